//! `Storage` (C1): a reference-counted, copy-on-write numeric buffer.
//!
//! The teacher has no refcounted-buffer precedent of its own (its
//! `types::tensor::Tensor<T>` just owns a plain `Vec<T>`); the COW wrapper
//! here follows the ordinary Rust `Rc`/`Arc` shared-buffer idiom used
//! elsewhere in the retrieval pack (e.g. `Arc<...>` in
//! `water236-horus::horus_core::memory`/`core::node`).
//!
//! Spec's "Empty" sentinel for "no imaginary part" (§3) is represented as
//! `Option<Storage>` at the `Tensor` level rather than a special shared
//! zero-length singleton — `None` is the zero-cost, idiomatic stand-in for
//! "this storage does not exist", and needs no refcounting of its own.

use std::rc::Rc;

use crate::dtype::DType;
use crate::error::{DTypeError, Result};

/// The dtype-tagged buffer a `Storage` owns.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBuf {
    Logic(Vec<u8>),
    Int32(Vec<i32>),
    Float64(Vec<f64>),
}

impl StorageBuf {
    pub fn dtype(&self) -> DType {
        match self {
            StorageBuf::Logic(_) => DType::Logic,
            StorageBuf::Int32(_) => DType::Int32,
            StorageBuf::Float64(_) => DType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StorageBuf::Logic(v) => v.len(),
            StorageBuf::Int32(v) => v.len(),
            StorageBuf::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read element `i` as `f64`, the common currency type kernel loops and
    /// `InputInfo` normalize through.
    pub fn get_f64(&self, i: usize) -> f64 {
        match self {
            StorageBuf::Logic(v) => v[i] as f64,
            StorageBuf::Int32(v) => v[i] as f64,
            StorageBuf::Float64(v) => v[i],
        }
    }

    pub fn set_f64(&mut self, i: usize, v: f64) {
        match self {
            StorageBuf::Logic(buf) => buf[i] = if v != 0.0 { 1 } else { 0 },
            StorageBuf::Int32(buf) => buf[i] = v as i32,
            StorageBuf::Float64(buf) => buf[i] = v,
        }
    }
}

/// A reference-counted numeric buffer. Cloning a `Storage` is a cheap
/// pointer bump; mutation requires `ensure_unshared`, which deep-copies
/// only when the refcount is greater than one.
#[derive(Debug, Clone)]
pub struct Storage {
    buf: Rc<StorageBuf>,
}

impl Storage {
    /// A zero-initialized buffer of `length` elements.
    pub fn zeros(length: usize, dtype: DType) -> Storage {
        let buf = match dtype {
            DType::Logic => StorageBuf::Logic(vec![0u8; length]),
            DType::Int32 => StorageBuf::Int32(vec![0i32; length]),
            DType::Float64 => StorageBuf::Float64(vec![0.0f64; length]),
        };
        Storage { buf: Rc::new(buf) }
    }

    /// Type-converted copy of a flat `f64` source into `dtype`.
    ///
    /// Fails with `INVALID_DTYPE_CONVERSION` when converting a non-finite
    /// value into `Logic` (spec §4.1).
    pub fn from_flat(src: &[f64], dtype: DType) -> Result<Storage> {
        if dtype == DType::Logic {
            for &v in src {
                if !v.is_finite() {
                    return Err(DTypeError::NonFiniteToLogic.into());
                }
            }
        }
        let buf = match dtype {
            DType::Logic => StorageBuf::Logic(src.iter().map(|&v| if v != 0.0 { 1u8 } else { 0u8 }).collect()),
            DType::Int32 => StorageBuf::Int32(src.iter().map(|&v| v as i32).collect()),
            DType::Float64 => StorageBuf::Float64(src.to_vec()),
        };
        Ok(Storage { buf: Rc::new(buf) })
    }

    pub fn from_buf(buf: StorageBuf) -> Storage {
        Storage { buf: Rc::new(buf) }
    }

    pub fn dtype(&self) -> DType {
        self.buf.dtype()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.buf)
    }

    pub fn as_buf(&self) -> &StorageBuf {
        &self.buf
    }

    pub fn get_f64(&self, i: usize) -> f64 {
        self.buf.get_f64(i)
    }

    /// A deep copy with a fresh, unshared buffer.
    pub fn deep_clone(&self) -> Storage {
        Storage {
            buf: Rc::new((*self.buf).clone()),
        }
    }

    /// Guarantees `refcount() == 1` after return, cloning the buffer first
    /// if it was shared. Returns a mutable view into the now-unshared
    /// buffer.
    pub fn ensure_unshared(&mut self) -> &mut StorageBuf {
        Rc::make_mut(&mut self.buf)
    }

    /// Coerce any finite number to `{0,1}` for a `Logic`-dtype storage,
    /// without checking that `self.dtype() == Logic` (caller's
    /// responsibility — spec §4.1 names this the "unchecked" variant).
    pub fn set_as_logic_unchecked(&mut self, offset: usize, v: f64) {
        let buf = self.ensure_unshared();
        if let StorageBuf::Logic(b) = buf {
            b[offset] = if v != 0.0 { 1 } else { 0 };
        }
    }

    pub fn set_f64(&mut self, offset: usize, v: f64) {
        self.ensure_unshared().set_f64(offset, v);
    }
}
