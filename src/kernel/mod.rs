//! Kernel Framework (C7): assembles unary, binary, and reduction loop
//! bodies from per-case code fragments, injecting the dtype policy and
//! handling broadcasting and in-place evaluation (spec §4.6).

use crate::complex::ComplexScalar;
use crate::dtype::{BinaryPolicy, DType, UnaryPolicy};
use crate::error::{DTypeError, Result, ShapeError, StateError, TensorError};
use crate::input::{InputInfo, OpInput};
use crate::storage::Storage;
use crate::tensor::broadcast::{self, is_exact};
use crate::tensor::{row_major_strides, ElementValue, Tensor};

pub enum OpOutput {
    Scalar(ElementValue),
    Tensor(Tensor),
}

fn scalar_output(re: f64, im: f64) -> OpOutput {
    if im != 0.0 {
        OpOutput::Scalar(ElementValue::Complex(ComplexScalar::new(re, im)))
    } else {
        OpOutput::Scalar(ElementValue::Real(re))
    }
}

fn unavailable(reason: String) -> TensorError {
    DTypeError::Unavailable { reason }.into()
}

fn left_pad_shape(shape: &[usize], ndim: usize) -> Vec<usize> {
    let pad = ndim - shape.len();
    let mut out = vec![1usize; pad];
    out.extend_from_slice(shape);
    out
}

fn padded_strides(shape: &[usize], ndim: usize) -> Vec<usize> {
    let strides = row_major_strides(shape);
    let pad = ndim - shape.len();
    let mut out = vec![0usize; pad];
    out.extend_from_slice(&strides);
    out
}

// ----------------------------------------------------------------------
// Unary (C7 unary case tree)
// ----------------------------------------------------------------------

pub type UnaryBody = fn(f64, f64) -> (f64, f64);

#[derive(Clone, Copy)]
pub struct UnaryConfig {
    pub dtype_policy: UnaryPolicy,
}

pub struct UnaryOp {
    body: UnaryBody,
    config: UnaryConfig,
}

pub fn make_unary_op(body: UnaryBody, config: UnaryConfig) -> UnaryOp {
    UnaryOp { body, config }
}

impl UnaryOp {
    pub fn call(&self, input: OpInput) -> Result<OpOutput> {
        let info = InputInfo::normalize(input)?;
        let out_dtype = (self.config.dtype_policy)(info.dtype, info.is_complex).ok_or_else(|| {
            unavailable(format!(
                "unary op unavailable for dtype {} (complex={})",
                info.dtype, info.is_complex
            ))
        })?;

        if info.is_scalar {
            let (re, im) = (self.body)(info.re, info.im);
            return Ok(scalar_output(re, im));
        }

        let n = info.len();
        let mut real_buf = Vec::with_capacity(n);
        let mut imag_buf = Vec::with_capacity(n);
        let mut any_complex = false;
        for i in 0..n {
            let (re, im) = (self.body)(info.get_re(i), info.get_im(i));
            real_buf.push(re);
            imag_buf.push(im);
            if im != 0.0 {
                any_complex = true;
            }
        }
        let real = Storage::from_flat(&real_buf, out_dtype)?;
        let imag = if any_complex {
            Some(Storage::from_flat(&imag_buf, out_dtype)?)
        } else {
            None
        };
        Ok(OpOutput::Tensor(Tensor::from_parts(real, imag, info.original_shape)))
    }

    /// Reuses `x`'s own buffer as the output. Fails before any write if the
    /// result dtype would be wider than `x`'s current dtype (spec §4.6).
    pub fn call_in_place(&self, x: &mut Tensor) -> Result<()> {
        let in_dtype = x.dtype();
        let is_complex = x.has_nonzero_complex_storage();
        let out_dtype = (self.config.dtype_policy)(in_dtype, is_complex).ok_or_else(|| {
            unavailable(format!(
                "unary op unavailable for dtype {} (complex={})",
                in_dtype, is_complex
            ))
        })?;
        if out_dtype > in_dtype {
            return Err(DTypeError::InPlaceDowncast {
                from: in_dtype.to_string(),
                to: out_dtype.to_string(),
            }
            .into());
        }

        let n = x.size();
        let mut results = Vec::with_capacity(n);
        let mut any_complex = false;
        for i in 0..n {
            let el = x.get_el_flat(i)?;
            let (re, im) = (self.body)(el.re(), el.im());
            if im != 0.0 {
                any_complex = true;
            }
            results.push((re, im));
        }

        let had_complex_storage = x.has_complex_storage();
        x.real_storage_mut().ensure_unshared();
        for (i, &(re, _)) in results.iter().enumerate() {
            x.real_storage_mut().set_f64(i, re);
        }
        if any_complex {
            let imag = x.imag_storage_mut();
            imag.ensure_unshared();
            for (i, &(_, im)) in results.iter().enumerate() {
                imag.set_f64(i, im);
            }
        } else if had_complex_storage {
            let imag = x.imag_storage_mut();
            imag.ensure_unshared();
            for i in 0..n {
                imag.set_f64(i, 0.0);
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Binary (C7 binary case tree: SS / ST / TS / TT)
// ----------------------------------------------------------------------

pub type BinaryBody = fn(f64, f64, f64, f64) -> (f64, f64);

#[derive(Clone, Copy)]
pub struct BinaryConfig {
    pub dtype_policy: BinaryPolicy,
}

pub struct BinaryOp {
    body: BinaryBody,
    config: BinaryConfig,
}

pub fn make_binary_op(body: BinaryBody, config: BinaryConfig) -> BinaryOp {
    BinaryOp { body, config }
}

impl BinaryOp {
    pub fn call(&self, x: OpInput, y: OpInput) -> Result<OpOutput> {
        let ix = InputInfo::normalize(x)?;
        let iy = InputInfo::normalize(y)?;
        let out_dtype = (self.config.dtype_policy)(ix.dtype, ix.is_complex, iy.dtype, iy.is_complex).ok_or_else(|| {
            unavailable(format!(
                "binary op unavailable for ({}, complex={}) and ({}, complex={})",
                ix.dtype, ix.is_complex, iy.dtype, iy.is_complex
            ))
        })?;

        if ix.is_scalar && iy.is_scalar {
            let (re, im) = (self.body)(ix.re, ix.im, iy.re, iy.im);
            return Ok(scalar_output(re, im));
        }
        if ix.is_scalar {
            return self.walk_st(ix.re, ix.im, &iy, out_dtype);
        }
        if iy.is_scalar {
            return self.walk_ts(&ix, iy.re, iy.im, out_dtype);
        }
        self.walk_tt(&ix, &iy, out_dtype)
    }

    fn walk_ts(&self, x: &InputInfo, y_re: f64, y_im: f64, out_dtype: DType) -> Result<OpOutput> {
        let n = x.len();
        let mut real_buf = Vec::with_capacity(n);
        let mut imag_buf = Vec::with_capacity(n);
        let mut any_complex = false;
        for i in 0..n {
            let (re, im) = (self.body)(x.get_re(i), x.get_im(i), y_re, y_im);
            real_buf.push(re);
            imag_buf.push(im);
            if im != 0.0 {
                any_complex = true;
            }
        }
        finish_tensor(real_buf, imag_buf, any_complex, out_dtype, x.original_shape.clone())
    }

    fn walk_st(&self, x_re: f64, x_im: f64, y: &InputInfo, out_dtype: DType) -> Result<OpOutput> {
        let n = y.len();
        let mut real_buf = Vec::with_capacity(n);
        let mut imag_buf = Vec::with_capacity(n);
        let mut any_complex = false;
        for i in 0..n {
            let (re, im) = (self.body)(x_re, x_im, y.get_re(i), y.get_im(i));
            real_buf.push(re);
            imag_buf.push(im);
            if im != 0.0 {
                any_complex = true;
            }
        }
        finish_tensor(real_buf, imag_buf, any_complex, out_dtype, y.original_shape.clone())
    }

    fn walk_tt(&self, x: &InputInfo, y: &InputInfo, out_dtype: DType) -> Result<OpOutput> {
        if is_exact(&x.original_shape, &y.original_shape) {
            let n = x.len();
            let mut real_buf = Vec::with_capacity(n);
            let mut imag_buf = Vec::with_capacity(n);
            let mut any_complex = false;
            for i in 0..n {
                let (re, im) = (self.body)(x.get_re(i), x.get_im(i), y.get_re(i), y.get_im(i));
                real_buf.push(re);
                imag_buf.push(im);
                if im != 0.0 {
                    any_complex = true;
                }
            }
            return finish_tensor(real_buf, imag_buf, any_complex, out_dtype, x.original_shape.clone());
        }

        let out_shape = broadcast::broadcast_shapes(&x.original_shape, &y.original_shape)?;
        let out_ndim = out_shape.len();
        let x_shape = left_pad_shape(&x.original_shape, out_ndim);
        let y_shape = left_pad_shape(&y.original_shape, out_ndim);
        let x_strides = padded_strides(&x.original_shape, out_ndim);
        let y_strides = padded_strides(&y.original_shape, out_ndim);

        let total: usize = out_shape.iter().product();
        let mut real_buf = Vec::with_capacity(total);
        let mut imag_buf = Vec::with_capacity(total);
        let mut any_complex = false;
        let mut idx = vec![0usize; out_ndim];
        for _ in 0..total {
            let mut xo = 0usize;
            let mut yo = 0usize;
            for axis in 0..out_ndim {
                let xi_idx = if x_shape[axis] == 1 { 0 } else { idx[axis] };
                let yi_idx = if y_shape[axis] == 1 { 0 } else { idx[axis] };
                xo += xi_idx * x_strides[axis];
                yo += yi_idx * y_strides[axis];
            }
            let (re, im) = (self.body)(x.get_re(xo), x.get_im(xo), y.get_re(yo), y.get_im(yo));
            real_buf.push(re);
            imag_buf.push(im);
            if im != 0.0 {
                any_complex = true;
            }
            for axis in (0..out_ndim).rev() {
                idx[axis] += 1;
                if idx[axis] < out_shape[axis] {
                    break;
                }
                idx[axis] = 0;
            }
        }
        finish_tensor(real_buf, imag_buf, any_complex, out_dtype, out_shape)
    }

    /// In-place binary evaluation. The broadcast output shape MUST equal
    /// `x`'s shape; the result dtype MUST NOT be wider than `x`'s dtype.
    pub fn call_in_place(&self, x: &mut Tensor, y: OpInput) -> Result<()> {
        let x_shape = x.shape().to_vec();
        let x_dtype = x.dtype();
        let x_complex = x.has_nonzero_complex_storage();
        let iy = InputInfo::normalize(y)?;
        let out_dtype = (self.config.dtype_policy)(x_dtype, x_complex, iy.dtype, iy.is_complex).ok_or_else(|| {
            unavailable(format!(
                "binary op unavailable for ({}, complex={}) and ({}, complex={})",
                x_dtype, x_complex, iy.dtype, iy.is_complex
            ))
        })?;
        if out_dtype > x_dtype {
            return Err(DTypeError::InPlaceDowncast {
                from: x_dtype.to_string(),
                to: out_dtype.to_string(),
            }
            .into());
        }
        let out_shape = broadcast::broadcast_shapes(&x_shape, &iy.original_shape)?;
        if out_shape != x_shape {
            return Err(ShapeError::SizeMismatch {
                expected: x_shape.iter().product(),
                got: out_shape.iter().product(),
            }
            .into());
        }

        let ndim = x_shape.len();
        let x_strides = x.strides();
        let y_shape = left_pad_shape(&iy.original_shape, ndim);
        let y_strides = padded_strides(&iy.original_shape, ndim);

        let n = x.size();
        let mut results = Vec::with_capacity(n);
        let mut any_complex = false;
        let mut idx = vec![0usize; ndim];
        for _ in 0..n {
            let mut xo = 0usize;
            let mut yo = 0usize;
            for axis in 0..ndim {
                xo += idx[axis] * x_strides[axis];
                let yi_idx = if y_shape[axis] == 1 { 0 } else { idx[axis] };
                yo += yi_idx * y_strides[axis];
            }
            let el = x.get_el_flat(xo)?;
            let (re, im) = (self.body)(el.re(), el.im(), iy.get_re(yo), iy.get_im(yo));
            if im != 0.0 {
                any_complex = true;
            }
            results.push((xo, re, im));
            for axis in (0..ndim).rev() {
                idx[axis] += 1;
                if idx[axis] < x_shape[axis] {
                    break;
                }
                idx[axis] = 0;
            }
        }

        let had_complex_storage = x.has_complex_storage();
        x.real_storage_mut().ensure_unshared();
        for &(off, re, _) in &results {
            x.real_storage_mut().set_f64(off, re);
        }
        if any_complex {
            let imag = x.imag_storage_mut();
            imag.ensure_unshared();
            for &(off, _, im) in &results {
                imag.set_f64(off, im);
            }
        } else if had_complex_storage {
            let imag = x.imag_storage_mut();
            imag.ensure_unshared();
            for i in 0..n {
                imag.set_f64(i, 0.0);
            }
        }
        Ok(())
    }
}

fn finish_tensor(
    real_buf: Vec<f64>,
    imag_buf: Vec<f64>,
    any_complex: bool,
    out_dtype: DType,
    shape: Vec<usize>,
) -> Result<OpOutput> {
    let real = Storage::from_flat(&real_buf, out_dtype)?;
    let imag = if any_complex {
        Some(Storage::from_flat(&imag_buf, out_dtype)?)
    } else {
        None
    };
    Ok(OpOutput::Tensor(Tensor::from_parts(real, imag, shape)))
}

// ----------------------------------------------------------------------
// Reductions
// ----------------------------------------------------------------------

/// `(real, imag?, offset, stride, n) -> (re, im, arg_index?)`.
pub type ReductionFn = fn(&Storage, Option<&Storage>, usize, usize, usize) -> (f64, f64, Option<usize>);

#[derive(Clone, Copy)]
pub struct ReductionConfig {
    pub dtype_policy: UnaryPolicy,
}

pub struct ReductionOp {
    reducer: ReductionFn,
    config: ReductionConfig,
}

pub fn make_reduction_op(reducer: ReductionFn, config: ReductionConfig) -> ReductionOp {
    ReductionOp { reducer, config }
}

pub enum ReductionOutput {
    Scalar(ElementValue),
    ScalarWithIndex(ElementValue, usize),
    Tensor(Tensor),
    TensorWithIndex(Tensor, Tensor),
}

impl ReductionOp {
    pub fn call(&self, t: &Tensor, axis: Option<usize>, keep_dims: bool) -> Result<ReductionOutput> {
        let out_dtype = (self.config.dtype_policy)(t.dtype(), t.has_nonzero_complex_storage())
            .ok_or_else(|| unavailable(format!("reduction unavailable for dtype {}", t.dtype())))?;

        match axis {
            None => self.call_full(t, out_dtype, keep_dims),
            Some(axis) => self.call_axis(t, axis, out_dtype, keep_dims),
        }
    }

    fn call_full(&self, t: &Tensor, out_dtype: DType, keep_dims: bool) -> Result<ReductionOutput> {
        if t.is_empty() {
            return Err(StateError::EmptyInput.into());
        }
        let (re, im, argi) = (self.reducer)(t.real_storage(), t.imag_storage(), 0, 1, t.size());
        if keep_dims {
            let shape = vec![1usize; t.ndim()];
            let real = Storage::from_flat(&[re], out_dtype)?;
            let imag = if im != 0.0 {
                Some(Storage::from_flat(&[im], out_dtype)?)
            } else {
                None
            };
            let value_tensor = Tensor::from_parts(real, imag, shape.clone());
            return Ok(match argi {
                Some(i) => ReductionOutput::TensorWithIndex(
                    value_tensor,
                    Tensor::from_parts(Storage::from_flat(&[i as f64], DType::Int32)?, None, shape),
                ),
                None => ReductionOutput::Tensor(value_tensor),
            });
        }
        let ev = if im != 0.0 {
            ElementValue::Complex(ComplexScalar::new(re, im))
        } else {
            ElementValue::Real(re)
        };
        Ok(match argi {
            Some(i) => ReductionOutput::ScalarWithIndex(ev, i),
            None => ReductionOutput::Scalar(ev),
        })
    }

    fn call_axis(&self, t: &Tensor, axis: usize, out_dtype: DType, keep_dims: bool) -> Result<ReductionOutput> {
        if axis >= t.ndim() {
            return Err(ShapeError::SizeMismatch {
                expected: t.ndim(),
                got: axis + 1,
            }
            .into());
        }
        let shape = t.shape().to_vec();
        let strides = t.strides();
        let axis_len = shape[axis];
        let axis_stride = strides[axis];

        let mut out_shape_full = shape.clone();
        out_shape_full[axis] = 1;
        let out_total: usize = out_shape_full.iter().product();

        let mut real_buf = Vec::with_capacity(out_total);
        let mut imag_buf = Vec::with_capacity(out_total);
        let mut index_buf = Vec::with_capacity(out_total);
        let mut any_complex = false;
        let mut idx = vec![0usize; t.ndim()];
        for _ in 0..out_total {
            let mut base = 0usize;
            for k in 0..t.ndim() {
                base += idx[k] * strides[k];
            }
            let (re, im, argi) = (self.reducer)(t.real_storage(), t.imag_storage(), base, axis_stride, axis_len);
            if im != 0.0 {
                any_complex = true;
            }
            real_buf.push(re);
            imag_buf.push(im);
            if let Some(a) = argi {
                index_buf.push(a as f64);
            }
            for k in (0..t.ndim()).rev() {
                if k == axis {
                    continue;
                }
                idx[k] += 1;
                if idx[k] < out_shape_full[k] {
                    break;
                }
                idx[k] = 0;
            }
        }

        let final_shape: Vec<usize> = if keep_dims {
            out_shape_full.clone()
        } else {
            out_shape_full
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != axis)
                .map(|(_, v)| *v)
                .collect()
        };

        let real = Storage::from_flat(&real_buf, out_dtype)?;
        let imag = if any_complex {
            Some(Storage::from_flat(&imag_buf, out_dtype)?)
        } else {
            None
        };
        let value_tensor = Tensor::from_parts(real, imag, final_shape.clone());

        if index_buf.is_empty() {
            return Ok(ReductionOutput::Tensor(value_tensor));
        }
        let idx_real = Storage::from_flat(&index_buf, DType::Int32)?;
        let idx_tensor = Tensor::from_parts(idx_real, None, final_shape);
        Ok(ReductionOutput::TensorWithIndex(value_tensor, idx_tensor))
    }
}
