//! `Tensor` (C3): the composition of one real `Storage`, an optional
//! imaginary `Storage`, and a shape vector (spec §3).

pub mod broadcast;

use crate::complex::ComplexScalar;
use crate::dtype::DType;
use crate::error::{DTypeError, IndexError, Result, ShapeError, StateError};
use crate::storage::{Storage, StorageBuf};

/// A single element read out of a tensor: a plain real number, or a complex
/// value when the position carries a non-zero imaginary part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementValue {
    Real(f64),
    Complex(ComplexScalar),
}

impl ElementValue {
    pub fn re(self) -> f64 {
        match self {
            ElementValue::Real(r) => r,
            ElementValue::Complex(z) => z.re,
        }
    }

    pub fn im(self) -> f64 {
        match self {
            ElementValue::Real(_) => 0.0,
            ElementValue::Complex(z) => z.im,
        }
    }
}

/// Nested-array representation used by `to_nested`/`from_nested`.
#[derive(Debug, Clone, PartialEq)]
pub enum NestedValue {
    Num(f64),
    Complex(ComplexScalar),
    List(Vec<NestedValue>),
}

#[derive(Debug, Clone)]
pub struct Tensor {
    real: Storage,
    imag: Option<Storage>,
    shape: Vec<usize>,
}

/// Row-major strides derived from `shape`: `stride[D-1] = 1`,
/// `stride[k] = stride[k+1] * n_{k+1}` (spec §3).
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let ndim = shape.len();
    let mut strides = vec![1usize; ndim];
    for k in (0..ndim.saturating_sub(1)).rev() {
        strides[k] = strides[k + 1] * shape[k + 1];
    }
    strides
}

impl Tensor {
    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    pub fn zeros(shape: &[usize], dtype: DType) -> Tensor {
        let len: usize = shape.iter().product();
        Tensor {
            real: Storage::zeros(len, dtype),
            imag: None,
            shape: shape.to_vec(),
        }
    }

    /// Allocates then iteratively sets every element to 1; for `Logic`
    /// dtype "1" is "true", consistent throughout (spec §9 open question:
    /// no ambiguity here, so this is implemented literally).
    pub fn ones(shape: &[usize], dtype: DType) -> Tensor {
        let mut t = Tensor::zeros(shape, dtype);
        for i in 0..t.size() {
            t.real.set_f64(i, 1.0);
        }
        t
    }

    /// A scalar tensor of `ndim` singleton axes (default 1), optionally
    /// complex.
    pub fn scalar(re: f64, im: Option<f64>, dtype: Option<DType>, ndim: Option<usize>) -> Result<Tensor> {
        let dtype = dtype.unwrap_or(DType::Float64);
        let shape = vec![1usize; ndim.unwrap_or(1).max(1)];
        let real = Storage::from_flat(&[re], dtype)?;
        let imag = match im {
            Some(v) => Some(Storage::from_flat(&[v], dtype)?),
            None => None,
        };
        Ok(Tensor { real, imag, shape })
    }

    pub fn scalar_from_complex(z: ComplexScalar) -> Tensor {
        Tensor::scalar(z.re, Some(z.im), Some(DType::Float64), None)
            .expect("float64 storage never fails to build")
    }

    pub fn from_flat(buf: &[f64], dtype: Option<DType>) -> Result<Tensor> {
        let dtype = dtype.unwrap_or(DType::Float64);
        Ok(Tensor {
            real: Storage::from_flat(buf, dtype)?,
            imag: None,
            shape: vec![buf.len()],
        })
    }

    pub fn complex(re_tensor: Tensor, im_tensor: Tensor) -> Result<Tensor> {
        if re_tensor.shape != im_tensor.shape {
            return Err(ShapeError::SizeMismatch {
                expected: re_tensor.size(),
                got: im_tensor.size(),
            }
            .into());
        }
        let dtype = re_tensor.dtype();
        let im_flat = im_tensor.real_data();
        let imag = Storage::from_flat(&im_flat, dtype)?;
        Ok(Tensor {
            real: re_tensor.real,
            imag: Some(imag),
            shape: re_tensor.shape,
        })
    }

    pub fn from_nested(arr: &NestedValue, dtype: Option<DType>) -> Result<Tensor> {
        let mut shape = Vec::new();
        infer_nested_shape(arr, 0, &mut shape)?;
        let mut real_flat = Vec::new();
        let mut imag_flat = Vec::new();
        let mut any_complex = false;
        flatten_nested(arr, &mut real_flat, &mut imag_flat, &mut any_complex)?;

        let dtype = dtype.unwrap_or(DType::Float64);
        let real = Storage::from_flat(&real_flat, dtype)?;
        let imag = if any_complex {
            Some(Storage::from_flat(&imag_flat, dtype)?)
        } else {
            None
        };
        Ok(Tensor { real, imag, shape })
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn dtype(&self) -> DType {
        self.real.dtype()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> Vec<usize> {
        row_major_strides(&self.shape)
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn has_complex_storage(&self) -> bool {
        self.imag.is_some()
    }

    pub fn has_nonzero_complex_storage(&self) -> bool {
        match &self.imag {
            Some(s) => (0..s.len()).any(|i| s.get_f64(i) != 0.0),
            None => false,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.size() == 1
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn real_storage(&self) -> &Storage {
        &self.real
    }

    pub fn real_storage_mut(&mut self) -> &mut Storage {
        &mut self.real
    }

    pub fn imag_storage(&self) -> Option<&Storage> {
        self.imag.as_ref()
    }

    /// Returns a mutable handle to the imaginary storage, lazily allocating
    /// a zeroed buffer matching the real storage's dtype/length if one
    /// doesn't exist yet (spec §3: "a complex tensor may still carry
    /// all-zero imaginary data").
    pub fn imag_storage_mut(&mut self) -> &mut Storage {
        if self.imag.is_none() {
            self.imag = Some(Storage::zeros(self.real.len(), self.real.dtype()));
        }
        self.imag.as_mut().unwrap()
    }

    // ------------------------------------------------------------------
    // Data access
    // ------------------------------------------------------------------

    pub fn real_data(&self) -> Vec<f64> {
        (0..self.real.len()).map(|i| self.real.get_f64(i)).collect()
    }

    pub fn imag_data(&self) -> Result<Vec<f64>> {
        match &self.imag {
            Some(s) => Ok((0..s.len()).map(|i| s.get_f64(i)).collect()),
            None => Err(StateError::NoImaginaryStorage.into()),
        }
    }

    fn offset(&self, indices: &[usize]) -> Result<usize> {
        if indices.len() != self.ndim() {
            return Err(ShapeError::SizeMismatch {
                expected: self.ndim(),
                got: indices.len(),
            }
            .into());
        }
        let strides = self.strides();
        let mut off = 0usize;
        for (k, &i) in indices.iter().enumerate() {
            if i >= self.shape[k] {
                return Err(IndexError::OutOfBounds {
                    axis: k,
                    index: i as isize,
                    len: self.shape[k],
                }
                .into());
            }
            off += i * strides[k];
        }
        Ok(off)
    }

    pub fn get_el_flat(&self, flat: usize) -> Result<ElementValue> {
        if flat >= self.real.len() {
            return Err(IndexError::OutOfBounds {
                axis: 0,
                index: flat as isize,
                len: self.real.len(),
            }
            .into());
        }
        let re = self.real.get_f64(flat);
        let im = self.imag.as_ref().map(|s| s.get_f64(flat)).unwrap_or(0.0);
        Ok(if im != 0.0 {
            ElementValue::Complex(ComplexScalar::new(re, im))
        } else {
            ElementValue::Real(re)
        })
    }

    pub fn get_el(&self, indices: &[usize]) -> Result<ElementValue> {
        let flat = self.offset(indices)?;
        self.get_el_flat(flat)
    }

    pub fn set_el_flat(&mut self, flat: usize, value: ElementValue) -> Result<()> {
        if flat >= self.real.len() {
            return Err(IndexError::OutOfBounds {
                axis: 0,
                index: flat as isize,
                len: self.real.len(),
            }
            .into());
        }
        if self.dtype() == DType::Logic && value.im() != 0.0 {
            return Err(DTypeError::ComplexIntoLogic.into());
        }
        self.real.set_f64(flat, value.re());
        if value.im() != 0.0 {
            self.imag_storage_mut().set_f64(flat, value.im());
        } else if let Some(imag) = self.imag.as_mut() {
            imag.set_f64(flat, 0.0);
        }
        Ok(())
    }

    pub fn set_el(&mut self, indices: &[usize], value: ElementValue) -> Result<()> {
        let flat = self.offset(indices)?;
        self.set_el_flat(flat, value)
    }

    pub fn to_nested(&self, real_only: bool) -> NestedValue {
        fn build(t: &Tensor, axis: usize, base: usize, strides: &[usize], real_only: bool) -> NestedValue {
            if axis == t.ndim() {
                let el = t.get_el_flat(base).expect("base offset always in range");
                return if real_only {
                    NestedValue::Num(el.re())
                } else {
                    match el {
                        ElementValue::Real(r) => NestedValue::Num(r),
                        ElementValue::Complex(z) => NestedValue::Complex(z),
                    }
                };
            }
            let n = t.shape[axis];
            let mut out = Vec::with_capacity(n);
            for i in 0..n {
                out.push(build(t, axis + 1, base + i * strides[axis], strides, real_only));
            }
            NestedValue::List(out)
        }
        if self.ndim() == 0 {
            return build(self, 0, 0, &[], real_only);
        }
        build(self, 0, 0, &self.strides(), real_only)
    }

    // ------------------------------------------------------------------
    // Reshape family — pointer-level: the returned tensor shares the same
    // underlying storage allocation until a write forces ensure_unshared.
    // ------------------------------------------------------------------

    /// Accepts a single `-1` dimension, inferred from the total element
    /// count. Two `-1`s or a non-divisible size is an error.
    pub fn reshape(&self, shape: &[isize]) -> Result<Tensor> {
        let resolved = resolve_reshape(shape, self.size())?;
        Ok(Tensor {
            real: self.real.clone(),
            imag: self.imag.clone(),
            shape: resolved,
        })
    }

    pub fn get_reshaped_copy(&self, shape: &[isize]) -> Result<Tensor> {
        let resolved = resolve_reshape(shape, self.size())?;
        Ok(Tensor {
            real: self.real.deep_clone(),
            imag: self.imag.as_ref().map(Storage::deep_clone),
            shape: resolved,
        })
    }

    pub fn prepend_axis(&self) -> Tensor {
        let mut shape = Vec::with_capacity(self.ndim() + 1);
        shape.push(1);
        shape.extend_from_slice(&self.shape);
        Tensor {
            real: self.real.clone(),
            imag: self.imag.clone(),
            shape,
        }
    }

    pub fn append_axis(&self) -> Tensor {
        let mut shape = self.shape.clone();
        shape.push(1);
        Tensor {
            real: self.real.clone(),
            imag: self.imag.clone(),
            shape,
        }
    }

    pub fn copy(&self, deep: bool) -> Tensor {
        if deep {
            Tensor {
                real: self.real.deep_clone(),
                imag: self.imag.as_ref().map(Storage::deep_clone),
                shape: self.shape.clone(),
            }
        } else {
            self.clone()
        }
    }

    pub fn as_type(&self, dtype: DType, always_copy: bool) -> Result<Tensor> {
        if dtype == self.dtype() && !always_copy {
            return Ok(self.clone());
        }
        if dtype == DType::Logic && self.has_nonzero_complex_storage() {
            return Err(DTypeError::ComplexToLogic.into());
        }
        let real = Storage::from_flat(&self.real_data(), dtype)?;
        let imag = match &self.imag {
            Some(_) => Some(Storage::from_flat(&self.imag_data()?, dtype)?),
            None => None,
        };
        Ok(Tensor {
            real,
            imag,
            shape: self.shape.clone(),
        })
    }

    /// Drops the imaginary storage. `real_data` is bitwise unchanged
    /// (spec §8 invariant 2).
    pub fn trim_imaginary_part(&self) -> Tensor {
        Tensor {
            real: self.real.clone(),
            imag: None,
            shape: self.shape.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Equality checks (spec §6 item 7)
    // ------------------------------------------------------------------

    /// Structural equality: same shape, dtype, complex-storage presence,
    /// and bitwise-identical values (NaN compares equal to NaN here, unlike
    /// IEEE `==`, so that `is_equal(x, x)` holds for any `x`).
    pub fn is_equal(&self, other: &Tensor) -> bool {
        if self.shape != other.shape || self.dtype() != other.dtype() {
            return false;
        }
        if self.has_complex_storage() != other.has_complex_storage() {
            return false;
        }
        let bits_eq = |a: f64, b: f64| a.to_bits() == b.to_bits();
        for i in 0..self.size() {
            if !bits_eq(self.real.get_f64(i), other.real.get_f64(i)) {
                return false;
            }
        }
        match (&self.imag, &other.imag) {
            (Some(a), Some(b)) => (0..a.len()).all(|i| bits_eq(a.get_f64(i), b.get_f64(i))),
            (None, None) => true,
            _ => false,
        }
    }

    /// Shape + value equality: `a + 0i == a` (dtype and complex-storage
    /// presence are not compared).
    pub fn is_numerically_equal(&self, other: &Tensor) -> bool {
        if self.shape != other.shape {
            return false;
        }
        (0..self.size()).all(|i| {
            let a = self.get_el_flat(i).unwrap();
            let b = other.get_el_flat(i).unwrap();
            a.re() == b.re() && a.im() == b.im()
        })
    }

    pub fn is_approximately_equal(&self, other: &Tensor, tol: f64) -> bool {
        if self.shape != other.shape {
            return false;
        }
        (0..self.size()).all(|i| {
            let a = self.get_el_flat(i).unwrap();
            let b = other.get_el_flat(i).unwrap();
            (a.re() - b.re()).abs() <= tol && (a.im() - b.im()).abs() <= tol
        })
    }

    pub fn real_buf(&self) -> &StorageBuf {
        self.real.as_buf()
    }

    /// Sum of the diagonal entries of a square matrix: offsets `i*(n+1)`
    /// for `i in 0..n`. Spec §9 flags a source path that instead walks
    /// `shape[0]` elements per iteration from offset 0 — the first column,
    /// not the diagonal — as a bug; this is the mathematically correct
    /// definition (DESIGN.md Open Question 1).
    pub fn trace(&self) -> Result<ElementValue> {
        if self.ndim() != 2 || self.shape[0] != self.shape[1] {
            return Err(ShapeError::NotSquare {
                shape: self.shape.clone(),
            }
            .into());
        }
        let n = self.shape[0];
        let mut re = 0.0;
        let mut im = 0.0;
        for i in 0..n {
            let el = self.get_el_flat(i * (n + 1))?;
            re += el.re();
            im += el.im();
        }
        Ok(if im != 0.0 {
            ElementValue::Complex(ComplexScalar::new(re, im))
        } else {
            ElementValue::Real(re)
        })
    }

    /// Assembles a tensor directly from already-built parts. Used by the
    /// indexing and kernel subsystems, which compute a flat result buffer
    /// themselves and just need it wrapped.
    pub(crate) fn from_parts(real: Storage, imag: Option<Storage>, shape: Vec<usize>) -> Tensor {
        Tensor { real, imag, shape }
    }
}

/// Concatenates `tensors` along `axis`. All tensors must share the same
/// ndim and agree on every axis except `axis`, which sums. Widens to the
/// widest input dtype; complex storage materializes if any input carries
/// nonzero imaginary data (spec §8: `concat([t], axis) == t.copy()`).
pub fn concat(tensors: &[&Tensor], axis: usize) -> Result<Tensor> {
    if tensors.is_empty() {
        return Err(StateError::EmptyInput.into());
    }
    let ndim = tensors[0].ndim();
    if axis >= ndim {
        return Err(ShapeError::SizeMismatch {
            expected: ndim,
            got: axis + 1,
        }
        .into());
    }
    let mut out_shape = tensors[0].shape().to_vec();
    let mut dtype = tensors[0].dtype();
    let mut any_complex = false;
    out_shape[axis] = 0;
    for t in tensors {
        if t.ndim() != ndim {
            return Err(ShapeError::SizeMismatch {
                expected: ndim,
                got: t.ndim(),
            }
            .into());
        }
        for k in 0..ndim {
            if k != axis && t.shape()[k] != tensors[0].shape()[k] {
                return Err(ShapeError::SizeMismatch {
                    expected: tensors[0].shape()[k],
                    got: t.shape()[k],
                }
                .into());
            }
        }
        out_shape[axis] += t.shape()[axis];
        dtype = dtype.wider(t.dtype());
        any_complex |= t.has_complex_storage();
    }

    let total: usize = out_shape.iter().product();
    let out_strides = row_major_strides(&out_shape);
    let mut real_buf = vec![0.0f64; total];
    let mut imag_buf = vec![0.0f64; total];
    let mut axis_base = 0usize;
    for t in tensors {
        let t_strides = t.strides();
        let n = t.size();
        for flat in 0..n {
            let mut rem = flat;
            let mut out_off = 0usize;
            for k in 0..ndim {
                let idx = rem / t_strides[k];
                rem %= t_strides[k];
                let out_idx = if k == axis { idx + axis_base } else { idx };
                out_off += out_idx * out_strides[k];
            }
            let el = t.get_el_flat(flat)?;
            real_buf[out_off] = el.re();
            imag_buf[out_off] = el.im();
        }
        axis_base += t.shape()[axis];
    }

    let real = Storage::from_flat(&real_buf, dtype)?;
    let imag = if any_complex {
        Some(Storage::from_flat(&imag_buf, dtype)?)
    } else {
        None
    };
    Ok(Tensor::from_parts(real, imag, out_shape))
}

fn resolve_reshape(shape: &[isize], total: usize) -> Result<Vec<usize>> {
    let mut unknown_axis = None;
    let mut known_product: usize = 1;
    for (i, &d) in shape.iter().enumerate() {
        if d == -1 {
            if unknown_axis.is_some() {
                return Err(ShapeError::UnknownDimInference {
                    shape: shape.to_vec(),
                }
                .into());
            }
            unknown_axis = Some(i);
        } else if d < 0 {
            return Err(ShapeError::UnknownDimInference {
                shape: shape.to_vec(),
            }
            .into());
        } else {
            known_product *= d as usize;
        }
    }
    let mut resolved: Vec<usize> = shape.iter().map(|&d| if d == -1 { 0 } else { d as usize }).collect();
    if let Some(axis) = unknown_axis {
        if known_product == 0 || total % known_product != 0 {
            return Err(ShapeError::UnknownDimInference {
                shape: shape.to_vec(),
            }
            .into());
        }
        resolved[axis] = total / known_product;
    } else if known_product != total {
        return Err(ShapeError::ReshapeMismatch {
            from: vec![total],
            to: resolved,
        }
        .into());
    }
    Ok(resolved)
}

fn infer_nested_shape(v: &NestedValue, depth: usize, shape: &mut Vec<usize>) -> Result<()> {
    match v {
        NestedValue::Num(_) | NestedValue::Complex(_) => Ok(()),
        NestedValue::List(items) => {
            if shape.len() == depth {
                shape.push(items.len());
            } else if shape[depth] != items.len() {
                return Err(ShapeError::Ragged {
                    position: depth,
                    reason: format!("expected length {}, got {}", shape[depth], items.len()),
                }
                .into());
            }
            for item in items {
                infer_nested_shape(item, depth + 1, shape)?;
            }
            Ok(())
        }
    }
}

fn flatten_nested(v: &NestedValue, real: &mut Vec<f64>, imag: &mut Vec<f64>, any_complex: &mut bool) -> Result<()> {
    match v {
        NestedValue::Num(n) => {
            real.push(*n);
            imag.push(0.0);
            Ok(())
        }
        NestedValue::Complex(z) => {
            real.push(z.re);
            imag.push(z.im);
            if z.im != 0.0 {
                *any_complex = true;
            }
            Ok(())
        }
        NestedValue::List(items) => {
            for item in items {
                flatten_nested(item, real, imag, any_complex)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_and_ones() {
        let z = Tensor::zeros(&[2, 3], DType::Float64);
        assert_eq!(z.size(), 6);
        assert_eq!(z.real_data(), vec![0.0; 6]);

        let o = Tensor::ones(&[2, 2], DType::Logic);
        assert_eq!(o.real_data(), vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn strides_are_row_major() {
        let t = Tensor::zeros(&[2, 3, 4], DType::Float64);
        assert_eq!(t.strides(), vec![12, 4, 1]);
    }

    #[test]
    fn invariant_len_matches_shape_product() {
        let t = Tensor::zeros(&[3, 4], DType::Int32);
        assert_eq!(t.real_data().len(), t.shape().iter().product::<usize>());
    }

    #[test]
    fn set_el_rejects_complex_value_into_logic_tensor() {
        let mut t = Tensor::zeros(&[2], DType::Logic);
        let err = t
            .set_el_flat(0, ElementValue::Complex(ComplexScalar::new(1.0, 1.0)))
            .unwrap_err();
        assert_eq!(err, DTypeError::ComplexIntoLogic.into());
    }

    #[test]
    fn set_el_allows_real_value_into_logic_tensor() {
        let mut t = Tensor::zeros(&[2], DType::Logic);
        t.set_el_flat(0, ElementValue::Real(5.0)).unwrap();
        assert_eq!(t.real_data()[0], 1.0);
    }

    #[test]
    fn trim_imaginary_part_leaves_real_unchanged() {
        let mut t = Tensor::zeros(&[2], DType::Float64);
        t.set_el_flat(0, ElementValue::Complex(ComplexScalar::new(1.0, 2.0))).unwrap();
        assert!(t.has_complex_storage());
        let trimmed = t.trim_imaginary_part();
        assert!(!trimmed.has_complex_storage());
        assert_eq!(trimmed.real_data(), t.real_data());
    }

    #[test]
    fn reshape_is_pointer_level() {
        let t = Tensor::from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], None).unwrap();
        let reshaped = t.reshape(&[2, 3]).unwrap();
        let back = reshaped.reshape(&[6]).unwrap();
        assert!(back.is_equal(&t));
    }

    #[test]
    fn reshape_infers_single_unknown_dim() {
        let t = Tensor::from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], None).unwrap();
        let reshaped = t.reshape(&[2, -1]).unwrap();
        assert_eq!(reshaped.shape(), &[2, 3]);
    }

    #[test]
    fn reshape_rejects_two_unknowns() {
        let t = Tensor::from_flat(&[1.0, 2.0, 3.0, 4.0], None).unwrap();
        assert!(t.reshape(&[-1, -1]).is_err());
    }

    #[test]
    fn reshape_rejects_nondivisible_size() {
        let t = Tensor::from_flat(&[1.0, 2.0, 3.0], None).unwrap();
        assert!(t.reshape(&[2, -1]).is_err());
    }

    #[test]
    fn prepend_and_append_axis() {
        let t = Tensor::zeros(&[3, 4], DType::Float64);
        assert_eq!(t.prepend_axis().shape(), &[1, 3, 4]);
        assert_eq!(t.append_axis().shape(), &[3, 4, 1]);
    }

    #[test]
    fn nested_roundtrip_real() {
        let nested = NestedValue::List(vec![
            NestedValue::List(vec![NestedValue::Num(1.0), NestedValue::Num(2.0)]),
            NestedValue::List(vec![NestedValue::Num(3.0), NestedValue::Num(4.0)]),
        ]);
        let t = Tensor::from_nested(&nested, Some(DType::Float64)).unwrap();
        assert_eq!(t.shape(), &[2, 2]);
        let back = t.to_nested(false);
        let t2 = Tensor::from_nested(&back, Some(DType::Float64)).unwrap();
        assert!(t2.is_equal(&t));
    }

    #[test]
    fn nested_rejects_ragged_arrays() {
        let nested = NestedValue::List(vec![
            NestedValue::List(vec![NestedValue::Num(1.0), NestedValue::Num(2.0)]),
            NestedValue::List(vec![NestedValue::Num(3.0)]),
        ]);
        assert!(Tensor::from_nested(&nested, None).is_err());
    }

    #[test]
    fn is_equal_vs_is_numerically_equal() {
        let a = Tensor::from_flat(&[1.0], Some(DType::Int32)).unwrap();
        let b = Tensor::from_flat(&[1.0], Some(DType::Float64)).unwrap();
        assert!(!a.is_equal(&b), "dtype differs");
        assert!(a.is_numerically_equal(&b));
    }

    #[test]
    fn approximately_equal_with_zero_tol_implies_numerically_equal() {
        let a = Tensor::from_flat(&[1.0, 2.0], None).unwrap();
        let b = Tensor::from_flat(&[1.0, 2.0], None).unwrap();
        assert!(a.is_approximately_equal(&b, 0.0));
        assert!(a.is_numerically_equal(&b));
    }

    #[test]
    fn is_equal_is_reflexive_even_with_nan() {
        let t = Tensor::from_flat(&[f64::NAN, 1.0], None).unwrap();
        assert!(t.is_equal(&t));
    }

    #[test]
    fn copy_deep_breaks_aliasing() {
        let a = Tensor::zeros(&[3], DType::Float64);
        let mut b = a.copy(true);
        b.set_el_flat(0, ElementValue::Real(9.0)).unwrap();
        assert_eq!(a.real_data()[0], 0.0);
    }

    #[test]
    fn as_type_converts_dtype() {
        let t = Tensor::from_flat(&[1.0, 2.0], Some(DType::Float64)).unwrap();
        let converted = t.as_type(DType::Int32, false).unwrap();
        assert_eq!(converted.dtype(), DType::Int32);
        assert_eq!(converted.real_data(), vec![1.0, 2.0]);
    }

    #[test]
    fn as_type_rejects_nonzero_complex_into_logic() {
        let mut t = Tensor::zeros(&[1], DType::Float64);
        t.set_el_flat(0, ElementValue::Complex(ComplexScalar::new(1.0, 1.0))).unwrap();
        let err = t.as_type(DType::Logic, false).unwrap_err();
        assert_eq!(err, DTypeError::ComplexToLogic.into());
    }

    #[test]
    fn as_type_allows_all_zero_complex_storage_into_logic() {
        let mut t = Tensor::zeros(&[1], DType::Float64);
        let _ = t.imag_storage_mut();
        t.set_el_flat(0, ElementValue::Real(1.0)).unwrap();
        let converted = t.as_type(DType::Logic, false).unwrap();
        assert_eq!(converted.dtype(), DType::Logic);
    }

    #[test]
    fn as_type_same_dtype_without_always_copy_shares_storage() {
        let t = Tensor::from_flat(&[1.0], None).unwrap();
        let same = t.as_type(DType::Float64, false).unwrap();
        assert_eq!(same.real_storage().refcount(), t.real_storage().refcount());
    }

    #[test]
    fn trace_sums_the_diagonal_not_the_first_column() {
        // [[1,2],[3,4]] -> diagonal is 1,4 (sum 5), not the first column 1,3.
        let t = Tensor::from_flat(&[1.0, 2.0, 3.0, 4.0], None).unwrap().reshape(&[2, 2]).unwrap();
        assert_eq!(t.trace().unwrap(), ElementValue::Real(5.0));
    }

    #[test]
    fn trace_rejects_non_square() {
        let t = Tensor::zeros(&[2, 3], DType::Float64);
        assert!(t.trace().is_err());
    }

    #[test]
    fn concat_of_single_tensor_is_a_copy() {
        let t = Tensor::from_flat(&[1.0, 2.0, 3.0], None).unwrap();
        let out = concat(&[&t], 0).unwrap();
        assert!(out.is_equal(&t));
    }

    #[test]
    fn concat_along_axis_zero() {
        let a = Tensor::from_flat(&[1.0, 2.0], None).unwrap().reshape(&[1, 2]).unwrap();
        let b = Tensor::from_flat(&[3.0, 4.0], None).unwrap().reshape(&[1, 2]).unwrap();
        let out = concat(&[&a, &b], 0).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.real_data(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn concat_along_axis_one_interleaves_rows() {
        let a = Tensor::from_flat(&[1.0, 2.0], None).unwrap().reshape(&[2, 1]).unwrap();
        let b = Tensor::from_flat(&[3.0, 4.0], None).unwrap().reshape(&[2, 1]).unwrap();
        let out = concat(&[&a, &b], 1).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.real_data(), vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn concat_rejects_mismatched_non_axis_dims() {
        let a = Tensor::zeros(&[2, 3], DType::Float64);
        let b = Tensor::zeros(&[2, 4], DType::Float64);
        assert!(concat(&[&a, &a], 1).is_ok());
        assert!(concat(&[&a, &b], 0).is_err());
    }
}
