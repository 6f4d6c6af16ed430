//! `InputInfo` (C4): normalizes any op input into one uniform view (spec
//! §4.3). This is the single point where the `OpInput` union gets
//! flattened so the kernel framework (C7) never has to match on the
//! original input shape again.

use crate::complex::ComplexScalar;
use crate::dtype::DType;
use crate::error::Result;
use crate::storage::Storage;
use crate::tensor::{NestedValue, Tensor};

/// A tagged union over every shape an op operand can arrive in.
pub enum OpInput<'a> {
    Number(f64),
    Complex(ComplexScalar),
    Nested(&'a NestedValue),
    /// A flat buffer plus the dtype its element type implies — integer
    /// buffers normalize to `Int32`, double buffers to `Float64`.
    FlatArray(&'a [f64], DType),
    Tensor(&'a Tensor),
}

/// The normalized view an operation actually consumes. For `Tensor` inputs,
/// `real`/`imag` are `Rc`-shared with the source tensor's storage — reading
/// is free, but writing through them mutates the caller's tensor unless the
/// caller has copied first (spec §4.3, §5).
pub struct InputInfo {
    pub is_scalar: bool,
    pub has_only_one_element: bool,
    pub is_complex: bool,
    pub original_shape: Vec<usize>,
    pub dtype: DType,
    pub real: Storage,
    pub imag: Option<Storage>,
    /// Meaningful only when `has_only_one_element`.
    pub re: f64,
    /// Meaningful only when `has_only_one_element`.
    pub im: f64,
}

impl InputInfo {
    pub fn normalize(input: OpInput) -> Result<InputInfo> {
        match input {
            OpInput::Number(n) => Ok(InputInfo {
                is_scalar: true,
                has_only_one_element: true,
                is_complex: false,
                original_shape: vec![1],
                dtype: DType::Float64,
                real: Storage::from_flat(&[n], DType::Float64)?,
                imag: None,
                re: n,
                im: 0.0,
            }),
            OpInput::Complex(z) => Ok(InputInfo {
                is_scalar: true,
                has_only_one_element: true,
                is_complex: z.im != 0.0,
                original_shape: vec![1],
                dtype: DType::Float64,
                real: Storage::from_flat(&[z.re], DType::Float64)?,
                imag: Some(Storage::from_flat(&[z.im], DType::Float64)?),
                re: z.re,
                im: z.im,
            }),
            OpInput::Nested(nested) => {
                let t = Tensor::from_nested(nested, None)?;
                Ok(InputInfo::from_tensor(&t))
            }
            OpInput::FlatArray(buf, dtype) => {
                let has_one = buf.len() == 1;
                Ok(InputInfo {
                    is_scalar: has_one,
                    has_only_one_element: has_one,
                    is_complex: false,
                    original_shape: vec![buf.len()],
                    dtype,
                    real: Storage::from_flat(buf, dtype)?,
                    imag: None,
                    re: if has_one { buf[0] } else { 0.0 },
                    im: 0.0,
                })
            }
            OpInput::Tensor(t) => Ok(InputInfo::from_tensor(t)),
        }
    }

    fn from_tensor(t: &Tensor) -> InputInfo {
        let has_one = t.size() == 1;
        let (re, im) = if has_one {
            let el = t.get_el_flat(0).expect("size 1 tensor has element 0");
            (el.re(), el.im())
        } else {
            (0.0, 0.0)
        };
        InputInfo {
            is_scalar: t.is_scalar(),
            has_only_one_element: has_one,
            is_complex: t.has_nonzero_complex_storage(),
            original_shape: t.shape().to_vec(),
            dtype: t.dtype(),
            real: t.real_storage().clone(),
            imag: t.imag_storage().cloned(),
            re,
            im,
        }
    }

    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn get_re(&self, i: usize) -> f64 {
        self.real.get_f64(i)
    }

    pub fn get_im(&self, i: usize) -> f64 {
        self.imag.as_ref().map(|s| s.get_f64(i)).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_normalizes_to_float64_scalar() {
        let info = InputInfo::normalize(OpInput::Number(3.5)).unwrap();
        assert!(info.is_scalar);
        assert!(info.has_only_one_element);
        assert!(!info.is_complex);
        assert_eq!(info.original_shape, vec![1]);
        assert_eq!(info.dtype, DType::Float64);
        assert_eq!(info.re, 3.5);
    }

    #[test]
    fn complex_scalar_with_zero_imag_is_not_flagged_complex() {
        let z = ComplexScalar::new(2.0, 0.0);
        let info = InputInfo::normalize(OpInput::Complex(z)).unwrap();
        assert!(!info.is_complex, "zero imaginary part must not flag is_complex");
        assert!(info.imag.is_some(), "storage still carries the zero imaginary buffer");
    }

    #[test]
    fn complex_scalar_with_nonzero_imag_is_complex() {
        let z = ComplexScalar::new(0.0, -4.0);
        let info = InputInfo::normalize(OpInput::Complex(z)).unwrap();
        assert!(info.is_complex);
        assert_eq!(info.im, -4.0);
    }

    #[test]
    fn flat_array_infers_dtype_from_caller_supplied_flavour() {
        let buf = [1.0, 2.0, 3.0];
        let info = InputInfo::normalize(OpInput::FlatArray(&buf, DType::Int32)).unwrap();
        assert_eq!(info.dtype, DType::Int32);
        assert_eq!(info.original_shape, vec![3]);
        assert!(!info.has_only_one_element);
    }

    #[test]
    fn nested_array_is_recursively_constructed_and_checked_for_raggedness() {
        let ragged = NestedValue::List(vec![
            NestedValue::List(vec![NestedValue::Num(1.0)]),
            NestedValue::List(vec![NestedValue::Num(2.0), NestedValue::Num(3.0)]),
        ]);
        assert!(InputInfo::normalize(OpInput::Nested(&ragged)).is_err());

        let square = NestedValue::List(vec![
            NestedValue::List(vec![NestedValue::Num(1.0), NestedValue::Num(2.0)]),
            NestedValue::List(vec![NestedValue::Num(3.0), NestedValue::Num(4.0)]),
        ]);
        let info = InputInfo::normalize(OpInput::Nested(&square)).unwrap();
        assert_eq!(info.original_shape, vec![2, 2]);
    }

    #[test]
    fn tensor_input_shares_storage_by_reference() {
        let t = Tensor::zeros(&[3], DType::Float64);
        let before = t.real_storage().refcount();
        let info = InputInfo::normalize(OpInput::Tensor(&t)).unwrap();
        assert_eq!(t.real_storage().refcount(), before + 1);
        assert_eq!(info.original_shape, vec![3]);
        assert!(!info.is_complex);
    }

    #[test]
    fn tensor_is_complex_reflects_nonzero_imaginary_only() {
        let mut t = Tensor::zeros(&[1], DType::Float64);
        // carries complex storage, but all zero
        let _ = t.imag_storage_mut();
        let info = InputInfo::normalize(OpInput::Tensor(&t)).unwrap();
        assert!(t.has_complex_storage());
        assert!(!info.is_complex);
    }
}
