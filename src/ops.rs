//! The concrete operator library: arithmetic, comparisons, unary
//! transcendentals, and reductions, all assembled from the kernel factory
//! (C7) in §4.6 plus the `ComplexScalar` closed forms (C2) in §4.7.

use crate::complex::ComplexScalar;
use crate::dtype::{no_change, only_logic_to_int, to_float64, to_logic, wider};
use crate::error::Result;
use crate::input::OpInput;
use crate::kernel::{
    make_binary_op, make_reduction_op, make_unary_op, BinaryConfig, OpOutput, ReductionConfig, ReductionOutput,
    UnaryConfig,
};
use crate::storage::Storage;
use crate::tensor::Tensor;

fn z(re: f64, im: f64) -> ComplexScalar {
    ComplexScalar::new(re, im)
}

// ----------------------------------------------------------------------
// Arithmetic
// ----------------------------------------------------------------------

fn add_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    let r = z(ax, ai).add(z(bx, bi));
    (r.re, r.im)
}

fn sub_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    let r = z(ax, ai).sub(z(bx, bi));
    (r.re, r.im)
}

fn mul_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    let r = z(ax, ai).mul(z(bx, bi));
    (r.re, r.im)
}

fn div_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    let r = z(ax, ai).div(z(bx, bi));
    (r.re, r.im)
}

fn pow_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    let r = z(ax, ai).pow(z(bx, bi));
    (r.re, r.im)
}

fn neg_body(re: f64, im: f64) -> (f64, f64) {
    let r = z(re, im).neg();
    (r.re, r.im)
}

pub fn add(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(add_body, BinaryConfig { dtype_policy: wider }).call(x, y)
}

pub fn add_in_place(x: &mut Tensor, y: OpInput) -> Result<()> {
    make_binary_op(add_body, BinaryConfig { dtype_policy: wider }).call_in_place(x, y)
}

pub fn sub(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(sub_body, BinaryConfig { dtype_policy: wider }).call(x, y)
}

pub fn sub_in_place(x: &mut Tensor, y: OpInput) -> Result<()> {
    make_binary_op(sub_body, BinaryConfig { dtype_policy: wider }).call_in_place(x, y)
}

pub fn mul(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(mul_body, BinaryConfig { dtype_policy: wider }).call(x, y)
}

pub fn mul_in_place(x: &mut Tensor, y: OpInput) -> Result<()> {
    make_binary_op(mul_body, BinaryConfig { dtype_policy: wider }).call_in_place(x, y)
}

pub fn div(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(div_body, BinaryConfig { dtype_policy: to_float64_binary }).call(x, y)
}

pub fn div_in_place(x: &mut Tensor, y: OpInput) -> Result<()> {
    make_binary_op(div_body, BinaryConfig { dtype_policy: to_float64_binary }).call_in_place(x, y)
}

pub fn pow(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(pow_body, BinaryConfig { dtype_policy: to_float64_binary }).call(x, y)
}

pub fn neg(x: OpInput) -> Result<OpOutput> {
    make_unary_op(neg_body, UnaryConfig { dtype_policy: only_logic_to_int }).call(x)
}

pub fn neg_in_place(x: &mut Tensor) -> Result<()> {
    make_unary_op(neg_body, UnaryConfig { dtype_policy: only_logic_to_int }).call_in_place(x)
}

fn to_float64_binary(_x: crate::dtype::DType, _cx: bool, _y: crate::dtype::DType, _cy: bool) -> Option<crate::dtype::DType> {
    Some(crate::dtype::DType::Float64)
}

// ----------------------------------------------------------------------
// Comparisons (always logic-valued; ordered on (re, im) lexicographically)
// ----------------------------------------------------------------------

fn as_tuple(re: f64, im: f64) -> (f64, f64) {
    (re, im)
}

fn lt_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    (if as_tuple(ax, ai) < as_tuple(bx, bi) { 1.0 } else { 0.0 }, 0.0)
}

fn le_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    (if as_tuple(ax, ai) <= as_tuple(bx, bi) { 1.0 } else { 0.0 }, 0.0)
}

fn gt_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    (if as_tuple(ax, ai) > as_tuple(bx, bi) { 1.0 } else { 0.0 }, 0.0)
}

fn ge_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    (if as_tuple(ax, ai) >= as_tuple(bx, bi) { 1.0 } else { 0.0 }, 0.0)
}

fn eq_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    (if ax == bx && ai == bi { 1.0 } else { 0.0 }, 0.0)
}

fn ne_body(ax: f64, ai: f64, bx: f64, bi: f64) -> (f64, f64) {
    (if ax == bx && ai == bi { 0.0 } else { 1.0 }, 0.0)
}

pub fn lt(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(lt_body, BinaryConfig { dtype_policy: to_logic_binary }).call(x, y)
}
pub fn le(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(le_body, BinaryConfig { dtype_policy: to_logic_binary }).call(x, y)
}
pub fn gt(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(gt_body, BinaryConfig { dtype_policy: to_logic_binary }).call(x, y)
}
pub fn ge(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(ge_body, BinaryConfig { dtype_policy: to_logic_binary }).call(x, y)
}
pub fn eq(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(eq_body, BinaryConfig { dtype_policy: to_logic_binary }).call(x, y)
}
pub fn ne(x: OpInput, y: OpInput) -> Result<OpOutput> {
    make_binary_op(ne_body, BinaryConfig { dtype_policy: to_logic_binary }).call(x, y)
}

fn to_logic_binary(x: crate::dtype::DType, cx: bool, y: crate::dtype::DType, cy: bool) -> Option<crate::dtype::DType> {
    to_logic(x, cx).and(to_logic(y, cy))
}

// ----------------------------------------------------------------------
// Unary transcendentals — every one auto-promotes to FLOAT64 (spec S4).
// ----------------------------------------------------------------------

macro_rules! unary_transcendental {
    ($fn_name:ident, $method:ident) => {
        pub fn $fn_name(x: OpInput) -> Result<OpOutput> {
            fn body(re: f64, im: f64) -> (f64, f64) {
                let r = z(re, im).$method();
                (r.re, r.im)
            }
            make_unary_op(body, UnaryConfig { dtype_policy: to_float64 }).call(x)
        }
    };
}

unary_transcendental!(sqrt, sqrt);
unary_transcendental!(exp, exp);
unary_transcendental!(log, log);
unary_transcendental!(sin, sin);
unary_transcendental!(cos, cos);
unary_transcendental!(tan, tan);
unary_transcendental!(cot, cot);
unary_transcendental!(sinh, sinh);
unary_transcendental!(cosh, cosh);
unary_transcendental!(tanh, tanh);
unary_transcendental!(coth, coth);
unary_transcendental!(asin, asin);
unary_transcendental!(acos, acos);
unary_transcendental!(atan, atan);
unary_transcendental!(asinh, asinh);
unary_transcendental!(acosh, acosh);
unary_transcendental!(atanh, atanh);

fn abs_body(re: f64, im: f64) -> (f64, f64) {
    (z(re, im).norm(), 0.0)
}

pub fn abs(x: OpInput) -> Result<OpOutput> {
    make_unary_op(abs_body, UnaryConfig { dtype_policy: to_float64 }).call(x)
}

fn conj_body(re: f64, im: f64) -> (f64, f64) {
    let r = z(re, im).conj();
    (r.re, r.im)
}

pub fn conj(x: OpInput) -> Result<OpOutput> {
    make_unary_op(conj_body, UnaryConfig { dtype_policy: no_change }).call(x)
}

// ----------------------------------------------------------------------
// Reductions
// ----------------------------------------------------------------------

fn sum_reducer(real: &Storage, imag: Option<&Storage>, offset: usize, stride: usize, n: usize) -> (f64, f64, Option<usize>) {
    let mut re = 0.0;
    let mut im = 0.0;
    for k in 0..n {
        re += real.get_f64(offset + k * stride);
        if let Some(i) = imag {
            im += i.get_f64(offset + k * stride);
        }
    }
    (re, im, None)
}

fn prod_reducer(real: &Storage, imag: Option<&Storage>, offset: usize, stride: usize, n: usize) -> (f64, f64, Option<usize>) {
    let mut acc = ComplexScalar::new(1.0, 0.0);
    for k in 0..n {
        let re = real.get_f64(offset + k * stride);
        let im = imag.map(|i| i.get_f64(offset + k * stride)).unwrap_or(0.0);
        acc = acc.mul(ComplexScalar::new(re, im));
    }
    (acc.re, acc.im, None)
}

fn max_reducer(real: &Storage, _imag: Option<&Storage>, offset: usize, stride: usize, n: usize) -> (f64, f64, Option<usize>) {
    let (best, _, nan) = scan(real, offset, stride, n, |v, best| v > best);
    (if nan { f64::NAN } else { best }, 0.0, None)
}

fn min_reducer(real: &Storage, _imag: Option<&Storage>, offset: usize, stride: usize, n: usize) -> (f64, f64, Option<usize>) {
    let (best, _, nan) = scan(real, offset, stride, n, |v, best| v < best);
    (if nan { f64::NAN } else { best }, 0.0, None)
}

fn argmax_reducer(real: &Storage, _imag: Option<&Storage>, offset: usize, stride: usize, n: usize) -> (f64, f64, Option<usize>) {
    let (best, best_i, nan) = scan(real, offset, stride, n, |v, best| v > best);
    (if nan { f64::NAN } else { best }, 0.0, Some(best_i))
}

fn argmin_reducer(real: &Storage, _imag: Option<&Storage>, offset: usize, stride: usize, n: usize) -> (f64, f64, Option<usize>) {
    let (best, best_i, nan) = scan(real, offset, stride, n, |v, best| v < best);
    (if nan { f64::NAN } else { best }, 0.0, Some(best_i))
}

/// Shared scan for max/min/argmax/argmin: `better(candidate, current_best)`
/// decides whether to replace the running best. Any NaN encountered poisons
/// the result (spec §4.7: "reductions on all-NaN input return NaN
/// consistently").
fn scan(real: &Storage, offset: usize, stride: usize, n: usize, better: fn(f64, f64) -> bool) -> (f64, usize, bool) {
    let mut best = real.get_f64(offset);
    let mut best_i = 0;
    let mut nan = best.is_nan();
    for k in 1..n {
        let v = real.get_f64(offset + k * stride);
        if v.is_nan() {
            nan = true;
        }
        if better(v, best) {
            best = v;
            best_i = k;
        }
    }
    (best, best_i, nan)
}

pub fn sum(t: &Tensor, axis: Option<usize>, keep_dims: bool) -> Result<ReductionOutput> {
    make_reduction_op(sum_reducer, ReductionConfig { dtype_policy: no_change }).call(t, axis, keep_dims)
}

pub fn prod(t: &Tensor, axis: Option<usize>, keep_dims: bool) -> Result<ReductionOutput> {
    make_reduction_op(prod_reducer, ReductionConfig { dtype_policy: no_change }).call(t, axis, keep_dims)
}

pub fn max(t: &Tensor, axis: Option<usize>, keep_dims: bool) -> Result<ReductionOutput> {
    make_reduction_op(max_reducer, ReductionConfig { dtype_policy: only_logic_to_int }).call(t, axis, keep_dims)
}

pub fn min(t: &Tensor, axis: Option<usize>, keep_dims: bool) -> Result<ReductionOutput> {
    make_reduction_op(min_reducer, ReductionConfig { dtype_policy: only_logic_to_int }).call(t, axis, keep_dims)
}

pub fn argmax(t: &Tensor, axis: Option<usize>, keep_dims: bool) -> Result<ReductionOutput> {
    make_reduction_op(argmax_reducer, ReductionConfig { dtype_policy: only_logic_to_int }).call(t, axis, keep_dims)
}

pub fn argmin(t: &Tensor, axis: Option<usize>, keep_dims: bool) -> Result<ReductionOutput> {
    make_reduction_op(argmin_reducer, ReductionConfig { dtype_policy: only_logic_to_int }).call(t, axis, keep_dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::tensor::ElementValue;

    #[test]
    fn add_widens_mixed_dtypes() {
        let x = Tensor::from_flat(&[1.0, 2.0], Some(DType::Int32)).unwrap();
        let y = Tensor::from_flat(&[0.5, 0.5], Some(DType::Float64)).unwrap();
        let out = add(OpInput::Tensor(&x), OpInput::Tensor(&y)).unwrap();
        match out {
            OpOutput::Tensor(t) => assert_eq!(t.real_data(), vec![1.5, 2.5]),
            _ => panic!("expected tensor"),
        }
    }

    #[test]
    fn div_always_promotes_to_float64() {
        let x = Tensor::from_flat(&[1.0, 3.0], Some(DType::Int32)).unwrap();
        let y = Tensor::from_flat(&[2.0], Some(DType::Int32)).unwrap();
        let out = div(OpInput::Tensor(&x), OpInput::Tensor(&y)).unwrap();
        match out {
            OpOutput::Tensor(t) => {
                assert_eq!(t.dtype(), DType::Float64);
                assert_eq!(t.real_data(), vec![0.5, 1.5]);
            }
            _ => panic!("expected tensor"),
        }
    }

    #[test]
    fn s4_sqrt_of_negative_scalar_is_complex() {
        let out = sqrt(OpInput::Number(-4.0)).unwrap();
        match out {
            OpOutput::Scalar(ElementValue::Complex(z)) => {
                assert!((z.re - 0.0).abs() < 1e-12);
                assert!((z.im - 2.0).abs() < 1e-12);
            }
            _ => panic!("expected complex scalar"),
        }
    }

    #[test]
    fn comparison_is_logic_valued() {
        let x = Tensor::from_flat(&[1.0, -2.0, 3.0], None).unwrap();
        let out = lt(OpInput::Tensor(&x), OpInput::Number(0.0)).unwrap();
        match out {
            OpOutput::Tensor(t) => {
                assert_eq!(t.dtype(), DType::Logic);
                assert_eq!(t.real_data(), vec![0.0, 1.0, 0.0]);
            }
            _ => panic!("expected tensor"),
        }
    }

    #[test]
    fn sum_reduction_matches_expected_total() {
        let x = Tensor::from_flat(&[1.0, 2.0, 3.0, 4.0], None).unwrap().reshape(&[2, 2]).unwrap();
        let out = sum(&x, Some(0), false).unwrap();
        match out {
            ReductionOutput::Tensor(t) => assert_eq!(t.real_data(), vec![4.0, 6.0]),
            _ => panic!("expected tensor"),
        }
    }

    #[test]
    fn argmax_reports_first_occurrence_on_ties() {
        let x = Tensor::from_flat(&[1.0, 5.0, 5.0, 2.0], None).unwrap();
        let out = argmax(&x, None, false).unwrap();
        match out {
            ReductionOutput::ScalarWithIndex(ElementValue::Real(v), idx) => {
                assert_eq!(v, 5.0);
                assert_eq!(idx, 1);
            }
            _ => panic!("expected scalar with index"),
        }
    }

    #[test]
    fn reductions_on_all_nan_input_return_nan() {
        let x = Tensor::from_flat(&[f64::NAN, f64::NAN], None).unwrap();
        let out = max(&x, None, false).unwrap();
        match out {
            ReductionOutput::Scalar(ElementValue::Real(v)) => assert!(v.is_nan()),
            _ => panic!("expected real scalar"),
        }
    }

    #[test]
    fn prod_multiplies_complex_operands() {
        let re = Tensor::from_flat(&[0.0, 1.0], None).unwrap();
        let im = Tensor::from_flat(&[1.0, 0.0], None).unwrap();
        let x = Tensor::complex(re, im).unwrap();
        let out = prod(&x, None, false).unwrap();
        match out {
            // i * 1 == i
            ReductionOutput::Scalar(ElementValue::Complex(z)) => {
                assert!((z.re - 0.0).abs() < 1e-12);
                assert!((z.im - 1.0).abs() < 1e-12);
            }
            _ => panic!("expected complex scalar"),
        }
    }
}
