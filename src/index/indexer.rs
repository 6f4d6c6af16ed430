//! `Indexer` (C6): parses an argument tuple into `IndexIterator`s and drives
//! sub-tensor read/write (spec §4.5).

use crate::complex::ComplexScalar;
use crate::error::{IndexError, Result, ShapeError};
use crate::index::IndexIterator;
use crate::storage::Storage;
use crate::tensor::{ElementValue, Tensor};

/// One argument of an indexing call. `Predicate` and whole-tensor `Mask`
/// only make sense in the single-argument form (spec §4.5); `Mask` used as
/// one of several per-axis arguments must instead match that axis's length.
pub enum IndexArg<'a> {
    Int(isize),
    IntArray(&'a [isize]),
    Mask(&'a Tensor),
    /// `"start:stop:step"`, Python slice syntax; parts may be empty.
    Slice(&'a str),
    Predicate(&'a dyn Fn(f64, f64) -> bool),
}

pub enum GetResult {
    Tensor(Tensor),
    Scalar(ElementValue),
}

pub enum SetValue<'a> {
    Scalar(ElementValue),
    Tensor(&'a Tensor),
}

pub struct Indexer;

impl Indexer {
    pub fn get(t: &Tensor, args: &[IndexArg], keep_dims: bool) -> Result<GetResult> {
        if args.len() == 1 {
            if let Some(offsets) = try_flat_select(t, &args[0])? {
                return Ok(GetResult::Tensor(gather_flat(t, &offsets)));
            }
        }
        let mut iters = axis_iterators(t, args)?;
        read_nested(t, &mut iters, keep_dims)
    }

    pub fn set(t: &mut Tensor, args: &[IndexArg], value: SetValue) -> Result<()> {
        if args.len() == 1 {
            if let Some(offsets) = try_flat_select(t, &args[0])? {
                return scatter_flat(t, &offsets, value);
            }
        }
        let mut iters = axis_iterators(t, args)?;
        write_nested(t, &mut iters, value)
    }
}

/// Handles the single-argument whole-tensor `Mask`/`Predicate` forms.
/// Returns `None` when `arg` doesn't match one of those (caller falls
/// through to per-axis parsing).
fn try_flat_select(t: &Tensor, arg: &IndexArg) -> Result<Option<Vec<usize>>> {
    match arg {
        IndexArg::Mask(mask) if mask.shape() == t.shape() => {
            let mut out = Vec::new();
            for i in 0..t.size() {
                if mask.real_storage().get_f64(i) != 0.0 {
                    out.push(i);
                }
            }
            Ok(Some(out))
        }
        IndexArg::Predicate(pred) => {
            let mut out = Vec::new();
            for i in 0..t.size() {
                let el = t.get_el_flat(i)?;
                if pred(el.re(), el.im()) {
                    out.push(i);
                }
            }
            Ok(Some(out))
        }
        _ => Ok(None),
    }
}

fn axis_iterators(t: &Tensor, args: &[IndexArg]) -> Result<Vec<IndexIterator>> {
    if args.len() > t.ndim() {
        return Err(ShapeError::SizeMismatch {
            expected: t.ndim(),
            got: args.len(),
        }
        .into());
    }
    let mut iters = Vec::with_capacity(t.ndim());
    for axis in 0..t.ndim() {
        let len = t.shape()[axis];
        if axis < args.len() {
            iters.push(parse_axis_arg(&args[axis], len)?);
        } else {
            iters.push(IndexIterator::ascending_range(0, len, 1)?);
        }
    }
    Ok(iters)
}

fn parse_axis_arg(arg: &IndexArg, axis_len: usize) -> Result<IndexIterator> {
    match arg {
        IndexArg::Int(i) => {
            let resolved = resolve_neg(*i, axis_len);
            bounds_check(resolved, axis_len)?;
            Ok(IndexIterator::constant(resolved as usize))
        }
        IndexArg::IntArray(arr) => {
            let mut out = Vec::with_capacity(arr.len());
            for &i in arr.iter() {
                let resolved = resolve_neg(i, axis_len);
                bounds_check(resolved, axis_len)?;
                out.push(resolved as usize);
            }
            Ok(IndexIterator::array_backed(out))
        }
        IndexArg::Mask(mask) => {
            if mask.ndim() != 1 || mask.shape()[0] != axis_len {
                return Err(ShapeError::SizeMismatch {
                    expected: axis_len,
                    got: mask.size(),
                }
                .into());
            }
            let mut out = Vec::new();
            for i in 0..axis_len {
                if mask.real_storage().get_f64(i) != 0.0 {
                    out.push(i);
                }
            }
            Ok(IndexIterator::array_backed(out))
        }
        IndexArg::Slice(s) => parse_slice_string(s, axis_len),
        IndexArg::Predicate(_) => Err(IndexError::InvalidSlice(
            "predicates are only valid as the sole, whole-tensor argument".to_string(),
        )
        .into()),
    }
}

fn resolve_neg(v: isize, len: usize) -> isize {
    if v < 0 {
        v + len as isize
    } else {
        v
    }
}

fn bounds_check(v: isize, len: usize) -> Result<()> {
    if v < 0 || v >= len as isize {
        return Err(IndexError::OutOfBounds {
            axis: 0,
            index: v,
            len,
        }
        .into());
    }
    Ok(())
}

/// Parses `"start:stop:step"` (parts may be empty) or a bare integer, which
/// degenerates to a `ConstantIterator`.
fn parse_slice_string(s: &str, len: usize) -> Result<IndexIterator> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() == 1 {
        let trimmed = parts[0].trim();
        if trimmed.is_empty() {
            return IndexIterator::ascending_range(0, len, 1);
        }
        let v: isize = trimmed
            .parse()
            .map_err(|_| IndexError::InvalidSlice(s.to_string()))?;
        let resolved = resolve_neg(v, len);
        bounds_check(resolved, len)?;
        return Ok(IndexIterator::constant(resolved as usize));
    }
    if parts.len() > 3 {
        return Err(IndexError::InvalidSlice(s.to_string()).into());
    }

    let step_str = parts.get(2).copied().unwrap_or("").trim();
    let step: isize = if step_str.is_empty() {
        1
    } else {
        step_str
            .parse()
            .map_err(|_| IndexError::InvalidSlice(s.to_string()))?
    };
    if step == 0 {
        return Err(IndexError::ZeroStep.into());
    }
    let descending = step < 0;
    let magnitude = step.unsigned_abs();

    let start_str = parts[0].trim();
    let stop_str = parts[1].trim();

    let start: isize = if start_str.is_empty() {
        if descending {
            len as isize - 1
        } else {
            0
        }
    } else {
        resolve_neg(
            start_str
                .parse()
                .map_err(|_| IndexError::InvalidSlice(s.to_string()))?,
            len,
        )
    };
    let stop: isize = if stop_str.is_empty() {
        if descending {
            -1
        } else {
            len as isize
        }
    } else {
        resolve_neg(
            stop_str
                .parse()
                .map_err(|_| IndexError::InvalidSlice(s.to_string()))?,
            len,
        )
    };

    if descending {
        let start = start.clamp(-1, len as isize - 1);
        let stop = stop.clamp(-1, len as isize - 1);
        IndexIterator::descending_range(start, stop, magnitude)
    } else {
        let start = start.clamp(0, len as isize) as usize;
        let stop = stop.clamp(0, len as isize) as usize;
        IndexIterator::ascending_range(start, stop, magnitude)
    }
}

fn odometer_offsets(counts: &[usize], values: &[Vec<usize>], strides: &[usize]) -> Vec<usize> {
    let total: usize = counts.iter().product();
    let ndim = counts.len();
    let mut idx = vec![0usize; ndim];
    let mut out = Vec::with_capacity(total);
    for _ in 0..total {
        let mut offset = 0usize;
        for axis in 0..ndim {
            offset += values[axis][idx[axis]] * strides[axis];
        }
        out.push(offset);
        for axis in (0..ndim).rev() {
            idx[axis] += 1;
            if idx[axis] < counts[axis] {
                break;
            }
            idx[axis] = 0;
        }
    }
    out
}

fn read_nested(t: &Tensor, iters: &mut [IndexIterator], keep_dims: bool) -> Result<GetResult> {
    let counts: Vec<usize> = iters.iter().map(|it| it.count()).collect();
    let constants: Vec<bool> = iters.iter().map(|it| it.is_constant()).collect();
    let values: Vec<Vec<usize>> = iters.iter_mut().map(|it| it.collect_rest()).collect();
    let offsets = odometer_offsets(&counts, &values, &t.strides());

    let mut real_buf = Vec::with_capacity(offsets.len());
    let mut imag_buf = Vec::with_capacity(offsets.len());
    let mut any_complex = false;
    for &off in &offsets {
        let el = t.get_el_flat(off)?;
        real_buf.push(el.re());
        imag_buf.push(el.im());
        if el.im() != 0.0 {
            any_complex = true;
        }
    }

    let squeezed_shape: Vec<usize> = if keep_dims {
        counts.clone()
    } else {
        counts
            .iter()
            .zip(constants.iter())
            .filter(|(_, is_const)| !**is_const)
            .map(|(n, _)| *n)
            .collect()
    };

    if squeezed_shape.is_empty() {
        let re = real_buf.first().copied().unwrap_or(0.0);
        let im = imag_buf.first().copied().unwrap_or(0.0);
        return Ok(GetResult::Scalar(if im != 0.0 {
            ElementValue::Complex(ComplexScalar::new(re, im))
        } else {
            ElementValue::Real(re)
        }));
    }

    let dtype = t.dtype();
    let real = Storage::from_flat(&real_buf, dtype)?;
    let imag = if any_complex {
        Some(Storage::from_flat(&imag_buf, dtype)?)
    } else {
        None
    };
    Ok(GetResult::Tensor(Tensor::from_parts(real, imag, squeezed_shape)))
}

fn gather_flat(t: &Tensor, offsets: &[usize]) -> Tensor {
    let mut real_buf = Vec::with_capacity(offsets.len());
    let mut imag_buf = Vec::with_capacity(offsets.len());
    let mut any_complex = false;
    for &off in offsets {
        let el = t.get_el_flat(off).expect("mask/predicate offsets are in range");
        real_buf.push(el.re());
        imag_buf.push(el.im());
        if el.im() != 0.0 {
            any_complex = true;
        }
    }
    let dtype = t.dtype();
    let real = Storage::from_flat(&real_buf, dtype).expect("re-encoding same dtype never fails");
    let imag = if any_complex {
        Some(Storage::from_flat(&imag_buf, dtype).expect("re-encoding same dtype never fails"))
    } else {
        None
    };
    Tensor::from_parts(real, imag, vec![offsets.len()])
}

fn write_nested(t: &mut Tensor, iters: &mut [IndexIterator], value: SetValue) -> Result<()> {
    let counts: Vec<usize> = iters.iter().map(|it| it.count()).collect();
    let values: Vec<Vec<usize>> = iters.iter_mut().map(|it| it.collect_rest()).collect();
    let strides = t.strides();
    let offsets = odometer_offsets(&counts, &values, &strides);

    t.real_storage_mut().ensure_unshared();
    if t.has_complex_storage() {
        t.imag_storage_mut().ensure_unshared();
    }

    match value {
        SetValue::Scalar(ev) => {
            for &off in &offsets {
                t.set_el_flat(off, ev)?;
            }
            Ok(())
        }
        SetValue::Tensor(src) => {
            let mut src_shape = src.shape().to_vec();
            while src_shape.last() == Some(&1) && src_shape.len() > counts.len() {
                src_shape.pop();
            }
            if src_shape != counts {
                return Err(ShapeError::SizeMismatch {
                    expected: offsets.len(),
                    got: src.size(),
                }
                .into());
            }
            for (i, &off) in offsets.iter().enumerate() {
                let el = src.get_el_flat(i)?;
                t.set_el_flat(off, el)?;
            }
            Ok(())
        }
    }
}

fn scatter_flat(t: &mut Tensor, offsets: &[usize], value: SetValue) -> Result<()> {
    t.real_storage_mut().ensure_unshared();
    if t.has_complex_storage() {
        t.imag_storage_mut().ensure_unshared();
    }
    match value {
        SetValue::Scalar(ev) => {
            for &off in offsets {
                t.set_el_flat(off, ev)?;
            }
            Ok(())
        }
        SetValue::Tensor(src) => {
            if src.size() != offsets.len() && src.size() != 1 {
                return Err(ShapeError::SizeMismatch {
                    expected: offsets.len(),
                    got: src.size(),
                }
                .into());
            }
            for (i, &off) in offsets.iter().enumerate() {
                let flat_src = if src.size() == 1 { 0 } else { i };
                let el = src.get_el_flat(flat_src)?;
                t.set_el_flat(off, el)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    fn matrix_2x3() -> Tensor {
        Tensor::from_nested(
            &crate::tensor::NestedValue::List(vec![
                crate::tensor::NestedValue::List(vec![
                    crate::tensor::NestedValue::Num(1.0),
                    crate::tensor::NestedValue::Num(-2.0),
                    crate::tensor::NestedValue::Num(3.0),
                ]),
                crate::tensor::NestedValue::List(vec![
                    crate::tensor::NestedValue::Num(-4.0),
                    crate::tensor::NestedValue::Num(5.0),
                    crate::tensor::NestedValue::Num(-6.0),
                ]),
            ]),
            Some(DType::Float64),
        )
        .unwrap()
    }

    #[test]
    fn s2_masked_write() {
        let mut a = matrix_2x3();
        let mask_vals: Vec<f64> = a.real_data().iter().map(|&v| if v < 0.0 { 1.0 } else { 0.0 }).collect();
        let mask = Tensor::from_flat(&mask_vals, Some(DType::Logic))
            .unwrap()
            .reshape(&[2, 3])
            .unwrap();
        Indexer::set(&mut a, &[IndexArg::Mask(&mask)], SetValue::Scalar(ElementValue::Real(0.0))).unwrap();
        assert_eq!(a.real_data(), vec![1.0, 0.0, 3.0, 0.0, 5.0, 0.0]);
    }

    #[test]
    fn s6_descending_slice_string() {
        let x = Tensor::from_flat(&[10.0, 20.0, 30.0, 40.0, 50.0], None).unwrap();
        let result = Indexer::get(&x, &[IndexArg::Slice("::-2")], false).unwrap();
        match result {
            GetResult::Tensor(t) => assert_eq!(t.real_data(), vec![50.0, 30.0, 10.0]),
            GetResult::Scalar(_) => panic!("expected tensor"),
        }
    }

    #[test]
    fn slice_stop_past_end_clamps_like_python_instead_of_erroring() {
        let x = Tensor::from_flat(&[10.0, 20.0, 30.0, 40.0, 50.0], None).unwrap();
        let result = Indexer::get(&x, &[IndexArg::Slice("0:100")], false).unwrap();
        match result {
            GetResult::Tensor(t) => assert_eq!(t.real_data(), vec![10.0, 20.0, 30.0, 40.0, 50.0]),
            GetResult::Scalar(_) => panic!("expected tensor"),
        }
    }

    #[test]
    fn descending_slice_start_past_end_clamps_to_len_minus_one() {
        let x = Tensor::from_flat(&[10.0, 20.0, 30.0, 40.0, 50.0], None).unwrap();
        let result = Indexer::get(&x, &[IndexArg::Slice("10::-1")], false).unwrap();
        match result {
            GetResult::Tensor(t) => assert_eq!(t.real_data(), vec![50.0, 40.0, 30.0, 20.0, 10.0]),
            GetResult::Scalar(_) => panic!("expected tensor"),
        }
    }

    #[test]
    fn scalar_index_squeezes_to_scalar() {
        let x = Tensor::from_flat(&[10.0, 20.0, 30.0], None).unwrap();
        let result = Indexer::get(&x, &[IndexArg::Int(1)], false).unwrap();
        match result {
            GetResult::Scalar(ElementValue::Real(r)) => assert_eq!(r, 20.0),
            _ => panic!("expected a squeezed scalar"),
        }
    }

    #[test]
    fn negative_integer_index_wraps() {
        let x = Tensor::from_flat(&[10.0, 20.0, 30.0], None).unwrap();
        let result = Indexer::get(&x, &[IndexArg::Int(-1)], false).unwrap();
        match result {
            GetResult::Scalar(ElementValue::Real(r)) => assert_eq!(r, 30.0),
            _ => panic!("expected a squeezed scalar"),
        }
    }

    #[test]
    fn keep_dims_preserves_constant_axes() {
        let x = Tensor::from_flat(&[10.0, 20.0, 30.0], None).unwrap();
        let result = Indexer::get(&x, &[IndexArg::Int(1)], true).unwrap();
        match result {
            GetResult::Tensor(t) => assert_eq!(t.shape(), &[1]),
            _ => panic!("expected a shape-[1] tensor with keep_dims"),
        }
    }

    #[test]
    fn array_index_gathers_in_order() {
        let x = Tensor::from_flat(&[10.0, 20.0, 30.0, 40.0], None).unwrap();
        let result = Indexer::get(&x, &[IndexArg::IntArray(&[3, 0, -1])], false).unwrap();
        match result {
            GetResult::Tensor(t) => assert_eq!(t.real_data(), vec![40.0, 10.0, 40.0]),
            _ => panic!("expected tensor"),
        }
    }

    #[test]
    fn predicate_selects_whole_tensor_matches() {
        let x = Tensor::from_flat(&[1.0, -2.0, 3.0, -4.0], None).unwrap();
        let pred: &dyn Fn(f64, f64) -> bool = &|re, _im| re < 0.0;
        let result = Indexer::get(&x, &[IndexArg::Predicate(pred)], false).unwrap();
        match result {
            GetResult::Tensor(t) => assert_eq!(t.real_data(), vec![-2.0, -4.0]),
            _ => panic!("expected tensor"),
        }
    }

    #[test]
    fn out_of_bounds_index_errors() {
        let x = Tensor::from_flat(&[1.0, 2.0], None).unwrap();
        assert!(Indexer::get(&x, &[IndexArg::Int(5)], false).is_err());
    }

    #[test]
    fn write_with_tensor_value_matches_shape() {
        let mut x = Tensor::from_flat(&[1.0, 2.0, 3.0, 4.0], None).unwrap();
        let replacement = Tensor::from_flat(&[9.0, 8.0], None).unwrap();
        Indexer::set(
            &mut x,
            &[IndexArg::Slice("1:3")],
            SetValue::Tensor(&replacement),
        )
        .unwrap();
        assert_eq!(x.real_data(), vec![1.0, 9.0, 8.0, 4.0]);
    }
}
