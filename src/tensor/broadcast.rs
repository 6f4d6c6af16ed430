//! The broadcast planner shared by the kernel framework's TT case (C7) and
//! by tensor-level shape checks (spec §4.6, invariant 4 of spec §8).

use crate::error::ShapeError;

/// Right-align `a` and `b`, left-padding the shorter with 1s, and combine
/// per-axis sizes: `(n, n) -> n`, `(n, 1) -> n`, `(1, n) -> n`. Two axes are
/// incompatible unless one of them is `1` or they're equal.
///
/// The result is commutative in shape (spec §8 invariant 4).
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>, ShapeError> {
    let ndim = a.len().max(b.len());
    let mut out = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let ai = axis_from_end(a, ndim, i);
        let bi = axis_from_end(b, ndim, i);
        let combined = match (ai, bi) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(ShapeError::BroadcastMismatch {
                    lhs: a.to_vec(),
                    rhs: b.to_vec(),
                })
            }
        };
        out.push(combined);
    }
    Ok(out)
}

fn axis_from_end(shape: &[usize], ndim: usize, i: usize) -> usize {
    let pad = ndim - shape.len();
    if i < pad {
        1
    } else {
        shape[i - pad]
    }
}

/// Whether `shape` can broadcast exactly onto `target` with no stretching
/// at all (used by the kernel framework to pick the tight lock-step walk
/// over the general strided walk).
pub fn is_exact(shape: &[usize], target: &[usize]) -> bool {
    shape.len() == target.len() && shape == target
}
