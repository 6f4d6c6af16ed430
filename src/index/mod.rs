//! `IndexIterator` (C5): a finite, restartable index stream. The four
//! concrete flavours are the algebra fancy indexing (C6) is expressed over
//! (spec §4.4).

pub mod indexer;

use crate::error::{IndexError, Result};

#[derive(Debug, Clone)]
enum IterKind {
    Constant(usize),
    Ascending { start: usize, step: usize },
    Descending { start: isize, step: isize },
    Array(Vec<usize>),
}

#[derive(Debug, Clone)]
pub struct IndexIterator {
    kind: IterKind,
    count: usize,
    pos: usize,
}

impl IndexIterator {
    pub fn constant(index: usize) -> Self {
        IndexIterator {
            kind: IterKind::Constant(index),
            count: 1,
            pos: 0,
        }
    }

    /// `i = start, start+step, ... < stop`. `step` must be positive.
    pub fn ascending_range(start: usize, stop: usize, step: usize) -> Result<Self> {
        if step == 0 {
            return Err(IndexError::ZeroStep.into());
        }
        let count = if stop > start { (stop - start - 1) / step + 1 } else { 0 };
        Ok(IndexIterator {
            kind: IterKind::Ascending { start, step },
            count,
            pos: 0,
        })
    }

    /// `i = start, start-step, ... > stop`. `stop` may be `-1` to express
    /// "down through 0". `step` must be positive.
    pub fn descending_range(start: isize, stop: isize, step: usize) -> Result<Self> {
        if step == 0 {
            return Err(IndexError::ZeroStep.into());
        }
        let count = if start > stop {
            ((start - stop - 1) / step as isize) as usize + 1
        } else {
            0
        };
        Ok(IndexIterator {
            kind: IterKind::Descending { start, step: step as isize },
            count,
            pos: 0,
        })
    }

    pub fn array_backed(indices: Vec<usize>) -> Self {
        let count = indices.len();
        IndexIterator {
            kind: IterKind::Array(indices),
            count,
            pos: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.count
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn next(&mut self) -> Result<usize> {
        let v = self.peek_next()?;
        self.pos += 1;
        Ok(v)
    }

    pub fn peek_next(&self) -> Result<usize> {
        if !self.has_next() {
            return Err(IndexError::OutOfBounds {
                axis: 0,
                index: self.pos as isize,
                len: self.count,
            }
            .into());
        }
        Ok(self.value_at(self.pos))
    }

    /// Materializes every index this iterator will yield, leaving it
    /// exhausted.
    pub fn collect_rest(&mut self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.count - self.pos);
        while self.has_next() {
            out.push(self.next().expect("has_next just checked"));
        }
        out
    }

    fn value_at(&self, i: usize) -> usize {
        match &self.kind {
            IterKind::Constant(v) => *v,
            IterKind::Ascending { start, step } => start + i * step,
            IterKind::Descending { start, step } => (start - i as isize * step) as usize,
            IterKind::Array(v) => v[i],
        }
    }

    /// True only for a `Constant` iterator — the dimension this iterator
    /// drives gets squeezed out of a read result unless `keep_dims`.
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, IterKind::Constant(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_yields_once() {
        let mut it = IndexIterator::constant(3);
        assert_eq!(it.count(), 1);
        assert_eq!(it.next().unwrap(), 3);
        assert!(!it.has_next());
        assert!(it.peek_next().is_err());
    }

    #[test]
    fn ascending_range_matches_formula() {
        let mut it = IndexIterator::ascending_range(1, 10, 3).unwrap();
        // 1,4,7 < 10
        assert_eq!(it.count(), 3);
        assert_eq!(it.collect_rest(), vec![1, 4, 7]);
    }

    #[test]
    fn ascending_range_empty_when_stop_not_after_start() {
        let it = IndexIterator::ascending_range(5, 5, 1).unwrap();
        assert_eq!(it.count(), 0);
    }

    #[test]
    fn descending_range_matches_s6() {
        // S6: x.get("::-2") on length 5 -> start=4, stop=-1, step=2
        let mut it = IndexIterator::descending_range(4, -1, 2).unwrap();
        assert_eq!(it.count(), 3);
        assert_eq!(it.collect_rest(), vec![4, 2, 0]);
    }

    #[test]
    fn array_backed_yields_in_order() {
        let mut it = IndexIterator::array_backed(vec![7, 2, 9]);
        assert_eq!(it.count(), 3);
        assert_eq!(it.collect_rest(), vec![7, 2, 9]);
    }

    #[test]
    fn reset_replays_from_start() {
        let mut it = IndexIterator::ascending_range(0, 3, 1).unwrap();
        it.collect_rest();
        assert!(!it.has_next());
        it.reset();
        assert_eq!(it.collect_rest(), vec![0, 1, 2]);
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(IndexIterator::ascending_range(0, 5, 0).is_err());
        assert!(IndexIterator::descending_range(5, 0, 0).is_err());
    }
}
