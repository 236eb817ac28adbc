//! C6 §4.6 "Sequence semantics for slicing": the canonical Python slice
//! normalisation algorithm, shared by list/tuple/str/unicode.

use crate::vm::{PyResult, VirtualMachine};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slice {
    pub start: isize,
    pub stop: isize,
    pub step: isize,
}

/// Normalise a `(start, stop, step)` slice (each possibly absent or
/// negative) against sequence length `n`, per §4.6 and §4.4 (block-free
/// here — this is pure arithmetic, no frame involved).
pub fn normalize_slice(
    start: Option<isize>,
    stop: Option<isize>,
    step: Option<isize>,
    n: isize,
    vm: &VirtualMachine,
) -> PyResult<Slice> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(vm.new_value_error("slice step cannot be zero".to_owned()));
    }

    let clamp = |mut i: isize, lo: isize, hi: isize| -> isize {
        if i < lo {
            i = lo;
        }
        if i > hi {
            i = hi;
        }
        i
    };

    let (default_start, default_stop, lo, hi) = if step > 0 {
        (0, n, 0, n)
    } else {
        (n - 1, -1, -1, n - 1)
    };

    let norm = |i: Option<isize>, default: isize| -> isize {
        match i {
            None => default,
            Some(mut i) => {
                if i < 0 {
                    i += n;
                    if i < lo {
                        i = lo;
                    }
                } else {
                    i = clamp(i, lo, hi);
                }
                i
            }
        }
    };

    let start = norm(start, default_start);
    let stop = norm(stop, default_stop);
    Ok(Slice { start, stop, step })
}

/// `len(s[start:stop:step])` for an already-normalised slice (§8.8).
pub fn slice_len(slice: Slice) -> usize {
    let Slice { start, stop, step } = slice;
    if step > 0 {
        if stop <= start {
            0
        } else {
            ((stop - start) + step - 1) as usize / step as usize
        }
    } else {
        if stop >= start {
            0
        } else {
            ((start - stop) + (-step) - 1) as usize / (-step) as usize
        }
    }
}

/// Iterate the normalised indices of a slice in order.
pub fn slice_indices(slice: Slice) -> impl Iterator<Item = isize> {
    let Slice { start, stop, step } = slice;
    let len = slice_len(slice) as isize;
    (0..len).map(move |k| start + k * step)
}

/// Normalise a single (possibly negative) index against length `n`,
/// raising `IndexError` if out of range (used by `__getitem__`/`__setitem__`
/// on sequences, as opposed to slicing).
pub fn normalize_index(i: isize, n: isize, vm: &VirtualMachine) -> PyResult<usize> {
    let idx = if i < 0 { i + n } else { i };
    if idx < 0 || idx >= n {
        Err(vm.new_index_error("index out of range".to_owned()))
    } else {
        Ok(idx as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(start: Option<isize>, stop: Option<isize>, step: Option<isize>, n: isize) -> Slice {
        // step==0 rejection is exercised via the VM-backed integration tests;
        // here we only check pure arithmetic with a default step.
        let step = step.unwrap_or(1);
        let clamp = |mut i: isize, lo: isize, hi: isize| {
            if i < lo {
                i = lo;
            }
            if i > hi {
                i = hi;
            }
            i
        };
        let (default_start, default_stop, lo, hi) = if step > 0 { (0, n, 0, n) } else { (n - 1, -1, -1, n - 1) };
        let norm1 = |i: Option<isize>, default: isize| match i {
            None => default,
            Some(mut i) => {
                if i < 0 {
                    i += n;
                    if i < lo {
                        i = lo;
                    }
                } else {
                    i = clamp(i, lo, hi);
                }
                i
            }
        };
        Slice { start: norm1(start, default_start), stop: norm1(stop, default_stop), step }
    }

    #[test]
    fn full_slice_len_matches_n() {
        let s = norm(None, None, None, 10);
        assert_eq!(slice_len(s), 10);
    }

    #[test]
    fn negative_step_reverses() {
        let s = norm(None, None, Some(-1), 5);
        assert_eq!(slice_indices(s).collect::<Vec<_>>(), vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn empty_when_stop_before_start() {
        let s = norm(Some(5), Some(2), None, 10);
        assert_eq!(slice_len(s), 0);
    }

    #[test]
    fn negative_indices_normalised() {
        let s = norm(Some(-3), Some(-1), None, 10);
        assert_eq!(slice_indices(s).collect::<Vec<_>>(), vec![7, 8]);
    }
}
