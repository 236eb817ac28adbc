//! C8 §4.8: the shared coercion lattice `bool ⊂ int ⊂ long ⊂ float ⊂
//! complex`. Each numeric builtin's binary slot calls into [`Level`]
//! helpers here instead of re-deriving the lattice locally.

use num_bigint::BigInt;
use num_complex::Complex64;
use num_traits::ToPrimitive;

use crate::builtins::complex::PyComplex;
use crate::builtins::float::PyFloat;
use crate::builtins::int::PyInt;
use crate::builtins::long::PyLong;
use crate::object::PyObjectRef;

/// Which rung of the tower an operand occupies. `Bool` reuses `PyInt`'s
/// payload (§3 basis reuse) so it collapses into `Int` here.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Level {
    Int,
    Long,
    Float,
    Complex,
}

pub fn level_of(obj: &PyObjectRef) -> Option<Level> {
    if obj.payload_is::<PyInt>() {
        Some(Level::Int)
    } else if obj.payload_is::<PyLong>() {
        Some(Level::Long)
    } else if obj.payload_is::<PyFloat>() {
        Some(Level::Float)
    } else if obj.payload_is::<PyComplex>() {
        Some(Level::Complex)
    } else {
        None
    }
}

/// A value widened to the common level of a pairwise operation.
pub enum Wide {
    Long(BigInt),
    Float(f64),
    Complex(Complex64),
}

pub fn widen(obj: &PyObjectRef, to: Level) -> Option<Wide> {
    let from = level_of(obj)?;
    Some(match to {
        Level::Int => return None, // only Int op Int stays at Int
        Level::Long => Wide::Long(match from {
            Level::Int => BigInt::from(obj.downcast_ref::<PyInt>().unwrap().value()),
            Level::Long => obj.downcast_ref::<PyLong>().unwrap().value().clone(),
            _ => return None,
        }),
        Level::Float => Wide::Float(match from {
            Level::Int => obj.downcast_ref::<PyInt>().unwrap().value() as f64,
            Level::Long => obj.downcast_ref::<PyLong>().unwrap().value().to_f64().unwrap_or(f64::NAN),
            Level::Float => obj.downcast_ref::<PyFloat>().unwrap().value(),
            _ => return None,
        }),
        Level::Complex => Wide::Complex(match from {
            Level::Int => Complex64::new(obj.downcast_ref::<PyInt>().unwrap().value() as f64, 0.0),
            Level::Long => Complex64::new(
                obj.downcast_ref::<PyLong>().unwrap().value().to_f64().unwrap_or(f64::NAN),
                0.0,
            ),
            Level::Float => Complex64::new(obj.downcast_ref::<PyFloat>().unwrap().value(), 0.0),
            Level::Complex => obj.downcast_ref::<PyComplex>().unwrap().value(),
        }),
    })
}

/// `max(level(a), level(b))`, the level an arithmetic op on the pair is
/// carried out at (§4.8 "performed at the strictest common type").
pub fn common_level(a: &PyObjectRef, b: &PyObjectRef) -> Option<Level> {
    Some(level_of(a)?.max(level_of(b)?))
}
