//! C1: universal object header and the typed/untyped reference types
//! built on it (§3 "Object header").

mod core;
mod payload;

pub use self::core::{PyObject, PyObjectRef, PyRef};
pub use self::payload::PyObjectPayload;
