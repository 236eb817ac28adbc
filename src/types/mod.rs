//! C1 + C2: type objects, MRO linearisation, and the slot table.

pub mod pytype;
pub mod slot;

pub use pytype::{PyType, PyTypeRef, TypeFlags, TypeOrTuple, isinstance, issubclass};
pub use slot::PyTypeSlots;
