//! C6/C7/C8: the concrete built-in types — containers, strings, and
//! the numeric tower — plus the process-wide singletons.
//!
//! C9/C11 (function/method/code, descriptor machinery) live here too:
//! `function`, `method`, `property`, `staticmethod`, `classmethod`.
//! C10 (generator/iterator) and C13's module object (`module`) round
//! out the rest.

pub mod classmethod;
pub mod complex;
pub mod dict;
pub mod float;
pub mod function;
pub mod generator;
pub mod int;
pub mod iterator;
pub mod list;
pub mod long;
pub mod method;
pub mod module;
pub mod numeric;
pub mod object;
pub mod property;
pub mod set;
pub mod singletons;
pub mod staticmethod;
pub mod str;
pub mod tuple;

pub use classmethod::PyClassMethod;
pub use complex::{PyComplex, PyComplexRef};
pub use dict::{PyDict, PyDictRef};
pub use float::{PyFloat, PyFloatRef};
pub use function::{PyFunction, PyFunctionRef};
pub use generator::{PyGenerator, PyGeneratorRef};
pub use int::{PyInt, PyIntRef};
pub use iterator::{PySeqIterator, PySeqIteratorRef};
pub use list::{PyList, PyListRef};
pub use long::{PyLong, PyLongRef};
pub use method::{PyMethod, PyMethodRef};
pub use module::{PyModule, PyModuleRef};
pub use object::PyBaseObject;
pub use property::PyProperty;
pub use set::{PyFrozenSet, PyFrozenSetRef, PySet, PySetRef};
pub use singletons::{PyEllipsis, PyNone, PyNotImplemented, PyUnboundLocal};
pub use staticmethod::PyStaticMethod;
pub use str::{PyStr, PyStrRef};
pub use tuple::{PyTuple, PyTupleRef};
