//! `pyrt`: an object and type runtime for executing Python 2 semantics
//! on compiled host code.
//!
//! The module layout splits the object header (`object`), the
//! type/slot machinery (`types`), the protocol dispatch layer built on
//! top of slots (`protocol`), the concrete builtin types (`builtins`),
//! the exception hierarchy (`exceptions`), the execution-context
//! primitives (`frame`), argument binding (`function`), the
//! host-value bridge (`convert`), the import coordinator (`import`),
//! and the bootstrap/runtime (`vm`).

pub mod builtins;
pub mod convert;
pub mod dictdatatype;
pub mod exceptions;
pub mod frame;
pub mod function;
pub mod import;
pub mod object;
pub mod protocol;
pub mod types;
pub mod vm;

pub use vm::{Context, PyResult, RuntimeOptions, VirtualMachine};
