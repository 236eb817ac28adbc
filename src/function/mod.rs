//! C9: argument containers and the code-object binding algorithm.

mod args;

pub use args::{BoundArguments, CodeConstructError, CodeObject, FuncArgs, NativeBody, Param};
