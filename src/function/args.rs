//! C9 §4.9: the positional/keyword argument container passed to every
//! callable, and the argument-binding algorithm for code objects.
//!
//! Grounded in `function/argument.rs` of the teacher: `FuncArgs` keeps
//! the same ordered-kwargs shape (an `IndexMap`, per PEP 468 — keyword
//! arguments preserve call-site order for `**kwargs`).

use std::sync::Arc;

use indexmap::IndexMap;

use crate::object::PyObjectRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug, Default, Clone)]
pub struct FuncArgs {
    pub args: Vec<PyObjectRef>,
    pub kwargs: IndexMap<String, PyObjectRef>,
}

impl FuncArgs {
    pub fn new(args: Vec<PyObjectRef>, kwargs: IndexMap<String, PyObjectRef>) -> Self {
        FuncArgs { args, kwargs }
    }

    pub fn prepend_arg(&mut self, item: PyObjectRef) {
        self.args.insert(0, item);
    }

    pub fn shift(&mut self) -> Option<PyObjectRef> {
        if self.args.is_empty() {
            None
        } else {
            Some(self.args.remove(0))
        }
    }
}

/// One formal parameter: a name and an optional default value thunk.
/// §4.9 invariant (8): no parameter without a default may follow one
/// that has one; `CodeObject::new` enforces this at construction time.
#[derive(Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<PyObjectRef>,
}

/// §4.9 "a host callable implementing the body": the runtime never
/// interprets bytecode of its own, so a code object's body is just the
/// generated-code closure that receives the bound arguments.
pub type NativeBody = Arc<dyn Fn(BoundArguments, PyObjectRef, &VirtualMachine) -> PyResult + Send + Sync>;

/// §4.9 "A code object bundles a name, source filename, a list of
/// formal parameters ..., flags, and a host callable implementing the
/// body."
pub struct CodeObject {
    pub name: String,
    pub filename: String,
    pub params: Vec<Param>,
    pub var_positional: bool,
    pub var_keyword: bool,
    pub body: NativeBody,
}

#[derive(Debug, thiserror::Error)]
pub enum CodeConstructError {
    #[error("non-default argument follows default argument")]
    DefaultOrder,
}

impl CodeObject {
    pub fn new(
        name: String,
        filename: String,
        params: Vec<Param>,
        var_positional: bool,
        var_keyword: bool,
        body: NativeBody,
    ) -> Result<Self, CodeConstructError> {
        let mut seen_default = false;
        for p in &params {
            if p.default.is_some() {
                seen_default = true;
            } else if seen_default {
                return Err(CodeConstructError::DefaultOrder);
            }
        }
        Ok(CodeObject { name, filename, params, var_positional, var_keyword, body })
    }

    fn declared_positional(&self) -> usize {
        self.params.len()
    }

    fn min_required(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }

    /// §4.9 "Argument binding", steps 1-8. Builds the working array of
    /// bound positional slots in formal-parameter order, plus the
    /// overflow `*args` tuple contents and `**kwargs` dict contents
    /// when the code object declares them.
    pub fn bind_arguments(
        &self,
        mut args: Vec<PyObjectRef>,
        mut kwargs: IndexMap<String, PyObjectRef>,
        vm: &VirtualMachine,
    ) -> PyResult<BoundArguments> {
        let declared = self.declared_positional();

        // (1)
        if args.len() > declared && !self.var_positional {
            return Err(vm.new_type_error(format!(
                "{}() takes {} arguments ({} given)",
                self.name,
                declared,
                args.len()
            )));
        }

        // (2)-(4): leading positional slots, then overflow into *args.
        let mut slots: Vec<Option<PyObjectRef>> = vec![None; declared];
        let overflow: Vec<PyObjectRef> = if args.len() > declared {
            args.split_off(declared)
        } else {
            Vec::new()
        };
        for (slot, value) in slots.iter_mut().zip(args.into_iter()) {
            *slot = Some(value);
        }

        // (6): keyword arguments matched against formal names.
        let mut extra_kwargs: IndexMap<String, PyObjectRef> = IndexMap::new();
        for (name, value) in kwargs.drain(..) {
            if let Some(i) = self.params.iter().position(|p| p.name == name) {
                if slots[i].is_some() {
                    return Err(vm.new_type_error(format!(
                        "{}() got multiple values for keyword argument '{}'",
                        self.name, name
                    )));
                }
                slots[i] = Some(value);
            } else if self.var_keyword {
                extra_kwargs.insert(name, value);
            } else {
                return Err(vm.new_type_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    self.name, name
                )));
            }
        }

        // (7): fill remaining slots from declared defaults, else error.
        let mut missing = Vec::new();
        let mut bound = Vec::with_capacity(declared);
        for (slot, param) in slots.into_iter().zip(self.params.iter()) {
            match slot.or_else(|| param.default.clone()) {
                Some(v) => bound.push(v),
                None => missing.push(param.name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(vm.new_type_error(format!(
                "{}() takes at least {} arguments ({} given)",
                self.name,
                self.min_required(),
                bound.len()
            )));
        }

        Ok(BoundArguments { positional: bound, varargs: overflow, varkw: extra_kwargs })
    }

    /// §4.9 step 9: bind, then invoke the body with `globals` and the
    /// bound argument vector; on failure, prepend a traceback record
    /// naming this code object before propagating the error.
    pub fn eval(
        &self,
        globals: PyObjectRef,
        args: Vec<PyObjectRef>,
        kwargs: IndexMap<String, PyObjectRef>,
        vm: &VirtualMachine,
    ) -> PyResult {
        let bound = self.bind_arguments(args, kwargs, vm)?;
        (self.body)(bound, globals, vm).map_err(|exc| {
            if let Some(base) = exc.downcast_ref::<crate::exceptions::PyBaseException>() {
                base.prepend_traceback(self.name.clone(), self.filename.clone());
            }
            exc
        })
    }
}

/// The result of binding: the declared-parameter slots in order, plus
/// whatever overflowed into `*args`/`**kwargs` (empty unless the code
/// object declared the corresponding flag).
pub struct BoundArguments {
    pub positional: Vec<PyObjectRef>,
    pub varargs: Vec<PyObjectRef>,
    pub varkw: IndexMap<String, PyObjectRef>,
}
