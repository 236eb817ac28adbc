//! C10 §4.10: "A generator wraps a block... `next(g)` is equivalent to
//! `g.send(None)`."
//!
//! Grounded in the teacher's `coroutine.rs` `Coro` (the `send`/`throw`/
//! `close` state machine, shared by its generator/coroutine/async-generator
//! trio) and `builtins/generator.rs`. This crate has no bytecode frame to
//! suspend, so the "block" a generator wraps is a host closure that takes
//! whatever opaque checkpoint state it last returned and the value being
//! sent or thrown in, and hands back either the next yielded value (with
//! its next checkpoint) or the generator's return value: precisely the
//! "resumes by dispatching on frame.state" paragraph, with the dispatch
//! folded into the closure itself since there's no interpreter loop here
//! to do it generically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::types::pytype::isinstance;
use crate::types::pytype::TypeOrTuple;
use crate::vm::{PyResult, VirtualMachine};

/// What a generator body is resumed with: a sent value (`send`/bare
/// `next`), or an exception to raise at the current checkpoint (`throw`,
/// and `close`'s injected `GeneratorExit`).
pub enum GeneratorResume {
    Send(PyObjectRef),
    Throw(PyObjectRef),
}

/// What a generator body hands back after running to its next checkpoint.
pub enum GeneratorStep {
    Yield { value: PyObjectRef, state: PyObjectRef },
    Return(PyObjectRef),
}

pub type GeneratorBody =
    Arc<dyn Fn(PyObjectRef, GeneratorResume, &VirtualMachine) -> PyResult<GeneratorStep> + Send + Sync>;

pub type PyGeneratorRef = PyRef<PyGenerator>;

#[derive(Debug)]
struct Inner {
    state: PyObjectRef,
}

pub struct PyGenerator {
    name: RwLock<String>,
    body: GeneratorBody,
    inner: RwLock<Inner>,
    started: AtomicBool,
    running: AtomicBool,
    closed: AtomicBool,
}

impl std::fmt::Debug for PyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<generator '{}'>", self.name.read())
    }
}

impl_payload!(PyGenerator, "generator");

impl PyGenerator {
    pub fn new_ref(
        name: String,
        body: GeneratorBody,
        initial_state: PyObjectRef,
        vm: &VirtualMachine,
    ) -> PyGeneratorRef {
        let obj = PyObject::new(
            PyGenerator {
                name: RwLock::new(name),
                body,
                inner: RwLock::new(Inner { state: initial_state }),
                started: AtomicBool::new(false),
                running: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            },
            vm.ctx.types.generator_type.clone().into_object(),
            None,
        );
        PyRef::new_unchecked(obj)
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    fn is_generator_exit(&self, exc: &PyObjectRef, vm: &VirtualMachine) -> bool {
        isinstance(exc, &TypeOrTuple::Type(vm.ctx.exceptions.generator_exit_type.clone()))
    }

    fn is_stop_iteration(&self, exc: &PyObjectRef, vm: &VirtualMachine) -> bool {
        isinstance(exc, &TypeOrTuple::Type(vm.ctx.exceptions.stop_iteration_type.clone()))
    }

    /// Marks the generator running for the duration of `f`, rejecting
    /// re-entrant calls the way CPython's `gi_running` flag does.
    fn run<F>(&self, vm: &VirtualMachine, f: F) -> PyResult<GeneratorStep>
    where
        F: FnOnce(PyObjectRef) -> PyResult<GeneratorStep>,
    {
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(vm.new_value_error("generator already executing".to_owned()));
        }
        let state = self.inner.read().state.clone();
        let result = f(state);
        self.running.store(false, Ordering::Release);
        result
    }

    fn finish_step(&self, step: PyResult<GeneratorStep>, vm: &VirtualMachine) -> PyResult {
        match step {
            Ok(GeneratorStep::Yield { value, state }) => {
                self.inner.write().state = state;
                Ok(value)
            }
            Ok(GeneratorStep::Return(_)) => {
                self.closed.store(true, Ordering::Release);
                Err(vm.new_stop_iteration())
            }
            Err(e) => {
                self.closed.store(true, Ordering::Release);
                if self.is_stop_iteration(&e, vm) {
                    Err(vm.new_runtime_error("generator raised StopIteration".to_owned()))
                } else {
                    Err(e)
                }
            }
        }
    }

    /// `g.send(v)` (§4.10).
    pub fn send(&self, value: PyObjectRef, vm: &VirtualMachine) -> PyResult {
        if self.closed.load(Ordering::Acquire) {
            return Err(vm.new_stop_iteration());
        }
        let started = self.started.swap(true, Ordering::AcqRel);
        if !started && !vm.is_none(&value) {
            self.started.store(false, Ordering::Release);
            return Err(vm.new_type_error(
                "can't send non-None value to a just-started generator".to_owned(),
            ));
        }
        let body = self.body.clone();
        let step = self.run(vm, |state| body(state, GeneratorResume::Send(value), vm));
        self.finish_step(step, vm)
    }

    /// `next(g)`, exactly `g.send(None)` per §4.10.
    pub fn next(&self, vm: &VirtualMachine) -> PyResult {
        self.send(vm.none(), vm)
    }

    /// `g.throw(exc)`: installs `exc` at the current checkpoint and
    /// resumes. A generator that has never run simply propagates `exc`
    /// without executing any body code, matching CPython.
    pub fn throw(&self, exc: PyObjectRef, vm: &VirtualMachine) -> PyResult {
        if self.closed.load(Ordering::Acquire) {
            return Err(exc);
        }
        if !self.started.load(Ordering::Acquire) {
            self.closed.store(true, Ordering::Release);
            return Err(exc);
        }
        let body = self.body.clone();
        let step = self.run(vm, |state| body(state, GeneratorResume::Throw(exc), vm));
        self.finish_step(step, vm)
    }

    /// `g.close()`: schedules `GeneratorExit` at the next resumption
    /// point (§4.10).
    pub fn close(&self, vm: &VirtualMachine) -> PyResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        if !self.started.load(Ordering::Acquire) {
            self.closed.store(true, Ordering::Release);
            return Ok(());
        }
        let genexit = vm.new_generator_exit();
        let body = self.body.clone();
        let step = self.run(vm, |state| body(state, GeneratorResume::Throw(genexit), vm));
        self.closed.store(true, Ordering::Release);
        match step {
            Ok(GeneratorStep::Yield { .. }) => {
                Err(vm.new_runtime_error("generator ignored GeneratorExit".to_owned()))
            }
            Ok(GeneratorStep::Return(_)) => Ok(()),
            Err(e) if self.is_generator_exit(&e, vm) || self.is_stop_iteration(&e, vm) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

pub fn generator_next(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let gen = obj.downcast_ref::<PyGenerator>().expect("generator_next on non-generator");
    gen.next(vm)
}

pub fn generator_iter(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult {
    Ok(obj.clone())
}

pub fn generator_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let gen = obj.downcast_ref::<PyGenerator>().expect("generator_repr on non-generator");
    Ok(vm.new_str(format!("<generator object {} at {:#x}>", gen.name(), obj.get_id())))
}
