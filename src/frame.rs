//! C4 §4.4: one execution context's exception state, recursion guard,
//! and the re-entrant "block" abstraction that runs a body until it
//! either returns cleanly or exhausts its checkpoint stack.
//!
//! This crate has no bytecode interpreter of its own: generated code
//! compiles straight to host closures (`function::NativeBody`,
//! `builtins::generator::GeneratorBody`), so nothing drives a `Frame`
//! through every call the way a real bytecode loop would. `Frame` and
//! `Block` are still built here in full, per §4.4, as the primitive any
//! future frame-stepping consumer would sit on. Existing call sites
//! that need only a slice of this behavior use narrower, purpose-built
//! equivalents instead of threading a `Frame` parameter through every
//! slot signature in the crate (see DESIGN.md's repr-recursion-guard
//! entry for that tradeoff).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::exceptions::PyBaseException;
use crate::object::PyObjectRef;
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

/// One execution context: name/filename for traceback records, the
/// exception currently being handled (`exc_info`), the resume-state
/// slot a `Block`'s checkpoints write into, the recursion-depth
/// counter, and the `reprEnter`/`reprLeave` self-reference guard.
pub struct Frame {
    name: String,
    filename: String,
    exc_info: RwLock<Option<PyObjectRef>>,
    state: RwLock<Option<PyObjectRef>>,
    depth: AtomicUsize,
    repr_stack: RwLock<Vec<usize>>,
}

impl Frame {
    pub fn new(name: String, filename: String) -> Self {
        Frame {
            name,
            filename,
            exc_info: RwLock::new(None),
            state: RwLock::new(None),
            depth: AtomicUsize::new(0),
            repr_stack: RwLock::new(Vec::new()),
        }
    }

    /// `RaiseType(T, msg)` (§4.4): constructs an instance of `T` with a
    /// single string argument, stores it in `exc_info` along with a
    /// traceback beginning at this frame (the traceback itself rides
    /// along on the exception object, per `PyBaseException::traceback`,
    /// rather than living separately on `exc_info`).
    pub fn raise_type(&self, ty: &PyTypeRef, msg: String, vm: &VirtualMachine) -> PyObjectRef {
        let exc = crate::exceptions::new_exception(ty, msg, vm);
        if let Some(base) = exc.downcast_ref::<PyBaseException>() {
            base.prepend_traceback(self.name.clone(), self.filename.clone());
        }
        *self.exc_info.write() = Some(exc.clone());
        exc
    }

    /// `RestoreExc(exc, tb)`: overwrites `exc_info` atomically from the
    /// caller's perspective. The traceback is already part of `exc`
    /// (or absent, for a clear), so there is no separate `tb` parameter
    /// to thread through here.
    pub fn restore_exc(&self, exc: Option<PyObjectRef>) {
        *self.exc_info.write() = exc;
    }

    pub fn exc_info(&self) -> Option<PyObjectRef> {
        self.exc_info.read().clone()
    }

    pub fn state(&self) -> Option<PyObjectRef> {
        self.state.read().clone()
    }

    pub fn set_state(&self, state: Option<PyObjectRef>) {
        *self.state.write() = state;
    }

    /// Enforces the recursion limit: increments the depth counter,
    /// raising `RuntimeError` without entering if it would exceed
    /// `vm.options.recursion_limit`. The returned guard decrements the
    /// counter on drop regardless of how the caller's scope exits.
    pub fn enter<'a>(&'a self, vm: &VirtualMachine) -> PyResult<FrameGuard<'a>> {
        let depth = self.depth.fetch_add(1, Ordering::AcqRel) + 1;
        if depth > vm.options.recursion_limit {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            return Err(vm.new_runtime_error("maximum recursion depth exceeded".to_owned()));
        }
        Ok(FrameGuard { frame: self })
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// `reprEnter(o)` (§4.4): true if `o`'s id is already being
    /// formatted on this frame (the caller should print `"{...}"`/
    /// `"[...]"` instead of recursing), false (and pushed) otherwise.
    pub fn repr_enter(&self, id: usize) -> bool {
        let mut stack = self.repr_stack.write();
        if stack.contains(&id) {
            true
        } else {
            stack.push(id);
            false
        }
    }

    /// `reprLeave(o)`: pops the most recent matching entry.
    pub fn repr_leave(&self, id: usize) {
        let mut stack = self.repr_stack.write();
        if let Some(pos) = stack.iter().rposition(|&x| x == id) {
            stack.remove(pos);
        }
    }
}

/// RAII guard returned by [`Frame::enter`]; decrements the recursion
/// depth counter when the nested call exits, successfully or not.
pub struct FrameGuard<'a> {
    frame: &'a Frame,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.frame.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A block's re-entrant body: reads `frame.state()` to know where to
/// resume (after a checkpoint retry) and `sent_value` for whatever the
/// block's caller supplied on this particular entry.
pub type BlockBody = Arc<dyn Fn(&Frame, Option<PyObjectRef>, &VirtualMachine) -> PyResult + Send + Sync>;

/// §4.4 "A block wraps a re-entrant body function... executing a block
/// repeatedly invokes it until it returns a non-failing result or runs
/// out of checkpoints." Each checkpoint models one `except`/`finally`
/// clause still available to try.
pub struct Block {
    body: BlockBody,
    checkpoints: RwLock<Vec<PyObjectRef>>,
}

impl Block {
    pub fn new(body: BlockBody, checkpoints: Vec<PyObjectRef>) -> Self {
        Block { body, checkpoints: RwLock::new(checkpoints) }
    }

    pub fn checkpoints_remaining(&self) -> usize {
        self.checkpoints.read().len()
    }

    /// Runs the block. On entry, captures the frame's existing
    /// `exc_info` to restore on normal return. On failure, if the
    /// checkpoint stack is non-empty, the top checkpoint becomes the
    /// frame's `state`, `exc_info` is set to the failure, and the body
    /// is re-entered with no new sent value (this is the "try next
    /// except / finally" unwind); once checkpoints run out, the last
    /// failure propagates and `exc_info` is left pointing at it.
    pub fn run(&self, frame: &Frame, sent_value: Option<PyObjectRef>, vm: &VirtualMachine) -> PyResult {
        let saved_exc_info = frame.exc_info();
        let mut value = sent_value;
        loop {
            match (self.body)(frame, value.take(), vm) {
                Ok(result) => {
                    frame.restore_exc(saved_exc_info);
                    return Ok(result);
                }
                Err(exc) => {
                    let checkpoint = self.checkpoints.write().pop();
                    match checkpoint {
                        Some(next_state) => {
                            frame.restore_exc(Some(exc));
                            frame.set_state(Some(next_state));
                        }
                        None => return Err(exc),
                    }
                }
            }
        }
    }
}
