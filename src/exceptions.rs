//! C3 §4.3: the exception hierarchy, and the traceback chain that rides
//! along with every raised value.
//!
//! Grounded in the teacher's `exceptions.rs` for the overall shape of an
//! `ExceptionZoo` (a flat struct of `PyTypeRef`s built once at startup)
//! and for the BaseException payload (args tuple + traceback slot);
//! trimmed to the Python-2 tree §4.3 names instead of the teacher's
//! Python-3 tree.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::builtins::dict::PyDict;
use crate::builtins::tuple::PyTuple;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectPayload, PyObjectRef, PyRef};
use crate::types::pytype::{PyType, TypeFlags};
use crate::types::slot::PyTypeSlots;
use crate::vm::{PyResult, VirtualMachine};

/// One traceback record per unwound frame, innermost first (§3 "Exception
/// value": "a linked list of frame records forming the traceback").
/// Simplified relative to the teacher: a frame *name*, not a live
/// back-reference to the `Frame` itself, since frames are transient
/// stack values here and don't need to outlive the exception that
/// escaped them.
#[derive(Debug)]
pub struct PyTraceback {
    pub frame_name: String,
    pub filename: String,
    pub next: Option<Arc<PyTraceback>>,
}

#[derive(Debug)]
pub struct PyBaseException {
    pub args: RwLock<PyRef<PyTuple>>,
    pub traceback: RwLock<Option<Arc<PyTraceback>>>,
}

impl_payload!(PyBaseException, "BaseException");

impl PyBaseException {
    pub fn new(args: PyRef<PyTuple>) -> Self {
        PyBaseException { args: RwLock::new(args), traceback: RwLock::new(None) }
    }

    /// First element of `args`, the conventional "message", if any.
    pub fn str_message(&self, vm: &VirtualMachine) -> PyResult<String> {
        let args = self.args.read();
        match args.elements().first() {
            Some(v) => vm.str_of(v),
            None => Ok(String::new()),
        }
    }

    pub fn prepend_traceback(&self, frame_name: String, filename: String) {
        let mut tb = self.traceback.write();
        let next = tb.take();
        *tb = Some(Arc::new(PyTraceback { frame_name, filename, next }));
    }
}

/// Every exception class built in at startup, rooted at `BaseException`.
/// Mirrors Python 2's actual hierarchy (the spec names the set but not
/// every parent/child edge; this follows CPython 2.7's layout, which is
/// also what the `StandardError` umbrella in §4.3 implies).
#[derive(Debug, Clone)]
pub struct ExceptionZoo {
    pub base_exception_type: PyRef<PyType>,
    pub exception_type: PyRef<PyType>,
    pub standard_error_type: PyRef<PyType>,
    pub arithmetic_error_type: PyRef<PyType>,
    pub overflow_error_type: PyRef<PyType>,
    pub zero_division_error_type: PyRef<PyType>,
    pub assertion_error_type: PyRef<PyType>,
    pub attribute_error_type: PyRef<PyType>,
    pub environment_error_type: PyRef<PyType>,
    pub io_error_type: PyRef<PyType>,
    pub os_error_type: PyRef<PyType>,
    pub eof_error_type: PyRef<PyType>,
    pub import_error_type: PyRef<PyType>,
    pub lookup_error_type: PyRef<PyType>,
    pub index_error_type: PyRef<PyType>,
    pub key_error_type: PyRef<PyType>,
    pub memory_error_type: PyRef<PyType>,
    pub name_error_type: PyRef<PyType>,
    pub unbound_local_error_type: PyRef<PyType>,
    pub reference_error_type: PyRef<PyType>,
    pub runtime_error_type: PyRef<PyType>,
    pub not_implemented_error_type: PyRef<PyType>,
    pub syntax_error_type: PyRef<PyType>,
    pub system_error_type: PyRef<PyType>,
    pub type_error_type: PyRef<PyType>,
    pub value_error_type: PyRef<PyType>,
    pub unicode_error_type: PyRef<PyType>,
    pub unicode_decode_error_type: PyRef<PyType>,
    pub unicode_encode_error_type: PyRef<PyType>,
    pub keyboard_interrupt_type: PyRef<PyType>,
    pub system_exit_type: PyRef<PyType>,
    pub stop_iteration_type: PyRef<PyType>,
    pub generator_exit_type: PyRef<PyType>,
    pub warning_type: PyRef<PyType>,
}

fn new_type(
    name: &str,
    base: &PyRef<PyType>,
    dict_type: &PyRef<PyType>,
    type_type: &PyRef<PyType>,
) -> PyRef<PyType> {
    let attributes = PyDict::new_bootstrap_dict(dict_type);
    let payload = PyType::new_unready(
        name.to_owned(),
        vec![base.clone()],
        attributes,
        "BaseException",
        TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE | TypeFlags::HAS_DICT,
    );
    let obj = PyObject::new(payload, type_type.clone().into_object(), None);
    let type_ref: PyRef<PyType> = PyRef::new_unchecked(obj);
    PyType::make_ready(&type_ref).expect("builtin exception MRO is always consistent");
    type_ref
}

impl ExceptionZoo {
    /// Built once by `Context::new`, after `object`/`type`/`dict` are ready.
    pub(crate) fn init(object_type: &PyRef<PyType>, type_type: &PyRef<PyType>, dict_type: &PyRef<PyType>) -> Self {
        let mut base_slots = PyTypeSlots::default();
        base_slots.new = Some(exception_new);
        base_slots.init = Some(exception_init);
        base_slots.repr = Some(exception_repr);
        base_slots.str = Some(exception_str);

        let attributes = PyDict::new_bootstrap_dict(dict_type);
        let base_payload = PyType::new_unready(
            "BaseException".to_owned(),
            vec![object_type.clone()],
            attributes,
            "BaseException",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE | TypeFlags::HAS_DICT,
        );
        let base_obj = PyObject::new(base_payload, type_type.clone().into_object(), None);
        let base_exception_type: PyRef<PyType> = PyRef::new_unchecked(base_obj);
        *base_exception_type.slots.write() = base_slots;
        PyType::make_ready(&base_exception_type).unwrap();

        let exception_type = new_type("Exception", &base_exception_type, dict_type, type_type);
        let standard_error_type = new_type("StandardError", &exception_type, dict_type, type_type);
        let arithmetic_error_type = new_type("ArithmeticError", &standard_error_type, dict_type, type_type);
        let overflow_error_type = new_type("OverflowError", &arithmetic_error_type, dict_type, type_type);
        let zero_division_error_type = new_type("ZeroDivisionError", &arithmetic_error_type, dict_type, type_type);
        let assertion_error_type = new_type("AssertionError", &standard_error_type, dict_type, type_type);
        let attribute_error_type = new_type("AttributeError", &standard_error_type, dict_type, type_type);
        let environment_error_type = new_type("EnvironmentError", &standard_error_type, dict_type, type_type);
        let io_error_type = new_type("IOError", &environment_error_type, dict_type, type_type);
        let os_error_type = new_type("OSError", &environment_error_type, dict_type, type_type);
        let eof_error_type = new_type("EOFError", &standard_error_type, dict_type, type_type);
        let import_error_type = new_type("ImportError", &standard_error_type, dict_type, type_type);
        let lookup_error_type = new_type("LookupError", &standard_error_type, dict_type, type_type);
        let index_error_type = new_type("IndexError", &lookup_error_type, dict_type, type_type);
        let key_error_type = new_type("KeyError", &lookup_error_type, dict_type, type_type);
        let memory_error_type = new_type("MemoryError", &standard_error_type, dict_type, type_type);
        let name_error_type = new_type("NameError", &standard_error_type, dict_type, type_type);
        let unbound_local_error_type = new_type("UnboundLocalError", &name_error_type, dict_type, type_type);
        let reference_error_type = new_type("ReferenceError", &standard_error_type, dict_type, type_type);
        let runtime_error_type = new_type("RuntimeError", &standard_error_type, dict_type, type_type);
        let not_implemented_error_type = new_type("NotImplementedError", &runtime_error_type, dict_type, type_type);
        let syntax_error_type = new_type("SyntaxError", &standard_error_type, dict_type, type_type);
        let system_error_type = new_type("SystemError", &standard_error_type, dict_type, type_type);
        let type_error_type = new_type("TypeError", &standard_error_type, dict_type, type_type);
        let value_error_type = new_type("ValueError", &standard_error_type, dict_type, type_type);
        let unicode_error_type = new_type("UnicodeError", &value_error_type, dict_type, type_type);
        let unicode_decode_error_type = new_type("UnicodeDecodeError", &unicode_error_type, dict_type, type_type);
        let unicode_encode_error_type = new_type("UnicodeEncodeError", &unicode_error_type, dict_type, type_type);
        let keyboard_interrupt_type = new_type("KeyboardInterrupt", &base_exception_type, dict_type, type_type);
        let system_exit_type = new_type("SystemExit", &base_exception_type, dict_type, type_type);
        let stop_iteration_type = new_type("StopIteration", &exception_type, dict_type, type_type);
        // Python 2.6+ hangs `GeneratorExit` directly off `BaseException`,
        // same level as `SystemExit`/`KeyboardInterrupt`, precisely so
        // that a bare `except Exception:` inside a generator body does
        // not accidentally swallow `close()`'s injected exit signal.
        let generator_exit_type = new_type("GeneratorExit", &base_exception_type, dict_type, type_type);
        let warning_type = new_type("Warning", &exception_type, dict_type, type_type);

        ExceptionZoo {
            base_exception_type,
            exception_type,
            standard_error_type,
            arithmetic_error_type,
            overflow_error_type,
            zero_division_error_type,
            assertion_error_type,
            attribute_error_type,
            environment_error_type,
            io_error_type,
            os_error_type,
            eof_error_type,
            import_error_type,
            lookup_error_type,
            index_error_type,
            key_error_type,
            memory_error_type,
            name_error_type,
            unbound_local_error_type,
            reference_error_type,
            runtime_error_type,
            not_implemented_error_type,
            syntax_error_type,
            system_error_type,
            type_error_type,
            value_error_type,
            unicode_error_type,
            unicode_decode_error_type,
            unicode_encode_error_type,
            keyboard_interrupt_type,
            system_exit_type,
            stop_iteration_type,
            generator_exit_type,
            warning_type,
        }
    }
}

fn exception_new(
    cls: PyRef<PyType>,
    args: crate::function::FuncArgs,
    vm: &VirtualMachine,
) -> PyResult {
    let tuple = PyTuple::new_ref(args.args, vm);
    let obj = PyObject::new(PyBaseException::new(tuple), cls.into_object(), None);
    Ok(obj)
}

fn exception_init(obj: &PyObjectRef, args: crate::function::FuncArgs, vm: &VirtualMachine) -> PyResult<()> {
    let exc = obj.downcast_ref::<PyBaseException>().expect("exception_init on non-exception");
    *exc.args.write() = PyTuple::new_ref(args.args, vm);
    Ok(())
}

fn exception_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let exc = obj.downcast_ref::<PyBaseException>().expect("exception_repr on non-exception");
    let args_repr: Vec<String> = exc
        .args
        .read()
        .elements()
        .iter()
        .map(|a| vm.str_of(a))
        .collect::<PyResult<_>>()?;
    Ok(vm.new_str(format!("{}({})", obj.class().name, args_repr.join(", "))))
}

fn exception_str(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let exc = obj.downcast_ref::<PyBaseException>().expect("exception_str on non-exception");
    Ok(vm.new_str(exc.str_message(vm)?))
}

/// Build a ready-to-raise exception instance of `ty` with a single
/// string argument, exactly `RaiseType(T, msg)` of §4.4.
pub fn new_exception(ty: &PyRef<PyType>, msg: String, vm: &VirtualMachine) -> PyObjectRef {
    let tuple = PyTuple::new_ref(vec![vm.new_str(msg)], vm);
    let obj = PyObject::new(PyBaseException::new(tuple), ty.clone().into_object(), None);
    obj
}

/// Build a ready-to-raise exception instance of `ty` with an arbitrary
/// single argument object (used by `KeyError`, which carries the
/// missing key rather than a string).
pub fn new_exception_with_arg(ty: &PyRef<PyType>, arg: PyObjectRef, vm: &VirtualMachine) -> PyObjectRef {
    let tuple = PyTuple::new_ref(vec![arg], vm);
    PyObject::new(PyBaseException::new(tuple), ty.clone().into_object(), None)
}
