//! §5 "Runtime": the bootstrap that gets `object`/`type`/`dict` (and
//! every other builtin type) off the ground, the interned-string table,
//! and the small set of VM-level helpers (`repr`/`str` conversion,
//! error construction, iteration) that every protocol module calls
//! through rather than re-deriving locally.
//!
//! Grounded in the teacher's `vm/context.rs` for the `Context` shape
//! (a bag of ready-made type/exception/singleton objects built once)
//! and `vm/vm.rs` for the helper-method surface; the actual metaclass
//! bootstrap sequence here is original to this crate's `Arc`-based
//! object representation (see DESIGN.md).

use std::cell::RefCell;
use std::collections::HashMap;

use num_complex::Complex64;
use num_traits::ToPrimitive;
use parking_lot::RwLock;

use crate::builtins::complex;
use crate::builtins::dict::{self, PyDict};
use crate::builtins::classmethod;
use crate::builtins::float;
use crate::builtins::function;
use crate::builtins::generator;
use crate::builtins::int::{self, PyInt};
use crate::builtins::iterator;
use crate::builtins::list::{self, PyList};
use crate::builtins::long::{self, PyLong};
use crate::builtins::method;
use crate::builtins::module;
use crate::builtins::object;
use crate::builtins::property;
use crate::builtins::set;
use crate::builtins::staticmethod;
use crate::builtins::singletons::{self, PyEllipsis, PyNone, PyNotImplemented, PyUnboundLocal};
use crate::builtins::str::{self, PyStr};
use crate::builtins::tuple::{self, PyTuple};
use crate::exceptions::ExceptionZoo;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::types::pytype::{isinstance, PyType, TypeFlags, TypeOrTuple};
use crate::types::slot::PyTypeSlots;
use crate::types::PyTypeRef;

/// Every Python error is just a `PyObjectRef` carrying a `BaseException`
/// payload (§4.3): there's no separate error enum to keep in sync.
pub type PyResult<T = PyObjectRef> = Result<T, PyObjectRef>;

/// Every builtin type object, built once at startup (§5).
#[derive(Clone)]
pub struct TypeZoo {
    pub object_type: PyTypeRef,
    pub type_type: PyTypeRef,
    pub dict_type: PyTypeRef,
    pub none_type: PyTypeRef,
    pub not_implemented_type: PyTypeRef,
    pub ellipsis_type: PyTypeRef,
    pub unbound_local_type: PyTypeRef,
    pub bool_type: PyTypeRef,
    pub int_type: PyTypeRef,
    pub long_type: PyTypeRef,
    pub float_type: PyTypeRef,
    pub complex_type: PyTypeRef,
    pub str_type: PyTypeRef,
    pub unicode_type: PyTypeRef,
    pub list_type: PyTypeRef,
    pub tuple_type: PyTypeRef,
    pub set_type: PyTypeRef,
    pub frozenset_type: PyTypeRef,
    pub function_type: PyTypeRef,
    pub method_type: PyTypeRef,
    pub property_type: PyTypeRef,
    pub staticmethod_type: PyTypeRef,
    pub classmethod_type: PyTypeRef,
    pub generator_type: PyTypeRef,
    pub seq_iterator_type: PyTypeRef,
    pub module_type: PyTypeRef,
    pub native_value_type: PyTypeRef,
}

/// Knobs a host embedding this runtime can tune (§5 "Runtime options").
#[derive(Clone, Copy, Debug)]
pub struct RuntimeOptions {
    pub initial_dict_capacity: usize,
    pub recursion_limit: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        RuntimeOptions { initial_dict_capacity: 8, recursion_limit: 1000 }
    }
}

/// The process-wide bag of ready-made objects: builtin types, the
/// exception zoo, the three singletons, the two bool instances, and the
/// interned-string pool that backs every attribute-name lookup.
pub struct Context {
    pub types: TypeZoo,
    pub exceptions: ExceptionZoo,
    pub none: PyObjectRef,
    pub not_implemented: PyObjectRef,
    pub ellipsis: PyObjectRef,
    pub unbound_local: PyObjectRef,
    pub true_value: PyObjectRef,
    pub false_value: PyObjectRef,
    /// The `sys.modules` registry (§4.13): every module `import_module`
    /// has ever installed, keyed by its dotted name.
    pub sys_modules: crate::builtins::PyDictRef,
    string_pool: RwLock<HashMap<String, PyObjectRef>>,
}

fn new_builtin_type(
    name: &str,
    bases: Vec<PyTypeRef>,
    basis: &'static str,
    flags: TypeFlags,
    dict_type: &PyTypeRef,
    type_type: &PyTypeRef,
    slots: PyTypeSlots,
) -> PyTypeRef {
    let attributes = PyDict::new_bootstrap_dict(dict_type);
    let payload = PyType::new_unready(name.to_owned(), bases, attributes, basis, flags);
    let obj = PyObject::new(payload, type_type.clone().into_object(), None);
    let type_ref: PyTypeRef = PyRef::new_unchecked(obj);
    *type_ref.slots.write() = slots;
    PyType::make_ready(&type_ref).expect("builtin type MRO is always consistent");
    type_ref
}

impl Context {
    pub fn new() -> Self {
        // --- phase 0: the object/type metaclass cycle ----------------
        // `object` and `type` are each instances of `type`, and `type`
        // is itself a subclass of `object`. Neither can be built first
        // through the normal `PyObject::new` path, which demands a
        // class up front. Both headers start with no class at all and
        // get patched once `type_type` exists (see `object/core.rs`).
        let object_attrs = PyDict::new_bootstrap_ref();
        let object_payload = PyType::new_unready(
            "object".to_owned(),
            vec![],
            object_attrs.clone(),
            "object",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
        );
        let object_type_obj = PyObject::new_bootstrap_root(object_payload);
        let object_type: PyTypeRef = PyRef::new_unchecked(object_type_obj.clone());

        let type_attrs = PyDict::new_bootstrap_ref();
        let type_payload = PyType::new_unready(
            "type".to_owned(),
            vec![object_type.clone()],
            type_attrs.clone(),
            "type",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
        );
        let type_type_obj = PyObject::new_bootstrap_root(type_payload);
        let type_type: PyTypeRef = PyRef::new_unchecked(type_type_obj.clone());

        // patch: type(object) is type, type(type) is type.
        object_type_obj.set_class(type_type.clone());
        type_type_obj.set_class(type_type.clone());

        // `object` supplies the default attribute-access algorithm
        // (§4.1) as slots so every other type inherits it via MRO
        // (invariant (i) in §3) instead of special-casing "no override".
        let mut object_slots = PyTypeSlots::default();
        object_slots.new = Some(object::object_new);
        object_slots.get_attribute = Some(crate::protocol::attr::generic_get_attribute);
        object_slots.set_attr = Some(object::object_set_attr);
        *object_type.slots.write() = object_slots;

        // `type` supplies its own `__call__` (§4.1 "Instance
        // construction"): calling any type object `T(...)` runs `T`'s
        // `new` slot, then `init` if the result is an instance of `T`.
        let mut type_slots = PyTypeSlots::default();
        type_slots.call = Some(crate::types::pytype::type_call);
        *type_type.slots.write() = type_slots;

        PyType::make_ready(&object_type).expect("object has no bases, always consistent");
        PyType::make_ready(&type_type).expect("type(object) MRO is always consistent");

        // --- phase 1: dict, so every later type can have a real
        // attributes dict instead of a bootstrap one -----------------
        let dict_attrs = PyDict::new_bootstrap_ref();
        let dict_payload = PyType::new_unready(
            "dict".to_owned(),
            vec![object_type.clone()],
            dict_attrs.clone(),
            "dict",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE | TypeFlags::HAS_DICT,
        );
        let dict_type_obj = PyObject::new(dict_payload, type_type.clone().into_object(), None);
        let dict_type: PyTypeRef = PyRef::new_unchecked(dict_type_obj);
        let mut dict_slots = PyTypeSlots::default();
        dict_slots.mapping.len = Some(dict::dict_len);
        dict_slots.mapping.getitem = Some(dict::dict_getitem);
        dict_slots.mapping.setitem = Some(dict::dict_setitem);
        dict_slots.mapping.contains = Some(dict::dict_contains);
        dict_slots.compare.eq = Some(dict::dict_eq_slot);
        dict_slots.new = Some(dict::dict_new);
        *dict_type.slots.write() = dict_slots;
        PyType::make_ready(&dict_type).expect("dict(object) MRO is always consistent");

        // Retroactively class the three dicts created before `dict_type`
        // existed (object's, type's, and dict's own attributes dict).
        object_attrs.as_object().set_class(dict_type.clone());
        type_attrs.as_object().set_class(dict_type.clone());
        dict_type.attributes.as_object().set_class(dict_type.clone());

        // --- phase 2: the rest of the numeric tower and containers ---
        let mut int_slots = PyTypeSlots::default();
        int_slots.repr = Some(int::int_repr);
        int_slots.str = Some(int::int_repr);
        int_slots.hash = Some(int::int_hash);
        int_slots.bool = Some(int::int_bool);
        int_slots.new = Some(int::int_new);
        int_slots.number.add = Some(int::int_add);
        int_slots.number.radd = Some(int::int_add);
        int_slots.number.sub = Some(int::int_sub);
        int_slots.number.rsub = Some(int::int_rsub);
        int_slots.number.mul = Some(int::int_mul);
        int_slots.number.rmul = Some(int::int_mul);
        int_slots.number.floordiv = Some(int::int_floordiv);
        int_slots.number.rfloordiv = Some(int::int_rfloordiv);
        // Python 2 classic division (`/` without `from __future__ import
        // division`) on two ints is floor division.
        int_slots.number.div = Some(int::int_floordiv);
        int_slots.number.rdiv = Some(int::int_rfloordiv);
        int_slots.number.modulo = Some(int::int_mod);
        int_slots.number.rmodulo = Some(int::int_rmod);
        int_slots.number.divmod = Some(int::int_divmod_obj);
        int_slots.number.rdivmod = Some(int::int_rdivmod);
        int_slots.number.pow = Some(int::int_pow);
        int_slots.number.lshift = Some(int::int_lshift);
        int_slots.number.rshift = Some(int::int_rshift);
        int_slots.number.and = Some(int::int_and);
        int_slots.number.rand = Some(int::int_and);
        int_slots.number.or = Some(int::int_or);
        int_slots.number.ror = Some(int::int_or);
        int_slots.number.xor = Some(int::int_xor);
        int_slots.number.rxor = Some(int::int_xor);
        int_slots.number.neg = Some(int::int_neg);
        int_slots.number.abs = Some(int::int_abs);
        int_slots.number.invert = Some(int::int_invert);
        int_slots.number.index = Some(int::int_index);
        int_slots.number.int = Some(int::int_index);
        int_slots.number.long = Some(int::int_long);
        int_slots.number.float = Some(int::int_float);
        int_slots.number.hex = Some(int::int_hex);
        int_slots.number.oct = Some(int::int_oct);
        int_slots.compare.eq = Some(int::int_eq);
        int_slots.compare.lt = Some(int::int_lt);
        let int_type = new_builtin_type(
            "int",
            vec![object_type.clone()],
            "int",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            int_slots,
        );

        // `bool` is a non-instantiable subclass of `int` whose two
        // singletons reuse `PyInt`'s payload directly (§3 basis reuse);
        // only repr/str/bool are overridden, everything else (hash,
        // arithmetic, comparison) is inherited unmodified via MRO.
        let mut bool_slots = PyTypeSlots::default();
        bool_slots.repr = Some(bool_repr);
        bool_slots.str = Some(bool_repr);
        let bool_type = new_builtin_type(
            "bool",
            vec![int_type.clone()],
            "int",
            TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            bool_slots,
        );

        let mut long_slots = PyTypeSlots::default();
        long_slots.repr = Some(long::long_repr);
        long_slots.str = Some(long::long_repr);
        long_slots.hash = Some(long::long_hash);
        long_slots.bool = Some(long::long_bool);
        long_slots.new = Some(long::long_new);
        long_slots.number.add = Some(long::long_add);
        long_slots.number.radd = Some(long::long_add);
        long_slots.number.sub = Some(long::long_sub);
        long_slots.number.rsub = Some(long::long_rsub);
        long_slots.number.mul = Some(long::long_mul);
        long_slots.number.rmul = Some(long::long_mul);
        long_slots.number.floordiv = Some(long::long_floordiv);
        long_slots.number.rfloordiv = Some(long::long_rfloordiv);
        long_slots.number.div = Some(long::long_floordiv);
        long_slots.number.rdiv = Some(long::long_rfloordiv);
        long_slots.number.modulo = Some(long::long_mod);
        long_slots.number.rmodulo = Some(long::long_rmod);
        long_slots.number.divmod = Some(long::long_divmod_obj);
        long_slots.number.rdivmod = Some(long::long_rdivmod);
        long_slots.number.neg = Some(long::long_neg);
        long_slots.number.abs = Some(long::long_abs);
        long_slots.number.index = Some(long::long_index);
        long_slots.number.long = Some(long::long_index);
        long_slots.number.int = Some(long::long_int);
        long_slots.number.float = Some(long::long_float);
        long_slots.number.hex = Some(long::long_hex);
        long_slots.number.oct = Some(long::long_oct);
        long_slots.compare.eq = Some(long::long_eq);
        long_slots.compare.lt = Some(long::long_lt);
        let long_type = new_builtin_type(
            "long",
            vec![object_type.clone()],
            "long",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            long_slots,
        );

        let mut float_slots = PyTypeSlots::default();
        float_slots.repr = Some(float::float_repr);
        float_slots.str = Some(float::float_repr);
        float_slots.hash = Some(float::float_hash);
        float_slots.bool = Some(float::float_bool);
        float_slots.new = Some(float::float_new);
        float_slots.number.add = Some(float::float_add);
        float_slots.number.radd = Some(float::float_add);
        float_slots.number.sub = Some(float::float_sub);
        float_slots.number.rsub = Some(float::float_rsub);
        float_slots.number.mul = Some(float::float_mul);
        float_slots.number.rmul = Some(float::float_mul);
        float_slots.number.div = Some(float::float_truediv);
        float_slots.number.rdiv = Some(float::float_rdiv);
        float_slots.number.floordiv = Some(float::float_floordiv);
        float_slots.number.rfloordiv = Some(float::float_rfloordiv);
        float_slots.number.modulo = Some(float::float_mod);
        float_slots.number.rmodulo = Some(float::float_rmod);
        float_slots.number.divmod = Some(float::float_divmod);
        float_slots.number.rdivmod = Some(float::float_rdivmod);
        float_slots.number.neg = Some(float::float_neg);
        float_slots.number.abs = Some(float::float_abs);
        float_slots.number.int = Some(float::float_int);
        float_slots.number.long = Some(float::float_long);
        float_slots.number.float = Some(float::float_float);
        float_slots.compare.eq = Some(float::float_eq);
        float_slots.compare.lt = Some(float::float_lt);
        let float_type = new_builtin_type(
            "float",
            vec![object_type.clone()],
            "float",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            float_slots,
        );

        let mut complex_slots = PyTypeSlots::default();
        complex_slots.repr = Some(complex::complex_repr);
        complex_slots.str = Some(complex::complex_repr);
        complex_slots.new = Some(complex::complex_new);
        complex_slots.number.add = Some(complex::complex_add);
        complex_slots.number.radd = Some(complex::complex_add);
        complex_slots.number.sub = Some(complex::complex_sub);
        complex_slots.number.mul = Some(complex::complex_mul);
        complex_slots.number.rmul = Some(complex::complex_mul);
        complex_slots.number.div = Some(complex::complex_truediv);
        complex_slots.number.rdiv = Some(complex::complex_rtruediv);
        complex_slots.number.neg = Some(complex::complex_neg);
        complex_slots.number.abs = Some(complex::complex_abs);
        complex_slots.compare.eq = Some(complex::complex_eq);
        // No `divmod`/`floordiv`/`modulo` slots: CPython raises TypeError
        // for `%`, `//`, and `divmod()` on a complex operand, so leaving
        // these unset and falling through to the slot-dispatch TypeError
        // is the correct behavior, not a gap.
        let complex_type = new_builtin_type(
            "complex",
            vec![object_type.clone()],
            "complex",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            complex_slots,
        );

        let mut str_slots = PyTypeSlots::default();
        str_slots.repr = Some(str::str_repr);
        str_slots.str = Some(str::str_str);
        str_slots.hash = Some(str::str_hash);
        str_slots.bool = Some(str::str_bool);
        str_slots.new = Some(str::str_new);
        str_slots.mapping.len = Some(str::str_len);
        str_slots.number.add = Some(str::str_add);
        str_slots.compare.eq = Some(str::str_eq);
        str_slots.compare.lt = Some(str::str_lt);
        let str_type = new_builtin_type(
            "str",
            vec![object_type.clone()],
            "str",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            str_slots.clone(),
        );
        let unicode_type = new_builtin_type(
            "unicode",
            vec![object_type.clone()],
            "str",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            str_slots,
        );

        let mut list_slots = PyTypeSlots::default();
        list_slots.repr = Some(list::list_repr);
        list_slots.new = Some(list::list_new);
        list_slots.mapping.len = Some(list::list_len);
        list_slots.mapping.getitem = Some(list::list_getitem);
        list_slots.mapping.setitem = Some(list::list_setitem);
        let list_type = new_builtin_type(
            "list",
            vec![object_type.clone()],
            "list",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            list_slots,
        );

        let mut tuple_slots = PyTypeSlots::default();
        tuple_slots.repr = Some(tuple::tuple_repr);
        tuple_slots.new = Some(tuple::tuple_new);
        tuple_slots.hash = Some(tuple::tuple_hash);
        tuple_slots.compare.eq = Some(tuple::tuple_eq);
        tuple_slots.mapping.len = Some(tuple::tuple_len);
        tuple_slots.mapping.getitem = Some(tuple::tuple_getitem);
        let tuple_type = new_builtin_type(
            "tuple",
            vec![object_type.clone()],
            "tuple",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            tuple_slots,
        );

        let mut set_slots = PyTypeSlots::default();
        set_slots.repr = Some(set::set_repr);
        set_slots.new = Some(set::set_new);
        set_slots.mapping.len = Some(set::set_len);
        set_slots.mapping.contains = Some(set::set_contains);
        let set_type = new_builtin_type(
            "set",
            vec![object_type.clone()],
            "set",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            set_slots,
        );

        let mut frozenset_slots = PyTypeSlots::default();
        frozenset_slots.new = Some(set::frozenset_new);
        frozenset_slots.hash = Some(set::frozenset_hash);
        let frozenset_type = new_builtin_type(
            "frozenset",
            vec![object_type.clone()],
            "frozenset",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            frozenset_slots,
        );

        // --- phase 2b: function/method/code and descriptor machinery
        // (C9/C11) ------------------------------------------------------
        let mut function_slots = PyTypeSlots::default();
        function_slots.call = Some(function::function_call);
        function_slots.get = Some(function::function_get);
        let function_type = new_builtin_type(
            "function",
            vec![object_type.clone()],
            "function",
            TypeFlags::empty(),
            &dict_type,
            &type_type,
            function_slots,
        );

        let mut method_slots = PyTypeSlots::default();
        method_slots.call = Some(method::method_call);
        let method_type = new_builtin_type(
            "instancemethod",
            vec![object_type.clone()],
            "instancemethod",
            TypeFlags::empty(),
            &dict_type,
            &type_type,
            method_slots,
        );

        let mut property_slots = PyTypeSlots::default();
        property_slots.new = Some(property::property_new);
        property_slots.get = Some(property::property_get);
        property_slots.set = Some(property::property_set);
        property_slots.delete = Some(property::property_delete);
        let property_type = new_builtin_type(
            "property",
            vec![object_type.clone()],
            "property",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            property_slots,
        );

        let mut staticmethod_slots = PyTypeSlots::default();
        staticmethod_slots.new = Some(staticmethod::staticmethod_new);
        staticmethod_slots.get = Some(staticmethod::staticmethod_get);
        let staticmethod_type = new_builtin_type(
            "staticmethod",
            vec![object_type.clone()],
            "staticmethod",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            staticmethod_slots,
        );

        let mut classmethod_slots = PyTypeSlots::default();
        classmethod_slots.new = Some(classmethod::classmethod_new);
        classmethod_slots.get = Some(classmethod::classmethod_get);
        let classmethod_type = new_builtin_type(
            "classmethod",
            vec![object_type.clone()],
            "classmethod",
            TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE,
            &dict_type,
            &type_type,
            classmethod_slots,
        );

        let mut generator_slots = PyTypeSlots::default();
        generator_slots.repr = Some(generator::generator_repr);
        generator_slots.iter = Some(generator::generator_iter);
        generator_slots.next = Some(generator::generator_next);
        let generator_type = new_builtin_type(
            "generator",
            vec![object_type.clone()],
            "generator",
            TypeFlags::empty(),
            &dict_type,
            &type_type,
            generator_slots,
        );

        let mut seq_iterator_slots = PyTypeSlots::default();
        seq_iterator_slots.iter = Some(iterator::seq_iterator_iter);
        seq_iterator_slots.next = Some(iterator::seq_iterator_next);
        let seq_iterator_type = new_builtin_type(
            "iterator",
            vec![object_type.clone()],
            "iterator",
            TypeFlags::empty(),
            &dict_type,
            &type_type,
            seq_iterator_slots,
        );

        let mut module_slots = PyTypeSlots::default();
        module_slots.repr = Some(module::module_repr);
        module_slots.new = Some(module::module_new);
        module_slots.get_attribute = Some(module::module_get_attribute);
        let module_type = new_builtin_type(
            "module",
            vec![object_type.clone()],
            "module",
            TypeFlags::INSTANTIABLE | TypeFlags::HAS_DICT,
            &dict_type,
            &type_type,
            module_slots,
        );

        let mut native_value_slots = PyTypeSlots::default();
        native_value_slots.repr = Some(crate::convert::native_value_repr);
        let native_value_type = new_builtin_type(
            "nativevalue",
            vec![object_type.clone()],
            "nativevalue",
            TypeFlags::empty(),
            &dict_type,
            &type_type,
            native_value_slots,
        );

        // --- phase 3: the singletons ----------------------------------
        let mut none_slots = PyTypeSlots::default();
        none_slots.repr = Some(singletons::none_repr);
        none_slots.str = Some(singletons::none_repr);
        none_slots.bool = Some(singletons::none_bool);
        none_slots.new = Some(singletons::singleton_new_disallowed);
        let none_type = new_builtin_type(
            "NoneType",
            vec![object_type.clone()],
            "NoneType",
            TypeFlags::empty(),
            &dict_type,
            &type_type,
            none_slots,
        );

        let mut not_implemented_slots = PyTypeSlots::default();
        not_implemented_slots.repr = Some(singletons::not_implemented_repr);
        not_implemented_slots.str = Some(singletons::not_implemented_repr);
        not_implemented_slots.new = Some(singletons::singleton_new_disallowed);
        let not_implemented_type = new_builtin_type(
            "NotImplementedType",
            vec![object_type.clone()],
            "NotImplementedType",
            TypeFlags::empty(),
            &dict_type,
            &type_type,
            not_implemented_slots,
        );

        let mut ellipsis_slots = PyTypeSlots::default();
        ellipsis_slots.repr = Some(singletons::ellipsis_repr);
        ellipsis_slots.str = Some(singletons::ellipsis_repr);
        ellipsis_slots.new = Some(singletons::singleton_new_disallowed);
        let ellipsis_type = new_builtin_type(
            "ellipsis",
            vec![object_type.clone()],
            "ellipsis",
            TypeFlags::empty(),
            &dict_type,
            &type_type,
            ellipsis_slots,
        );

        let mut unbound_local_slots = PyTypeSlots::default();
        unbound_local_slots.new = Some(singletons::singleton_new_disallowed);
        let unbound_local_type = new_builtin_type(
            "UnboundLocalType",
            vec![object_type.clone()],
            "UnboundLocalType",
            TypeFlags::empty(),
            &dict_type,
            &type_type,
            unbound_local_slots,
        );

        let none = PyObject::new(PyNone, none_type.clone().into_object(), None);
        let not_implemented = PyObject::new(PyNotImplemented, not_implemented_type.clone().into_object(), None);
        let ellipsis = PyObject::new(PyEllipsis, ellipsis_type.clone().into_object(), None);
        let unbound_local = PyObject::new(PyUnboundLocal, unbound_local_type.clone().into_object(), None);
        let true_value = PyObject::new(int::bare(1), bool_type.clone().into_object(), None);
        let false_value = PyObject::new(int::bare(0), bool_type.clone().into_object(), None);

        let types = TypeZoo {
            object_type: object_type.clone(),
            type_type: type_type.clone(),
            dict_type: dict_type.clone(),
            none_type,
            not_implemented_type,
            ellipsis_type,
            unbound_local_type,
            bool_type,
            int_type,
            long_type,
            float_type,
            complex_type,
            str_type,
            unicode_type,
            list_type,
            tuple_type,
            set_type,
            frozenset_type,
            function_type,
            method_type,
            property_type,
            staticmethod_type,
            classmethod_type,
            generator_type,
            seq_iterator_type,
            module_type,
            native_value_type,
        };

        let exceptions = ExceptionZoo::init(&object_type, &type_type, &dict_type);
        let sys_modules = PyDict::new_bootstrap_dict(&dict_type);

        Context {
            types,
            exceptions,
            none,
            not_implemented,
            ellipsis,
            unbound_local,
            true_value,
            false_value,
            sys_modules,
            string_pool: RwLock::new(HashMap::new()),
        }
    }

    /// §5 "interned strings": every attribute name and dict-string-key
    /// lookup goes through this table rather than allocating a fresh
    /// `PyStr` per lookup. Append-only — entries are never evicted.
    pub fn intern_str(&self, name: &str) -> PyObjectRef {
        if let Some(existing) = self.string_pool.read().get(name) {
            return existing.clone();
        }
        let mut pool = self.string_pool.write();
        if let Some(existing) = pool.get(name) {
            return existing.clone();
        }
        let obj = PyObject::new(PyStr::new_raw(name.to_owned()), self.types.str_type.clone().into_object(), None);
        pool.insert(name.to_owned(), obj.clone());
        obj
    }
}

fn bool_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let truthy = obj.downcast_ref::<PyInt>().expect("bool reuses PyInt's payload").value() != 0;
    Ok(vm.new_str(if truthy { "True".to_owned() } else { "False".to_owned() }))
}

/// The virtual machine: the bootstrapped [`Context`] plus the knobs a
/// host embedding this runtime can set (§5 "Runtime").
pub struct VirtualMachine {
    pub ctx: Context,
    pub options: RuntimeOptions,
}

thread_local! {
    /// The repr-recursion guard (§4.4's per-frame `reprEnter`/`reprLeave`
    /// simplified to a single thread-wide stack): slot functions only
    /// see a `&VirtualMachine`, not a live frame, so the guard lives
    /// here instead. See DESIGN.md for the tradeoff.
    static REPR_GUARD: RefCell<Vec<usize>> = RefCell::new(Vec::new());
}

impl VirtualMachine {
    pub fn new(options: RuntimeOptions) -> Self {
        VirtualMachine { ctx: Context::new(), options }
    }

    // --- construction helpers ---------------------------------------

    pub fn new_str(&self, value: String) -> PyObjectRef {
        str::new_str(value, self)
    }

    pub fn new_unicode(&self, value: String) -> PyObjectRef {
        str::new_unicode(value, self)
    }

    pub fn new_bool(&self, value: bool) -> PyObjectRef {
        if value { self.ctx.true_value.clone() } else { self.ctx.false_value.clone() }
    }

    pub fn new_int(&self, value: i64) -> PyObjectRef {
        int::new_int(value, self)
    }

    pub fn new_float(&self, value: f64) -> PyObjectRef {
        float::new_float(value, self)
    }

    pub fn new_complex(&self, value: Complex64) -> PyObjectRef {
        complex::new_complex(value, self)
    }

    pub fn new_list(&self, elements: Vec<PyObjectRef>) -> PyObjectRef {
        PyList::new_ref(elements, self).into_object()
    }

    pub fn new_tuple(&self, elements: Vec<PyObjectRef>) -> PyObjectRef {
        PyTuple::new_ref(elements, self).into_object()
    }

    pub fn none(&self) -> PyObjectRef {
        self.ctx.none.clone()
    }

    pub fn not_implemented(&self) -> PyObjectRef {
        self.ctx.not_implemented.clone()
    }

    pub fn is_not_implemented(&self, obj: &PyObjectRef) -> bool {
        obj.payload_is::<PyNotImplemented>()
    }

    pub fn is_none(&self, obj: &PyObjectRef) -> bool {
        obj.payload_is::<PyNone>()
    }

    /// `vm.invoke(callable, args)` (§6 "Callable protocol"): a
    /// positional-only convenience used by descriptor/property plumbing,
    /// which never needs to thread keyword arguments through.
    pub fn invoke(&self, callable: &PyObjectRef, args: Vec<PyObjectRef>) -> PyResult {
        crate::protocol::callable::call(callable, crate::function::FuncArgs::new(args, indexmap::IndexMap::new()), self)
    }

    // --- error construction (§4.3) -----------------------------------

    pub fn new_type_error(&self, msg: String) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.type_error_type, msg, self)
    }

    pub fn new_attribute_error(&self, msg: String) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.attribute_error_type, msg, self)
    }

    pub fn new_value_error(&self, msg: String) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.value_error_type, msg, self)
    }

    pub fn new_index_error(&self, msg: String) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.index_error_type, msg, self)
    }

    pub fn new_runtime_error(&self, msg: String) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.runtime_error_type, msg, self)
    }

    pub fn new_overflow_error(&self, msg: String) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.overflow_error_type, msg, self)
    }

    pub fn new_zero_division_error(&self, msg: String) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.zero_division_error_type, msg, self)
    }

    pub fn new_name_error(&self, msg: String) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.name_error_type, msg, self)
    }

    pub fn new_stop_iteration(&self) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.stop_iteration_type, String::new(), self)
    }

    pub fn new_generator_exit(&self) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.generator_exit_type, String::new(), self)
    }

    pub fn new_import_error(&self, msg: String) -> PyObjectRef {
        crate::exceptions::new_exception(&self.ctx.exceptions.import_error_type, msg, self)
    }

    pub fn new_key_error(&self, key: PyObjectRef) -> PyObjectRef {
        crate::exceptions::new_exception_with_arg(&self.ctx.exceptions.key_error_type, key, self)
    }

    // --- conversion helpers -------------------------------------------

    /// `repr(obj)` (§4.1): calls the `repr` slot, falling back to the
    /// default `<ClassName object at 0xID>` form object/type never
    /// needs to set a slot for.
    pub fn repr_of(&self, obj: &PyObjectRef) -> PyResult<String> {
        let repr_slot = obj.class().slots.read().repr;
        let result = match repr_slot {
            Some(f) => f(obj, self)?,
            None => self.new_str(format!("<{} object at {:#x}>", obj.class().name, obj.get_id())),
        };
        let s = result
            .downcast_ref::<PyStr>()
            .ok_or_else(|| self.new_type_error("__repr__ returned non-string".to_owned()))?;
        Ok(s.as_str().to_owned())
    }

    /// `str(obj)` (§4.1): the `str` slot if set, else falls back to `repr`.
    pub fn str_of(&self, obj: &PyObjectRef) -> PyResult<String> {
        let str_slot = obj.class().slots.read().str;
        match str_slot {
            Some(f) => {
                let result = f(obj, self)?;
                let s = result
                    .downcast_ref::<PyStr>()
                    .ok_or_else(|| self.new_type_error("__str__ returned non-string".to_owned()))?;
                Ok(s.as_str().to_owned())
            }
            None => self.repr_of(obj),
        }
    }

    /// Truth-value testing (§4.1): `bool` slot, else `len() != 0`, else
    /// every object is true.
    pub fn bool_truth(&self, obj: &PyObjectRef) -> PyResult<bool> {
        let ty = obj.class();
        let bool_slot = ty.slots.read().bool;
        if let Some(f) = bool_slot {
            return f(obj, self);
        }
        let len_slot = ty.slots.read().mapping.len;
        if let Some(f) = len_slot {
            return Ok(f(obj, self)? != 0);
        }
        Ok(true)
    }

    /// `operator.index(obj)` (§4.8): accepts `int`/`long`/`bool` and
    /// anything with a `number.index` slot, for use as a sequence
    /// subscript or slice bound.
    pub fn to_index(&self, obj: &PyObjectRef) -> PyResult<isize> {
        if let Some(i) = obj.downcast_ref::<PyInt>() {
            return Ok(i.value() as isize);
        }
        if let Some(l) = obj.downcast_ref::<PyLong>() {
            return l
                .value()
                .to_isize()
                .ok_or_else(|| self.new_overflow_error("long int too large to convert".to_owned()));
        }
        let index_slot = obj.class().slots.read().number.index;
        match index_slot {
            Some(f) => {
                let result = f(obj, self)?;
                self.to_index(&result)
            }
            None => Err(self.new_type_error(format!(
                "'{}' object cannot be interpreted as an index",
                obj.class().name
            ))),
        }
    }

    /// Drains an iterable into a `Vec`, for the handful of builtin
    /// constructors (`list(x)`, `tuple(x)`, `set(x)`) that need every
    /// element up front. Prefers a real `__iter__`/`next` pair; falls
    /// back to the sequence protocol (`len`+`getitem`) for containers
    /// that don't define an iterator type of their own yet.
    pub fn iterate_to_vec(&self, obj: &PyObjectRef) -> PyResult<Vec<PyObjectRef>> {
        let ty = obj.class();
        let iter_slot = ty.slots.read().iter;
        if let Some(f) = iter_slot {
            let iterator = f(obj, self)?;
            return self.drain_iterator(&iterator);
        }
        let (len_slot, getitem_slot) = {
            let slots = ty.slots.read();
            (slots.mapping.len, slots.mapping.getitem)
        };
        if let (Some(len_fn), Some(getitem_fn)) = (len_slot, getitem_slot) {
            let n = len_fn(obj, self)?;
            let mut out = Vec::with_capacity(n);
            for i in 0..n {
                let idx = self.new_int(i as i64);
                out.push(getitem_fn(obj, &idx, self)?);
            }
            return Ok(out);
        }
        if ty.slots.read().next.is_some() {
            return self.drain_iterator(obj);
        }
        Err(self.new_type_error(format!("'{}' object is not iterable", ty.name)))
    }

    fn drain_iterator(&self, iterator: &PyObjectRef) -> PyResult<Vec<PyObjectRef>> {
        let next_slot = iterator
            .class()
            .slots
            .read()
            .next
            .ok_or_else(|| self.new_type_error(format!("'{}' object is not an iterator", iterator.class().name)))?;
        let mut out = Vec::new();
        loop {
            match next_slot(iterator, self) {
                Ok(v) => out.push(v),
                Err(e) => {
                    if isinstance(&e, &TypeOrTuple::Type(self.ctx.exceptions.stop_iteration_type.clone())) {
                        break;
                    }
                    return Err(e);
                }
            }
        }
        Ok(out)
    }

    // --- repr-recursion guard (§4.4, simplified to thread scope) -----

    pub fn frame_repr_enter(&self, obj: &PyObjectRef) -> bool {
        let id = obj.get_id();
        REPR_GUARD.with(|g| {
            let mut g = g.borrow_mut();
            if g.contains(&id) {
                true
            } else {
                g.push(id);
                false
            }
        })
    }

    pub fn frame_repr_leave(&self, obj: &PyObjectRef) {
        let id = obj.get_id();
        REPR_GUARD.with(|g| {
            let mut g = g.borrow_mut();
            if let Some(pos) = g.iter().rposition(|&x| x == id) {
                g.remove(pos);
            }
        });
    }
}

impl Default for VirtualMachine {
    fn default() -> Self {
        VirtualMachine::new(RuntimeOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_produces_a_consistent_metaclass_cycle() {
        let vm = VirtualMachine::default();
        assert_eq!(
            vm.ctx.types.type_type.as_object().class().get_id(),
            vm.ctx.types.type_type.get_id(),
        );
        assert_eq!(
            vm.ctx.types.object_type.as_object().class().get_id(),
            vm.ctx.types.type_type.get_id(),
        );
    }

    #[test]
    fn bool_is_a_subtype_of_int() {
        let vm = VirtualMachine::default();
        assert!(vm.ctx.types.bool_type.is_subtype(&vm.ctx.types.int_type));
    }

    #[test]
    fn true_and_false_hash_like_one_and_zero() {
        let vm = VirtualMachine::default();
        let h_true = crate::protocol::number::hash_object(&vm.ctx.true_value, &vm).unwrap();
        let h_one = crate::protocol::number::hash_object(&vm.new_int(1), &vm).unwrap();
        assert_eq!(h_true, h_one);
    }

    #[test]
    fn interned_strings_are_identical_objects() {
        let vm = VirtualMachine::default();
        let a = vm.ctx.intern_str("foo");
        let b = vm.ctx.intern_str("foo");
        assert_eq!(a.get_id(), b.get_id());
    }
}
