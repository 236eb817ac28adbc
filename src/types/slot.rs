//! C2: the slot table. Each type carries an explicit struct of optional
//! function pointers — one per abstract operation from §4.2 — rather
//! than relying on trait-object dispatch. This is what lets types be
//! constructed dynamically at runtime (§9 "Slot tables as duck typing")
//! and is grounded in `types/slot.rs` of the teacher, trimmed to the
//! operations §4.2 actually names.

use crate::function::FuncArgs;
use crate::object::{PyObjectRef, PyRef};
use crate::types::pytype::PyType;
use crate::vm::{PyResult, VirtualMachine};

pub type UnarySlot = fn(&PyObjectRef, &VirtualMachine) -> PyResult;
pub type LenSlot = fn(&PyObjectRef, &VirtualMachine) -> PyResult<usize>;
pub type BoolSlot = fn(&PyObjectRef, &VirtualMachine) -> PyResult<bool>;
pub type HashSlot = fn(&PyObjectRef, &VirtualMachine) -> PyResult<i64>;
pub type BinarySlot = fn(&PyObjectRef, &PyObjectRef, &VirtualMachine) -> PyResult;
pub type CmpSlot = fn(&PyObjectRef, &PyObjectRef, &VirtualMachine) -> PyResult<Option<std::cmp::Ordering>>;
pub type SetItemSlot = fn(&PyObjectRef, &PyObjectRef, &PyObjectRef, &VirtualMachine) -> PyResult<()>;
pub type CallSlot = fn(&PyObjectRef, FuncArgs, &VirtualMachine) -> PyResult;
pub type NewSlot = fn(PyRef<PyType>, FuncArgs, &VirtualMachine) -> PyResult;
pub type InitSlot = fn(&PyObjectRef, FuncArgs, &VirtualMachine) -> PyResult<()>;
/// `(instance, owner_type) -> value`; `instance` is `None` for class-level access.
pub type GetSlot = fn(&PyObjectRef, Option<PyObjectRef>, Option<PyObjectRef>, &VirtualMachine) -> PyResult;
pub type SetSlot = fn(&PyObjectRef, PyObjectRef, PyObjectRef, &VirtualMachine) -> PyResult<()>;
pub type DeleteSlot = fn(&PyObjectRef, PyObjectRef, &VirtualMachine) -> PyResult<()>;
pub type SetAttrSlot = fn(&PyObjectRef, &str, Option<PyObjectRef>, &VirtualMachine) -> PyResult<()>;
pub type GetAttributeSlot = fn(&PyObjectRef, &str, &VirtualMachine) -> PyResult;

/// One slot per binary/reflected/in-place arithmetic & bitwise operator
/// named in §4.2 "Binary". Stored three times over (forward, reflected,
/// in-place) because each is independently overridable.
#[derive(Default, Clone)]
pub struct NumberSlots {
    pub add: Option<BinarySlot>,
    pub radd: Option<BinarySlot>,
    pub iadd: Option<BinarySlot>,
    pub sub: Option<BinarySlot>,
    pub rsub: Option<BinarySlot>,
    pub isub: Option<BinarySlot>,
    pub mul: Option<BinarySlot>,
    pub rmul: Option<BinarySlot>,
    pub imul: Option<BinarySlot>,
    pub div: Option<BinarySlot>,
    pub rdiv: Option<BinarySlot>,
    pub idiv: Option<BinarySlot>,
    pub floordiv: Option<BinarySlot>,
    pub rfloordiv: Option<BinarySlot>,
    pub ifloordiv: Option<BinarySlot>,
    pub modulo: Option<BinarySlot>,
    pub rmodulo: Option<BinarySlot>,
    pub imodulo: Option<BinarySlot>,
    pub divmod: Option<BinarySlot>,
    pub rdivmod: Option<BinarySlot>,
    pub pow: Option<BinarySlot>,
    pub rpow: Option<BinarySlot>,
    pub ipow: Option<BinarySlot>,
    pub lshift: Option<BinarySlot>,
    pub rlshift: Option<BinarySlot>,
    pub ilshift: Option<BinarySlot>,
    pub rshift: Option<BinarySlot>,
    pub rrshift: Option<BinarySlot>,
    pub irshift: Option<BinarySlot>,
    pub and: Option<BinarySlot>,
    pub rand: Option<BinarySlot>,
    pub iand: Option<BinarySlot>,
    pub or: Option<BinarySlot>,
    pub ror: Option<BinarySlot>,
    pub ior: Option<BinarySlot>,
    pub xor: Option<BinarySlot>,
    pub rxor: Option<BinarySlot>,
    pub ixor: Option<BinarySlot>,
    pub neg: Option<UnarySlot>,
    pub pos: Option<UnarySlot>,
    pub invert: Option<UnarySlot>,
    pub abs: Option<UnarySlot>,
    pub int: Option<UnarySlot>,
    pub long: Option<UnarySlot>,
    pub float: Option<UnarySlot>,
    pub complex: Option<UnarySlot>,
    pub index: Option<UnarySlot>,
    pub hex: Option<UnarySlot>,
    pub oct: Option<UnarySlot>,
}

/// The six rich-comparison operators plus the legacy 3-way `cmp`.
#[derive(Default, Clone)]
pub struct CompareSlots {
    pub lt: Option<BinarySlot>,
    pub le: Option<BinarySlot>,
    pub eq: Option<BinarySlot>,
    pub ne: Option<BinarySlot>,
    pub ge: Option<BinarySlot>,
    pub gt: Option<BinarySlot>,
    pub cmp: Option<CmpSlot>,
}

#[derive(Default, Clone)]
pub struct MappingSlots {
    pub len: Option<LenSlot>,
    pub contains: Option<BinarySlot>,
    pub getitem: Option<BinarySlot>,
    pub setitem: Option<SetItemSlot>,
}

#[derive(Default, Clone)]
pub struct PyTypeSlots {
    // unary
    pub repr: Option<UnarySlot>,
    pub str: Option<UnarySlot>,
    pub hash: Option<HashSlot>,
    pub iter: Option<UnarySlot>,
    pub next: Option<UnarySlot>,
    pub bool: Option<BoolSlot>,
    // binary/ternary number & mapping protocols
    pub number: NumberSlots,
    pub compare: CompareSlots,
    pub mapping: MappingSlots,
    pub call: Option<CallSlot>,
    // meta
    pub new: Option<NewSlot>,
    pub init: Option<InitSlot>,
    pub get_attribute: Option<GetAttributeSlot>,
    pub set_attr: Option<SetAttrSlot>,
    pub get: Option<GetSlot>,
    pub set: Option<SetSlot>,
    pub delete: Option<DeleteSlot>,
    /// §4.12: unwrap this instance into the host-native value, if any.
    pub native: Option<UnarySlot>,
}

impl PyTypeSlots {
    /// Fill every `None` slot in `self` from `base`, the way type
    /// readiness inherits slots from the first base in MRO that defines
    /// them (§4.2 "Slot inheritance", invariant (i) in §3).
    pub fn inherit_from(&mut self, base: &PyTypeSlots) {
        macro_rules! fill {
            ($($field:ident),* $(,)?) => {
                $( if self.$field.is_none() { self.$field = base.$field; } )*
            };
        }
        fill!(repr, str, hash, iter, next, bool, call, new, init, get_attribute, set_attr, get, set, delete, native);

        macro_rules! fill_nested {
            ($group:ident, $($field:ident),* $(,)?) => {
                $( if self.$group.$field.is_none() { self.$group.$field = base.$group.$field; } )*
            };
        }
        fill_nested!(number, add, radd, iadd, sub, rsub, isub, mul, rmul, imul, div, rdiv, idiv,
            floordiv, rfloordiv, ifloordiv, modulo, rmodulo, imodulo, divmod, rdivmod, pow, rpow, ipow,
            lshift, rlshift, ilshift, rshift, rrshift, irshift, and, rand, iand, or, ror, ior, xor, rxor, ixor,
            neg, pos, invert, abs, int, long, float, complex, index, hex, oct);
        fill_nested!(compare, lt, le, eq, ne, ge, gt, cmp);
        fill_nested!(mapping, len, contains, getitem, setitem);
    }
}
