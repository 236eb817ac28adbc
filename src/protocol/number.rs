//! C2 §4.2 "Binary": the forward/reflected/in-place operator dispatch
//! algorithm, applied uniformly to every arithmetic and bitwise slot.
//!
//! Grounded in `protocol/number.rs` of the teacher for the protocol
//! shape; the subclass-prefers-reflected rule follows spec §4.2 exactly
//! (it is the same rule CPython's `binary_op1` implements).

use crate::object::PyObjectRef;
use crate::types::slot::{BinarySlot, NumberSlots, UnarySlot};
use crate::vm::{PyResult, VirtualMachine};

fn ptr_ne(a: Option<BinarySlot>, b: Option<BinarySlot>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => (x as usize) != (y as usize),
        (None, None) => false,
        _ => true,
    }
}

/// The shared core of every binary operator: §4.2 steps 1-4.
pub fn binary_dispatch(
    v: &PyObjectRef,
    w: &PyObjectRef,
    op_symbol: &str,
    forward: impl Fn(&NumberSlots) -> Option<BinarySlot>,
    reflected: impl Fn(&NumberSlots) -> Option<BinarySlot>,
    vm: &VirtualMachine,
) -> PyResult {
    let v_type = v.class();
    let w_type = w.class();
    let same_type = v_type.get_id() == w_type.get_id();
    let w_is_subclass = !same_type && w_type.is_subtype(&v_type);

    let w_overrides_reflected = w_is_subclass && {
        let vf = reflected(&v_type.slots.read().number);
        let wf = reflected(&w_type.slots.read().number);
        ptr_ne(vf, wf)
    };

    let try_forward = |vm: &VirtualMachine| -> Option<PyResult> {
        forward(&v_type.slots.read().number).map(|f| f(v, w, vm))
    };
    let try_reflected = |vm: &VirtualMachine| -> Option<PyResult> {
        reflected(&w_type.slots.read().number).map(|f| f(w, v, vm))
    };

    if w_overrides_reflected {
        if let Some(r) = try_reflected(vm) {
            let r = r?;
            if !vm.is_not_implemented(&r) {
                return Ok(r);
            }
        }
    }
    if let Some(r) = try_forward(vm) {
        let r = r?;
        if !vm.is_not_implemented(&r) {
            return Ok(r);
        }
    }
    if !w_overrides_reflected {
        if let Some(r) = try_reflected(vm) {
            let r = r?;
            if !vm.is_not_implemented(&r) {
                return Ok(r);
            }
        }
    }

    Err(vm.new_type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op_symbol, v_type.name, w_type.name
    )))
}

macro_rules! binop {
    ($name:ident, $sym:literal, $fwd:ident, $rfl:ident) => {
        pub fn $name(v: &PyObjectRef, w: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
            binary_dispatch(v, w, $sym, |s| s.$fwd, |s| s.$rfl, vm)
        }
    };
}

binop!(add, "+", add, radd);
binop!(sub, "-", sub, rsub);
binop!(mul, "*", mul, rmul);
binop!(div, "/", div, rdiv);
binop!(floordiv, "//", floordiv, rfloordiv);
binop!(modulo, "%", modulo, rmodulo);
binop!(divmod, "divmod()", divmod, rdivmod);
binop!(pow, "** or pow()", pow, rpow);
binop!(lshift, "<<", lshift, rlshift);
binop!(rshift, ">>", rshift, rrshift);
binop!(and, "&", and, rand);
binop!(or, "|", or, ror);
binop!(xor, "^", xor, rxor);

/// §4.2 "In-place ops": prefer `I<op>` on `v`, else compute out-of-place
/// and let the caller re-bind the name to the new object.
fn inplace_dispatch(
    v: &PyObjectRef,
    w: &PyObjectRef,
    iop: impl Fn(&NumberSlots) -> Option<BinarySlot>,
    fallback: impl Fn(&PyObjectRef, &PyObjectRef, &VirtualMachine) -> PyResult,
    vm: &VirtualMachine,
) -> PyResult {
    let slot = iop(&v.class().slots.read().number);
    if let Some(f) = slot {
        let r = f(v, w, vm)?;
        if !vm.is_not_implemented(&r) {
            return Ok(r);
        }
    }
    fallback(v, w, vm)
}

macro_rules! inplace_op {
    ($name:ident, $iop:ident, $fallback:ident) => {
        pub fn $name(v: &PyObjectRef, w: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
            inplace_dispatch(v, w, |s| s.$iop, $fallback, vm)
        }
    };
}

inplace_op!(iadd, iadd, add);
inplace_op!(isub, isub, sub);
inplace_op!(imul, imul, mul);
inplace_op!(idiv, idiv, div);
inplace_op!(ifloordiv, ifloordiv, floordiv);
inplace_op!(imodulo, imodulo, modulo);
inplace_op!(ipow, ipow, pow);
inplace_op!(ilshift, ilshift, lshift);
inplace_op!(irshift, irshift, rshift);
inplace_op!(iand, iand, and);
inplace_op!(ior, ior, or);
inplace_op!(ixor, ixor, xor);

fn unary_dispatch(v: &PyObjectRef, op_symbol: &str, slot: impl Fn(&NumberSlots) -> Option<UnarySlot>, vm: &VirtualMachine) -> PyResult {
    let ty = v.class();
    match slot(&ty.slots.read().number) {
        Some(f) => f(v, vm),
        None => Err(vm.new_type_error(format!(
            "bad operand type for {}: '{}'",
            op_symbol, ty.name
        ))),
    }
}

pub fn neg(v: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    unary_dispatch(v, "unary -", |s| s.neg, vm)
}
pub fn pos(v: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    unary_dispatch(v, "unary +", |s| s.pos, vm)
}
pub fn invert(v: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    unary_dispatch(v, "unary ~", |s| s.invert, vm)
}
pub fn abs(v: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    unary_dispatch(v, "abs()", |s| s.abs, vm)
}
pub fn hex(v: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    unary_dispatch(v, "hex()", |s| s.hex, vm)
}
pub fn oct(v: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    unary_dispatch(v, "oct()", |s| s.oct, vm)
}
pub fn to_int(v: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    unary_dispatch(v, "int()", |s| s.int, vm)
}
pub fn to_long(v: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    unary_dispatch(v, "long()", |s| s.long, vm)
}
pub fn to_float(v: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    unary_dispatch(v, "float()", |s| s.float, vm)
}

/// §3 invariant (iv): a type without a hash slot raises `TypeError` on
/// hashing.
pub fn hash_object(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<i64> {
    let hash_slot = obj.class().slots.read().hash;
    match hash_slot {
        Some(f) => f(obj, vm),
        None => Err(vm.new_type_error(format!("unhashable type: '{}'", obj.class().name))),
    }
}

#[cfg(test)]
mod tests {
    // Exercised end-to-end in tests/dispatch.rs (needs bootstrapped
    // builtin int/float types to be meaningful).
}
