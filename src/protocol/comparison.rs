//! C2 §4.2 "Rich comparison": the six comparison operators, the
//! subclass-prefers-reflected rule restated for swapped operators, and
//! the 3-way-compare / default-order fallback chain.

use std::cmp::Ordering;

use crate::builtins::singletons::PyNone;
use crate::object::PyObjectRef;
use crate::types::slot::{BinarySlot, CompareSlots};
use crate::vm::{PyResult, VirtualMachine};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl CompareOp {
    /// `swap(Lt)=Gt, swap(Le)=Ge, Eq<->Eq, Ne<->Ne` (§4.2).
    pub fn swapped(self) -> Self {
        use CompareOp::*;
        match self {
            Lt => Gt,
            Gt => Lt,
            Le => Ge,
            Ge => Le,
            Eq => Eq,
            Ne => Ne,
        }
    }

    pub fn symbol(self) -> &'static str {
        use CompareOp::*;
        match self {
            Lt => "<",
            Le => "<=",
            Eq => "==",
            Ne => "!=",
            Ge => ">=",
            Gt => ">",
        }
    }

    fn slot(self, s: &CompareSlots) -> Option<BinarySlot> {
        use CompareOp::*;
        match self {
            Lt => s.lt,
            Le => s.le,
            Eq => s.eq,
            Ne => s.ne,
            Ge => s.ge,
            Gt => s.gt,
        }
    }
}

fn ptr_ne(a: Option<BinarySlot>, b: Option<BinarySlot>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => (x as usize) != (y as usize),
        (None, None) => false,
        _ => true,
    }
}

fn try_rich_compare(
    v: &PyObjectRef,
    w: &PyObjectRef,
    op: CompareOp,
    vm: &VirtualMachine,
) -> PyResult<Option<PyObjectRef>> {
    let v_type = v.class();
    let w_type = w.class();
    let same = v_type.get_id() == w_type.get_id();
    let w_is_subclass = !same && w_type.is_subtype(&v_type);
    let rop = op.swapped();

    let w_overrides = w_is_subclass && {
        let vf = rop.slot(&v_type.slots.read().compare);
        let wf = rop.slot(&w_type.slots.read().compare);
        ptr_ne(vf, wf)
    };

    let do_v = |vm: &VirtualMachine| op.slot(&v_type.slots.read().compare).map(|f| f(v, w, vm));
    let do_w = |vm: &VirtualMachine| rop.slot(&w_type.slots.read().compare).map(|f| f(w, v, vm));

    if w_overrides {
        if let Some(r) = do_w(vm) {
            let r = r?;
            if !vm.is_not_implemented(&r) {
                return Ok(Some(r));
            }
        }
    }
    if let Some(r) = do_v(vm) {
        let r = r?;
        if !vm.is_not_implemented(&r) {
            return Ok(Some(r));
        }
    }
    if !w_overrides {
        if let Some(r) = do_w(vm) {
            let r = r?;
            if !vm.is_not_implemented(&r) {
                return Ok(Some(r));
            }
        }
    }
    Ok(None)
}

fn try_three_way(v: &PyObjectRef, w: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Option<i32>> {
    let v_cmp = v.class().slots.read().compare.cmp;
    if let Some(f) = v_cmp {
        if let Some(ord) = f(v, w, vm)? {
            return Ok(Some(order_to_sign(ord)));
        }
    }
    let w_cmp = w.class().slots.read().compare.cmp;
    if let Some(f) = w_cmp {
        if let Some(ord) = f(w, v, vm)? {
            return Ok(Some(-order_to_sign(ord)));
        }
    }
    Ok(None)
}

fn order_to_sign(ord: Ordering) -> i32 {
    match ord {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// §9 "default 3-way order": `None` orders below everything non-`None`;
/// distinct types order by type name; same type orders by payload
/// pointer identity.
fn default_order(v: &PyObjectRef, w: &PyObjectRef) -> i32 {
    let v_none = v.payload_is::<PyNone>();
    let w_none = w.payload_is::<PyNone>();
    match (v_none, w_none) {
        (true, true) => 0,
        (true, false) => -1,
        (false, true) => 1,
        (false, false) => {
            let vt = &v.class().name;
            let wt = &w.class().name;
            if vt != wt {
                match vt.as_str().cmp(wt.as_str()) {
                    Ordering::Less => -1,
                    Ordering::Equal => 0,
                    Ordering::Greater => 1,
                }
            } else {
                (v.get_id() as i128 - w.get_id() as i128).signum() as i32
            }
        }
    }
}

fn apply_sign(op: CompareOp, c: i32) -> bool {
    use CompareOp::*;
    match op {
        Lt => c < 0,
        Le => c <= 0,
        Eq => c == 0,
        Ne => c != 0,
        Ge => c >= 0,
        Gt => c > 0,
    }
}

/// `v op w` for one of the six rich-comparison operators, following the
/// full fallback chain of §4.2.
pub fn rich_compare(v: &PyObjectRef, w: &PyObjectRef, op: CompareOp, vm: &VirtualMachine) -> PyResult {
    if let Some(result) = try_rich_compare(v, w, op, vm)? {
        return Ok(result);
    }
    let sign = match try_three_way(v, w, vm)? {
        Some(s) => s,
        None => default_order(v, w),
    };
    Ok(vm.new_bool(apply_sign(op, sign)))
}

/// Used by the dict's key-equality path (§4.5): identity short-circuit
/// then `Eq`.
pub fn objects_equal(v: &PyObjectRef, w: &PyObjectRef, vm: &VirtualMachine) -> PyResult<bool> {
    if v.is(w) {
        return Ok(true);
    }
    let r = rich_compare(v, w, CompareOp::Eq, vm)?;
    vm.bool_truth(&r)
}
