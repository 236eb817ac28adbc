//! C8 §4.8: the machine-word `int`. Distinct from [`super::long::PyLong`]
//! per spec — arithmetic that would overflow `i64` promotes to `long`
//! rather than wrapping or panicking. `bool` reuses this payload
//! directly (§3 basis reuse): `True`/`False` are `PyInt` instances
//! classed under a separate, non-instantiable `bool` type.

use num_bigint::BigInt;

use crate::builtins::long::PyLong;
use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::protocol::comparison::CompareOp;
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug, Clone, Copy)]
pub struct PyInt {
    value: i64,
}

impl_payload!(PyInt, "int");

pub type PyIntRef = PyRef<PyInt>;

impl PyInt {
    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn new_ref(value: i64, vm: &VirtualMachine) -> PyIntRef {
        PyRef::new_unchecked(new_int(value, vm))
    }
}

pub fn new_int(value: i64, vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(PyInt { value }, vm.ctx.types.int_type.clone().into_object(), None)
}

/// `bool` singletons reuse `PyInt`'s payload, classed under `bool_type`
/// (a non-instantiable subclass of `int_type` in the MRO). This is the
/// only place a `PyInt` is ever constructed with a type other than
/// `int_type` itself.
pub fn new_bool(value: bool, vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(
        PyInt { value: value as i64 },
        vm.ctx.types.bool_type.clone().into_object(),
        None,
    )
}

/// Bare payload constructor, used only by `vm::Context::new` to build the
/// two `bool` singletons before a `VirtualMachine` exists to hand to
/// [`new_bool`].
pub(crate) fn bare(value: i64) -> PyInt {
    PyInt { value }
}

/// CPython's int hash: the value reduced mod `2^31 - 1`, with the
/// reserved sentinel `-1` remapped to `-2` (§4.8 "hash ... matches
/// CPython's algorithm for ints, bools and exact-integer floats").
pub fn hash_i64(value: i64) -> i64 {
    const MODULUS: i64 = (1i64 << 31) - 1;
    let mut h = value % MODULUS;
    if h == -1 {
        h = -2;
    }
    h
}

pub fn int_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_str(obj.downcast_ref::<PyInt>().unwrap().value.to_string()))
}

pub fn int_hash(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<i64> {
    Ok(hash_i64(obj.downcast_ref::<PyInt>().unwrap().value))
}

pub fn int_bool(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<bool> {
    Ok(obj.downcast_ref::<PyInt>().unwrap().value != 0)
}

fn as_i64(obj: &PyObjectRef) -> Option<i64> {
    obj.downcast_ref::<PyInt>().map(|i| i.value)
}

/// Runs a checked `i64` op; on overflow, retries the same op over
/// `BigInt` and returns a `long` instead (§4.8 overflow-promotion).
fn promote_on_overflow(
    a: i64,
    b: i64,
    checked: impl FnOnce(i64, i64) -> Option<i64>,
    wide: impl FnOnce(&BigInt, &BigInt) -> BigInt,
    vm: &VirtualMachine,
) -> PyObjectRef {
    match checked(a, b) {
        Some(v) => new_int(v, vm),
        None => {
            let result = wide(&BigInt::from(a), &BigInt::from(b));
            PyLong::new_obj(result, vm)
        }
    }
}

pub fn int_add(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => Ok(promote_on_overflow(a, b, i64::checked_add, |x, y| x + y, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn int_sub(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => Ok(promote_on_overflow(a, b, i64::checked_sub, |x, y| x - y, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn int_mul(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => Ok(promote_on_overflow(a, b, i64::checked_mul, |x, y| x * y, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn int_neg(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match a.checked_neg() {
        Some(v) => Ok(new_int(v, vm)),
        None => Ok(PyLong::new_obj(-BigInt::from(a), vm)),
    }
}

pub fn int_abs(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match a.checked_abs() {
        Some(v) => Ok(new_int(v, vm)),
        None => Ok(PyLong::new_obj(BigInt::from(a).magnitude().clone().into(), vm)),
    }
}

/// Python's floor-division/modulo sign convention: the remainder takes
/// the sign of the divisor (§4.8 "divmod ... follows the floor-division
/// sign convention").
pub fn int_divmod(a: i64, b: i64, vm: &VirtualMachine) -> PyResult<(i64, i64)> {
    if b == 0 {
        return Err(vm.new_zero_division_error("integer division or modulo by zero".to_owned()));
    }
    let mut q = a / b;
    let mut r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        q -= 1;
        r += b;
    }
    Ok((q, r))
}

pub fn int_floordiv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => int_divmod(a, b, vm).map(|(q, _)| new_int(q, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn int_mod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => int_divmod(a, b, vm).map(|(_, r)| new_int(r, vm)),
        None => Ok(vm.not_implemented()),
    }
}

/// Reflected forms of the non-commutative ops: `w.__rop__(v)` computes
/// `v op w`, i.e. the forward op with the operands swapped back (§4.2).
pub fn int_rsub(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    int_sub(other, obj, vm)
}

pub fn int_rfloordiv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    int_floordiv(other, obj, vm)
}

pub fn int_rmod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    int_mod(other, obj, vm)
}

pub fn int_lshift(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    let b = match as_i64(other) {
        Some(b) => b,
        None => return Ok(vm.not_implemented()),
    };
    if b < 0 {
        return Err(vm.new_value_error("negative shift count".to_owned()));
    }
    if b >= i64::BITS as i64 || a.checked_shl(b as u32).map_or(true, |v| (v >> b) != a) {
        return Ok(PyLong::new_obj(BigInt::from(a) << (b as u64), vm));
    }
    Ok(new_int(a << b, vm))
}

pub fn int_rshift(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    let b = match as_i64(other) {
        Some(b) => b,
        None => return Ok(vm.not_implemented()),
    };
    if b < 0 {
        return Err(vm.new_value_error("negative shift count".to_owned()));
    }
    Ok(new_int(if b >= i64::BITS as i64 { if a < 0 { -1 } else { 0 } } else { a >> b }, vm))
}

/// Bitwise ops never overflow `i64` (the result is always no wider than
/// its widest operand), so unlike the arithmetic ops above there is no
/// promotion path to `long` here (§4.8).
pub fn int_and(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => Ok(new_int(a & b, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn int_or(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => Ok(new_int(a | b, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn int_xor(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => Ok(new_int(a ^ b, vm)),
        None => Ok(vm.not_implemented()),
    }
}

/// `~a == -(a + 1)`; Rust's bitwise-not on a two's-complement `i64`
/// computes exactly this with no overflow case to guard.
pub fn int_invert(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(new_int(!as_i64(obj).unwrap(), vm))
}

/// `v.divmod(w)` as a binary slot: pairs [`int_divmod`]'s floor-division
/// result up into the `(quotient, remainder)` tuple §4.2's `DivMod` slot
/// returns.
pub fn int_divmod_obj(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => int_divmod(a, b, vm).map(|(q, r)| vm.new_tuple(vec![new_int(q, vm), new_int(r, vm)])),
        None => Ok(vm.not_implemented()),
    }
}

pub fn int_rdivmod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    int_divmod_obj(other, obj, vm)
}

/// Negative exponents produce a `float` in Python 2 (`2 ** -1 == 0.5`);
/// non-negative ones follow the same overflow-promotion-to-`long`
/// pattern as `int_add`/`int_mul` (§4.8).
pub fn int_pow(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    let b = match as_i64(other) {
        Some(b) => b,
        None => return Ok(vm.not_implemented()),
    };
    if b < 0 {
        if a == 0 {
            return Err(vm.new_zero_division_error("0.0 cannot be raised to a negative power".to_owned()));
        }
        return Ok(crate::builtins::float::new_float((a as f64).powi(b as i32), vm));
    }
    let exp = match u32::try_from(b) {
        Ok(e) => e,
        Err(_) => return Err(vm.new_overflow_error("exponent too large".to_owned())),
    };
    match a.checked_pow(exp) {
        Some(v) => Ok(new_int(v, vm)),
        None => Ok(PyLong::new_obj(BigInt::from(a).pow(exp), vm)),
    }
}

fn int_richcompare(obj: &PyObjectRef, other: &PyObjectRef, op: CompareOp, vm: &VirtualMachine) -> PyResult {
    let a = as_i64(obj).unwrap();
    match as_i64(other) {
        Some(b) => {
            let result = match op {
                CompareOp::Eq => a == b,
                CompareOp::Ne => a != b,
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                CompareOp::Gt => a > b,
                CompareOp::Ge => a >= b,
            };
            Ok(vm.new_bool(result))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn int_eq(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    int_richcompare(obj, other, CompareOp::Eq, vm)
}

pub fn int_lt(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    int_richcompare(obj, other, CompareOp::Lt, vm)
}

/// `bin`/`oct`/`hex`: sign is rendered before the prefix (`-0x1a`, not
/// `0x-1a`), and `oct(0) == "0"` rather than `"0o0"` (§4.8 edge case).
pub fn to_base(value: i64, base: u32) -> String {
    let neg = value < 0;
    let magnitude = (value as i128).unsigned_abs();
    let digits = match base {
        2 => format!("{:b}", magnitude),
        8 => {
            if magnitude == 0 {
                return "0".to_owned();
            }
            format!("{:o}", magnitude)
        }
        16 => format!("{:x}", magnitude),
        _ => unreachable!("unsupported base"),
    };
    let prefix = match base {
        2 => "0b",
        8 => "0o",
        16 => "0x",
        _ => unreachable!(),
    };
    if neg {
        format!("-{}{}", prefix, digits)
    } else {
        format!("{}{}", prefix, digits)
    }
}

pub fn int_hex(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_str(to_base(as_i64(obj).unwrap(), 16)))
}

pub fn int_oct(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_str(to_base(as_i64(obj).unwrap(), 8)))
}

/// `Index`/`Int`: an `int` is already its own index and its own `int()`
/// conversion, so both just hand back the same object.
pub fn int_index(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult {
    Ok(obj.clone())
}

pub fn int_long(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(PyLong::new_obj(BigInt::from(as_i64(obj).unwrap()), vm))
}

pub fn int_float(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(crate::builtins::float::new_float(as_i64(obj).unwrap() as f64, vm))
}

pub fn int_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let value = match args.args.first() {
        None => 0,
        Some(v) => {
            if let Some(i) = v.downcast_ref::<PyInt>() {
                i.value
            } else if let Some(s) = v.downcast_ref::<crate::builtins::str::PyStr>() {
                s.as_str()
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| vm.new_value_error(format!("invalid literal for int(): '{}'", s.as_str())))?
            } else {
                return Err(vm.new_type_error("int() argument must be a string or a number".to_owned()));
            }
        }
    };
    Ok(PyObject::new(PyInt { value }, cls.into_object(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_value_for_small_ints() {
        assert_eq!(hash_i64(0), 0);
        assert_eq!(hash_i64(1), 1);
        assert_eq!(hash_i64(-1), -2);
    }

    #[test]
    fn floor_div_follows_divisor_sign() {
        // -7 // 2 == -4, -7 % 2 == 1 in Python's convention.
        let vm_free_check = |a: i64, b: i64| -> (i64, i64) {
            let mut q = a / b;
            let mut r = a % b;
            if r != 0 && (r < 0) != (b < 0) {
                q -= 1;
                r += b;
            }
            (q, r)
        };
        assert_eq!(vm_free_check(-7, 2), (-4, 1));
        assert_eq!(vm_free_check(7, -2), (-4, -1));
    }

    #[test]
    fn base_conversion_matches_edge_cases() {
        assert_eq!(to_base(0, 8), "0");
        assert_eq!(to_base(-26, 16), "-0x1a");
        assert_eq!(to_base(5, 2), "0b101");
    }
}
