//! C8 §4.8: the IEEE-754 double. Sits above `int`/`long` and below
//! `complex` in the coercion tower.

use num_traits::ToPrimitive;

use crate::builtins::int::hash_i64;
use crate::builtins::numeric::{common_level, widen, Level, Wide};
use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::protocol::comparison::CompareOp;
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug, Clone, Copy)]
pub struct PyFloat {
    value: f64,
}

impl_payload!(PyFloat, "float");

pub type PyFloatRef = PyRef<PyFloat>;

impl PyFloat {
    pub fn value(&self) -> f64 {
        self.value
    }
}

pub fn new_float(value: f64, vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(PyFloat { value }, vm.ctx.types.float_type.clone().into_object(), None)
}

fn as_f64(obj: &PyObjectRef) -> Option<f64> {
    if let Some(f) = obj.downcast_ref::<PyFloat>() {
        return Some(f.value);
    }
    match widen(obj, Level::Float)? {
        Wide::Float(f) => Some(f),
        _ => None,
    }
}

/// CPython's float hash special cases: NaN hashes to 0, the infinities
/// to fixed sentinels, and any float with an exact integer value hashes
/// as that integer so `hash(1.0) == hash(1)` (§4.8).
pub fn hash_f64(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    if value.is_infinite() {
        return if value > 0.0 { 314_159 } else { -271_828 };
    }
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return hash_i64(value as i64);
    }
    // Non-integral finite value: fold the bit pattern. Not CPython-bit-
    // compatible, just a stable, well-distributed hash.
    let bits = value.to_bits();
    let folded = (bits ^ (bits >> 32)) as i64;
    if folded == -1 {
        -2
    } else {
        folded
    }
}

pub fn float_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let v = obj.downcast_ref::<PyFloat>().unwrap().value;
    Ok(vm.new_str(format_float(v)))
}

pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_owned()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_owned() } else { "-inf".to_owned() }
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

pub fn float_hash(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<i64> {
    Ok(hash_f64(obj.downcast_ref::<PyFloat>().unwrap().value))
}

pub fn float_bool(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<bool> {
    Ok(obj.downcast_ref::<PyFloat>().unwrap().value != 0.0)
}

macro_rules! float_binop {
    ($name:ident, $op:tt) => {
        pub fn $name(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
            let a = obj.downcast_ref::<PyFloat>().unwrap().value;
            match as_f64(other) {
                Some(b) => Ok(new_float(a $op b, vm)),
                None => Ok(vm.not_implemented()),
            }
        }
    };
}

float_binop!(float_add, +);
float_binop!(float_sub, -);
float_binop!(float_mul, *);

/// §4.8/S6: every float division-family `ZeroDivisionError` (true
/// division, floor division, modulo, and divmod) shares this one
/// message, matching CPython's `float division or modulo by zero`.
const FLOAT_ZERO_DIVISION_MSG: &str = "float division or modulo by zero";

pub fn float_floordiv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyFloat>().unwrap().value;
    match as_f64(other) {
        Some(b) => {
            if b == 0.0 {
                return Err(vm.new_zero_division_error(FLOAT_ZERO_DIVISION_MSG.to_owned()));
            }
            Ok(new_float((a / b).floor(), vm))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn float_truediv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyFloat>().unwrap().value;
    match as_f64(other) {
        Some(b) => {
            if b == 0.0 {
                return Err(vm.new_zero_division_error(FLOAT_ZERO_DIVISION_MSG.to_owned()));
            }
            Ok(new_float(a / b, vm))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn float_mod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyFloat>().unwrap().value;
    match as_f64(other) {
        Some(b) => {
            if b == 0.0 {
                return Err(vm.new_zero_division_error(FLOAT_ZERO_DIVISION_MSG.to_owned()));
            }
            let r = a % b;
            let r = if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r };
            Ok(new_float(r, vm))
        }
        None => Ok(vm.not_implemented()),
    }
}

/// `(quotient, remainder)` as a single slot, matching `int`/`long`'s
/// `DivMod` (§4.2); S6: `divmod(-12.5, 4.0) == (-4.0, 3.5)`.
pub fn float_divmod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyFloat>().unwrap().value;
    match as_f64(other) {
        Some(b) => {
            if b == 0.0 {
                return Err(vm.new_zero_division_error(FLOAT_ZERO_DIVISION_MSG.to_owned()));
            }
            let q = (a / b).floor();
            let r = a - b * q;
            Ok(vm.new_tuple(vec![new_float(q, vm), new_float(r, vm)]))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn float_rdivmod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    float_divmod(other, obj, vm)
}

pub fn float_rdiv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyFloat>().unwrap().value;
    match as_f64(other) {
        Some(b) => {
            if a == 0.0 {
                return Err(vm.new_zero_division_error(FLOAT_ZERO_DIVISION_MSG.to_owned()));
            }
            Ok(new_float(b / a, vm))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn float_rsub(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyFloat>().unwrap().value;
    match as_f64(other) {
        Some(b) => Ok(new_float(b - a, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn float_rfloordiv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyFloat>().unwrap().value;
    match as_f64(other) {
        Some(b) => {
            if a == 0.0 {
                return Err(vm.new_zero_division_error(FLOAT_ZERO_DIVISION_MSG.to_owned()));
            }
            Ok(new_float((b / a).floor(), vm))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn float_rmod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyFloat>().unwrap().value;
    match as_f64(other) {
        Some(b) => {
            if a == 0.0 {
                return Err(vm.new_zero_division_error(FLOAT_ZERO_DIVISION_MSG.to_owned()));
            }
            let r = b % a;
            let r = if r != 0.0 && (r < 0.0) != (a < 0.0) { r + a } else { r };
            Ok(new_float(r, vm))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn float_neg(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(new_float(-obj.downcast_ref::<PyFloat>().unwrap().value, vm))
}

pub fn float_abs(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(new_float(obj.downcast_ref::<PyFloat>().unwrap().value.abs(), vm))
}

fn float_richcompare(obj: &PyObjectRef, other: &PyObjectRef, op: CompareOp, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyFloat>().unwrap().value;
    match as_f64(other) {
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

pub fn float_eq(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    float_richcompare(obj, other, CompareOp::Eq, vm)
}

pub fn float_lt(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    float_richcompare(obj, other, CompareOp::Lt, vm)
}

pub fn float_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let value = match args.args.first() {
        None => 0.0,
        Some(v) => {
            if let Some(f) = v.downcast_ref::<PyFloat>() {
                f.value
            } else if let Some(s) = v.downcast_ref::<crate::builtins::str::PyStr>() {
                s.as_str()
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| vm.new_value_error(format!("could not convert string to float: '{}'", s.as_str())))?
            } else {
                as_f64(v).ok_or_else(|| vm.new_type_error("float() argument must be a string or a number".to_owned()))?
            }
        }
    };
    Ok(PyObject::new(PyFloat { value }, cls.into_object(), None))
}

/// `Float`: a float is its own `float()` conversion.
pub fn float_float(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult {
    Ok(obj.clone())
}

/// `Int`/`Long`: truncates toward zero, matching Python's `int(1.9) == 1`
/// and `int(-1.9) == -1`. Values outside `i64` promote to `long` the same
/// way an overflowing `int` arithmetic result would (§4.8).
pub fn float_int(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let v = obj.downcast_ref::<PyFloat>().unwrap().value.trunc();
    if v.abs() < 9.223_372_036_854_776e18 {
        Ok(crate::builtins::int::new_int(v as i64, vm))
    } else {
        float_long(obj, vm)
    }
}

pub fn float_long(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    use num_bigint::BigInt;
    use num_traits::FromPrimitive;
    let v = obj.downcast_ref::<PyFloat>().unwrap().value.trunc();
    let big = BigInt::from_f64(v).ok_or_else(|| vm.new_overflow_error("cannot convert float infinity/nan to long".to_owned()))?;
    Ok(crate::builtins::long::PyLong::new_obj(big, vm))
}

/// Used by the `int`/`long` binary slots once they determine the common
/// level is `Float` (§4.8): coerce both operands and hand off.
pub fn promote_pair(a: &PyObjectRef, b: &PyObjectRef) -> Option<(f64, f64)> {
    if common_level(a, b)? != Level::Float {
        return None;
    }
    Some((as_f64(a)?, as_f64(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_and_infinities_hash_to_cpython_sentinels() {
        assert_eq!(hash_f64(f64::NAN), 0);
        assert_eq!(hash_f64(f64::INFINITY), 314_159);
        assert_eq!(hash_f64(f64::NEG_INFINITY), -271_828);
    }

    #[test]
    fn exact_integer_floats_hash_as_the_integer() {
        assert_eq!(hash_f64(1.0), hash_i64(1));
        assert_eq!(hash_f64(-5.0), hash_i64(-5));
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert!((format_float(-0.5) == "-0.5"));
    }
}
