//! C8 §4.8: the top of the coercion tower. Only `+`, `-`, `*`, `/`,
//! equality and `abs` are meaningful for complex numbers — ordering
//! comparisons raise `TypeError` per §4.8's "no ordering".

use num_complex::Complex64;

use crate::builtins::float::{format_float, new_float};
use crate::builtins::numeric::{widen, Level, Wide};
use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug, Clone, Copy)]
pub struct PyComplex {
    value: Complex64,
}

impl_payload!(PyComplex, "complex");

pub type PyComplexRef = PyRef<PyComplex>;

impl PyComplex {
    pub fn value(&self) -> Complex64 {
        self.value
    }
}

pub fn new_complex(value: Complex64, vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(PyComplex { value }, vm.ctx.types.complex_type.clone().into_object(), None)
}

fn as_complex(obj: &PyObjectRef) -> Option<Complex64> {
    if let Some(c) = obj.downcast_ref::<PyComplex>() {
        return Some(c.value);
    }
    match widen(obj, Level::Complex)? {
        Wide::Complex(c) => Some(c),
        _ => None,
    }
}

pub fn complex_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let c = obj.downcast_ref::<PyComplex>().unwrap().value;
    let text = if c.re == 0.0 {
        format!("{}j", format_float(c.im))
    } else {
        let sign = if c.im < 0.0 || c.im.is_sign_negative() { "-" } else { "+" };
        format!("({}{}{}j)", format_float(c.re), sign, format_float(c.im.abs()))
    };
    Ok(vm.new_str(text))
}

pub fn complex_abs(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(new_float(obj.downcast_ref::<PyComplex>().unwrap().value.norm(), vm))
}

pub fn complex_neg(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(new_complex(-obj.downcast_ref::<PyComplex>().unwrap().value, vm))
}

macro_rules! complex_binop {
    ($name:ident, $op:tt) => {
        pub fn $name(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
            let a = obj.downcast_ref::<PyComplex>().unwrap().value;
            match as_complex(other) {
                Some(b) => Ok(new_complex(a $op b, vm)),
                None => Ok(vm.not_implemented()),
            }
        }
    };
}

complex_binop!(complex_add, +);
complex_binop!(complex_sub, -);
complex_binop!(complex_mul, *);

pub fn complex_truediv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyComplex>().unwrap().value;
    match as_complex(other) {
        Some(b) => {
            if b.re == 0.0 && b.im == 0.0 {
                return Err(vm.new_zero_division_error("complex division by zero".to_owned()));
            }
            Ok(new_complex(a / b, vm))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn complex_rtruediv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyComplex>().unwrap().value;
    match as_complex(other) {
        Some(b) => {
            if a.re == 0.0 && a.im == 0.0 {
                return Err(vm.new_zero_division_error("complex division by zero".to_owned()));
            }
            Ok(new_complex(b / a, vm))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn complex_eq(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyComplex>().unwrap().value;
    match as_complex(other) {
        Some(b) => Ok(vm.new_bool(a == b)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn complex_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let re = match args.args.first() {
        Some(v) => {
            if let Some(c) = v.downcast_ref::<PyComplex>() {
                let value = c.value;
                return Ok(PyObject::new(PyComplex { value }, cls.into_object(), None));
            }
            as_complex(v).map(|c| c.re).unwrap_or(0.0)
        }
        None => 0.0,
    };
    let im = match args.args.get(1) {
        Some(v) => as_complex(v).map(|c| c.re).unwrap_or(0.0),
        None => 0.0,
    };
    Ok(PyObject::new(
        PyComplex { value: Complex64::new(re, im) },
        cls.into_object(),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_omits_real_part_when_zero() {
        let c = Complex64::new(0.0, 2.0);
        assert_eq!(format!("{}j", format_float(c.im)), "2.0j");
    }
}
