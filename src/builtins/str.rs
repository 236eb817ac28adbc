//! C7: text. Python 2 distinguishes byte `str` from `unicode`; both are
//! represented here by the same `PyStr` payload holding a Rust `String`
//! (`str` and `unicode` share a basis the way `bool`/`int` do), classed
//! under two distinct type objects so `isinstance`/`type()` still tell
//! them apart. This is a deliberate simplification over tracking raw
//! bytes versus codepoints separately — see DESIGN.md.

use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::protocol::comparison::CompareOp;
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug, Clone)]
pub struct PyStr {
    value: String,
}

impl_payload!(PyStr, "str");

pub type PyStrRef = PyRef<PyStr>;

impl PyStr {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn new_ref(value: String, vm: &VirtualMachine) -> PyStrRef {
        PyRef::new_unchecked(new_str(value, vm))
    }

    /// Bare payload constructor, used only by the interned-string table
    /// in `vm::Context`, which already holds `str_type` directly and has
    /// no reason to round-trip through a `VirtualMachine`.
    pub(crate) fn new_raw(value: String) -> PyStr {
        PyStr { value }
    }
}

pub fn new_str(value: String, vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(PyStr { value }, vm.ctx.types.str_type.clone().into_object(), None)
}

pub fn new_unicode(value: String, vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(PyStr { value }, vm.ctx.types.unicode_type.clone().into_object(), None)
}

/// djb2-style fold, stable across a process but not claiming CPython
/// bit-compatibility (§4.7 "hashing ... suitable for dict/set keys").
pub fn hash_str(s: &str) -> i64 {
    let mut h: i64 = 5381;
    for b in s.bytes() {
        h = h.wrapping_mul(33).wrapping_add(b as i64);
    }
    if h == -1 {
        h = -2;
    }
    h
}

pub fn str_hash(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<i64> {
    Ok(hash_str(&obj.downcast_ref::<PyStr>().unwrap().value))
}

pub fn str_len(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<usize> {
    Ok(obj.downcast_ref::<PyStr>().unwrap().value.chars().count())
}

pub fn str_eq(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    match other.downcast_ref::<PyStr>() {
        Some(b) => Ok(vm.new_bool(obj.downcast_ref::<PyStr>().unwrap().value == b.value)),
        None => Ok(vm.not_implemented()),
    }
}

fn str_richcompare(obj: &PyObjectRef, other: &PyObjectRef, op: CompareOp, vm: &VirtualMachine) -> PyResult {
    let a = &obj.downcast_ref::<PyStr>().unwrap().value;
    match other.downcast_ref::<PyStr>() {
        Some(b) => {
            let b = &b.value;
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

pub fn str_lt(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    str_richcompare(obj, other, CompareOp::Lt, vm)
}

/// CPython's quote-preference rule: prefer single quotes, switch to
/// doubles only when the text has a `'` but no `"` (§4.7 repr escaping).
pub fn repr_quoted(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || (c as u32) == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if (c as u32) > 0xffff => {
                out.push_str(&format!("\\U{:08x}", c as u32));
            }
            c if (c as u32) > 0x7e => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

pub fn str_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_str(repr_quoted(&obj.downcast_ref::<PyStr>().unwrap().value)))
}

pub fn str_str(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult {
    Ok(obj.clone())
}

pub fn str_bool(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<bool> {
    Ok(!obj.downcast_ref::<PyStr>().unwrap().value.is_empty())
}

pub fn str_add(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = &obj.downcast_ref::<PyStr>().unwrap().value;
    match other.downcast_ref::<PyStr>() {
        Some(b) => Ok(new_str(format!("{}{}", a, b.value), vm)),
        None => Ok(vm.not_implemented()),
    }
}

impl PyStr {
    pub fn join(&self, parts: &[PyObjectRef], vm: &VirtualMachine) -> PyResult<String> {
        let mut pieces = Vec::with_capacity(parts.len());
        for p in parts {
            match p.downcast_ref::<PyStr>() {
                Some(s) => pieces.push(s.value.clone()),
                None => return Err(vm.new_type_error("join() argument must be a string".to_owned())),
            }
        }
        Ok(pieces.join(&self.value))
    }

    pub fn split(&self, sep: Option<&str>) -> Vec<String> {
        match sep {
            Some(sep) if !sep.is_empty() => self.value.split(sep).map(str::to_owned).collect(),
            _ => self.value.split_whitespace().map(str::to_owned).collect(),
        }
    }

    pub fn strip(&self) -> &str {
        self.value.trim()
    }

    pub fn lstrip(&self) -> &str {
        self.value.trim_start()
    }

    pub fn rstrip(&self) -> &str {
        self.value.trim_end()
    }

    pub fn startswith(&self, prefix: &str) -> bool {
        self.value.starts_with(prefix)
    }

    pub fn endswith(&self, suffix: &str) -> bool {
        self.value.ends_with(suffix)
    }

    pub fn find(&self, needle: &str) -> isize {
        match self.value.find(needle) {
            Some(byte_idx) => self.value[..byte_idx].chars().count() as isize,
            None => -1,
        }
    }

    pub fn rfind(&self, needle: &str) -> isize {
        match self.value.rfind(needle) {
            Some(byte_idx) => self.value[..byte_idx].chars().count() as isize,
            None => -1,
        }
    }

    pub fn replace(&self, old: &str, new: &str) -> String {
        self.value.replace(old, new)
    }

    pub fn upper(&self) -> String {
        self.value.to_uppercase()
    }

    pub fn lower(&self) -> String {
        self.value.to_lowercase()
    }

    pub fn count(&self, needle: &str) -> usize {
        if needle.is_empty() {
            return self.value.chars().count() + 1;
        }
        self.value.matches(needle).count()
    }

    pub fn title(&self) -> String {
        let mut out = String::with_capacity(self.value.len());
        let mut prev_is_alpha = false;
        for c in self.value.chars() {
            if c.is_alphabetic() {
                out.extend(if prev_is_alpha { c.to_lowercase().collect::<Vec<_>>() } else { c.to_uppercase().collect::<Vec<_>>() });
                prev_is_alpha = true;
            } else {
                out.push(c);
                prev_is_alpha = false;
            }
        }
        out
    }

    pub fn capitalize(&self) -> String {
        let mut chars = self.value.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
            None => String::new(),
        }
    }

    pub fn swapcase(&self) -> String {
        self.value
            .chars()
            .map(|c| {
                if c.is_uppercase() {
                    c.to_lowercase().next().unwrap_or(c)
                } else if c.is_lowercase() {
                    c.to_uppercase().next().unwrap_or(c)
                } else {
                    c
                }
            })
            .collect()
    }
}

pub fn str_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let value = match args.args.first() {
        Some(v) => vm.str_of(v)?,
        None => String::new(),
    };
    Ok(PyObject::new(PyStr { value }, cls.into_object(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_prefers_single_quotes() {
        assert_eq!(repr_quoted("hi"), "'hi'");
        assert_eq!(repr_quoted("it's"), "\"it's\"");
        assert_eq!(repr_quoted("both \" and '"), "'both \" and \\''");
    }

    #[test]
    fn title_only_capitalizes_first_letter_of_each_word() {
        let s = PyStr { value: "hello world".to_owned() };
        assert_eq!(s.title(), "Hello World");
    }

    #[test]
    fn count_on_empty_needle_matches_cpython() {
        let s = PyStr { value: "abc".to_owned() };
        assert_eq!(s.count(""), 4);
    }
}
