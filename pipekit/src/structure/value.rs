// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Typed field values stored in a [`crate::Structure`].
//!
//! [`Value`] is a closed set of variants. Each variant knows its text type tag
//! (the `(int)` in `channels=(int)2`), how it renders, how it compares and
//! whether it is contained in another value for subset checks.

use std::fmt::{self, Write};

use crate::{Error, Result};

/// A rational number, used for frame rates and pixel aspect ratios.
///
/// Equality is by value: `1/2 == 2/4`.
#[derive(Debug, Clone, Copy)]
pub struct Fraction {
    numer: i32,
    denom: i32,
}

impl Fraction {
    /// Creates `numer/denom`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidValue`] if `denom` is zero.
    pub fn new(numer: i32, denom: i32) -> Result<Self> {
        if denom == 0 {
            return Err(Error::InvalidValue(format!("{numer}/0 has a zero denominator")));
        }
        Ok(Self { numer, denom })
    }

    /// Numerator as given to [`Fraction::new`].
    pub fn numer(&self) -> i32 {
        self.numer
    }

    /// Denominator as given to [`Fraction::new`], never zero.
    pub fn denom(&self) -> i32 {
        self.denom
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        i64::from(self.numer) * i64::from(other.denom)
            == i64::from(other.numer) * i64::from(self.denom)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numer, self.denom)
    }
}

impl TryFrom<(i32, i32)> for Fraction {
    type Error = Error;

    fn try_from((numer, denom): (i32, i32)) -> Result<Self> {
        Self::new(numer, denom)
    }
}

/// Inclusive integer range with an optional step, rendered `[ min, max ]` or
/// `[ min, max, step ]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    min: i32,
    max: i32,
    step: i32,
}

impl IntRange {
    /// Creates a range with step 1. Bounds given in reverse order are
    /// swapped, so `IntRange::new(3, 1)` is `[ 1, 3 ]`.
    pub fn new(min: i32, max: i32) -> Self {
        Self::with_step(min, max, 1)
    }

    /// Creates a range whose members are `min + k * step`.
    ///
    /// Reversed bounds are swapped and a step below 1 is treated as 1, so
    /// every range renders to text the parser accepts.
    pub fn with_step(min: i32, max: i32, step: i32) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            step: step.max(1),
        }
    }

    /// Lower bound, inclusive.
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Upper bound, inclusive.
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Distance between members, at least 1.
    pub fn step(&self) -> i32 {
        self.step
    }

    /// Returns `true` if `value` is a member of the range.
    pub fn contains(&self, value: i32) -> bool {
        value >= self.min
            && value <= self.max
            && (i64::from(value) - i64::from(self.min)) % i64::from(self.step) == 0
    }
}

/// Inclusive floating point range, rendered `[ min, max ]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleRange {
    min: f64,
    max: f64,
}

impl DoubleRange {
    /// Creates a range. Bounds given in reverse order are swapped.
    pub fn new(min: f64, max: f64) -> Self {
        if min > max {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// Lower bound, inclusive.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound, inclusive.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns `true` if `min <= value <= max`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A dynamically typed field value.
#[derive(Debug, Clone)]
pub enum Value {
    /// 32-bit signed integer, tag `int`.
    Int(i32),
    /// 64-bit signed integer, tag `gint64`.
    Int64(i64),
    /// 32-bit unsigned integer, tag `uint`.
    UInt(u32),
    /// Double precision float, tag `double`.
    Double(f64),
    /// Tag `boolean`.
    Boolean(bool),
    /// UTF-8 string, tag `string`.
    String(String),
    /// Tag `fraction`.
    Fraction(Fraction),
    /// Integer range, tag `int`.
    IntRange(IntRange),
    /// Double range, tag `double`.
    DoubleRange(DoubleRange),
    /// Unordered set of alternatives, rendered `{ a, b }`.
    List(Vec<Value>),
    /// Ordered sequence, rendered `< a, b >`.
    Array(Vec<Value>),
}

impl Value {
    /// Returns the type name of this value.
    ///
    /// Scalars and ranges share the tag of their element type, so an
    /// [`IntRange`] reports `int`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) | Value::IntRange(_) => "int",
            Value::Int64(_) => "gint64",
            Value::UInt(_) => "uint",
            Value::Double(_) | Value::DoubleRange(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Fraction(_) => "fraction",
            Value::List(_) => "list",
            Value::Array(_) => "array",
        }
    }

    fn is_collection(&self) -> bool {
        matches!(self, Value::List(_) | Value::Array(_))
    }

    /// The tag written in front of this value, if any.
    ///
    /// Collections only carry an outer tag when they are non-empty and all of
    /// their items are scalars or ranges of one type; otherwise every item is
    /// tagged on its own.
    pub(crate) fn serial_tag(&self) -> Option<&'static str> {
        match self {
            Value::List(items) | Value::Array(items) => {
                let first = items.first()?;
                if first.is_collection() {
                    return None;
                }
                let tag = first.type_name();
                items
                    .iter()
                    .all(|item| !item.is_collection() && item.type_name() == tag)
                    .then_some(tag)
            }
            other => Some(other.type_name()),
        }
    }

    /// Appends `(tag)value` to `out`.
    pub(crate) fn write_tagged(&self, out: &mut String) {
        if let Some(tag) = self.serial_tag() {
            out.push('(');
            out.push_str(tag);
            out.push(')');
        }
        self.write_bare(out);
    }

    /// Appends the value without a leading type tag.
    pub(crate) fn write_bare(&self, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = match self {
            Value::Int(v) => write!(out, "{v}"),
            Value::Int64(v) => write!(out, "{v}"),
            Value::UInt(v) => write!(out, "{v}"),
            Value::Double(v) => write!(out, "{v}"),
            Value::Boolean(v) => write!(out, "{v}"),
            Value::String(s) => {
                write_string(out, s);
                Ok(())
            }
            Value::Fraction(v) => write!(out, "{v}"),
            Value::IntRange(r) if r.step == 1 => write!(out, "[ {}, {} ]", r.min, r.max),
            Value::IntRange(r) => write!(out, "[ {}, {}, {} ]", r.min, r.max, r.step),
            Value::DoubleRange(r) => write!(out, "[ {}, {} ]", r.min, r.max),
            Value::List(items) => {
                self.write_items(out, '{', '}', items);
                Ok(())
            }
            Value::Array(items) => {
                self.write_items(out, '<', '>', items);
                Ok(())
            }
        };
    }

    fn write_items(&self, out: &mut String, open: char, close: char, items: &[Value]) {
        let tagged_outside = self.serial_tag().is_some();
        out.push(open);
        out.push(' ');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if tagged_outside {
                item.write_bare(out);
            } else {
                item.write_tagged(out);
            }
        }
        if !items.is_empty() {
            out.push(' ');
        }
        out.push(close);
    }

    /// Returns `true` if every value described by `self` is also described by
    /// `superset`.
    pub fn is_subset(&self, superset: &Value) -> bool {
        if self == superset {
            return true;
        }
        match (self, superset) {
            (Value::Int(v), Value::IntRange(r)) => r.contains(*v),
            (Value::IntRange(a), Value::IntRange(b)) => {
                b.contains(a.min) && b.contains(a.max) && a.step % b.step == 0
            }
            (Value::Double(v), Value::DoubleRange(r)) => r.contains(*v),
            (Value::DoubleRange(a), Value::DoubleRange(b)) => b.min <= a.min && a.max <= b.max,
            (Value::List(items), _) => {
                !items.is_empty() && items.iter().all(|item| item.is_subset(superset))
            }
            (_, Value::List(items)) => items.iter().any(|item| self.is_subset(item)),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Fraction(a), Value::Fraction(b)) => a == b,
            (Value::IntRange(a), Value::IntRange(b)) => a == b,
            (Value::DoubleRange(a), Value::DoubleRange(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::List(a), Value::List(b)) => same_members(a, b),
            _ => false,
        }
    }
}

/// Order-independent comparison, each member of `a` matched to a distinct
/// member of `b`.
fn same_members(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|item| {
        let found = b
            .iter()
            .enumerate()
            .position(|(i, candidate)| !used[i] && candidate == item);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_tagged(&mut out);
        f.write_str(&out)
    }
}

/// Characters that may appear in an unquoted string token.
pub(crate) fn is_simple_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '/' | ':' | '.')
}

fn write_string(out: &mut String, s: &str) {
    if !s.is_empty() && s.chars().all(is_simple_char) {
        out.push_str(s);
        return;
    }
    out.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

macro_rules! impl_from_value {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from_value!(i32, Int);
impl_from_value!(i64, Int64);
impl_from_value!(u32, UInt);
impl_from_value!(f64, Double);
impl_from_value!(bool, Boolean);
impl_from_value!(String, String);
impl_from_value!(Fraction, Fraction);
impl_from_value!(IntRange, IntRange);
impl_from_value!(DoubleRange, DoubleRange);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

/// Conversion out of a [`Value`] for typed structure getters.
pub trait FromValue: Sized {
    /// Type name reported in [`crate::Error::TypeMismatch`].
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_value_trait {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl FromValue for $ty {
            const TYPE_NAME: &'static str = $name;

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_from_value_trait!(i32, Int, "int");
impl_from_value_trait!(i64, Int64, "gint64");
impl_from_value_trait!(u32, UInt, "uint");
impl_from_value_trait!(f64, Double, "double");
impl_from_value_trait!(bool, Boolean, "boolean");
impl_from_value_trait!(String, String, "string");
impl_from_value_trait!(Fraction, Fraction, "fraction");
impl_from_value_trait!(IntRange, IntRange, "int");
impl_from_value_trait!(DoubleRange, DoubleRange, "double");

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: &Value) -> String {
        value.to_string()
    }

    #[test]
    fn scalars_render_with_tag() {
        assert_eq!(render(&Value::Int(-3)), "(int)-3");
        assert_eq!(render(&Value::Double(2.0)), "(double)2");
        assert_eq!(render(&Value::Double(0.25)), "(double)0.25");
        assert_eq!(render(&Value::Boolean(true)), "(boolean)true");
        assert_eq!(render(&Value::Fraction(Fraction::new(30000, 1001).unwrap())), "(fraction)30000/1001");
        assert_eq!(render(&Value::UInt(7)), "(uint)7");
        assert_eq!(render(&Value::Int64(-1)), "(gint64)-1");
    }

    #[test]
    fn strings_are_quoted_only_when_needed() {
        assert_eq!(render(&"video/x-raw".into()), "(string)video/x-raw");
        assert_eq!(render(&"hello world".into()), "(string)\"hello world\"");
        assert_eq!(render(&"".into()), "(string)\"\"");
        assert_eq!(render(&"a\"b\\c".into()), "(string)\"a\\\"b\\\\c\"");
        assert_eq!(render(&"tab\there".into()), "(string)\"tab\\011here\"");
    }

    #[test]
    fn ranges_render_step_only_when_not_one() {
        assert_eq!(render(&IntRange::new(1, 2).into()), "(int)[ 1, 2 ]");
        assert_eq!(render(&IntRange::with_step(2, 8, 2).into()), "(int)[ 2, 8, 2 ]");
        assert_eq!(render(&DoubleRange::new(0.5, 1.0).into()), "(double)[ 0.5, 1 ]");
    }

    #[test]
    fn homogeneous_list_is_tagged_outside() {
        let list = Value::List(vec!["I420".into(), "YV12".into()]);
        assert_eq!(render(&list), "(string){ I420, YV12 }");
    }

    #[test]
    fn mixed_list_tags_each_item() {
        let list = Value::List(vec![Value::Int(1), "a".into()]);
        assert_eq!(render(&list), "{ (int)1, (string)a }");
        assert_eq!(render(&Value::Array(vec![])), "< >");
    }

    #[test]
    fn list_equality_ignores_order_array_does_not() {
        let a = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::List(vec![Value::Int(2), Value::Int(1)]);
        assert_eq!(a, b);
        let c = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        let d = Value::Array(vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(c, d);
        assert_ne!(a, Value::List(vec![Value::Int(1), Value::Int(1)]));
    }

    #[test]
    fn fractions_compare_by_value() {
        assert_eq!(Fraction::new(1, 2).unwrap(), Fraction::new(2, 4).unwrap());
        assert_ne!(Fraction::new(1, 2).unwrap(), Fraction::new(1, 3).unwrap());
        assert_eq!(Fraction::new(-1, 2).unwrap(), Fraction::new(1, -2).unwrap());
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert!(matches!(Fraction::new(1, 0), Err(Error::InvalidValue(_))));
        assert!(Fraction::try_from((5, 0)).is_err());
        assert_eq!(Fraction::try_from((5, 1)).unwrap().numer(), 5);
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let r = IntRange::with_step(9, 1, 0);
        assert_eq!((r.min(), r.max(), r.step()), (1, 9, 1));
        assert_eq!(IntRange::new(3, 1), IntRange::new(1, 3));
        let d = DoubleRange::new(2.5, -1.0);
        assert_eq!((d.min(), d.max()), (-1.0, 2.5));
        assert!(d.contains(0.0));
    }

    #[test]
    fn int_in_range_is_subset() {
        let range: Value = IntRange::new(1, 2).into();
        assert!(Value::Int(1).is_subset(&range));
        assert!(Value::Int(2).is_subset(&range));
        assert!(!Value::Int(3).is_subset(&range));
        assert!(!range.is_subset(&Value::Int(1)));
    }

    #[test]
    fn stepped_range_membership() {
        let even = IntRange::with_step(0, 10, 2);
        assert!(even.contains(4));
        assert!(!even.contains(5));
        let narrower: Value = IntRange::with_step(2, 6, 4).into();
        assert!(narrower.is_subset(&even.into()));
    }

    #[test]
    fn list_subset_rules() {
        let formats = Value::List(vec!["I420".into(), "NV12".into(), "RGB".into()]);
        assert!(Value::from("NV12").is_subset(&formats));
        assert!(!Value::from("BGR").is_subset(&formats));
        let two = Value::List(vec!["RGB".into(), "I420".into()]);
        assert!(two.is_subset(&formats));
        assert!(!formats.is_subset(&two));
    }

    #[test]
    fn typed_extraction() {
        assert_eq!(i32::from_value(&Value::Int(5)), Some(5));
        assert_eq!(i32::from_value(&Value::UInt(5)), None);
        assert_eq!(String::from_value(&"x".into()), Some("x".to_owned()));
    }
}
