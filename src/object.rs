use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::prelude::*;

/// Anything that can appear on the left of a call expression, apart from
/// classes which construct instances through [`Class::construct`].
pub trait Callable: Debug + Display {
    fn arity(&self) -> usize;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError>;

    /// Getters run on plain property access instead of being returned.
    fn is_getter(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub enum Object {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Callable(Rc<dyn Callable>),
    Class(Rc<Class>),
    Instance(Shared<Instance>),
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => same_number(*left, *right),
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Callable(left), Self::Callable(right)) => Rc::ptr_eq(left, right),
            (Self::Class(left), Self::Class(right)) => Rc::ptr_eq(left, right),
            (Self::Instance(left), Self::Instance(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

/// Numbers compare by value, except that NaN equals NaN and the two zeros
/// differ.
fn same_number(left: f64, right: f64) -> bool {
    if left.is_nan() || right.is_nan() {
        return left.is_nan() && right.is_nan();
    }
    left == right && left.is_sign_negative() == right.is_sign_negative()
}

/// Plain decimal for magnitudes in `[1e-3, 1e7)` and for zero, `d.dddE±x`
/// outside it. Integral values drop the fraction.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }

    let magnitude = n.abs();
    if magnitude != 0.0 && !(1e-3..1e7).contains(&magnitude) {
        let scientific = format!("{n:e}");
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            let point = if mantissa.contains('.') { "" } else { ".0" };
            return format!("{mantissa}{point}E{exponent}");
        }
    }

    format!("{n}")
}

impl Object {
    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// `nil` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Null | Self::Boolean(false))
    }
}

/// The form `print` writes.
impl Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "nil"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::String(s) => write!(f, "{s}"),
            Self::Callable(c) => write!(f, "{c}"),
            Self::Class(c) => write!(f, "{c}"),
            Self::Instance(i) => write!(f, "{}", i.borrow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_without_trailing_zero() {
        assert_eq!(Object::Number(4.0).to_string(), "4");
        assert_eq!(Object::Number(3.5).to_string(), "3.5");
        assert_eq!(Object::Number(-2.0).to_string(), "-2");
    }

    #[test]
    fn numbers_outside_plain_range_print_scientific() {
        assert_eq!(Object::Number(9999999.0).to_string(), "9999999");
        assert_eq!(Object::Number(1e7).to_string(), "1.0E7");
        assert_eq!(Object::Number(12345678.0).to_string(), "1.2345678E7");
        assert_eq!(Object::Number(-2.5e20).to_string(), "-2.5E20");
        assert_eq!(Object::Number(0.001).to_string(), "0.001");
        assert_eq!(Object::Number(0.0001).to_string(), "1.0E-4");
        assert_eq!(Object::Number(0.0).to_string(), "0");
        assert_eq!(Object::Number(-0.0).to_string(), "-0");
    }

    #[test]
    fn non_finite_numbers_print_by_name() {
        assert_eq!(Object::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Object::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Object::Number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn nan_equals_itself_and_zeros_differ() {
        assert_eq!(Object::Number(f64::NAN), Object::Number(f64::NAN));
        assert_ne!(Object::Number(0.0), Object::Number(-0.0));
        assert_eq!(Object::Number(0.0), Object::Number(0.0));
        assert_ne!(Object::Number(1.0), Object::Number(f64::NAN));
    }

    #[test]
    fn truthiness() {
        assert!(!Object::Null.is_truthy());
        assert!(!Object::Boolean(false).is_truthy());
        assert!(Object::Number(0.0).is_truthy());
        assert!(Object::String(String::new()).is_truthy());
    }

    #[test]
    fn nil_only_equals_nil() {
        assert_eq!(Object::Null, Object::Null);
        assert_ne!(Object::Null, Object::Boolean(false));
        assert_ne!(Object::Number(0.0), Object::Null);
        assert_ne!(Object::Number(1.0), Object::String("1".to_owned()));
    }
}
