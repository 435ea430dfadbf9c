//! Argument values passed to method invocations.

use crate::refs::RawObject;

/// A single marshaled argument, the safe counterpart of `jvalue`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JValue {
    Bool(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// An object reference; `None` is the null reference.
    Object(Option<RawObject>),
}

impl JValue {
    /// The descriptor letter of the value's type (`L` for any object).
    pub const fn type_char(&self) -> char {
        match self {
            JValue::Bool(_) => 'Z',
            JValue::Byte(_) => 'B',
            JValue::Char(_) => 'C',
            JValue::Short(_) => 'S',
            JValue::Int(_) => 'I',
            JValue::Long(_) => 'J',
            JValue::Float(_) => 'F',
            JValue::Double(_) => 'D',
            JValue::Object(_) => 'L',
        }
    }

    /// The object reference, if this is an object value.
    pub const fn as_object(&self) -> Option<RawObject> {
        match self {
            JValue::Object(obj) => *obj,
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i32> {
        match self {
            JValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_long(&self) -> Option<i64> {
        match self {
            JValue::Long(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<RawObject> for JValue {
    fn from(obj: RawObject) -> Self {
        JValue::Object(Some(obj))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    #[test]
    fn type_chars_match_descriptors() {
        assert_eq!(JValue::Bool(true).type_char(), 'Z');
        assert_eq!(JValue::Char(65).type_char(), 'C');
        assert_eq!(JValue::Long(1).type_char(), 'J');
        assert_eq!(JValue::Object(None).type_char(), 'L');
    }

    #[test]
    fn accessors() {
        let obj = RawObject::from_addr(NonZeroUsize::new(8).unwrap());
        assert_eq!(JValue::from(obj).as_object(), Some(obj));
        assert_eq!(JValue::Int(3).as_object(), None);
        assert_eq!(JValue::Int(3).as_int(), Some(3));
        assert_eq!(JValue::Long(3).as_int(), None);
        assert_eq!(JValue::Long(-9).as_long(), Some(-9));
    }
}
