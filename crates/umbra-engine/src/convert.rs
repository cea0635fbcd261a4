//! Typed facades and value conversion
//!
//! [`LiveBinding::invoke`] works on [`BoundValue`]s. The traits here let a
//! Rust struct stand in for a capability type and let calls take and return
//! ordinary Rust values:
//!
//! ```ignore
//! #[derive(Clone)]
//! struct Point(LiveBinding);
//!
//! impl Capability for Point {
//!     fn capability() -> CapabilityType { POINT.clone() }
//!     fn from_binding(binding: LiveBinding) -> Self { Point(binding) }
//!     fn binding(&self) -> &LiveBinding { &self.0 }
//! }
//!
//! impl Point {
//!     fn x(&self) -> BindResult<i32> { self.0.call("getX", ()) }
//!     fn translate(&self, dx: i32, dy: i32) -> BindResult<()> { self.0.call("translate", (dx, dy)) }
//! }
//! ```

use umbra_sdk::{ObjectRef, Value};

use crate::binding::{BoundValue, LiveBinding};
use crate::capability::CapabilityType;

/// A Rust type acting as the typed facade of a capability type
pub trait Capability: Sized {
    /// The capability type this facade stands for
    fn capability() -> CapabilityType;

    /// Wrap a binding of [`Self::capability`]
    fn from_binding(binding: LiveBinding) -> Self;

    /// The underlying binding
    fn binding(&self) -> &LiveBinding;
}

impl BoundValue {
    /// Convert a binding of `C`'s capability type into the facade; any other
    /// value is handed back
    pub fn into_capability<C: Capability>(self) -> Result<C, BoundValue> {
        match self {
            BoundValue::Binding(binding) if binding.capability() == &C::capability() => Ok(C::from_binding(binding)),
            other => Err(other),
        }
    }
}

/// Conversion into a call argument
pub trait IntoBound {
    /// Convert into a bound value
    fn into_bound(self) -> BoundValue;
}

/// Conversion from a call result; the value is handed back on mismatch
pub trait FromBound: Sized {
    /// Convert from a bound value
    fn from_bound(value: BoundValue) -> Result<Self, BoundValue>;
}

macro_rules! impl_into_bound {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoBound for $ty {
                fn into_bound(self) -> BoundValue {
                    BoundValue::from(self)
                }
            }
        )*
    };
}

impl_into_bound!(bool, i8, i16, char, i32, i64, f32, f64, &str, String, ObjectRef, Value, LiveBinding);

impl IntoBound for BoundValue {
    fn into_bound(self) -> BoundValue {
        self
    }
}

impl<C: Capability> IntoBound for &C {
    fn into_bound(self) -> BoundValue {
        BoundValue::Binding(self.binding().clone())
    }
}

impl<T: IntoBound> IntoBound for Option<T> {
    fn into_bound(self) -> BoundValue {
        self.map(IntoBound::into_bound).unwrap_or_default()
    }
}

impl<T: IntoBound> IntoBound for Vec<T> {
    fn into_bound(self) -> BoundValue {
        BoundValue::Array(self.into_iter().map(IntoBound::into_bound).collect())
    }
}

impl FromBound for BoundValue {
    fn from_bound(value: BoundValue) -> Result<Self, BoundValue> {
        Ok(value)
    }
}

impl FromBound for Value {
    fn from_bound(value: BoundValue) -> Result<Self, BoundValue> {
        match value {
            BoundValue::Value(raw) => Ok(raw),
            other => Err(other),
        }
    }
}

impl FromBound for LiveBinding {
    fn from_bound(value: BoundValue) -> Result<Self, BoundValue> {
        match value {
            BoundValue::Binding(binding) => Ok(binding),
            other => Err(other),
        }
    }
}

impl FromBound for () {
    fn from_bound(value: BoundValue) -> Result<Self, BoundValue> {
        if value.is_null() {
            Ok(())
        } else {
            Err(value)
        }
    }
}

macro_rules! impl_from_bound {
    ($($ty:ty => $extract:expr),* $(,)?) => {
        $(
            impl FromBound for $ty {
                fn from_bound(value: BoundValue) -> Result<Self, BoundValue> {
                    let extracted = match &value {
                        BoundValue::Value(raw) => ($extract)(raw),
                        _ => None,
                    };
                    extracted.ok_or(value)
                }
            }
        )*
    };
}

impl_from_bound! {
    bool => Value::as_bool,
    char => Value::as_char,
    i32 => Value::as_i32,
    i64 => Value::as_i64,
    f64 => Value::as_f64,
    String => |raw: &Value| raw.as_str().map(str::to_string),
    ObjectRef => Value::as_object,
}

impl<T: FromBound> FromBound for Option<T> {
    fn from_bound(value: BoundValue) -> Result<Self, BoundValue> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_bound(value).map(Some)
    }
}

// The first element that does not convert is handed back.
impl<T: FromBound> FromBound for Vec<T> {
    fn from_bound(value: BoundValue) -> Result<Self, BoundValue> {
        match value {
            BoundValue::Array(items) => items.into_iter().map(T::from_bound).collect(),
            other => Err(other),
        }
    }
}

/// Conversion of a Rust argument list into call arguments
pub trait IntoArgs {
    /// Convert into bound arguments
    fn into_args(self) -> Vec<BoundValue>;
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<BoundValue> {
        Vec::new()
    }
}

impl IntoArgs for Vec<BoundValue> {
    fn into_args(self) -> Vec<BoundValue> {
        self
    }
}

macro_rules! impl_into_args {
    ($(($($name:ident),+)),* $(,)?) => {
        $(
            impl<$($name: IntoBound),+> IntoArgs for ($($name,)+) {
                #[allow(non_snake_case)]
                fn into_args(self) -> Vec<BoundValue> {
                    let ($($name,)+) = self;
                    vec![$($name.into_bound()),+]
                }
            }
        )*
    };
}

impl_into_args!((A), (A, B), (A, B, C), (A, B, C, D));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_args() {
        assert!(().into_args().is_empty());
        assert_eq!(
            ("x", 1i32, true).into_args(),
            vec![BoundValue::from("x"), BoundValue::from(1i32), BoundValue::from(true)]
        );
        assert_eq!((None::<i32>,).into_args(), vec![BoundValue::default()]);
    }

    #[test]
    fn test_from_bound_scalars() {
        assert_eq!(i32::from_bound(BoundValue::from(4i32)), Ok(4));
        assert_eq!(i64::from_bound(BoundValue::from(4i32)), Ok(4));
        assert_eq!(String::from_bound(BoundValue::from("hi")), Ok("hi".to_string()));
        assert_eq!(Option::<i32>::from_bound(BoundValue::default()), Ok(None));
        assert_eq!(<()>::from_bound(BoundValue::default()), Ok(()));
        assert_eq!(bool::from_bound(BoundValue::from(1i32)), Err(BoundValue::from(1i32)));
        assert_eq!(
            Vec::<i32>::from_bound(BoundValue::from(vec![1i32, 2])),
            Ok(vec![1, 2])
        );
    }
}
