use crate::{Error, Result, Value};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::any;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// Numeric conversions widen freely and narrow with a range check, so a column
/// declared as `i32` in a row contract accepts an `Int64` fetched by the driver
/// as long as it fits.
///
/// # Examples
/// ```rust
/// use rowkit_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// Typed null for this type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    /// Convert a dynamic [`Value`] into `Self`, coercing compatible variants.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn conversion_error<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>(),
    ))
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                if let $destination(Some(v)) = value {
                    return Ok(v);
                }
                if let Some(v) = value.as_i128() {
                    return <$source>::try_from(v).map_err(|_| {
                        Error::msg(format!(
                            "Value {v}: {} is out of range for {}",
                            value.type_name(),
                            any::type_name::<Self>(),
                        ))
                    });
                }
                match value {
                    Value::Decimal(Some(v)) => {
                        let error = Error::msg(format!(
                            "Value {v}: Decimal does not fit into {}",
                            any::type_name::<Self>()
                        ));
                        if !v.is_integer() {
                            return Err(error.context("The value is not a integer"));
                        }
                        v.to_i128()
                            .and_then(|v| <$source>::try_from(v).ok())
                            .ok_or(error)
                    }
                    _ => Err(conversion_error::<Self>(&value)),
                }
            }
        }
    };
}
impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);
impl_as_value_integer!(u8, Value::UInt8);
impl_as_value_integer!(u16, Value::UInt16);
impl_as_value_integer!(u32, Value::UInt32);
impl_as_value_integer!(u64, Value::UInt64);

macro_rules! impl_as_value_float {
    ($source:ty, $destination:path, $from_decimal:ident) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                if let Some(v) = value.as_i128() {
                    return Ok(v as _);
                }
                match value {
                    Value::Float32(Some(v)) => Ok(v as _),
                    Value::Float64(Some(v)) => Ok(v as _),
                    Value::Decimal(Some(v)) => v.$from_decimal().ok_or(Error::msg(format!(
                        "Value {v}: Decimal does not fit into {}",
                        any::type_name::<Self>()
                    ))),
                    _ => Err(conversion_error::<Self>(&value)),
                }
            }
        }
    };
}
impl_as_value_float!(f32, Value::Float32, to_f32);
impl_as_value_float!(f64, Value::Float64, to_f64);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match (&value, value.as_i128()) {
            (Value::Boolean(Some(v)), ..) => Ok(*v),
            (_, Some(0)) => Ok(false),
            (_, Some(1)) => Ok(true),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if let Some(v) = value.as_i128() {
            return Decimal::from_i128(v).ok_or(conversion_error::<Self>(&value));
        }
        match value {
            Value::Decimal(Some(v)) => Ok(v),
            Value::Float32(Some(v)) => {
                Decimal::from_f32(v).ok_or(conversion_error::<Self>(&value))
            }
            Value::Float64(Some(v)) => {
                Decimal::from_f64(v).ok_or(conversion_error::<Self>(&value))
            }
            Value::Varchar(Some(ref v)) => v
                .parse::<Decimal>()
                .map_err(|e| Error::new(e).context(conversion_error::<Self>(&value))),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Uuid(Some(v)) => Ok(v.to_string()),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for Box<[u8]> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v),
            Value::Varchar(Some(v)) => Ok(v.into_bytes().into_boxed_slice()),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        <Box<[u8]>>::try_from_value(value).map(Into::into)
    }
}

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) => Uuid::parse_str(v)
                .map_err(|e| Error::new(e).context(conversion_error::<Self>(&value))),
            Value::Blob(Some(ref v)) => Uuid::from_slice(v)
                .map_err(|e| Error::new(e).context(conversion_error::<Self>(&value))),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

macro_rules! impl_as_value_exact {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    _ => Err(conversion_error::<Self>(&value)),
                }
            }
        }
    };
}
impl_as_value_exact!(Date, Value::Date);
impl_as_value_exact!(Time, Value::Time);
impl_as_value_exact!(PrimitiveDateTime, Value::Timestamp);
impl_as_value_exact!(OffsetDateTime, Value::TimestampWithTimezone);

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
}

/// Coerce `value` into the variant of `template`, keeping nulls typed.
pub fn coerce_value(template: &Value, value: Value) -> Result<Value> {
    if value.is_null() {
        return Ok(template.as_null());
    }
    if template.same_type(&value) || matches!(template, Value::Null) {
        return Ok(value);
    }
    Ok(match template {
        Value::Boolean(..) => bool::try_from_value(value)?.as_value(),
        Value::Int8(..) => i8::try_from_value(value)?.as_value(),
        Value::Int16(..) => i16::try_from_value(value)?.as_value(),
        Value::Int32(..) => i32::try_from_value(value)?.as_value(),
        Value::Int64(..) => i64::try_from_value(value)?.as_value(),
        Value::UInt8(..) => u8::try_from_value(value)?.as_value(),
        Value::UInt16(..) => u16::try_from_value(value)?.as_value(),
        Value::UInt32(..) => u32::try_from_value(value)?.as_value(),
        Value::UInt64(..) => u64::try_from_value(value)?.as_value(),
        Value::Float32(..) => f32::try_from_value(value)?.as_value(),
        Value::Float64(..) => f64::try_from_value(value)?.as_value(),
        Value::Decimal(..) => Decimal::try_from_value(value)?.as_value(),
        Value::Varchar(..) => String::try_from_value(value)?.as_value(),
        Value::Blob(..) => <Box<[u8]>>::try_from_value(value)?.as_value(),
        Value::Date(..) => Date::try_from_value(value)?.as_value(),
        Value::Time(..) => Time::try_from_value(value)?.as_value(),
        Value::Timestamp(..) => PrimitiveDateTime::try_from_value(value)?.as_value(),
        Value::TimestampWithTimezone(..) => OffsetDateTime::try_from_value(value)?.as_value(),
        Value::Uuid(..) => Uuid::try_from_value(value)?.as_value(),
        Value::Null => value,
    })
}
