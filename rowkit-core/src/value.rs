use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use rust_decimal::Decimal;
use std::fmt::{self, Display};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed cell value.
///
/// Every variant wraps an `Option`: `Value::Int64(None)` is a typed SQL `NULL`, it
/// is used as the column template inside a [`crate::RowSchema`] and as the bound
/// parameter for a null column so that drivers still know the expected type.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::TimestampWithTimezone(l), Self::TimestampWithTimezone(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int8(v) => v.is_none(),
            Value::Int16(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::UInt8(v) => v.is_none(),
            Value::UInt16(v) => v.is_none(),
            Value::UInt32(v) => v.is_none(),
            Value::UInt64(v) => v.is_none(),
            Value::Float32(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::TimestampWithTimezone(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// Typed null of the same variant.
    pub fn as_null(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int8(..) => Value::Int8(None),
            Value::Int16(..) => Value::Int16(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::UInt8(..) => Value::UInt8(None),
            Value::UInt16(..) => Value::UInt16(None),
            Value::UInt32(..) => Value::UInt32(None),
            Value::UInt64(..) => Value::UInt64(None),
            Value::Float32(..) => Value::Float32(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Decimal(..) => Value::Decimal(None),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
            Value::TimestampWithTimezone(..) => Value::TimestampWithTimezone(None),
            Value::Uuid(..) => Value::Uuid(None),
        }
    }

    /// Same value for columns where absent and null are interchangeable.
    pub fn same_value(&self, other: &Self) -> bool {
        match (self.is_null(), other.is_null()) {
            (true, true) => true,
            (false, false) => self == other,
            _ => false,
        }
    }

    /// Integer content of any integer variant.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match self {
            Value::Int8(Some(v)) => *v as i128,
            Value::Int16(Some(v)) => *v as i128,
            Value::Int32(Some(v)) => *v as i128,
            Value::Int64(Some(v)) => *v as i128,
            Value::UInt8(Some(v)) => *v as i128,
            Value::UInt16(Some(v)) => *v as i128,
            Value::UInt32(Some(v)) => *v as i128,
            Value::UInt64(Some(v)) => *v as i128,
            _ => return None,
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(..) => "boolean",
            Value::Int8(..) => "int8",
            Value::Int16(..) => "int16",
            Value::Int32(..) => "int32",
            Value::Int64(..) => "int64",
            Value::UInt8(..) => "uint8",
            Value::UInt16(..) => "uint16",
            Value::UInt32(..) => "uint32",
            Value::UInt64(..) => "uint64",
            Value::Float32(..) => "float32",
            Value::Float64(..) => "float64",
            Value::Decimal(..) => "decimal",
            Value::Varchar(..) => "varchar",
            Value::Blob(..) => "blob",
            Value::Date(..) => "date",
            Value::Time(..) => "time",
            Value::Timestamp(..) => "timestamp",
            Value::TimestampWithTimezone(..) => "timestamp with time zone",
            Value::Uuid(..) => "uuid",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        macro_rules! write_option {
            ($v:expr) => {
                match $v {
                    Some(v) => write!(f, "{}", v),
                    None => f.write_str("null"),
                }
            };
        }
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write_option!(v),
            Value::Int8(v) => write_option!(v),
            Value::Int16(v) => write_option!(v),
            Value::Int32(v) => write_option!(v),
            Value::Int64(v) => write_option!(v),
            Value::UInt8(v) => write_option!(v),
            Value::UInt16(v) => write_option!(v),
            Value::UInt32(v) => write_option!(v),
            Value::UInt64(v) => write_option!(v),
            Value::Float32(v) => write_option!(v),
            Value::Float64(v) => write_option!(v),
            Value::Decimal(v) => write_option!(v),
            Value::Varchar(Some(v)) => write!(f, "'{}'", v),
            Value::Varchar(None) => f.write_str("null"),
            Value::Blob(Some(v)) => write!(f, "<{} bytes>", v.len()),
            Value::Blob(None) => f.write_str("null"),
            Value::Date(v) => write_option!(v),
            Value::Time(v) => write_option!(v),
            Value::Timestamp(v) => write_option!(v),
            Value::TimestampWithTimezone(v) => write_option!(v),
            Value::Uuid(v) => write_option!(v),
        }
    }
}

/// Emits the typed null of the value, used by the derive macro to build column templates.
impl ToTokens for Value {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let variant = match self {
            Value::Null => quote!(Null),
            Value::Boolean(..) => quote!(Boolean(None)),
            Value::Int8(..) => quote!(Int8(None)),
            Value::Int16(..) => quote!(Int16(None)),
            Value::Int32(..) => quote!(Int32(None)),
            Value::Int64(..) => quote!(Int64(None)),
            Value::UInt8(..) => quote!(UInt8(None)),
            Value::UInt16(..) => quote!(UInt16(None)),
            Value::UInt32(..) => quote!(UInt32(None)),
            Value::UInt64(..) => quote!(UInt64(None)),
            Value::Float32(..) => quote!(Float32(None)),
            Value::Float64(..) => quote!(Float64(None)),
            Value::Decimal(..) => quote!(Decimal(None)),
            Value::Varchar(..) => quote!(Varchar(None)),
            Value::Blob(..) => quote!(Blob(None)),
            Value::Date(..) => quote!(Date(None)),
            Value::Time(..) => quote!(Time(None)),
            Value::Timestamp(..) => quote!(Timestamp(None)),
            Value::TimestampWithTimezone(..) => quote!(TimestampWithTimezone(None)),
            Value::Uuid(..) => quote!(Uuid(None)),
        };
        tokens.extend(quote!(::rowkit::Value::#variant));
    }
}
