//! Coercing strongly-typed Rust values into storable SQL scalars.

use core::fmt::{self, Display, Formatter};
use core::num::{
    NonZeroI8,
    NonZeroU8,
    NonZeroI16,
    NonZeroU16,
    NonZeroI32,
    NonZeroU32,
    NonZeroI64,
    NonZeroU64,
};
use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;
use rusqlite::types::Value;
use crate::error::{Error, Result};


/// The basic kind of a value, as far as the statement compiler is concerned.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Kind {
    Null,
    String,
    Number,
    Boolean,
    Date,
    Object,
}

impl Kind {
    /// Classifies an already-storable, dynamically-typed value.
    ///
    /// Booleans and dates are stored as integers, so they come back as
    /// `Number`; blobs are opaque and come back as `Object`.
    pub const fn of(value: &Value) -> Self {
        match *value {
            Value::Null       => Kind::Null,
            Value::Integer(_) => Kind::Number,
            Value::Real(_)    => Kind::Number,
            Value::Text(_)    => Kind::String,
            Value::Blob(_)    => Kind::Object,
        }
    }
}

impl Display for Kind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match *self {
            Kind::Null    => "null",
            Kind::String  => "string",
            Kind::Number  => "number",
            Kind::Boolean => "boolean",
            Kind::Date    => "date",
            Kind::Object  => "object",
        })
    }
}

/// Describes values that can be bound as a parameter of a compiled statement.
///
/// Implementations classify themselves into a [`Kind`] and convert
/// themselves to a [`Value`] that SQLite can store: objects are
/// serialized to text, dates become integer epoch milliseconds, and
/// everything else passes through as the obvious primitive.
pub trait Scalar {
    /// The kind of this particular value.
    fn kind(&self) -> Kind;

    /// Converts this value to its storable representation.
    fn to_storable(&self) -> Result<Value>;
}

/// A [`Scalar`] whose kind is known statically. This is what column
/// metadata records for every mapped field.
pub trait ScalarType: Scalar {
    /// The kind of every value of this type (other than `NULL`).
    const KIND: Kind;
}

/// Converts an auto-generated integer key back into the type of a key field.
pub trait FromKey: Sized {
    /// Performs the conversion, failing if the key is out of range.
    fn from_key(key: i64) -> Result<Self>;
}

macro_rules! impl_scalar_for_integer {
    ($($ty:ty,)*) => {$(
        impl Scalar for $ty {
            fn kind(&self) -> Kind {
                Kind::Number
            }

            fn to_storable(&self) -> Result<Value> {
                i64::try_from(*self).map(Value::Integer).map_err(Error::other)
            }
        }

        impl ScalarType for $ty {
            const KIND: Kind = Kind::Number;
        }

        impl FromKey for $ty {
            fn from_key(key: i64) -> Result<Self> {
                <$ty>::try_from(key).map_err(Error::other)
            }
        }
    )*}
}

impl_scalar_for_integer!{
    i8,
    u8,
    i16,
    u16,
    i32,
    u32,
    i64,
    u64,
    isize,
    usize,
}

macro_rules! impl_scalar_for_nonzero {
    ($($ty:ty,)*) => {$(
        impl Scalar for $ty {
            fn kind(&self) -> Kind {
                Kind::Number
            }

            fn to_storable(&self) -> Result<Value> {
                self.get().to_storable()
            }
        }

        impl ScalarType for $ty {
            const KIND: Kind = Kind::Number;
        }
    )*}
}

impl_scalar_for_nonzero!{
    NonZeroI8,
    NonZeroU8,
    NonZeroI16,
    NonZeroU16,
    NonZeroI32,
    NonZeroU32,
    NonZeroI64,
    NonZeroU64,
}

impl Scalar for f32 {
    fn kind(&self) -> Kind {
        Kind::Number
    }

    fn to_storable(&self) -> Result<Value> {
        Ok(Value::Real(f64::from(*self)))
    }
}

impl ScalarType for f32 {
    const KIND: Kind = Kind::Number;
}

impl Scalar for f64 {
    fn kind(&self) -> Kind {
        Kind::Number
    }

    fn to_storable(&self) -> Result<Value> {
        Ok(Value::Real(*self))
    }
}

impl ScalarType for f64 {
    const KIND: Kind = Kind::Number;
}

impl Scalar for bool {
    fn kind(&self) -> Kind {
        Kind::Boolean
    }

    fn to_storable(&self) -> Result<Value> {
        Ok(Value::Integer(i64::from(*self)))
    }
}

impl ScalarType for bool {
    const KIND: Kind = Kind::Boolean;
}

impl Scalar for str {
    fn kind(&self) -> Kind {
        Kind::String
    }

    fn to_storable(&self) -> Result<Value> {
        Ok(Value::Text(self.to_owned()))
    }
}

impl Scalar for String {
    fn kind(&self) -> Kind {
        Kind::String
    }

    fn to_storable(&self) -> Result<Value> {
        Ok(Value::Text(self.clone()))
    }
}

impl ScalarType for String {
    const KIND: Kind = Kind::String;
}

impl Scalar for [u8] {
    fn kind(&self) -> Kind {
        Kind::Object
    }

    fn to_storable(&self) -> Result<Value> {
        Ok(Value::Blob(self.to_vec()))
    }
}

impl Scalar for Vec<u8> {
    fn kind(&self) -> Kind {
        Kind::Object
    }

    fn to_storable(&self) -> Result<Value> {
        Ok(Value::Blob(self.clone()))
    }
}

impl ScalarType for Vec<u8> {
    const KIND: Kind = Kind::Object;
}

impl Scalar for Value {
    fn kind(&self) -> Kind {
        Kind::of(self)
    }

    fn to_storable(&self) -> Result<Value> {
        Ok(self.clone())
    }
}

impl<T: Scalar> Scalar for Option<T> {
    fn kind(&self) -> Kind {
        self.as_ref().map_or(Kind::Null, Scalar::kind)
    }

    fn to_storable(&self) -> Result<Value> {
        self.as_ref().map_or(Ok(Value::Null), Scalar::to_storable)
    }
}

impl<T: ScalarType> ScalarType for Option<T> {
    const KIND: Kind = T::KIND;
}

impl<T: FromKey> FromKey for Option<T> {
    fn from_key(key: i64) -> Result<Self> {
        T::from_key(key).map(Some)
    }
}

impl<T> Scalar for Cow<'_, T>
where
    T: ?Sized + ToOwned + Scalar,
{
    fn kind(&self) -> Kind {
        T::kind(self)
    }

    fn to_storable(&self) -> Result<Value> {
        T::to_storable(self)
    }
}

macro_rules! impl_scalar_for_wrapper {
    ($($ty:ty;)*) => {$(
        impl<T: ?Sized + Scalar> Scalar for $ty {
            fn kind(&self) -> Kind {
                T::kind(&**self)
            }

            fn to_storable(&self) -> Result<Value> {
                T::to_storable(&**self)
            }
        }
    )*}
}

impl_scalar_for_wrapper! {
    &T;
    &mut T;
    Box<T>;
    Rc<T>;
    Arc<T>;
}

#[cfg(feature = "chrono")]
mod chrono_impls {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
    use super::*;

    impl<Tz: TimeZone> Scalar for DateTime<Tz> {
        fn kind(&self) -> Kind {
            Kind::Date
        }

        fn to_storable(&self) -> Result<Value> {
            Ok(Value::Integer(self.timestamp_millis()))
        }
    }

    impl<Tz: TimeZone> ScalarType for DateTime<Tz> {
        const KIND: Kind = Kind::Date;
    }

    /// Naive date-times are interpreted as UTC.
    impl Scalar for NaiveDateTime {
        fn kind(&self) -> Kind {
            Kind::Date
        }

        fn to_storable(&self) -> Result<Value> {
            Ok(Value::Integer(self.and_utc().timestamp_millis()))
        }
    }

    impl ScalarType for NaiveDateTime {
        const KIND: Kind = Kind::Date;
    }

    /// A calendar date is stored as UTC midnight of that day.
    impl Scalar for NaiveDate {
        fn kind(&self) -> Kind {
            Kind::Date
        }

        fn to_storable(&self) -> Result<Value> {
            let midnight = self.and_hms_opt(0, 0, 0).ok_or_else(|| {
                Error::message(format_args!("date `{self}` has no midnight"))
            })?;

            midnight.to_storable()
        }
    }

    impl ScalarType for NaiveDate {
        const KIND: Kind = Kind::Date;
    }
}

#[cfg(feature = "uuid")]
mod uuid_impls {
    use uuid::Uuid;
    use super::*;

    impl Scalar for Uuid {
        fn kind(&self) -> Kind {
            Kind::String
        }

        fn to_storable(&self) -> Result<Value> {
            Ok(Value::Text(self.hyphenated().to_string()))
        }
    }

    impl ScalarType for Uuid {
        const KIND: Kind = Kind::String;
    }
}

#[cfg(feature = "json")]
mod json_impls {
    use serde_json::Value as JsonValue;
    use super::*;

    /// JSON is always serialized to text, even for scalar JSON values,
    /// so that it round-trips through a `TEXT` column unambiguously.
    impl Scalar for JsonValue {
        fn kind(&self) -> Kind {
            Kind::Object
        }

        fn to_storable(&self) -> Result<Value> {
            Ok(Value::Text(self.to_string()))
        }
    }

    impl ScalarType for JsonValue {
        const KIND: Kind = Kind::Object;
    }
}
