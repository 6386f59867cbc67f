//! Conversion of raw response text into primitive values.
//!
//! Used when the declared response content type is neither JSON nor XML.
//! Only scalar shapes are accepted: strings, chars, booleans, numbers,
//! unit enum variants, `Option` and newtype wrappers around those.

use std::fmt;

use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};

/// Raw text could not be converted into the requested type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ConversionError(String);

impl de::Error for ConversionError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Converts `text` into `T` using the plain-text rules above.
pub(crate) fn from_text<T: DeserializeOwned>(text: &str) -> Result<T, ConversionError> {
    T::deserialize(PlainText(text))
}

struct PlainText<'de>(&'de str);

impl PlainText<'_> {
    fn unsupported(&self, shape: &str) -> ConversionError {
        ConversionError(format!("plain text cannot be converted into {shape}"))
    }
}

macro_rules! parse_number {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                let value = self.0.trim().parse::<$ty>().map_err(|err| {
                    ConversionError(format!(
                        "cannot convert '{}' into {}: {err}",
                        self.0,
                        stringify!($ty)
                    ))
                })?;
                visitor.$visit(value)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for PlainText<'de> {
    type Error = ConversionError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_borrowed_str(self.0)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let text = self.0.trim();
        if text.eq_ignore_ascii_case("true") {
            visitor.visit_bool(true)
        } else if text.eq_ignore_ascii_case("false") {
            visitor.visit_bool(false)
        } else {
            Err(ConversionError(format!("cannot convert '{}' into bool", self.0)))
        }
    }

    parse_number! {
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_f32 => visit_f32(f32),
        deserialize_f64 => visit_f64(f64),
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        if self.0.trim().is_empty() {
            visitor.visit_unit()
        } else {
            Err(self.unsupported("unit"))
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let variant: de::value::StrDeserializer<'_, ConversionError> =
            self.0.trim().into_deserializer();
        visitor.visit_enum(variant)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("bytes"))
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("bytes"))
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported(name))
    }

    fn deserialize_seq<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("a sequence"))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("a tuple"))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported(name))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("a map"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported(name))
    }

    serde::forward_to_deserialize_any! {
        char str string identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Deserialize;

    use super::from_text;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Health {
        Up,
        Down,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ticket(u64);

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Shape {
        a: i32,
    }

    #[test]
    fn converts_scalars() {
        assert_eq!(from_text::<String>("hello").unwrap(), "hello");
        assert_eq!(from_text::<i32>(" 42\n").unwrap(), 42);
        assert_eq!(from_text::<f64>("1.5").unwrap(), 1.5);
        assert!(from_text::<bool>("True").unwrap());
        assert_eq!(from_text::<char>("x").unwrap(), 'x');
    }

    #[test]
    fn converts_enums_and_wrappers() {
        assert_eq!(from_text::<Health>("up").unwrap(), Health::Up);
        assert_eq!(from_text::<Health>("down\n").unwrap(), Health::Down);
        assert_eq!(from_text::<Ticket>("9").unwrap(), Ticket(9));
        assert_eq!(from_text::<Option<u8>>("7").unwrap(), Some(7));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = from_text::<u8>("300").expect_err("must overflow");
        assert!(err.to_string().contains("u8"));
        assert!(from_text::<bool>("yes").is_err());
        assert!(from_text::<Health>("sideways").is_err());
    }

    #[test]
    fn conversion_error_is_a_std_error() {
        let err: Box<dyn std::error::Error + Send + Sync> =
            Box::new(from_text::<i64>("abc").expect_err("not a number"));
        assert!(err.to_string().starts_with("cannot convert 'abc' into i64"));
        assert!(err.source().is_none());
    }

    #[test]
    fn rejects_structured_targets() {
        let err = from_text::<Shape>("{\"a\":1}").expect_err("structs are unsupported");
        assert!(err.to_string().contains("Shape"));
        assert!(from_text::<Vec<u8>>("1,2").is_err());
        assert!(from_text::<HashMap<String, String>>("a=b").is_err());
    }
}
