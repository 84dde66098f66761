//! Transport-safety guard for values crossing a realm boundary.
//!
//! `serde_json` quietly turns non-finite floats into `null`. Values are
//! walked with [`TransportCheck`] first so such data fails loudly with a
//! serialization error instead of arriving altered on the other side.

use std::fmt;

use pixiebrix_protocols::MessengerError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::ser;
use serde_json::Value;

/// Nesting limit for transported values.
pub const MAX_DEPTH: usize = 128;

/// Convert a value to its transport form, rejecting anything that would
/// not survive the trip unchanged.
pub fn to_transport<T: Serialize + ?Sized>(value: &T) -> Result<Value, MessengerError> {
    value
        .serialize(TransportCheck::root())
        .map_err(|e| MessengerError::Serialization(e.to_string()))?;
    Ok(serde_json::to_value(value)?)
}

/// Rebuild a typed value from its transport form.
pub fn from_transport<T: DeserializeOwned>(value: Value) -> Result<T, MessengerError> {
    Ok(serde_json::from_value(value)?)
}

#[derive(Debug)]
pub struct UnsafeValue {
    path: Vec<String>,
    reason: String,
}

impl UnsafeValue {
    fn within(mut self, segment: impl fmt::Display) -> Self {
        self.path.push(segment.to_string());
        self
    }
}

impl fmt::Display for UnsafeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str(&self.reason);
        }
        let path: Vec<&str> = self.path.iter().rev().map(String::as_str).collect();
        write!(f, "{} at {}", self.reason, path.join("."))
    }
}

impl std::error::Error for UnsafeValue {}

impl ser::Error for UnsafeValue {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self {
            path: Vec::new(),
            reason: msg.to_string(),
        }
    }
}

/// Serializer that produces nothing and only validates.
pub struct TransportCheck {
    depth: usize,
    index: usize,
}

impl TransportCheck {
    fn root() -> Self {
        Self { depth: 0, index: 0 }
    }

    fn nested(&self) -> Result<Self, UnsafeValue> {
        if self.depth >= MAX_DEPTH {
            return Err(ser::Error::custom(format!(
                "value nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        Ok(Self {
            depth: self.depth + 1,
            index: 0,
        })
    }

    fn child(&self) -> Self {
        Self {
            depth: self.depth,
            index: 0,
        }
    }

    fn element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), UnsafeValue> {
        let index = self.index;
        self.index += 1;
        value.serialize(self.child()).map_err(|e| e.within(index))
    }
}

fn finite(value: f64) -> Result<(), UnsafeValue> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ser::Error::custom(format!(
            "{} is not a transport-safe number",
            value
        )))
    }
}

impl ser::Serializer for TransportCheck {
    type Ok = ();
    type Error = UnsafeValue;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _v: bool) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_i8(self, _v: i8) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_i16(self, _v: i16) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_i32(self, _v: i32) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_i64(self, _v: i64) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_i128(self, _v: i128) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_u8(self, _v: u8) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_u16(self, _v: u16) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_u32(self, _v: u32) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_u64(self, _v: u64) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_u128(self, _v: u128) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<(), UnsafeValue> {
        finite(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<(), UnsafeValue> {
        finite(v)
    }

    fn serialize_char(self, _v: char) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_str(self, _v: &str) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_none(self) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), UnsafeValue> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), UnsafeValue> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), UnsafeValue> {
        value
            .serialize(self.nested()?)
            .map_err(|e| e.within(variant))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, UnsafeValue> {
        self.nested()
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, UnsafeValue> {
        self.nested()
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self, UnsafeValue> {
        self.nested()
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, UnsafeValue> {
        self.nested()
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, UnsafeValue> {
        self.nested()
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, UnsafeValue> {
        self.nested()
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, UnsafeValue> {
        self.nested()
    }
}

impl ser::SerializeSeq for TransportCheck {
    type Ok = ();
    type Error = UnsafeValue;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), UnsafeValue> {
        self.element(value)
    }

    fn end(self) -> Result<(), UnsafeValue> {
        Ok(())
    }
}

impl ser::SerializeTuple for TransportCheck {
    type Ok = ();
    type Error = UnsafeValue;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), UnsafeValue> {
        self.element(value)
    }

    fn end(self) -> Result<(), UnsafeValue> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for TransportCheck {
    type Ok = ();
    type Error = UnsafeValue;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), UnsafeValue> {
        self.element(value)
    }

    fn end(self) -> Result<(), UnsafeValue> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for TransportCheck {
    type Ok = ();
    type Error = UnsafeValue;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), UnsafeValue> {
        self.element(value)
    }

    fn end(self) -> Result<(), UnsafeValue> {
        Ok(())
    }
}

impl ser::SerializeMap for TransportCheck {
    type Ok = ();
    type Error = UnsafeValue;

    // Key types are left to serde_json, which rejects non-string keys itself.
    fn serialize_key<T: Serialize + ?Sized>(&mut self, _key: &T) -> Result<(), UnsafeValue> {
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), UnsafeValue> {
        value.serialize(self.child())
    }

    fn serialize_entry<K, V>(&mut self, key: &K, value: &V) -> Result<(), UnsafeValue>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        ser::SerializeMap::serialize_key(self, key)?;
        let label = serde_json::to_value(key)
            .ok()
            .and_then(|k| k.as_str().map(str::to_string))
            .unwrap_or_else(|| "<key>".to_string());
        ser::SerializeMap::serialize_value(self, value).map_err(|e| e.within(label))
    }

    fn end(self) -> Result<(), UnsafeValue> {
        Ok(())
    }
}

impl ser::SerializeStruct for TransportCheck {
    type Ok = ();
    type Error = UnsafeValue;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), UnsafeValue> {
        value.serialize(self.child()).map_err(|e| e.within(key))
    }

    fn end(self) -> Result<(), UnsafeValue> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for TransportCheck {
    type Ok = ();
    type Error = UnsafeValue;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), UnsafeValue> {
        value.serialize(self.child()).map_err(|e| e.within(key))
    }

    fn end(self) -> Result<(), UnsafeValue> {
        Ok(())
    }
}
