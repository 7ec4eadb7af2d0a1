//! serde `Serializer` that builds a [`Value`] directly.
//!
//! `serde_json::to_value` writes NaN and infinities as `null`; this one
//! fails on them instead, naming the path of the offending field.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{self, Serialize};

use crate::codec::{self, push_path_key};
use crate::value::Value;

#[derive(Debug)]
pub(crate) struct Error {
    /// Unset until the error reaches the serializer of the failing field.
    pub(crate) path: Option<String>,
    pub(crate) reason: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for Error {}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self {
            path: None,
            reason: msg.to_string(),
        }
    }
}

pub(crate) fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value, Error> {
    child(data, String::from("$"))
}

/// Serialize `value` as the node at `path`.
fn child<T: Serialize + ?Sized>(value: &T, path: String) -> Result<Value, Error> {
    let at = path.clone();
    value.serialize(ValueSerializer { path }).map_err(|mut e| {
        if e.path.is_none() {
            e.path = Some(at);
        }
        e
    })
}

fn key_path(parent: &str, key: &str) -> String {
    let mut path = parent.to_owned();
    push_path_key(&mut path, key);
    path
}

fn tagged(variant: &str, inner: Value) -> Value {
    Value::Object(BTreeMap::from([(variant.to_owned(), inner)]))
}

struct ValueSerializer {
    path: String,
}

impl ValueSerializer {
    fn number(&self, n: f64) -> Result<Value, Error> {
        if n.is_finite() {
            Ok(Value::Number(n))
        } else {
            Err(Error {
                path: Some(self.path.clone()),
                reason: format!("{n} is not a finite number"),
            })
        }
    }
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;
    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = VariantSerializer<SeqSerializer>;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = VariantSerializer<MapSerializer>;

    fn serialize_bool(self, v: bool) -> Result<Value, Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Error> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Error> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Error> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Error> {
        Ok(Value::Number(v as f64))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Error> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Error> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Error> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Error> {
        Ok(Value::Number(v as f64))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Error> {
        self.number(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Error> {
        self.number(v)
    }

    fn serialize_char(self, v: char) -> Result<Value, Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Error> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Error> {
        Ok(Value::Array(v.iter().map(|b| Value::Number((*b).into())).collect()))
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(self, _name: &'static str, value: &T) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        let inner = child(value, key_path(&self.path, variant))?;
        Ok(tagged(variant, inner))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer, Error> {
        Ok(SeqSerializer {
            path: self.path,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqSerializer, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSerializer<SeqSerializer>, Error> {
        Ok(VariantSerializer {
            variant,
            inner: SeqSerializer {
                path: key_path(&self.path, variant),
                items: Vec::with_capacity(len),
            },
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapSerializer, Error> {
        Ok(MapSerializer::at(self.path))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<MapSerializer, Error> {
        Ok(MapSerializer::at(self.path))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantSerializer<MapSerializer>, Error> {
        Ok(VariantSerializer {
            variant,
            inner: MapSerializer::at(key_path(&self.path, variant)),
        })
    }
}

struct SeqSerializer {
    path: String,
    items: Vec<Value>,
}

impl SeqSerializer {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let path = format!("{}[{}]", self.path, self.items.len());
        self.items.push(child(value, path)?);
        Ok(())
    }
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

struct MapSerializer {
    path: String,
    entries: BTreeMap<String, Value>,
    next_key: Option<String>,
}

impl MapSerializer {
    fn at(path: String) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
            next_key: None,
        }
    }

    fn insert<T: Serialize + ?Sized>(&mut self, key: String, value: &T) -> Result<(), Error> {
        let value = child(value, key_path(&self.path, &key))?;
        self.entries.insert(key, value);
        Ok(())
    }

    fn fail(&self, reason: String) -> Error {
        Error {
            path: Some(self.path.clone()),
            reason,
        }
    }
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Error> {
        // Same key forms serde_json accepts: strings, plus numbers and bools written as text.
        let key = match child(key, self.path.clone())? {
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            number @ Value::Number(_) => codec::encode(&number).map_err(|e| self.fail(e.to_string()))?,
            other => return Err(self.fail(format!("object keys must be strings, not {}", other.kind_name()))),
        };
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| self.fail("map value serialized before its key".into()))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Object(self.entries))
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Error> {
        self.insert(key.to_owned(), value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Object(self.entries))
    }
}

struct VariantSerializer<S> {
    variant: &'static str,
    inner: S,
}

impl ser::SerializeTupleVariant for VariantSerializer<SeqSerializer> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        self.inner.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(tagged(self.variant, Value::Array(self.inner.items)))
    }
}

impl ser::SerializeStructVariant for VariantSerializer<MapSerializer> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Error> {
        self.inner.insert(key.to_owned(), value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(tagged(self.variant, Value::Object(self.inner.entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Point {
        x: f64,
        y: f32,
    }

    #[derive(Serialize)]
    struct Shape {
        name: String,
        points: Vec<Point>,
        tag: Option<u8>,
    }

    #[derive(Serialize)]
    enum Event {
        Ping,
        Moved(Point),
        Resized { w: u32, h: u32 },
        Pair(i64, bool),
    }

    #[test]
    fn test_struct_matches_serde_json() {
        let shape = Shape {
            name: "tri".into(),
            points: vec![Point { x: 1.0, y: 2.5 }],
            tag: None,
        };
        let ours = to_value(&shape).unwrap();
        let theirs = codec::from_json(serde_json::to_value(&shape).unwrap()).unwrap();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn test_enum_forms_match_serde_json() {
        let events = [
            Event::Ping,
            Event::Moved(Point { x: 0.5, y: 1.0 }),
            Event::Resized { w: 3, h: 4 },
            Event::Pair(-7, true),
        ];
        for event in events {
            let theirs = codec::from_json(serde_json::to_value(&event).unwrap()).unwrap();
            assert_eq!(to_value(&event).unwrap(), theirs);
        }
    }

    #[test]
    fn test_nan_rejected_with_field_path() {
        let shape = Shape {
            name: "bad".into(),
            points: vec![Point { x: 0.0, y: 0.0 }, Point { x: 0.0, y: f32::NAN }],
            tag: Some(1),
        };
        let err = to_value(&shape).unwrap_err();
        assert_eq!(err.path.as_deref(), Some("$.points[1].y"));
        assert!(err.reason.contains("NaN"));
    }

    #[test]
    fn test_infinity_in_variant_rejected() {
        let err = to_value(&Event::Moved(Point { x: f64::INFINITY, y: 0.0 })).unwrap_err();
        assert_eq!(err.path.as_deref(), Some("$.Moved.x"));
    }

    #[test]
    fn test_numeric_map_keys_become_text() {
        let map = HashMap::from([(1u32, "one"), (20u32, "twenty")]);
        let value = to_value(&map).unwrap();
        assert_eq!(value.get("1"), Some(&Value::from("one")));
        assert_eq!(value.get("20"), Some(&Value::from("twenty")));
    }

    #[test]
    fn test_non_scalar_map_key_rejected() {
        let map = BTreeMap::from([(vec![1u8], 1u8)]);
        let err = to_value(&map).unwrap_err();
        assert!(err.reason.contains("object keys must be strings"), "{}", err.reason);
        assert_eq!(err.path.as_deref(), Some("$"));
    }
}
