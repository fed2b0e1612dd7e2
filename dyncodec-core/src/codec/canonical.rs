//! # Canonical binary encoding
//!
//! `DynamicMessage` keeps map fields in hash maps, so its own encoder emits map entries in
//! arbitrary order. The codec needs reproducible bytes for a given value (they get hashed and
//! signed), so this module re-emits a message field by field:
//!
//! * Fields and extensions in ascending field number.
//! * Map entries sorted by key.
//! * Nested messages, list elements and map values encoded canonically, recursively.
//!
//! Scalars and packed lists are delegated to `prost-reflect` one field at a time, which is
//! already deterministic. Unknown fields are not re-emitted.
use prost::Message;
use prost::encoding::{WireType, encode_key, encode_varint};
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MapKey, ReflectMessage, Value};

pub(crate) fn encode(message: &DynamicMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_into(message, &mut buf);
    buf
}

fn encode_into(message: &DynamicMessage, buf: &mut Vec<u8>) {
    let mut fields: Vec<(FieldDescriptor, &Value)> = message.fields().collect();
    fields.sort_by_key(|(field, _)| field.number());

    let mut extensions: Vec<_> = message.extensions().collect();
    extensions.sort_by_key(|(extension, _)| extension.number());

    for (field, value) in fields {
        encode_field(message, &field, value, buf);
    }

    for (extension, value) in extensions {
        let mut single = DynamicMessage::new(message.descriptor());
        single.set_extension(&extension, value.clone());
        single.encode_raw(buf);
    }
}

fn encode_field(parent: &DynamicMessage, field: &FieldDescriptor, value: &Value, buf: &mut Vec<u8>) {
    match (field.kind(), value) {
        (Kind::Message(entry), Value::Map(map)) if field.is_map() => {
            let key_field = entry.map_entry_key_field();
            let value_field = entry.map_entry_value_field();

            let mut entries: Vec<(&MapKey, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            for (key, value) in entries {
                let mut item = DynamicMessage::new(entry.clone());
                item.set_field(&key_field, map_key_value(key));
                item.set_field(&value_field, value.clone());
                encode_nested(field.number(), &item, buf);
            }
        }
        (Kind::Message(_), Value::List(items)) if !field.is_group() => {
            for item in items {
                if let Value::Message(item) = item {
                    encode_nested(field.number(), item, buf);
                }
            }
        }
        (Kind::Message(_), Value::Message(nested)) if !field.is_group() => {
            encode_nested(field.number(), nested, buf);
        }
        _ => {
            let mut single = DynamicMessage::new(parent.descriptor());
            single.set_field(field, value.clone());
            single.encode_raw(buf);
        }
    }
}

fn encode_nested(number: u32, message: &DynamicMessage, buf: &mut Vec<u8>) {
    let body = encode(message);
    encode_key(number, WireType::LengthDelimited, buf);
    encode_varint(body.len() as u64, buf);
    buf.extend_from_slice(&body);
}

fn map_key_value(key: &MapKey) -> Value {
    match key {
        MapKey::Bool(v) => Value::Bool(*v),
        MapKey::I32(v) => Value::I32(*v),
        MapKey::I64(v) => Value::I64(*v),
        MapKey::U32(v) => Value::U32(*v),
        MapKey::U64(v) => Value::U64(*v),
        MapKey::String(v) => Value::String(v.clone()),
    }
}
