//! # Protobuf JSON
//!
//! `prost-reflect` resolves the `@type` of a `google.protobuf.Any` by the last segment of its URL,
//! which only works when the URL ends with the type name. Type URLs are registry aliases here, so
//! messages are walked field by field:
//!
//! * Fields holding messages are converted recursively, and every `Any` is resolved through
//!   [`TypeRegistry::find_by_url`](super::registry::TypeRegistry::find_by_url).
//! * Scalar, enum and well-known type fields are delegated to `prost-reflect`, one field at a time.
use super::{ANY_TYPE, Codec, CodecError, any_parts, decode, new_any};
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, ReflectMessage, Value};
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

const TYPE_KEY: &str = "@type";
const VALUE_KEY: &str = "value";

/// Well-known types with a dedicated JSON form, nested under `"value"` inside an `Any`.
fn is_well_known_type(name: &str) -> bool {
    matches!(
        name,
        "google.protobuf.Any"
            | "google.protobuf.Timestamp"
            | "google.protobuf.Duration"
            | "google.protobuf.Struct"
            | "google.protobuf.FloatValue"
            | "google.protobuf.DoubleValue"
            | "google.protobuf.Int32Value"
            | "google.protobuf.Int64Value"
            | "google.protobuf.UInt32Value"
            | "google.protobuf.UInt64Value"
            | "google.protobuf.BoolValue"
            | "google.protobuf.StringValue"
            | "google.protobuf.BytesValue"
            | "google.protobuf.FieldMask"
            | "google.protobuf.ListValue"
            | "google.protobuf.Value"
            | "google.protobuf.Empty"
    )
}

/// Whether the field stores messages: a message field, a list of messages or a map with
/// message values.
fn holds_messages(field: &FieldDescriptor) -> bool {
    match field.kind() {
        Kind::Message(entry) if field.is_map() => {
            entry.map_entry_value_field().kind().as_message().is_some()
        }
        Kind::Message(_) => true,
        _ => false,
    }
}

fn invalid(type_name: &str, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidJson {
        type_name: type_name.to_string(),
        reason: reason.into(),
    }
}

pub(super) fn to_json(codec: &Codec, message: &DynamicMessage) -> Result<Json, CodecError> {
    let descriptor = message.descriptor();
    let type_name = descriptor.full_name();

    if type_name == ANY_TYPE {
        return any_to_json(codec, message);
    }
    if is_well_known_type(type_name) {
        return serialize(message);
    }

    let mut object = Map::new();

    for (field, value) in message.fields() {
        match value {
            Value::Message(_) | Value::List(_) | Value::Map(_) if holds_messages(&field) => {
                object.insert(
                    field.json_name().to_string(),
                    nested_to_json(codec, type_name, value)?,
                );
            }
            _ => {
                let mut single = DynamicMessage::new(descriptor.clone());
                single
                    .try_set_field(&field, value.clone())
                    .map_err(|e| invalid(type_name, e.to_string()))?;
                object.extend(serialize_fields(&single)?);
            }
        }
    }

    for (extension, value) in message.extensions() {
        let mut single = DynamicMessage::new(descriptor.clone());
        single.set_extension(&extension, value.clone());
        object.extend(serialize_fields(&single)?);
    }

    Ok(Json::Object(object))
}

fn nested_to_json(codec: &Codec, parent: &str, value: &Value) -> Result<Json, CodecError> {
    match value {
        Value::Message(nested) => to_json(codec, nested),
        Value::List(items) => items
            .iter()
            .map(|item| nested_to_json(codec, parent, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array),
        Value::Map(entries) => entries
            .iter()
            .map(|(key, item)| Ok((map_key_to_string(key), nested_to_json(codec, parent, item)?)))
            .collect::<Result<Map<_, _>, CodecError>>()
            .map(Json::Object),
        other => Err(invalid(parent, format!("expected a message, found {other:?}"))),
    }
}

fn any_to_json(codec: &Codec, any: &DynamicMessage) -> Result<Json, CodecError> {
    let (type_url, value) = any_parts(any)?;
    let payload = decode(codec.registry.find_by_url(&type_url)?, &value)?;
    let payload_json = to_json(codec, &payload)?;

    let mut object = Map::new();
    object.insert(TYPE_KEY.to_string(), Json::String(type_url));

    match payload_json {
        Json::Object(fields) if !is_well_known_type(payload.descriptor().full_name()) => {
            object.extend(fields)
        }
        other => {
            object.insert(VALUE_KEY.to_string(), other);
        }
    }

    Ok(Json::Object(object))
}

fn serialize(message: &DynamicMessage) -> Result<Json, CodecError> {
    serde_json::to_value(message).map_err(|source| CodecError::Json {
        type_name: message.descriptor().full_name().to_string(),
        source,
    })
}

fn serialize_fields(message: &DynamicMessage) -> Result<Map<String, Json>, CodecError> {
    match serialize(message)? {
        Json::Object(fields) => Ok(fields),
        _ => Ok(Map::new()),
    }
}

fn map_key_to_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(v) => v.clone(),
    }
}

pub(super) fn from_json(
    codec: &Codec,
    descriptor: MessageDescriptor,
    json: Json,
) -> Result<DynamicMessage, CodecError> {
    let type_name = descriptor.full_name().to_string();

    if type_name == ANY_TYPE {
        return any_from_json(codec, descriptor, json);
    }

    let object = match json {
        Json::Object(object) if !is_well_known_type(&type_name) => object,
        other => return deserialize(descriptor, other),
    };

    let mut rest = Map::new();
    let mut walked = Vec::new();

    for (key, value) in object {
        let field = descriptor
            .get_field_by_json_name(&key)
            .or_else(|| descriptor.get_field_by_name(&key));

        match field {
            Some(field) if holds_messages(&field) && !value.is_null() => {
                let value = nested_from_json(codec, &field, value)?;
                walked.push((field, value));
            }
            _ => {
                rest.insert(key, value);
            }
        }
    }

    let mut message = deserialize(descriptor, Json::Object(rest))?;
    for (field, value) in walked {
        message
            .try_set_field(&field, value)
            .map_err(|e| invalid(&type_name, e.to_string()))?;
    }

    Ok(message)
}

fn nested_from_json(codec: &Codec, field: &FieldDescriptor, json: Json) -> Result<Value, CodecError> {
    let kind = field.kind();
    let Some(descriptor) = kind.as_message() else {
        return Err(invalid(field.full_name(), "expected a message field"));
    };

    if field.is_map() {
        let key_kind = descriptor.map_entry_key_field().kind();
        let value_kind = descriptor.map_entry_value_field().kind();
        let Some(value_descriptor) = value_kind.as_message() else {
            return Err(invalid(field.full_name(), "expected message map values"));
        };
        let Json::Object(entries) = json else {
            return Err(invalid(field.full_name(), "expected a JSON object"));
        };

        let mut map = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            let key = parse_map_key(&key_kind, &key)
                .ok_or_else(|| invalid(field.full_name(), format!("invalid map key '{key}'")))?;
            let value = from_json(codec, value_descriptor.clone(), value)?;
            map.insert(key, Value::Message(value));
        }
        return Ok(Value::Map(map));
    }

    if field.is_list() {
        let Json::Array(items) = json else {
            return Err(invalid(field.full_name(), "expected a JSON array"));
        };
        return items
            .into_iter()
            .map(|item| from_json(codec, descriptor.clone(), item).map(Value::Message))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List);
    }

    from_json(codec, descriptor.clone(), json).map(Value::Message)
}

fn any_from_json(
    codec: &Codec,
    any_descriptor: MessageDescriptor,
    json: Json,
) -> Result<DynamicMessage, CodecError> {
    let Json::Object(mut object) = json else {
        return Err(invalid(ANY_TYPE, "expected a JSON object"));
    };

    let type_url = match object.remove(TYPE_KEY) {
        Some(Json::String(url)) => url,
        _ => return Err(CodecError::MalformedAny(TYPE_KEY)),
    };

    let descriptor = codec.registry.find_by_url(&type_url)?;
    let payload_json = if is_well_known_type(descriptor.full_name()) {
        object.remove(VALUE_KEY).unwrap_or(Json::Null)
    } else {
        Json::Object(object)
    };

    let payload = from_json(codec, descriptor, payload_json)?;
    new_any(any_descriptor, &type_url, &payload)
}

fn deserialize(descriptor: MessageDescriptor, json: Json) -> Result<DynamicMessage, CodecError> {
    let type_name = descriptor.full_name().to_string();
    DynamicMessage::deserialize(descriptor, json)
        .map_err(|source| CodecError::Json { type_name, source })
}

fn parse_map_key(kind: &Kind, key: &str) -> Option<MapKey> {
    match kind {
        Kind::Bool => match key {
            "true" => Some(MapKey::Bool(true)),
            "false" => Some(MapKey::Bool(false)),
            _ => None,
        },
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => key.parse().ok().map(MapKey::I32),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => key.parse().ok().map(MapKey::I64),
        Kind::Uint32 | Kind::Fixed32 => key.parse().ok().map(MapKey::U32),
        Kind::Uint64 | Kind::Fixed64 => key.parse().ok().map(MapKey::U64),
        Kind::String => Some(MapKey::String(key.to_string())),
        _ => None,
    }
}
