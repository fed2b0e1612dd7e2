//! # Codec
//!
//! The immutable result of a successful build. A [`Codec`] bundles the [`TypeRegistry`] with
//! binary and JSON entry points, all of which resolve `google.protobuf.Any` payloads through the
//! registry's type URL aliases.
//!
//! * **Binary marshal** is canonical: the same message value always produces the same bytes.
//! * **Binary unmarshal** verifies that every nested `Any` names a registered type URL and that
//!   its payload decodes as that type.
//! * **JSON** follows the canonical protobuf JSON mapping, with `Any` resolved through the same
//!   aliases as binary.
//!
//! A codec is cheap to clone and safe to share between tasks.
pub mod builder;
mod canonical;
mod json;
pub mod registry;
pub mod types;

use prost::bytes::Bytes;
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage, Value};
use registry::{RegistryError, TypeRegistry};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

const ANY_TYPE: &str = "google.protobuf.Any";

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to decode '{type_name}': '{source}'")]
    Decode {
        type_name: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("Invalid JSON for '{type_name}': '{source}'")]
    Json {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid JSON for '{type_name}': {reason}")]
    InvalidJson { type_name: String, reason: String },

    #[error("Message '{0}' is not a google.protobuf.Any")]
    NotAny(String),

    #[error("Malformed google.protobuf.Any: missing '{0}'")]
    MalformedAny(&'static str),

    #[error("Type URL '{url}' is registered for '{registered}', not '{given}'")]
    AnyTypeMismatch {
        url: String,
        registered: String,
        given: String,
    },

    #[error("Decoder panicked while processing '{type_name}': {message}")]
    Panicked { type_name: String, message: String },
}

#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<TypeRegistry>,
}

impl Codec {
    pub(crate) fn new(registry: TypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Encodes `message` canonically: fields, extensions and map entries in ascending order.
    pub fn marshal_binary(&self, message: &DynamicMessage) -> Vec<u8> {
        canonical::encode(message)
    }

    /// Decodes `bytes` as the message `type_name`.
    ///
    /// Every `google.protobuf.Any` found in the result, at any depth, must carry a type URL
    /// known to the registry and a payload that decodes as the aliased type.
    pub fn unmarshal_binary(
        &self,
        bytes: &[u8],
        type_name: &str,
    ) -> Result<DynamicMessage, CodecError> {
        let descriptor = self.registry.find_message(type_name)?;
        let message = decode(descriptor, bytes)?;
        self.verify_anys(&message)?;
        Ok(message)
    }

    /// Serializes `message` to canonical protobuf JSON.
    ///
    /// The `@type` of every `Any` is written as stored and its payload is resolved through the
    /// registry's type URL aliases.
    pub fn marshal_text(&self, message: &DynamicMessage) -> Result<String, CodecError> {
        let value = json::to_json(self, message)?;
        serde_json::to_string(&value).map_err(|source| CodecError::Json {
            type_name: message.descriptor().full_name().to_string(),
            source,
        })
    }

    /// Parses canonical protobuf JSON as the message `type_name`.
    ///
    /// `Any` payloads are looked up by their `@type` in the registry's type URL aliases and
    /// stored canonically encoded.
    pub fn unmarshal_text(&self, text: &str, type_name: &str) -> Result<DynamicMessage, CodecError> {
        let descriptor = self.registry.find_message(type_name)?;

        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|source| CodecError::Json {
                type_name: type_name.to_string(),
                source,
            })?;

        let message = json::from_json(self, descriptor, value)?;
        self.verify_anys(&message)?;
        Ok(message)
    }

    /// Wraps `message` in a `google.protobuf.Any` tagged with `type_url`.
    ///
    /// The URL must be registered as an alias of the message's own type.
    pub fn pack_any(&self, type_url: &str, message: &DynamicMessage) -> Result<DynamicMessage, CodecError> {
        let registered = self.registry.find_by_url(type_url)?;
        if registered.full_name() != message.descriptor().full_name() {
            return Err(CodecError::AnyTypeMismatch {
                url: type_url.to_string(),
                registered: registered.full_name().to_string(),
                given: message.descriptor().full_name().to_string(),
            });
        }

        new_any(self.registry.find_message(ANY_TYPE)?, type_url, message)
    }

    /// Decodes the payload of a `google.protobuf.Any` as the type its URL is aliased to.
    pub fn unpack_any(&self, any: &DynamicMessage) -> Result<DynamicMessage, CodecError> {
        let (type_url, value) = any_parts(any)?;
        let descriptor = self.registry.find_by_url(&type_url)?;
        let message = decode(descriptor, &value)?;
        self.verify_anys(&message)?;
        Ok(message)
    }

    fn verify_anys(&self, message: &DynamicMessage) -> Result<(), CodecError> {
        if message.descriptor().full_name() == ANY_TYPE {
            self.unpack_any(message)?;
            return Ok(());
        }

        for (_, value) in message.fields() {
            self.verify_value(value)?;
        }
        for (_, value) in message.extensions() {
            self.verify_value(value)?;
        }
        Ok(())
    }

    fn verify_value(&self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Message(nested) => self.verify_anys(nested),
            Value::List(items) => items.iter().try_for_each(|item| self.verify_value(item)),
            Value::Map(entries) => entries.values().try_for_each(|item| self.verify_value(item)),
            _ => Ok(()),
        }
    }
}

fn any_parts(any: &DynamicMessage) -> Result<(String, Bytes), CodecError> {
    let descriptor = any.descriptor();
    if descriptor.full_name() != ANY_TYPE {
        return Err(CodecError::NotAny(descriptor.full_name().to_string()));
    }

    let type_url = any
        .get_field_by_name("type_url")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or(CodecError::MalformedAny("type_url"))?;

    let value = any
        .get_field_by_name("value")
        .and_then(|v| v.as_bytes().cloned())
        .ok_or(CodecError::MalformedAny("value"))?;

    Ok((type_url, value))
}

/// Builds a `google.protobuf.Any` of the served `descriptor` holding `message` canonically encoded.
fn new_any(
    descriptor: MessageDescriptor,
    type_url: &str,
    message: &DynamicMessage,
) -> Result<DynamicMessage, CodecError> {
    let mut any = DynamicMessage::new(descriptor);
    any.try_set_field_by_name("type_url", Value::String(type_url.to_string()))
        .map_err(|_| CodecError::MalformedAny("type_url"))?;
    any.try_set_field_by_name("value", Value::Bytes(Bytes::from(canonical::encode(message))))
        .map_err(|_| CodecError::MalformedAny("value"))?;
    Ok(any)
}

fn decode(descriptor: MessageDescriptor, bytes: &[u8]) -> Result<DynamicMessage, CodecError> {
    let type_name = descriptor.full_name().to_string();

    catch_unwind(AssertUnwindSafe(|| DynamicMessage::decode(descriptor, bytes)))
        .map_err(|payload| CodecError::Panicked {
            type_name: type_name.clone(),
            message: crate::proto::panic_message(payload),
        })?
        .map_err(|source| CodecError::Decode { type_name, source })
}
