//! # Type Registry
//!
//! The queryable result of a build: every registered file, every message, enum and extension
//! those files declare, and the table of type URL aliases used to resolve `google.protobuf.Any`
//! payloads.
//!
//! The registry is only mutated by the codec builder while a build is running. Once the build
//! succeeds it is moved into a [`super::Codec`] and never mutated again.
use crate::proto::{self, ProtoError};
use prost_reflect::{DescriptorPool, EnumDescriptor, ExtensionDescriptor, MessageDescriptor};
use prost_types::FileDescriptorProto;
use std::collections::{BTreeMap, btree_map::Entry};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Type '{0}' not found in registry")]
    NotFound(String),

    #[error("Type URL '{0}' not found in registry")]
    UrlNotFound(String),

    #[error(
        "Disallowed overwrite of type URL '{url}': registered for '{existing}', attempted '{attempted}'"
    )]
    ConflictingUrl {
        url: String,
        existing: String,
        attempted: String,
    },

    #[error("File '{0}' is already registered with different contents")]
    ConflictingFile(String),

    #[error(transparent)]
    Proto(#[from] ProtoError),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::NotFound(_) | RegistryError::UrlNotFound(_)
        )
    }
}

/// A type resolved by its fully qualified name.
#[derive(Debug, Clone)]
pub enum RegisteredType {
    Message(MessageDescriptor),
    Enum(EnumDescriptor),
    Extension(ExtensionDescriptor),
}

impl RegisteredType {
    /// Returns the full_name (e.g.,`my.package.v1.MyMessage`) of the inner descriptor
    pub fn full_name(&self) -> &str {
        match self {
            RegisteredType::Message(v) => v.full_name(),
            RegisteredType::Enum(v) => v.full_name(),
            RegisteredType::Extension(v) => v.full_name(),
        }
    }

    /// Returns the inner [`MessageDescriptor`] if this variant is `Message`.
    pub fn message_descriptor(&self) -> Option<&MessageDescriptor> {
        match self {
            RegisteredType::Message(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    pool: DescriptorPool,
    type_urls: BTreeMap<String, String>,
    registration_order: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a message, enum or extension by its fully qualified name.
    pub fn find_by_name(&self, name: &str) -> Result<RegisteredType, RegistryError> {
        if let Some(descriptor) = self.pool.get_message_by_name(name) {
            return Ok(RegisteredType::Message(descriptor));
        }
        if let Some(descriptor) = self.pool.get_enum_by_name(name) {
            return Ok(RegisteredType::Enum(descriptor));
        }
        if let Some(descriptor) = self.pool.get_extension_by_name(name) {
            return Ok(RegisteredType::Extension(descriptor));
        }
        Err(RegistryError::NotFound(name.to_string()))
    }

    /// Looks up a message by name, rejecting enums and extensions.
    pub fn find_message(&self, name: &str) -> Result<MessageDescriptor, RegistryError> {
        self.pool
            .get_message_by_name(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Resolves a type URL to the message registered for it.
    ///
    /// Both links must exist: the URL must have an alias and the alias target must be a message
    /// of this registry.
    pub fn find_by_url(&self, url: &str) -> Result<MessageDescriptor, RegistryError> {
        let name = self
            .type_urls
            .get(url)
            .ok_or_else(|| RegistryError::UrlNotFound(url.to_string()))?;

        self.find_message(name)
    }

    /// Aliases `url` to the message `name`.
    ///
    /// Registering the same pair again is a no-op. A URL never changes meaning once registered.
    pub fn register_url(&mut self, url: &str, name: &str) -> Result<(), RegistryError> {
        match self.type_urls.entry(url.to_string()) {
            Entry::Vacant(slot) => {
                debug!(url, name, "registered type URL");
                slot.insert(name.to_string());
                Ok(())
            }
            Entry::Occupied(slot) if slot.get() == name => Ok(()),
            Entry::Occupied(slot) => Err(RegistryError::ConflictingUrl {
                url: url.to_string(),
                existing: slot.get().clone(),
                attempted: name.to_string(),
            }),
        }
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.pool.get_file_by_name(path).is_some()
    }

    /// Adds a file whose dependencies are all registered already.
    ///
    /// Returns `false` if an identical file was already registered under the same path.
    pub(crate) fn register_file(&mut self, fd: FileDescriptorProto) -> Result<bool, RegistryError> {
        let path = proto::file_path(&fd)?.to_string();

        if let Some(existing) = self.pool.get_file_by_name(&path) {
            return if *existing.file_descriptor_proto() == fd {
                Ok(false)
            } else {
                Err(RegistryError::ConflictingFile(path))
            };
        }

        proto::add_to_pool(&mut self.pool, fd)?;
        self.registration_order.push(path);
        Ok(true)
    }

    /// Paths of every file, in the order they were registered. Dependencies always come first.
    pub fn registration_order(&self) -> &[String] {
        &self.registration_order
    }

    /// Every alias, sorted by type URL.
    pub fn type_urls(&self) -> impl Iterator<Item = (&str, &str)> {
        self.type_urls
            .iter()
            .map(|(url, name)| (url.as_str(), name.as_str()))
    }

    pub fn descriptor_pool(&self) -> &DescriptorPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::{DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto};

    fn file(path: &str, deps: &[&str], messages: &[&str]) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(path.to_string()),
            package: Some("pkg".to_string()),
            dependency: deps.iter().map(|d| d.to_string()).collect(),
            message_type: messages
                .iter()
                .map(|m| DescriptorProto {
                    name: Some(m.to_string()),
                    ..Default::default()
                })
                .collect(),
            syntax: Some("proto3".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn finds_messages_and_enums_by_name() {
        let mut registry = TypeRegistry::new();
        let mut fd = file("pkg/a.proto", &[], &["A"]);
        fd.enum_type.push(EnumDescriptorProto {
            name: Some("Kind".to_string()),
            value: vec![EnumValueDescriptorProto {
                name: Some("KIND_UNSPECIFIED".to_string()),
                number: Some(0),
                ..Default::default()
            }],
            ..Default::default()
        });
        registry.register_file(fd).unwrap();

        assert!(matches!(
            registry.find_by_name("pkg.A"),
            Ok(RegisteredType::Message(_))
        ));
        assert!(matches!(
            registry.find_by_name("pkg.Kind"),
            Ok(RegisteredType::Enum(_))
        ));
        assert!(matches!(
            registry.find_by_name("pkg.Missing"),
            Err(RegistryError::NotFound(name)) if name == "pkg.Missing"
        ));
    }

    #[test]
    fn registration_order_is_recorded() {
        let mut registry = TypeRegistry::new();
        registry.register_file(file("pkg/c.proto", &[], &["C"])).unwrap();
        registry
            .register_file(file("pkg/b.proto", &["pkg/c.proto"], &["B"]))
            .unwrap();

        assert_eq!(registry.registration_order(), ["pkg/c.proto", "pkg/b.proto"]);
        assert!(registry.contains_file("pkg/b.proto"));
    }

    #[test]
    fn identical_file_is_registered_once() {
        let mut registry = TypeRegistry::new();

        assert!(registry.register_file(file("pkg/a.proto", &[], &["A"])).unwrap());
        assert!(!registry.register_file(file("pkg/a.proto", &[], &["A"])).unwrap());
        assert_eq!(registry.registration_order().len(), 1);
    }

    #[test]
    fn different_file_under_same_path_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register_file(file("pkg/a.proto", &[], &["A"])).unwrap();

        let result = registry.register_file(file("pkg/a.proto", &[], &["Other"]));

        assert!(matches!(result, Err(RegistryError::ConflictingFile(path)) if path == "pkg/a.proto"));
    }

    #[test]
    fn url_alias_is_idempotent_and_never_overwritten() {
        let mut registry = TypeRegistry::new();

        registry.register_url("/x.Y", "x.Y").unwrap();
        registry.register_url("/x.Y", "x.Y").unwrap();
        let result = registry.register_url("/x.Y", "x.Z");

        assert!(matches!(
            result,
            Err(RegistryError::ConflictingUrl { existing, attempted, .. })
                if existing == "x.Y" && attempted == "x.Z"
        ));
        assert_eq!(registry.type_urls().collect::<Vec<_>>(), [("/x.Y", "x.Y")]);
    }

    #[test]
    fn url_lookup_needs_both_links() {
        let mut registry = TypeRegistry::new();
        registry.register_file(file("pkg/a.proto", &[], &["A"])).unwrap();
        registry.register_url("/pkg.A", "pkg.A").unwrap();
        registry.register_url("/pkg.Ghost", "pkg.Ghost").unwrap();

        assert_eq!(registry.find_by_url("/pkg.A").unwrap().full_name(), "pkg.A");
        assert!(matches!(
            registry.find_by_url("/pkg.Unknown"),
            Err(RegistryError::UrlNotFound(_))
        ));
        assert!(matches!(
            registry.find_by_url("/pkg.Ghost"),
            Err(RegistryError::NotFound(name)) if name == "pkg.Ghost"
        ));
    }
}
