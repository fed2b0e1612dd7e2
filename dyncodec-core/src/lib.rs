//! # Dyncodec Core
//!
//! `dyncodec-core` builds a protobuf codec at runtime for a node whose schema is not known
//! at compile time. The schema is discovered through two reflection services exposed by the node
//! and assembled into a self-consistent registry that can marshal and unmarshal arbitrary
//! messages, including polymorphic `google.protobuf.Any` payloads tagged by type URL.
//!
//! ## Key Components
//!
//! * **[`ReflectionClient`]:** A gRPC Server Reflection client that resolves symbols and file
//!   paths to raw file descriptor bytes, caching every file it receives in a [`SymbolCache`].
//! * **[`MetadataClient`]:** A one-time fetch of the application descriptors
//!   (`cosmos.base.reflection.v2alpha1`) that lists the services, transaction messages and
//!   interface implementers the codec must know about.
//! * **[`CodecBuilder`]:** Links the files reported by both clients into a [`TypeRegistry`],
//!   dependencies first, detecting cyclic imports and conflicting type URL aliases.
//! * **[`Codec`]:** The immutable result. Canonical binary encoding, binary decoding and
//!   protobuf JSON, all resolving `Any` payloads through the registry.
//!
//! The [`client::dial`] function wires all of the above over a single `tonic` channel.
//!
//! ## Feature Flags (Internal use only)
//!
//! * `gen-proto`: Enables the binary that regenerates the application reflection types.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod client;
pub mod codec;
pub mod metadata;
pub mod proto;
pub mod reflection;

pub use codec::{
    Codec, CodecError,
    builder::{BuildError, BuildStage, BuilderState, CodecBuilder},
    registry::{RegisteredType, RegistryError, TypeRegistry},
    types::{InterfaceDescriptor, InterfaceImplementer, InventoryProvider, SchemaSource},
};
pub use metadata::client::{AppInventory, MetadataClient, MetadataError};
pub use reflection::{
    ReflectionVersion,
    cache::SymbolCache,
    client::{ReflectionClient, ReflectionResolveError},
};

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tokio_util::sync::CancellationToken;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
