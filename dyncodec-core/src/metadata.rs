//! # Application Metadata
//!
//! Nodes built on the cosmos-sdk expose a second reflection service,
//! `cosmos.base.reflection.v2alpha1.ReflectionService`, that describes the application rather
//! than its files: which query services it serves, which messages a transaction may carry and
//! which interfaces travel inside `google.protobuf.Any` together with their implementers.
//!
//! This is the inventory the codec builder starts from.
pub mod client;
pub mod generated;
pub mod service;
