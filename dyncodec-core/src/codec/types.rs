use std::error::Error;

/// A concrete message type registered as an implementation of an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceImplementer {
    /// Fully qualified protobuf name (e.g. `cosmos.bank.v1beta1.MsgSend`).
    pub full_name: String,
    /// Type URL used to tag the message inside a `google.protobuf.Any`.
    pub type_url: String,
}

/// A logical interface, expressed on the wire as `google.protobuf.Any`, and its implementers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    /// Interface name. Not a protobuf symbol, the application defines it.
    pub name: String,
    pub implementers: Vec<InterfaceImplementer>,
}

/// Describes which symbols the codec must be able to handle.
///
/// Listing the same messages from several methods is fine, the builder skips files it already
/// registered.
#[allow(async_fn_in_trait)]
pub trait InventoryProvider {
    type Error: Error + Send + Sync + 'static;

    /// Fully qualified names of the query services of the application.
    async fn services(&self) -> Result<Vec<String>, Self::Error>;

    /// Fully qualified names of messages that might not be reachable from any service.
    async fn messages(&self) -> Result<Vec<String>, Self::Error>;

    /// Interfaces whose implementers travel inside `google.protobuf.Any`.
    async fn interfaces(&self) -> Result<Vec<InterfaceDescriptor>, Self::Error>;
}

/// A remote store of protobuf schema files.
#[allow(async_fn_in_trait)]
pub trait SchemaSource {
    type Error: Error + Send + Sync + 'static;

    /// Path of the file declaring the fully qualified `symbol`.
    async fn file_path_for_symbol(&self, symbol: &str) -> Result<String, Self::Error>;

    /// Raw, possibly gzip-compressed, `FileDescriptorProto` bytes of the file at `path`.
    async fn file_descriptor_bytes(&self, path: &str) -> Result<Vec<u8>, Self::Error>;
}
