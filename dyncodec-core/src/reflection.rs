//! # Server Reflection
//!
//! This module contains the logic necessary to interact with the gRPC Server Reflection Protocol.
//!
//! It lets the codec builder fetch schema files from the remote node on demand, one symbol or
//! path at a time, instead of requiring a pre-compiled descriptor set.
pub mod cache;
pub mod client;

use http::uri::PathAndQuery;

/// Revision of the reflection protocol spoken by the server.
///
/// Both revisions share the same messages and only differ in the RPC path. Nodes built on older
/// gRPC stacks only expose `v1alpha`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReflectionVersion {
    V1,
    #[default]
    V1Alpha,
}

impl ReflectionVersion {
    pub(crate) fn path(self) -> PathAndQuery {
        match self {
            ReflectionVersion::V1 => PathAndQuery::from_static(
                "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo",
            ),
            ReflectionVersion::V1Alpha => PathAndQuery::from_static(
                "/grpc.reflection.v1alpha.ServerReflection/ServerReflectionInfo",
            ),
        }
    }
}

impl std::str::FromStr for ReflectionVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" => Ok(ReflectionVersion::V1),
            "v1alpha" => Ok(ReflectionVersion::V1Alpha),
            other => Err(format!(
                "Unknown reflection version '{other}'. Expected 'v1' or 'v1alpha'"
            )),
        }
    }
}
