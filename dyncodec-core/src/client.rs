//! # Dial
//!
//! Wires everything together over a single connection: a [`ReflectionClient`] for schema files,
//! a [`MetadataClient`] for the application inventory, and one build.
//!
//! ```rust,no_run
//! use dyncodec_core::{CancellationToken, client::{DialOptions, dial}};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancellationToken::new();
//! let codec = dial("http://localhost:9090", DialOptions::default(), &cancel).await?;
//!
//! for path in codec.registry().registration_order() {
//!     println!("{path}");
//! }
//! # Ok(())
//! # }
//! ```
use crate::{
    BoxError, Codec,
    codec::builder::{BuildError, CodecBuilder},
    metadata::{client::MetadataClient, service::AppReflectionClient},
    reflection::{ReflectionVersion, client::ReflectionClient},
};
use http_body::Body as HttpBody;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tracing::info;

/// Connection settings for [`dial`].
#[derive(Debug, Clone, Default)]
pub struct DialOptions {
    /// Revision of the gRPC reflection protocol the node speaks.
    pub reflection_version: ReflectionVersion,
    pub connect_timeout: Option<Duration>,
    /// Host sent in every reflection request. Most servers ignore it.
    pub host: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),

    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),

    #[error("Connection to '{0}' was cancelled")]
    Cancelled(String),

    #[error("Failed to build the codec: '{0}'")]
    Build(#[from] BuildError),
}

/// Connects to `addr` and builds a [`Codec`] from the node's reflection services.
pub async fn dial(
    addr: &str,
    options: DialOptions,
    cancel: &CancellationToken,
) -> Result<Codec, DialError> {
    let mut endpoint = Endpoint::new(addr.to_string())
        .map_err(|e| DialError::InvalidUrl(addr.to_string(), e))?;

    if let Some(timeout) = options.connect_timeout {
        endpoint = endpoint.connect_timeout(timeout);
    }

    let channel: Channel = tokio::select! {
        _ = cancel.cancelled() => return Err(DialError::Cancelled(addr.to_string())),
        channel = endpoint.connect() => {
            channel.map_err(|e| DialError::ConnectionFailed(addr.to_string(), e))?
        }
    };

    info!(addr, "connected");

    Ok(build_from_service(channel, options, cancel).await?)
}

/// Builds a [`Codec`] over an existing `tonic` service (e.g. a `Channel` or an intercepted one).
pub async fn build_from_service<S>(
    service: S,
    options: DialOptions,
    cancel: &CancellationToken,
) -> Result<Codec, BuildError>
where
    S: tonic::client::GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    let mut reflection =
        ReflectionClient::new(service.clone()).with_version(options.reflection_version);
    if let Some(host) = options.host {
        reflection = reflection.with_host(host);
    }

    let metadata = MetadataClient::new(AppReflectionClient::new(service));

    CodecBuilder::new(metadata, reflection).build(cancel).await
}
