//! # Reflection Client
//!
//! A client implementation for `grpc.reflection.v1` and `grpc.reflection.v1alpha`.
//!
//! Unlike a one-shot resolver, this client answers one question at a time ("which file declares
//! symbol X", "give me file P") and keeps everything it learns in a [`SymbolCache`]. A single
//! reflection response usually carries several files, so most lookups after the first few are
//! answered without touching the network.
//!
//! ## Stream discipline
//!
//! The client keeps one long-lived bidirectional stream open per instance. Every request is
//! paired with exactly one response before the next request is sent, under an async mutex.
//! The stream is taken out of the session for the duration of an exchange and only put back
//! once the response has been read, so a failed or cancelled exchange simply drops it and the
//! next request opens a fresh one.
//!
//! ## References
//!
//! * [gRPC Server Reflection Protocol](https://github.com/grpc/grpc/blob/master/doc/server-reflection.md)
use super::{ReflectionVersion, cache::CacheConflict, cache::SymbolCache};
use crate::{
    BoxError,
    codec::types::SchemaSource,
    proto::{self, ProtoError},
};
use http_body::Body as HttpBody;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Code, Streaming, client::GrpcService};
use tonic_reflection::pb::v1::{
    ServerReflectionRequest, ServerReflectionResponse, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ReflectionResolveError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),

    #[error(
        "Failed to start a stream request with the reflection server, reflection might not be supported: '{0}'"
    )]
    ServerStreamInitFailed(#[source] tonic::Status),

    #[error("The server stream returned an error status while resolving {target}: '{status}'")]
    ServerStreamFailure {
        target: String,
        #[source]
        status: tonic::Status,
    },

    #[error("Reflection stream closed unexpectedly")]
    StreamClosed,

    #[error("Internal error: Failed to send request to stream")]
    SendFailed,

    #[error("Server returned reflection error code {code} for {target}: {message}")]
    ServerError {
        target: String,
        code: i32,
        message: String,
    },

    #[error("Protocol error: Received unexpected response type for {target}: {got}")]
    UnexpectedResponseType { target: String, got: String },

    #[error("Failed to process file descriptor returned for {target}: '{source}'")]
    Descriptor {
        target: String,
        #[source]
        source: ProtoError,
    },

    #[error("Reflection server returned conflicting descriptors: '{0}'")]
    Conflict(#[from] CacheConflict),

    #[error("Server did not return a file declaring symbol '{0}'")]
    SymbolNotFound(String),

    #[error("Server did not return file '{0}'")]
    FileNotFound(String),
}

impl ReflectionResolveError {
    /// Whether the server answered but does not know the requested symbol or file.
    pub fn is_not_found(&self) -> bool {
        match self {
            ReflectionResolveError::SymbolNotFound(_) | ReflectionResolveError::FileNotFound(_) => {
                true
            }
            ReflectionResolveError::ServerError { code, .. } => *code == Code::NotFound as i32,
            ReflectionResolveError::ServerStreamFailure { status, .. } => {
                status.code() == Code::NotFound
            }
            _ => false,
        }
    }
}

// The host defined in the reflection requests doesn't seem to be a mandatory field
// and there is no documentation about what it is about.
// So we won't enforce it from the user.
const EMPTY_HOST: &str = "";

// Requests are strictly paired with responses, there is never more than one queued.
const REQUEST_BUFFER: usize = 1;

#[derive(Clone, Copy)]
enum Target<'a> {
    Symbol(&'a str),
    File(&'a str),
    Services,
}

impl Target<'_> {
    fn message_request(self) -> MessageRequest {
        match self {
            Target::Symbol(symbol) => MessageRequest::FileContainingSymbol(symbol.to_string()),
            Target::File(path) => MessageRequest::FileByFilename(path.to_string()),
            Target::Services => MessageRequest::ListServices(String::new()),
        }
    }
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Symbol(symbol) => write!(f, "symbol '{symbol}'"),
            Target::File(path) => write!(f, "file '{path}'"),
            Target::Services => write!(f, "service list"),
        }
    }
}

struct OpenStream {
    requests: mpsc::Sender<ServerReflectionRequest>,
    responses: Streaming<ServerReflectionResponse>,
}

struct Session<S> {
    grpc: tonic::client::Grpc<S>,
    stream: Option<OpenStream>,
}

/// A caching client for the gRPC Server Reflection Protocol.
pub struct ReflectionClient<S = Channel> {
    session: Mutex<Session<S>>,
    cache: Arc<SymbolCache>,
    version: ReflectionVersion,
    host: String,
    round_trips: AtomicUsize,
}

impl<S> ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self::with_cache(service, Arc::new(SymbolCache::new()))
    }

    /// Creates a client that reads from and writes to an existing cache.
    pub fn with_cache(service: S, cache: Arc<SymbolCache>) -> Self {
        Self {
            session: Mutex::new(Session {
                grpc: tonic::client::Grpc::new(service),
                stream: None,
            }),
            cache,
            version: ReflectionVersion::default(),
            host: EMPTY_HOST.to_string(),
            round_trips: AtomicUsize::new(0),
        }
    }

    pub fn with_version(mut self, version: ReflectionVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn cache(&self) -> &Arc<SymbolCache> {
        &self.cache
    }

    /// Number of request/response exchanges performed with the server so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// Resolves the path of the file declaring `symbol` (e.g. `cosmos.bank.v1beta1.Query`).
    ///
    /// # Returns
    ///
    /// * `Ok(path)` - From the cache, or from the server after a single round trip.
    /// * `Err(ReflectionResolveError::SymbolNotFound)` - The server answered without a file
    ///   declaring the symbol.
    /// * `Err(ReflectionResolveError)` - Transport or protocol failure.
    pub async fn file_path_for_symbol(&self, symbol: &str) -> Result<String, ReflectionResolveError> {
        if let Some(path) = self.cache.path_for_symbol(symbol) {
            debug!(symbol, path = %path, "symbol cache hit");
            return Ok(path);
        }

        let mut session = self.session.lock().await;

        // Another caller may have fetched it while we were waiting for the session.
        if let Some(path) = self.cache.path_for_symbol(symbol) {
            return Ok(path);
        }

        let target = Target::Symbol(symbol);
        let response = self.exchange(&mut session, target).await?;
        self.absorb_files(response, target)?;

        self.cache
            .path_for_symbol(symbol)
            .ok_or_else(|| ReflectionResolveError::SymbolNotFound(symbol.to_string()))
    }

    /// Returns the raw descriptor bytes of the file at `path`, possibly gzip-compressed.
    ///
    /// # Returns
    ///
    /// * `Ok(bytes)` - From the cache, or from the server after a single round trip.
    /// * `Err(ReflectionResolveError::FileNotFound)` - The server answered without that file.
    /// * `Err(ReflectionResolveError)` - Transport or protocol failure.
    pub async fn file_descriptor_bytes(&self, path: &str) -> Result<Vec<u8>, ReflectionResolveError> {
        if let Some(raw) = self.cache.file_bytes(path) {
            debug!(path, "file cache hit");
            return Ok(raw);
        }

        let mut session = self.session.lock().await;

        if let Some(raw) = self.cache.file_bytes(path) {
            return Ok(raw);
        }

        let target = Target::File(path);
        let response = self.exchange(&mut session, target).await?;
        self.absorb_files(response, target)?;

        self.cache
            .file_bytes(path)
            .ok_or_else(|| ReflectionResolveError::FileNotFound(path.to_string()))
    }

    /// Lists all services exposed by the server. Never cached.
    pub async fn list_services(&self) -> Result<Vec<String>, ReflectionResolveError> {
        let mut session = self.session.lock().await;

        match self.exchange(&mut session, Target::Services).await? {
            MessageResponse::ListServicesResponse(resp) => {
                Ok(resp.service.into_iter().map(|s| s.name).collect())
            }
            other => Err(ReflectionResolveError::UnexpectedResponseType {
                target: Target::Services.to_string(),
                got: format!("{other:?}"),
            }),
        }
    }

    /// Sends one request and reads exactly one response.
    async fn exchange(
        &self,
        session: &mut Session<S>,
        target: Target<'_>,
    ) -> Result<MessageResponse, ReflectionResolveError> {
        let mut stream = match session.stream.take() {
            Some(stream) => stream,
            None => self.open_stream(&mut session.grpc).await?,
        };

        let request = ServerReflectionRequest {
            host: self.host.clone(),
            message_request: Some(target.message_request()),
        };

        debug!(%target, "sending reflection request");

        if stream.requests.send(request).await.is_err() {
            warn!(%target, "reflection stream rejected request, discarding it");
            return Err(ReflectionResolveError::SendFailed);
        }

        let response = match stream.responses.message().await {
            Ok(Some(response)) => response,
            Ok(None) => {
                warn!(%target, "reflection stream closed by server, discarding it");
                return Err(ReflectionResolveError::StreamClosed);
            }
            Err(status) => {
                warn!(%target, code = ?status.code(), "reflection stream failed, discarding it");
                return Err(ReflectionResolveError::ServerStreamFailure {
                    target: target.to_string(),
                    status,
                });
            }
        };

        self.round_trips.fetch_add(1, Ordering::Relaxed);
        // The pair is complete, the stream can serve the next request.
        session.stream = Some(stream);

        match response.message_response {
            Some(MessageResponse::ErrorResponse(e)) => Err(ReflectionResolveError::ServerError {
                target: target.to_string(),
                code: e.error_code,
                message: e.error_message,
            }),
            Some(message) => Ok(message),
            None => Err(ReflectionResolveError::UnexpectedResponseType {
                target: target.to_string(),
                got: "Empty Message".into(),
            }),
        }
    }

    async fn open_stream(
        &self,
        grpc: &mut tonic::client::Grpc<S>,
    ) -> Result<OpenStream, ReflectionResolveError> {
        grpc.ready()
            .await
            .map_err(|e| ReflectionResolveError::ClientNotReady(e.into()))?;

        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let codec = tonic_prost::ProstCodec::default();

        let responses = grpc
            .streaming(
                tonic::Request::new(ReceiverStream::new(rx)),
                self.version.path(),
                codec,
            )
            .await
            .map_err(ReflectionResolveError::ServerStreamInitFailed)?
            .into_inner();

        debug!(version = ?self.version, "opened reflection stream");

        Ok(OpenStream {
            requests: tx,
            responses,
        })
    }

    /// Caches every file in a descriptor response, not only the one that was asked for.
    fn absorb_files(
        &self,
        response: MessageResponse,
        target: Target<'_>,
    ) -> Result<(), ReflectionResolveError> {
        let blobs = match response {
            MessageResponse::FileDescriptorResponse(res) => res.file_descriptor_proto,
            other => {
                return Err(ReflectionResolveError::UnexpectedResponseType {
                    target: target.to_string(),
                    got: format!("{other:?}"),
                });
            }
        };

        for raw in blobs {
            let (path, symbols) =
                proto::symbols_from_bytes(&raw).map_err(|source| {
                    ReflectionResolveError::Descriptor {
                        target: target.to_string(),
                        source,
                    }
                })?;

            debug!(%target, path = %path, symbols = symbols.len(), "caching file descriptor");
            self.cache.insert_file(&path, raw, symbols)?;
        }

        Ok(())
    }
}

impl<S> SchemaSource for ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    type Error = ReflectionResolveError;

    async fn file_path_for_symbol(&self, symbol: &str) -> Result<String, Self::Error> {
        ReflectionClient::file_path_for_symbol(self, symbol).await
    }

    async fn file_descriptor_bytes(&self, path: &str) -> Result<Vec<u8>, Self::Error> {
        ReflectionClient::file_descriptor_bytes(self, path).await
    }
}
