//! # Application Reflection Transport
//!
//! The six unary calls of `cosmos.base.reflection.v2alpha1.ReflectionService`, behind a trait so
//! that the [`super::client::MetadataClient`] can be driven by any implementation.
use super::generated::v2alpha1::{
    GetAuthnDescriptorRequest, GetAuthnDescriptorResponse, GetChainDescriptorRequest,
    GetChainDescriptorResponse, GetCodecDescriptorRequest, GetCodecDescriptorResponse,
    GetConfigurationDescriptorRequest, GetConfigurationDescriptorResponse,
    GetQueryServicesDescriptorRequest, GetQueryServicesDescriptorResponse, GetTxDescriptorRequest,
    GetTxDescriptorResponse,
};
use crate::BoxError;
use http::uri::PathAndQuery;
use http_body::Body as HttpBody;
use tonic::{Status, client::GrpcService, transport::Channel};

/// The application reflection RPCs. Each takes no parameters and returns one descriptor.
#[allow(async_fn_in_trait)]
pub trait AppReflectionService {
    async fn authn_descriptor(&self) -> Result<GetAuthnDescriptorResponse, Status>;
    async fn chain_descriptor(&self) -> Result<GetChainDescriptorResponse, Status>;
    async fn codec_descriptor(&self) -> Result<GetCodecDescriptorResponse, Status>;
    async fn configuration_descriptor(&self) -> Result<GetConfigurationDescriptorResponse, Status>;
    async fn query_services_descriptor(&self)
    -> Result<GetQueryServicesDescriptorResponse, Status>;
    async fn tx_descriptor(&self) -> Result<GetTxDescriptorResponse, Status>;
}

const SERVICE: &str = "cosmos.base.reflection.v2alpha1.ReflectionService";

/// A `tonic` client for the application reflection service.
///
/// Every call works on its own clone of the underlying service, so calls can run concurrently.
#[derive(Debug, Clone)]
pub struct AppReflectionClient<S = Channel> {
    inner: tonic::client::Grpc<S>,
}

impl<S> AppReflectionClient<S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            inner: tonic::client::Grpc::new(service),
        }
    }

    async fn unary<Req, Resp>(&self, method: &str, request: Req) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.inner.clone();

        grpc.ready().await.map_err(|e| {
            let e: BoxError = e.into();
            Status::unknown(format!("Service was not ready: {e}"))
        })?;

        let path = PathAndQuery::try_from(format!("/{SERVICE}/{method}"))
            .map_err(|e| Status::internal(format!("Invalid method path: {e}")))?;
        let codec = tonic_prost::ProstCodec::default();

        grpc.unary(tonic::Request::new(request), path, codec)
            .await
            .map(tonic::Response::into_inner)
    }
}

impl<S> AppReflectionService for AppReflectionClient<S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    async fn authn_descriptor(&self) -> Result<GetAuthnDescriptorResponse, Status> {
        self.unary("GetAuthnDescriptor", GetAuthnDescriptorRequest {})
            .await
    }

    async fn chain_descriptor(&self) -> Result<GetChainDescriptorResponse, Status> {
        self.unary("GetChainDescriptor", GetChainDescriptorRequest {})
            .await
    }

    async fn codec_descriptor(&self) -> Result<GetCodecDescriptorResponse, Status> {
        self.unary("GetCodecDescriptor", GetCodecDescriptorRequest {})
            .await
    }

    async fn configuration_descriptor(&self) -> Result<GetConfigurationDescriptorResponse, Status> {
        self.unary(
            "GetConfigurationDescriptor",
            GetConfigurationDescriptorRequest {},
        )
        .await
    }

    async fn query_services_descriptor(
        &self,
    ) -> Result<GetQueryServicesDescriptorResponse, Status> {
        self.unary(
            "GetQueryServicesDescriptor",
            GetQueryServicesDescriptorRequest {},
        )
        .await
    }

    async fn tx_descriptor(&self) -> Result<GetTxDescriptorResponse, Status> {
        self.unary("GetTxDescriptor", GetTxDescriptorRequest {})
            .await
    }
}
