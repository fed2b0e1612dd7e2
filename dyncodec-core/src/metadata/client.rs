//! # Metadata Client
//!
//! Fetches the application descriptors once and derives from them the inventory the codec
//! builder needs.
//!
//! ## Initialization
//!
//! The six descriptor calls run together in a single attempt, guarded by an async mutex:
//!
//! * Concurrent first callers queue behind the attempt and all observe its outcome, success or
//!   failure. The calls are never issued twice for the same attempt.
//! * Success is sticky. Every later call is answered from memory.
//! * A failed attempt keeps no partial state. The next caller that arrives after the failure
//!   starts a fresh attempt.
use super::generated::v2alpha1::{AppDescriptor, msg_descriptor::Msg};
use super::service::AppReflectionService;
use crate::codec::types::{InterfaceDescriptor, InterfaceImplementer, InventoryProvider};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tonic::Status;
use tracing::{debug, info};

#[derive(Debug, Clone, thiserror::Error)]
pub enum MetadataError {
    #[error("Application reflection call '{method}' failed: '{status}'")]
    Rpc {
        method: &'static str,
        #[source]
        status: Status,
    },

    #[error("Application reflection call '{method}' returned an empty descriptor")]
    MissingDescriptor { method: &'static str },

    #[error("Transaction message #{index} has no recognized descriptor shape")]
    UnrecognizedMsgShape { index: usize },

    #[error("Transaction message #{index} ('{name}') uses the unsupported legacy descriptor shape")]
    UnsupportedMsgShape { index: usize, name: String },
}

impl MetadataError {
    /// Whether the node answered with descriptors that cannot be trusted, as opposed to not
    /// answering at all.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            MetadataError::UnrecognizedMsgShape { .. } | MetadataError::UnsupportedMsgShape { .. }
        )
    }
}

/// What the application reports about itself, in the form the codec builder consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct AppInventory {
    /// Query services, in the order the node reported them.
    pub services: Vec<String>,
    /// Request message names of every transaction message.
    pub messages: Vec<String>,
    pub interfaces: Vec<InterfaceDescriptor>,
    /// The assembled descriptors the inventory was derived from.
    pub descriptor: AppDescriptor,
}

enum InitState {
    Idle,
    Ready(Arc<AppInventory>),
    Failed { attempt: u64, error: MetadataError },
}

pub struct MetadataClient<T> {
    service: T,
    state: Mutex<InitState>,
    finished_attempts: AtomicU64,
}

impl<T: AppReflectionService> MetadataClient<T> {
    pub fn new(service: T) -> Self {
        Self {
            service,
            state: Mutex::new(InitState::Idle),
            finished_attempts: AtomicU64::new(0),
        }
    }

    pub fn service(&self) -> &T {
        &self.service
    }

    /// Returns the inventory, fetching it first if no attempt has succeeded yet.
    pub async fn inventory(&self) -> Result<Arc<AppInventory>, MetadataError> {
        let seen = self.finished_attempts.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        match &*state {
            InitState::Ready(inventory) => return Ok(inventory.clone()),
            // The attempt we were queued behind failed. Report it rather than starting another.
            InitState::Failed { attempt, error } if *attempt > seen => return Err(error.clone()),
            InitState::Failed { .. } | InitState::Idle => {}
        }

        let attempt = self.finished_attempts.load(Ordering::Acquire) + 1;
        debug!(attempt, "fetching application descriptors");

        let result = self.fetch().await;
        self.finished_attempts.store(attempt, Ordering::Release);

        match result {
            Ok(inventory) => {
                info!(
                    services = inventory.services.len(),
                    messages = inventory.messages.len(),
                    interfaces = inventory.interfaces.len(),
                    "application descriptors loaded"
                );
                let inventory = Arc::new(inventory);
                *state = InitState::Ready(inventory.clone());
                Ok(inventory)
            }
            Err(error) => {
                debug!(attempt, %error, "application descriptors could not be loaded");
                *state = InitState::Failed {
                    attempt,
                    error: error.clone(),
                };
                Err(error)
            }
        }
    }

    /// The assembled application descriptor, as reported by the node.
    pub async fn app_descriptor(&self) -> Result<AppDescriptor, MetadataError> {
        Ok(self.inventory().await?.descriptor.clone())
    }

    async fn fetch(&self) -> Result<AppInventory, MetadataError> {
        let (authn, chain, codec, config, queries, tx) = tokio::try_join!(
            call("GetAuthnDescriptor", self.service.authn_descriptor()),
            call("GetChainDescriptor", self.service.chain_descriptor()),
            call("GetCodecDescriptor", self.service.codec_descriptor()),
            call(
                "GetConfigurationDescriptor",
                self.service.configuration_descriptor()
            ),
            call(
                "GetQueryServicesDescriptor",
                self.service.query_services_descriptor()
            ),
            call("GetTxDescriptor", self.service.tx_descriptor()),
        )?;

        let authn = required("GetAuthnDescriptor", authn.authn)?;
        let chain = required("GetChainDescriptor", chain.chain)?;
        let codec = required("GetCodecDescriptor", codec.codec)?;
        let config = required("GetConfigurationDescriptor", config.config)?;
        let queries = required("GetQueryServicesDescriptor", queries.queries)?;
        let tx = required("GetTxDescriptor", tx.tx)?;

        let services = queries
            .query_services
            .iter()
            .map(|svc| svc.fullname.clone())
            .collect();

        let interfaces = codec
            .interfaces
            .iter()
            .map(|iface| InterfaceDescriptor {
                name: iface.fullname.clone(),
                implementers: iface
                    .interface_implementers
                    .iter()
                    .map(|imp| InterfaceImplementer {
                        full_name: imp.fullname.clone(),
                        type_url: imp.type_url.clone(),
                    })
                    .collect(),
            })
            .collect();

        let messages = tx
            .msgs
            .iter()
            .enumerate()
            .map(|(index, msg)| match &msg.msg {
                Some(Msg::ServiceMsg(m)) => Ok(m.request_fullname.clone()),
                Some(Msg::LegacyMsg(m)) => Err(MetadataError::UnsupportedMsgShape {
                    index,
                    name: m.msg_fullname.clone(),
                }),
                None => Err(MetadataError::UnrecognizedMsgShape { index }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AppInventory {
            services,
            messages,
            interfaces,
            descriptor: AppDescriptor {
                authn: Some(authn),
                chain: Some(chain),
                codec: Some(codec),
                configuration: Some(config),
                query_services: Some(queries),
                tx: Some(tx),
            },
        })
    }
}

async fn call<R>(
    method: &'static str,
    request: impl Future<Output = Result<R, Status>>,
) -> Result<R, MetadataError> {
    request
        .await
        .map_err(|status| MetadataError::Rpc { method, status })
}

fn required<D>(method: &'static str, descriptor: Option<D>) -> Result<D, MetadataError> {
    descriptor.ok_or(MetadataError::MissingDescriptor { method })
}

impl<T: AppReflectionService> InventoryProvider for MetadataClient<T> {
    type Error = MetadataError;

    async fn services(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.inventory().await?.services.clone())
    }

    async fn messages(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.inventory().await?.messages.clone())
    }

    async fn interfaces(&self) -> Result<Vec<InterfaceDescriptor>, Self::Error> {
        Ok(self.inventory().await?.interfaces.clone())
    }
}
