//! # Codec Builder
//!
//! Links the schema files an application depends on into a [`TypeRegistry`], pulling them one at
//! a time from a [`SchemaSource`] as they are discovered.
//!
//! ## Pipeline
//!
//! A build runs three stages, strictly in order. The first failure aborts the build and no
//! [`Codec`] is produced.
//!
//! 1. **Services**: registers the file declaring every service the inventory reports.
//! 2. **Messages**: registers the file declaring every message whose file is not known yet.
//! 3. **Interfaces**: registers the file of every interface implementer still unknown, then
//!    aliases the implementer's type URL to its name.
//!
//! Files are registered dependencies first. A file that is reached again while its own
//! dependencies are still being resolved closes an import cycle, which fails the build.
//!
//! ## Single use
//!
//! A builder runs at most one build in its lifetime. The transition out of
//! [`BuilderState::Idle`] is a single compare-and-swap, so concurrent callers see exactly one
//! winner and every other call is rejected with [`BuildError::AlreadyBuilt`].
use super::Codec;
use super::registry::{RegistryError, TypeRegistry};
use super::types::{InventoryProvider, SchemaSource};
use crate::BoxError;
use crate::metadata::client::MetadataError;
use crate::proto::{self, ProtoError};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BuilderState {
    Idle = 0,
    Building = 1,
    Done = 2,
    Failed = 3,
}

impl BuilderState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => BuilderState::Idle,
            1 => BuilderState::Building,
            2 => BuilderState::Done,
            _ => BuilderState::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Services,
    Messages,
    Interfaces,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStage::Services => write!(f, "service"),
            BuildStage::Messages => write!(f, "message"),
            BuildStage::Interfaces => write!(f, "interface"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("The builder can only run once and not concurrently")]
    AlreadyBuilt,

    #[error("Build was cancelled")]
    Cancelled,

    #[error("Failed to list {what}: '{source}'")]
    Inventory {
        what: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Failed to resolve the file declaring '{symbol}': '{source}'")]
    ResolveSymbol {
        symbol: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to fetch descriptor bytes for file '{path}': '{source}'")]
    FetchFile {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Bad descriptor sequence, cyclic import detected at file '{0}'")]
    CyclicImport(String),

    #[error("Unable to register '{path}', dependency '{dependency}' failed: '{source}'")]
    Dependency {
        path: String,
        dependency: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("The {stage} stage failed on '{name}': '{source}'")]
    Stage {
        stage: BuildStage,
        name: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("Invalid descriptor for file '{path}': '{source}'")]
    Proto {
        path: String,
        #[source]
        source: ProtoError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Implementer '{name}' of interface '{interface}' is not declared by its file '{path}'")]
    MissingImplementer {
        interface: String,
        name: String,
        path: String,
    },
}

impl BuildError {
    /// The innermost error, past every stage and dependency wrapper.
    pub fn root_cause(&self) -> &BuildError {
        let mut current = self;
        while let BuildError::Stage { source, .. } | BuildError::Dependency { source, .. } = current
        {
            current = &**source;
        }
        current
    }

    /// Whether the schema or metadata of the node is inconsistent, as opposed to unreachable.
    pub fn is_integrity_error(&self) -> bool {
        match self.root_cause() {
            BuildError::CyclicImport(_)
            | BuildError::MissingImplementer { .. }
            | BuildError::Registry(
                RegistryError::ConflictingUrl { .. } | RegistryError::ConflictingFile(_),
            ) => true,
            BuildError::Inventory { source, .. } => source
                .downcast_ref::<MetadataError>()
                .is_some_and(MetadataError::is_integrity_error),
            _ => false,
        }
    }

    fn in_stage(self, stage: BuildStage, name: &str) -> Self {
        BuildError::Stage {
            stage,
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Builds a [`Codec`] from an inventory `P` and a schema source `R`.
pub struct CodecBuilder<P, R> {
    provider: P,
    source: R,
    state: AtomicU8,
}

impl<P, R> CodecBuilder<P, R>
where
    P: InventoryProvider,
    R: SchemaSource,
{
    pub fn new(provider: P, source: R) -> Self {
        Self {
            provider,
            source,
            state: AtomicU8::new(BuilderState::Idle as u8),
        }
    }

    pub fn state(&self) -> BuilderState {
        BuilderState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// Runs the build.
    ///
    /// # Returns
    ///
    /// * `Ok(Codec)` - Every service, message and interface implementer was registered.
    /// * `Err(BuildError::AlreadyBuilt)` - Another call already started a build on this builder.
    /// * `Err(BuildError::Cancelled)` - `cancel` fired before the build completed.
    /// * `Err(BuildError)` - Any other failure. The builder is left in [`BuilderState::Failed`].
    pub async fn build(&self, cancel: &CancellationToken) -> Result<Codec, BuildError> {
        self.state
            .compare_exchange(
                BuilderState::Idle as u8,
                BuilderState::Building as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| BuildError::AlreadyBuilt)?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BuildError::Cancelled),
            result = self.run() => result,
        };

        let state = match &result {
            Ok(_) => BuilderState::Done,
            Err(_) => BuilderState::Failed,
        };
        self.state.store(state as u8, Ordering::Release);

        result
    }

    async fn run(&self) -> Result<Codec, BuildError> {
        let mut session = BuildSession {
            source: &self.source,
            registry: TypeRegistry::new(),
            visited: HashSet::new(),
        };

        let services = self
            .provider
            .services()
            .await
            .map_err(|e| inventory_error("services", e))?;

        for service in &services {
            session
                .register_symbol(service)
                .await
                .map_err(|e| e.in_stage(BuildStage::Services, service))?;
        }

        info!(
            services = services.len(),
            files = session.registry.registration_order().len(),
            "service stage complete"
        );

        let messages = self
            .provider
            .messages()
            .await
            .map_err(|e| inventory_error("messages", e))?;

        for message in &messages {
            session
                .register_symbol(message)
                .await
                .map_err(|e| e.in_stage(BuildStage::Messages, message))?;
        }

        info!(
            messages = messages.len(),
            files = session.registry.registration_order().len(),
            "message stage complete"
        );

        let interfaces = self
            .provider
            .interfaces()
            .await
            .map_err(|e| inventory_error("interfaces", e))?;

        for interface in &interfaces {
            for implementer in &interface.implementers {
                session
                    .register_implementer(&interface.name, &implementer.full_name)
                    .await
                    .map_err(|e| e.in_stage(BuildStage::Interfaces, &implementer.full_name))?;

                session
                    .registry
                    .register_url(&implementer.type_url, &implementer.full_name)
                    .map_err(|e| {
                        BuildError::from(e).in_stage(BuildStage::Interfaces, &interface.name)
                    })?;
            }
        }

        info!(
            interfaces = interfaces.len(),
            files = session.registry.registration_order().len(),
            "interface stage complete"
        );

        Ok(Codec::new(session.registry))
    }
}

/// Mutable state of a single build.
struct BuildSession<'a, R> {
    source: &'a R,
    registry: TypeRegistry,
    /// Every path registration ever started during this build, completed or not.
    visited: HashSet<String>,
}

impl<R: SchemaSource> BuildSession<'_, R> {
    /// Registers the file declaring `symbol`, unless it is already registered.
    async fn register_symbol(&mut self, symbol: &str) -> Result<(), BuildError> {
        let path = self.resolve(symbol).await?;
        self.register_path(&path).await
    }

    async fn register_implementer(&mut self, interface: &str, name: &str) -> Result<(), BuildError> {
        if self.registry.find_message(name).is_ok() {
            return Ok(());
        }

        let path = self.resolve(name).await?;
        self.register_path(&path).await?;

        // The node claims `path` declares the implementer, the registered file must agree.
        match self.registry.find_message(name) {
            Ok(_) => Ok(()),
            Err(_) => Err(BuildError::MissingImplementer {
                interface: interface.to_string(),
                name: name.to_string(),
                path,
            }),
        }
    }

    async fn resolve(&self, symbol: &str) -> Result<String, BuildError> {
        self.source
            .file_path_for_symbol(symbol)
            .await
            .map_err(|e| BuildError::ResolveSymbol {
                symbol: symbol.to_string(),
                source: e.into(),
            })
    }

    /// Registers the file at `path` after all of its dependencies.
    async fn register_path(&mut self, path: &str) -> Result<(), BuildError> {
        if self.registry.contains_file(path) {
            return Ok(());
        }

        // Not registered but already visited: we are inside its own dependency chain.
        if !self.visited.insert(path.to_string()) {
            return Err(BuildError::CyclicImport(path.to_string()));
        }

        let raw = self
            .source
            .file_descriptor_bytes(path)
            .await
            .map_err(|e| BuildError::FetchFile {
                path: path.to_string(),
                source: e.into(),
            })?;

        let fd = proto::decompress(&raw)
            .and_then(|raw| proto::decode_file(&raw))
            .map_err(|source| BuildError::Proto {
                path: path.to_string(),
                source,
            })?;

        for dependency in proto::dependencies_of(&fd) {
            if self.registry.contains_file(&dependency) {
                continue;
            }

            Box::pin(self.register_path(&dependency))
                .await
                .map_err(|e| BuildError::Dependency {
                    path: path.to_string(),
                    dependency: dependency.clone(),
                    source: Box::new(e),
                })?;
        }

        self.registry.register_file(fd)?;
        debug!(path, "registered file");

        Ok(())
    }
}

fn inventory_error<E: Into<BoxError>>(what: &'static str, error: E) -> BuildError {
    BuildError::Inventory {
        what,
        source: error.into(),
    }
}
