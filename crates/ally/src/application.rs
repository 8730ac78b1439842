//! Application wiring.
//!
//! An [`Application`] owns the configuration, the service container and the
//! assemblies contributed by plugins. It builds the two processings an ally
//! deployment runs:
//!
//! ```text
//! server:    [content router] → [gateway router] → resources router
//! assembler: process_method → contributed assemblers
//! ```

use crate::error::ApplicationError;
use ally_cdm::{ContentDeliveryHandler, LocalFileSystemCdm};
use ally_config::{AllyConfig, GatewayMode};
use ally_core::contexts::{invoker, register, request};
use ally_core::processor::{ProcessMethodHandler, RoutingByPathHandler, RoutingHandler};
use ally_core::{register_invokers, Container};
use ally_design::prelude::*;
use ally_design::AssemblyError;
use ally_telemetry::init_telemetry;
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the assembly serving published content.
pub const CONTENT: &str = "content";
/// Name of the assembly serving the gateway.
pub const GATEWAY: &str = "gateway";
/// Name of the assembly serving the resources.
pub const RESOURCES: &str = "resources";

/// A configured ally application.
///
/// # Example
///
/// ```no_run
/// use ally::{AllyConfig, Application};
///
/// # fn main() -> Result<(), ally::ApplicationError> {
/// let app = Application::from_config(AllyConfig::default())?;
/// let server = app.server_processing()?;
/// # Ok(())
/// # }
/// ```
pub struct Application {
    config: Arc<AllyConfig>,
    container: Container,
    cdm: Arc<LocalFileSystemCdm>,
    resources: Assembly,
    gateway: Assembly,
    assemblers: Vec<Arc<dyn Processor>>,
    sources: Vec<ContextSpec>,
}

impl Application {
    /// Creates the application.
    ///
    /// The configuration is validated, telemetry is initialized, and the
    /// configuration and the content delivery manager are registered in the
    /// container.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, telemetry cannot be
    /// initialized or the content repository path cannot be resolved.
    pub fn from_config(config: AllyConfig) -> Result<Self, ApplicationError> {
        config.validate()?;
        init_telemetry(&config.telemetry())?;

        let cdm = Arc::new(LocalFileSystemCdm::new(
            &config.cdm.repository_path,
            config.cdm.server_uri.clone(),
        )?);
        let config = Arc::new(config);

        let mut container = Container::new();
        container.register(Arc::clone(&config));
        container.register(Arc::clone(&cdm));

        info!(
            http_addr = %config.server.http_addr,
            root_uri = %config.server.root_uri,
            gateway = ?config.gateway.mode,
            "Application configured"
        );

        Ok(Self {
            config,
            container,
            cdm,
            resources: Assembly::new(RESOURCES),
            gateway: Assembly::new(GATEWAY),
            assemblers: Vec::new(),
            sources: Vec::new(),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AllyConfig {
        &self.config
    }

    /// Returns the service container.
    #[must_use]
    pub const fn container(&self) -> &Container {
        &self.container
    }

    /// Returns the service container for registration.
    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// Returns the content delivery manager.
    #[must_use]
    pub fn cdm(&self) -> &Arc<LocalFileSystemCdm> {
        &self.cdm
    }

    /// Returns the resources assembly for contribution.
    pub fn resources_mut(&mut self) -> &mut Assembly {
        &mut self.resources
    }

    /// Returns the gateway assembly for contribution.
    pub fn gateway_mut(&mut self) -> &mut Assembly {
        &mut self.gateway
    }

    /// Returns the gateway assembly, unless the gateway is disabled.
    ///
    /// An internal gateway is not routed by the server; it is served by
    /// the caller from this assembly.
    #[must_use]
    pub fn gateway(&self) -> Option<&Assembly> {
        match self.config.gateway.mode {
            GatewayMode::None => None,
            GatewayMode::External | GatewayMode::Internal => Some(&self.gateway),
        }
    }

    /// Contributes a processor to the assembler assembly.
    pub fn add_assembler(&mut self, processor: impl Processor) -> &mut Self {
        self.assemblers.push(Arc::new(processor));
        self
    }

    /// Declares a context the caller provides to the processings.
    pub fn add_source(&mut self, spec: ContextSpec) -> &mut Self {
        self.sources.push(spec);
        self
    }

    /// Builds the server assembly.
    ///
    /// # Errors
    ///
    /// Returns `AssemblyError` if two routers share an assembly name.
    pub fn server_assembly(&self) -> Result<Assembly, AssemblyError> {
        let mut server = Assembly::new("server");

        if self.config.cdm.server_provide_content {
            let mut content = Assembly::new(CONTENT);
            content.add(ContentDeliveryHandler::new(self.cdm.repository()))?;
            server.add(RoutingByPathHandler::new(
                content,
                self.config.cdm.root_uri_content.as_str(),
            ))?;
        }

        if self.config.gateway.mode == GatewayMode::External {
            server.add(RoutingHandler::new(self.gateway.clone()))?;
        }

        server.add(RoutingByPathHandler::new(
            self.resources.clone(),
            self.config.server.root_uri.as_str(),
        ))?;
        Ok(server)
    }

    /// Builds the assembler assembly.
    ///
    /// # Errors
    ///
    /// Returns `AssemblyError` if two assemblers share a name.
    pub fn assembler_assembly(&self) -> Result<Assembly, AssemblyError> {
        let mut assembler = Assembly::new("assembler");
        assembler.add(ProcessMethodHandler::new())?;
        for processor in &self.assemblers {
            assembler.add_shared(Arc::clone(processor))?;
        }
        Ok(assembler)
    }

    /// Resolves the server processing.
    ///
    /// # Errors
    ///
    /// Returns an error if the server assembly cannot be built or resolved.
    pub fn server_processing(&self) -> Result<Processing, ApplicationError> {
        let server = self.server_assembly()?;
        let processing = Processing::builder(&server)
            .source(request::spec().defines(&request::URI))
            .source(invoker::registered())
            .sources(self.sources.iter().cloned())
            .build()?;
        debug!(processors = server.processors().len(), "Server processing resolved");
        Ok(processing)
    }

    /// Resolves the assembler processing.
    ///
    /// # Errors
    ///
    /// Returns an error if the assembler assembly cannot be built or resolved.
    pub fn assembler_processing(&self) -> Result<Processing, ApplicationError> {
        let assembler = self.assembler_assembly()?;
        let processing = Processing::builder(&assembler)
            .source(register::spec().defines(&register::INVOKERS))
            .source(invoker::registered())
            .sources(self.sources.iter().cloned())
            .build()?;
        Ok(processing)
    }

    /// Registers the declared invokers through the assembler processing.
    ///
    /// # Errors
    ///
    /// Returns an error if the assembler processing cannot be resolved or the
    /// registration keeps failing.
    pub async fn register(&self, invokers: Vec<Context>) -> Result<Vec<SharedContext>, ApplicationError> {
        let processing = self.assembler_processing()?;
        Ok(register_invokers(&processing, invokers).await?)
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .field("resources", &self.resources.name())
            .field("assemblers", &self.assemblers.len())
            .finish_non_exhaustive()
    }
}
