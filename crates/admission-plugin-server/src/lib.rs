pub mod admission_review;
pub mod api;
pub mod attributes;
pub mod certs;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod handler;
pub mod plugin;
pub mod tracing;
pub mod verdict;

use ::tracing::{error, info};
use anyhow::Result;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use lazy_static::lazy_static;
use std::{net::SocketAddr, process, sync::Arc, sync::RwLock};

use crate::certs::{create_tls_config, ConfigSource};
use crate::config::Config;
use crate::decoder::Decoder;
use crate::handler::AdmissionPluginHandler;
use crate::plugin::AdmissionPlugin;

lazy_static! {
    pub static ref TRACE_SYSTEM_INITIALIZED: RwLock<bool> = RwLock::new(false);
}

/// Serves an admission plugin over HTTPS, accepting only clients that
/// present a certificate issued by the published client CA.
pub struct AdmissionPluginServer {
    router: Router,
    tls_config: Arc<rustls::ServerConfig>,
    addr: SocketAddr,
}

impl AdmissionPluginServer {
    /// Bootstrap the mutual TLS configuration and prepare the router.
    ///
    /// Any failure while fetching the client CA bundle or loading the server
    /// key pair is returned: the server must not start with a partial trust
    /// configuration.
    pub async fn new_from_config<D, P>(
        config: Config,
        decoder: D,
        plugin: P,
        client_ca_source: &impl ConfigSource,
    ) -> Result<Self>
    where
        D: Decoder,
        P: AdmissionPlugin<D::Object>,
    {
        let tls_config = create_tls_config(&config.tls_config, client_ca_source).await?;

        let handler = AdmissionPluginHandler::new(decoder, plugin)
            .with_evaluation_limit(config.policy_evaluation_limit());
        let router = api::router(handler);

        Ok(Self {
            router,
            tls_config: Arc::new(tls_config),
            addr: config.addr,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self) -> Result<()> {
        let rustls_config = RustlsConfig::from_config(self.tls_config);
        info!(
            address = %self.addr,
            service = config::SERVICE_NAME,
            "started HTTPS server"
        );
        axum_server::bind_rustls(self.addr, rustls_config)
            .serve(self.router.into_make_service())
            .await?;

        Ok(())
    }
}

pub fn fatal_error(msg: String) {
    let trace_system_ready = TRACE_SYSTEM_INITIALIZED
        .read()
        .map(|ready| *ready)
        .unwrap_or(false);
    if trace_system_ready {
        error!("{}", msg);
    } else {
        eprintln!("{msg}");
    }

    process::exit(1);
}
