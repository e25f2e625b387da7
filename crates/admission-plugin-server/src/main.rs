use admission_plugin_server::{
    certs::KubeConfigSource, cli, config::Config, decoder::JsonDecoder, fatal_error,
    plugin::AlwaysAdmit, tracing::setup_tracing, AdmissionPluginServer,
    TRACE_SYSTEM_INITIALIZED,
};
use anyhow::{anyhow, Result};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    let config = Config::from_args(&matches)?;

    // The kube client and the TLS server rely on rustls. More than one crypto
    // provider ends up in the dependency tree, hence the default one must be
    // chosen explicitly.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Cannot install the default crypto provider"))?;

    setup_tracing(&config.log_level, &config.log_fmt, config.log_no_color)?;
    debug!("tracing system ready");
    if let Ok(mut initialized) = TRACE_SYSTEM_INITIALIZED.write() {
        *initialized = true;
    }

    let client = match kube::Client::try_default().await {
        Ok(client) => client,
        Err(e) => {
            fatal_error(format!("Cannot connect to Kubernetes: {e}"));
            unreachable!()
        }
    };

    let server = match AdmissionPluginServer::new_from_config(
        config,
        JsonDecoder,
        AlwaysAdmit,
        &KubeConfigSource::new(client),
    )
    .await
    {
        Ok(server) => server,
        Err(e) => {
            fatal_error(e.to_string());
            unreachable!()
        }
    };

    if let Err(e) = server.run().await {
        fatal_error(e.to_string());
    }

    Ok(())
}
