use anyhow::{anyhow, Result};
use clap::ArgMatches;
use lazy_static::lazy_static;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub static SERVICE_NAME: &str = "admission-plugin-server";

lazy_static! {
    pub(crate) static ref HOSTNAME: String =
        std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown"));
}

pub const DEFAULT_CLIENT_CA_CONFIGMAP: &str = "extension-apiserver-authentication";
pub const DEFAULT_CLIENT_CA_NAMESPACE: &str = "kube-system";
pub const DEFAULT_CLIENT_CA_KEY: &str = "requestheader-client-ca-file";

pub struct Config {
    pub addr: SocketAddr,
    pub tls_config: TlsConfig,
    /// `None` when timeout protection is disabled.
    pub policy_evaluation_limit_seconds: Option<u64>,
    pub log_level: String,
    pub log_fmt: String,
    pub log_no_color: bool,
}

#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub client_ca: ClientCaLocation,
}

/// Where the CA bundle used to verify client certificates is published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCaLocation {
    pub name: String,
    pub namespace: String,
    pub key: String,
}

impl Default for ClientCaLocation {
    fn default() -> Self {
        ClientCaLocation {
            name: DEFAULT_CLIENT_CA_CONFIGMAP.to_owned(),
            namespace: DEFAULT_CLIENT_CA_NAMESPACE.to_owned(),
            key: DEFAULT_CLIENT_CA_KEY.to_owned(),
        }
    }
}

impl Config {
    pub fn from_args(matches: &ArgMatches) -> Result<Self> {
        let addr = api_bind_address(matches)?;
        let tls_config = build_tls_config(matches)?;
        let policy_evaluation_limit_seconds = if matches
            .get_one::<bool>("disable-timeout-protection")
            .copied()
            .unwrap_or(false)
        {
            None
        } else {
            let limit = matches
                .get_one::<String>("policy-timeout")
                .ok_or_else(|| anyhow!("policy-timeout is required"))?
                .parse::<u64>()
                .map_err(|e| anyhow!("error parsing policy-timeout: {e}"))?;
            Some(limit)
        };

        let log_level = matches
            .get_one::<String>("log-level")
            .ok_or_else(|| anyhow!("log level not set"))?
            .to_owned();
        let log_fmt = matches
            .get_one::<String>("log-fmt")
            .ok_or_else(|| anyhow!("log fmt not set"))?
            .to_owned();
        let log_no_color = matches
            .get_one::<bool>("log-no-color")
            .copied()
            .unwrap_or(false);

        Ok(Self {
            addr,
            tls_config,
            policy_evaluation_limit_seconds,
            log_level,
            log_fmt,
            log_no_color,
        })
    }

    pub fn policy_evaluation_limit(&self) -> Option<Duration> {
        self.policy_evaluation_limit_seconds.map(Duration::from_secs)
    }
}

fn api_bind_address(matches: &clap::ArgMatches) -> Result<SocketAddr> {
    let ip = matches
        .get_one::<String>("address")
        .ok_or_else(|| anyhow!("address is required"))?
        .parse::<IpAddr>()
        .map_err(|e| anyhow!("error parsing address: {e}"))?;
    let port = matches
        .get_one::<String>("port")
        .ok_or_else(|| anyhow!("port is required"))?
        .parse::<u16>()
        .map_err(|e| anyhow!("error parsing port: {e}"))?;

    Ok(SocketAddr::new(ip, port))
}

fn build_tls_config(matches: &clap::ArgMatches) -> Result<TlsConfig> {
    let cert_file = matches
        .get_one::<String>("cert-file")
        .ok_or_else(|| anyhow!("cert-file is required"))?;
    let key_file = matches
        .get_one::<String>("key-file")
        .ok_or_else(|| anyhow!("key-file is required"))?;

    let string_arg = |id: &str| -> Result<String> {
        let value = matches
            .get_one::<String>(id)
            .ok_or_else(|| anyhow!("{id} is required"))?;
        if value.is_empty() {
            return Err(anyhow!("{id} cannot be empty"));
        }
        Ok(value.to_owned())
    };

    Ok(TlsConfig {
        cert_file: PathBuf::from(cert_file),
        key_file: PathBuf::from(key_file),
        client_ca: ClientCaLocation {
            name: string_arg("client-ca-configmap")?,
            namespace: string_arg("client-ca-namespace")?,
            key: string_arg("client-ca-key")?,
        },
    })
}
