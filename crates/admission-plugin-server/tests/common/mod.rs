#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};

use admission_plugin_server::{
    certs::ConfigSource,
    config::{ClientCaLocation, Config, TlsConfig},
    decoder::Decoder,
    errors::TrustBootstrapError,
    plugin::AdmissionPlugin,
    AdmissionPluginServer,
};
use axum::Router;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose, SanType,
};
use tempfile::TempDir;

/// Serves a fixed client CA bundle, standing in for the cluster.
pub(crate) struct StaticConfigSource(pub(crate) Vec<u8>);

impl ConfigSource for StaticConfigSource {
    async fn fetch(&self, _location: &ClientCaLocation) -> Result<Vec<u8>, TrustBootstrapError> {
        Ok(self.0.clone())
    }
}

pub(crate) struct CertificateAuthority {
    pub(crate) cert: Certificate,
    pub(crate) key: KeyPair,
}

impl CertificateAuthority {
    pub(crate) fn new(common_name: &str) -> Self {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec![]).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let cert = params.self_signed(&key).unwrap();

        CertificateAuthority { cert, key }
    }

    pub(crate) fn pem(&self) -> String {
        self.cert.pem()
    }

    /// Returns the PEM encoded certificate and key.
    pub(crate) fn issue(
        &self,
        common_name: &str,
        usage: ExtendedKeyUsagePurpose,
    ) -> (String, String) {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["localhost".to_owned()]).unwrap();
        params
            .subject_alt_names
            .push(SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params.extended_key_usages = vec![usage];
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();

        (cert.pem(), key.serialize_pem())
    }
}

/// Key material of a webhook whose clients are verified against
/// `client_ca`. The server certificate is issued by `server_ca`.
pub(crate) struct TlsMaterial {
    pub(crate) server_ca: CertificateAuthority,
    pub(crate) client_ca: CertificateAuthority,
    pub(crate) dir: TempDir,
    pub(crate) tls_config: TlsConfig,
}

impl TlsMaterial {
    pub(crate) fn new() -> Self {
        let server_ca = CertificateAuthority::new("admission-plugin-server-ca");
        let client_ca = CertificateAuthority::new("front-proxy-ca");
        let (cert, key) = server_ca.issue(
            "admission-plugin-server",
            ExtendedKeyUsagePurpose::ServerAuth,
        );

        let dir = tempfile::tempdir().unwrap();
        let cert_file = dir.path().join("tls.crt");
        let key_file = dir.path().join("tls.key");
        std::fs::write(&cert_file, cert).unwrap();
        std::fs::write(&key_file, key).unwrap();

        TlsMaterial {
            server_ca,
            client_ca,
            dir,
            tls_config: TlsConfig {
                cert_file,
                key_file,
                client_ca: ClientCaLocation::default(),
            },
        }
    }

    pub(crate) fn config_source(&self) -> StaticConfigSource {
        StaticConfigSource(self.client_ca.pem().into_bytes())
    }
}

pub(crate) fn default_test_config(tls_config: TlsConfig) -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        tls_config,
        policy_evaluation_limit_seconds: Some(2),
        log_level: "info".to_owned(),
        log_fmt: "json".to_owned(),
        log_no_color: false,
    }
}

pub(crate) async fn app<D, P>(
    policy_evaluation_limit_seconds: Option<u64>,
    decoder: D,
    plugin: P,
) -> Router
where
    D: Decoder,
    P: AdmissionPlugin<D::Object>,
{
    let tls = TlsMaterial::new();
    let config = Config {
        policy_evaluation_limit_seconds,
        ..default_test_config(tls.tls_config.clone())
    };

    let server =
        AdmissionPluginServer::new_from_config(config, decoder, plugin, &tls.config_source())
            .await
            .unwrap();

    server.router()
}

/// Find a port nobody is listening on.
pub(crate) fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
