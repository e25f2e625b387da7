use std::{future::Future, path::Path, sync::Arc};

use ::tracing::{debug, info, warn};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use rustls::{
    crypto::CryptoProvider,
    server::{danger::ClientCertVerifier, WebPkiClientVerifier},
    RootCertStore, ServerConfig,
};
use rustls_pki_types::{pem::SliceIter, CertificateDer, PrivateKeyDer};

use crate::{
    config::{ClientCaLocation, TlsConfig},
    errors::TrustBootstrapError,
};

type Result<T> = std::result::Result<T, TrustBootstrapError>;

/// Fetches the PEM encoded CA bundle published by the caller of the webhook.
pub trait ConfigSource {
    fn fetch(&self, location: &ClientCaLocation) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Reads the client CA bundle from a Kubernetes ConfigMap.
#[derive(Clone)]
pub struct KubeConfigSource {
    client: kube::Client,
}

impl KubeConfigSource {
    pub fn new(client: kube::Client) -> Self {
        KubeConfigSource { client }
    }
}

impl ConfigSource for KubeConfigSource {
    async fn fetch(&self, location: &ClientCaLocation) -> Result<Vec<u8>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &location.namespace);
        let config_map = api.get_opt(&location.name).await?.ok_or_else(|| {
            TrustBootstrapError::ConfigObjectNotFound {
                name: location.name.clone(),
                namespace: location.namespace.clone(),
            }
        })?;

        if let Some(bundle) = config_map
            .data
            .as_ref()
            .and_then(|data| data.get(&location.key))
        {
            return Ok(bundle.as_bytes().to_vec());
        }
        if let Some(bundle) = config_map
            .binary_data
            .as_ref()
            .and_then(|data| data.get(&location.key))
        {
            return Ok(bundle.0.clone());
        }

        Err(TrustBootstrapError::MissingKey {
            name: location.name.clone(),
            namespace: location.namespace.clone(),
            key: location.key.clone(),
        })
    }
}

/// Build the TLS configuration of the webhook: the server presents the key
/// pair found on disk and every client must present a certificate issued by
/// the CA published at `tls_config.client_ca`.
pub async fn create_tls_config(
    tls_config: &TlsConfig,
    source: &impl ConfigSource,
) -> Result<ServerConfig> {
    let location = &tls_config.client_ca;
    let client_ca_bundle = source.fetch(location).await?;
    info!(
        configmap = location.name.as_str(),
        namespace = location.namespace.as_str(),
        key = location.key.as_str(),
        "fetched client CA bundle"
    );
    let client_verifier = build_client_verifier(&client_ca_bundle)?;

    let (cert, key) = load_server_cert_and_key(&tls_config.cert_file, &tls_config.key_file).await?;

    build_tls_server_config(cert, key, client_verifier)
}

fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

// Build the TLS server
fn build_tls_server_config(
    cert: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    client_verifier: Arc<dyn ClientCertVerifier>,
) -> Result<ServerConfig> {
    let mut config = ServerConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()?
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(cert, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|source| TrustBootstrapError::ReadFile {
            path: path.to_owned(),
            source,
        })
}

// Load the server certificate chain and key
async fn load_server_cert_and_key(
    cert_file: &Path,
    key_file: &Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let cert_contents = read_file(cert_file).await?;
    let key_contents = read_file(key_file).await?;

    let cert_iterator: SliceIter<CertificateDer> = SliceIter::new(&cert_contents[..]);
    let certs: Vec<_> = cert_iterator
        .filter_map(|it| {
            if let Err(ref e) = it {
                warn!("Cannot parse server certificate: {e}");
            }
            it.ok()
        })
        .collect();

    if certs.is_empty() {
        return Err(TrustBootstrapError::ServerCertificate(cert_file.to_owned()));
    }

    let key_iterator: SliceIter<PrivateKeyDer> = SliceIter::new(&key_contents[..]);
    let mut keys: Vec<PrivateKeyDer> = key_iterator
        .filter_map(|it| {
            if let Err(ref e) = it {
                warn!("Cannot parse private key: {e}");
            }
            it.ok()
        })
        .collect();

    match keys.pop() {
        Some(key) if keys.is_empty() => {
            debug!(chain_length = certs.len(), "loaded server certificate");
            Ok((certs, key))
        }
        popped => Err(TrustBootstrapError::PrivateKey {
            path: key_file.to_owned(),
            found: keys.len() + usize::from(popped.is_some()),
        }),
    }
}

// Load the client CA certificates and build the client verifier
fn build_client_verifier(client_ca_bundle: &[u8]) -> Result<Arc<dyn ClientCertVerifier>> {
    let cert_iterator: SliceIter<CertificateDer> = SliceIter::new(client_ca_bundle);
    let client_ca_certs: Vec<_> = cert_iterator
        .filter_map(|it| {
            if let Err(ref e) = it {
                warn!("Cannot parse client CA certificate: {e}");
            }
            it.ok()
        })
        .collect();

    let mut store = RootCertStore::empty();
    let (cert_added, cert_ignored) = store.add_parsable_certificates(client_ca_certs);
    info!(
        client_ca_certs_added = cert_added,
        client_ca_certs_ignored = cert_ignored,
        "Loaded client CA certificates"
    );
    if cert_added == 0 {
        return Err(TrustBootstrapError::NoClientCaCertificates);
    }

    Ok(WebPkiClientVerifier::builder_with_provider(Arc::new(store), crypto_provider()).build()?)
}
