use std::{fmt, path::PathBuf, time::Duration};

use thiserror::Error;

/// The object of the review request that could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Object,
    OldObject,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Phase::Object => write!(f, "object"),
            Phase::OldObject => write!(f, "oldObject"),
        }
    }
}

#[derive(Debug, Error)]
#[error("cannot decode {phase}: {source}")]
pub struct DecodeError {
    pub phase: Phase,
    #[source]
    pub source: anyhow::Error,
}

/// Errors raised while handling a single admission review. None of them is
/// fatal: each one becomes a rejection carrying the error message.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("cannot parse admission review: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown kind/version {kind:?}/{api_version:?}")]
    ProtocolMismatch { kind: String, api_version: String },

    #[error("failed to convert to admission record: {0}")]
    Decode(#[from] DecodeError),

    #[error("error from admission plugin: {0}")]
    Policy(anyhow::Error),

    #[error("admission plugin attempted object mutation, which is unsupported")]
    MutationViolation,

    #[error("admission plugin evaluation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("admission plugin evaluation aborted: {0}")]
    Aborted(String),
}

/// Errors raised while configuring TLS. They are always fatal: the server
/// must not start listening with a partial trust configuration.
#[derive(Debug, Error)]
pub enum TrustBootstrapError {
    #[error("cannot find ConfigMap {namespace}/{name}")]
    ConfigObjectNotFound { name: String, namespace: String },

    #[error("cannot find key {key:?} inside of ConfigMap {namespace}/{name}")]
    MissingKey {
        name: String,
        namespace: String,
        key: String,
    },

    #[error("cannot fetch client CA bundle: {0}")]
    Kube(#[from] kube::Error),

    #[error("client CA bundle does not contain any valid certificate")]
    NoClientCaCertificates,

    #[error("cannot read {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("expected at least one certificate in certificate file {0:?}")]
    ServerCertificate(PathBuf),

    #[error("expected exactly one key in key file {path:?}, found {found}")]
    PrivateKey { path: PathBuf, found: usize },

    #[error("cannot build client verifier: {0}")]
    ClientVerifier(#[from] rustls::server::VerifierBuilderError),

    #[error("cannot build TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),
}
