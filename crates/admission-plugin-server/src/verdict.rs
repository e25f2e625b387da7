use crate::errors::AdmissionError;

/// The outcome of an admission review, before it is encoded on the wire.
///
/// A reason is attached if and only if the request is rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn allow() -> Self {
        Verdict {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Verdict {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

impl From<AdmissionError> for Verdict {
    fn from(error: AdmissionError) -> Self {
        Verdict::deny(error.to_string())
    }
}
