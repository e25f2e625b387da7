use tracing::{debug, info};

use crate::{attributes::Attributes, errors::AdmissionError, verdict::Verdict};

/// An admission plugin decides whether a request is allowed.
///
/// The plugin receives a mutable reference to the decision request, but
/// this webhook cannot return a mutated object to the caller: any change
/// made to `attributes.object` leads to the rejection of the request.
pub trait AdmissionPlugin<O>: Send + Sync + 'static {
    /// Returning an error rejects the request.
    fn admit(&self, attributes: &mut Attributes<O>) -> anyhow::Result<()>;
}

impl<O, F> AdmissionPlugin<O> for F
where
    F: Fn(&mut Attributes<O>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn admit(&self, attributes: &mut Attributes<O>) -> anyhow::Result<()> {
        self(attributes)
    }
}

/// Run the admission plugin against the decision request.
pub fn invoke<O, P>(plugin: &P, attributes: &mut Attributes<O>) -> Verdict
where
    O: Clone + PartialEq,
    P: AdmissionPlugin<O> + ?Sized,
{
    let original = attributes.object.clone();
    let result = plugin.admit(attributes);

    if original != attributes.object {
        debug!(plugin_error = ?result.err(), "plugin mutated the object");
        return AdmissionError::MutationViolation.into();
    }

    match result {
        Ok(()) => Verdict::allow(),
        Err(error) => AdmissionError::Policy(error).into(),
    }
}

/// Accepts every request, logging what has been admitted.
#[derive(Clone, Debug, Default)]
pub struct AlwaysAdmit;

impl<O: Send + 'static> AdmissionPlugin<O> for AlwaysAdmit {
    fn admit(&self, attributes: &mut Attributes<O>) -> anyhow::Result<()> {
        info!(
            operation = attributes.operation.as_str(),
            kind = attributes.kind.kind.as_str(),
            namespace = attributes.namespace.as_str(),
            name = attributes.name.as_str(),
            user = attributes.user_info.name.as_str(),
            "admitted"
        );
        Ok(())
    }
}
