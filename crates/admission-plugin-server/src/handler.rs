use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn, Span};

use crate::{
    admission_review::AdmissionReview,
    attributes::Attributes,
    decoder::Decoder,
    errors::AdmissionError,
    plugin::{self, AdmissionPlugin},
    verdict::Verdict,
};

/// Wraps an admission plugin, turning admission reviews into decision
/// requests and the plugin's answer back into admission reviews.
pub struct AdmissionPluginHandler<D, P> {
    decoder: Arc<D>,
    plugin: Arc<P>,
    evaluation_limit: Option<Duration>,
}

impl<D, P> Clone for AdmissionPluginHandler<D, P> {
    fn clone(&self) -> Self {
        AdmissionPluginHandler {
            decoder: self.decoder.clone(),
            plugin: self.plugin.clone(),
            evaluation_limit: self.evaluation_limit,
        }
    }
}

/// Outcome of the steps that come before the plugin invocation.
enum Prepared<O> {
    Ready(AdmissionReview, Attributes<O>),
    Rejected(AdmissionReview, AdmissionError),
}

impl<D, P> AdmissionPluginHandler<D, P>
where
    D: Decoder,
    P: AdmissionPlugin<D::Object>,
{
    pub fn new(decoder: D, plugin: P) -> Self {
        AdmissionPluginHandler {
            decoder: Arc::new(decoder),
            plugin: Arc::new(plugin),
            evaluation_limit: None,
        }
    }

    /// Reject requests whose plugin evaluation takes longer than `limit`.
    /// Only honored by [`AdmissionPluginHandler::handle`].
    pub fn with_evaluation_limit(mut self, limit: Option<Duration>) -> Self {
        self.evaluation_limit = limit;
        self
    }

    /// Review the raw body of a request, running the plugin on the current
    /// thread.
    pub fn review(&self, body: &[u8]) -> AdmissionReview {
        match self.prepare(body) {
            Prepared::Rejected(review, error) => reject(review, error),
            Prepared::Ready(review, mut attributes) => {
                let verdict = plugin::invoke(self.plugin.as_ref(), &mut attributes);
                respond(review, verdict)
            }
        }
    }

    /// Review the raw body of a request. The plugin is run on the blocking
    /// thread pool, under the evaluation limit when one is set.
    pub async fn handle(&self, body: &[u8]) -> AdmissionReview {
        let (review, mut attributes) = match self.prepare(body) {
            Prepared::Rejected(review, error) => return reject(review, error),
            Prepared::Ready(review, attributes) => (review, attributes),
        };

        let plugin = self.plugin.clone();
        let span = Span::current();
        let evaluation = tokio::task::spawn_blocking(move || {
            let _enter = span.enter();
            plugin::invoke(plugin.as_ref(), &mut attributes)
        });

        let outcome = match self.evaluation_limit {
            Some(limit) => match tokio::time::timeout(limit, evaluation).await {
                Ok(outcome) => outcome,
                Err(_) => return reject(review, AdmissionError::Timeout(limit)),
            },
            None => evaluation.await,
        };

        match outcome {
            Ok(verdict) => respond(review, verdict),
            Err(error) => reject(review, AdmissionError::Aborted(error.to_string())),
        }
    }

    fn prepare(&self, body: &[u8]) -> Prepared<D::Object> {
        let review = match AdmissionReview::from_slice(body) {
            Ok(review) => review,
            Err(error) => {
                return Prepared::Rejected(AdmissionReview::default(), AdmissionError::Parse(error))
            }
        };

        if !review.is_supported() {
            let error = AdmissionError::ProtocolMismatch {
                kind: review.kind.clone(),
                api_version: review.api_version.clone(),
            };
            return Prepared::Rejected(review, error);
        }

        record_request(&review);

        match Attributes::from_spec(&review.spec, self.decoder.as_ref()) {
            Ok(attributes) => Prepared::Ready(review, attributes),
            Err(error) => Prepared::Rejected(review, error.into()),
        }
    }
}

fn reject(review: AdmissionReview, error: AdmissionError) -> AdmissionReview {
    warn!(%error, "admission review rejected");
    respond(review, error.into())
}

fn respond(review: AdmissionReview, verdict: Verdict) -> AdmissionReview {
    Span::current().record("allowed", verdict.allowed);
    if let Some(reason) = &verdict.reason {
        Span::current().record("reason", reason.as_str());
    }
    if verdict.allowed {
        debug!("admission review allowed");
    } else {
        info!(reason = verdict.reason.as_deref(), "admission review denied");
    }

    review.with_verdict(verdict)
}

fn record_request(review: &AdmissionReview) {
    let spec = &review.spec;
    Span::current().record("operation", spec.operation.as_str());
    Span::current().record("kind", spec.kind.kind.as_str());
    Span::current().record("kind_group", spec.kind.group.as_str());
    Span::current().record("kind_version", spec.kind.version.as_str());
    Span::current().record("resource", spec.resource.resource.as_str());
    Span::current().record("resource_group", spec.resource.group.as_str());
    Span::current().record("resource_version", spec.resource.version.as_str());
    Span::current().record("subresource", spec.sub_resource.as_str());
    Span::current().record("namespace", spec.namespace.as_str());
    Span::current().record("name", spec.name.as_str());
}
