use axum::{
    body::Bytes,
    extract,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::{
    api::{state::ApiServerState, ApiError},
    decoder::Decoder,
    plugin::AdmissionPlugin,
};

/// Review a request. The body is not extracted as JSON: malformed payloads
/// are answered with a rejection, not with an HTTP error.
#[tracing::instrument(
    name = "admission_review",
    fields(
        host=crate::config::HOSTNAME.as_str(),
        name=tracing::field::Empty,
        namespace=tracing::field::Empty,
        operation=tracing::field::Empty,
        subresource=tracing::field::Empty,
        kind_group=tracing::field::Empty,
        kind_version=tracing::field::Empty,
        kind=tracing::field::Empty,
        resource_group=tracing::field::Empty,
        resource_version=tracing::field::Empty,
        resource=tracing::field::Empty,
        allowed=tracing::field::Empty,
        reason=tracing::field::Empty,
    ),
    skip_all)]
pub(crate) async fn validate_handler<D, P>(
    extract::State(state): extract::State<Arc<ApiServerState<D, P>>>,
    body: Bytes,
) -> Result<Response, ApiError>
where
    D: Decoder,
    P: AdmissionPlugin<D::Object>,
{
    debug!(body_length = body.len(), "admission review received");

    let admission_review = state.handler.handle(&body).await;
    let payload = admission_review.to_json_vec().map_err(|e| {
        error!(error = %e, "cannot serialize admission review");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Something went wrong".to_owned(),
        }
    })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], payload).into_response())
}
