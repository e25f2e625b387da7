mod api_error;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{routing::post, Router};

use crate::{decoder::Decoder, handler::AdmissionPluginHandler, plugin::AdmissionPlugin};

pub(crate) use api_error::ApiError;
use handlers::validate_handler;
use state::ApiServerState;

/// Build the router of the webhook. Admission reviews are accepted only on
/// `POST /`.
pub fn router<D, P>(handler: AdmissionPluginHandler<D, P>) -> Router
where
    D: Decoder,
    P: AdmissionPlugin<D::Object>,
{
    let state = Arc::new(ApiServerState { handler });

    Router::new()
        .route("/", post(validate_handler::<D, P>))
        .with_state(state)
}
