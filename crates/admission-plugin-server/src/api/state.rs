use crate::handler::AdmissionPluginHandler;

pub(crate) struct ApiServerState<D, P> {
    pub(crate) handler: AdmissionPluginHandler<D, P>,
}
