use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Collects media mounts into one router with request tracing and
/// `x-request-id` propagation.
#[derive(Clone, Default)]
pub struct MediaApp {
    pub router: Router<()>,
}

impl MediaApp {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Nest a router (usually from [`crate::MediaServer::serve`]) under `path`
    pub fn mount(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    /// Final router with the tracing and request-id layers applied
    pub fn into_router(self) -> Router<()> {
        self.router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "media server listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}
