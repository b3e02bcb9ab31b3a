use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::Notify;

use super::routes::routes;
use crate::controller::AppContext;
use crate::error_handling::types::WebError;

/// Longest wait for open connections once shutdown was requested. `/stream`
/// responses never end by themselves.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP front end of the relay.
pub struct WebServer {
    context: Arc<AppContext>,
}

impl WebServer {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Binds `addr` and serves until `shutdown` resolves.
    pub async fn serve<F>(&self, addr: SocketAddr, shutdown: F) -> Result<(), WebError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let signalled = Arc::new(Notify::new());
        let notify = signalled.clone();

        let (bound, server) = warp::serve(routes(self.context.clone()))
            .try_bind_with_graceful_shutdown(addr, async move {
                shutdown.await;
                notify.notify_one();
            })
            .map_err(|e| WebError::BindFailed(format!("{}: {}", addr, e)))?;

        info!("HTTP server listening on http://{}", bound);
        info!(
            "Serving static files from {} and clips from {}",
            self.context.static_dir().display(),
            self.context.clips_dir().display()
        );

        tokio::pin!(server);
        tokio::select! {
            _ = &mut server => {}
            _ = signalled.notified() => {
                if tokio::time::timeout(DRAIN_TIMEOUT, &mut server).await.is_err() {
                    warn!(
                        "Connections still open after {:?}, closing them",
                        DRAIN_TIMEOUT
                    );
                }
            }
        }

        info!("HTTP server stopped");
        Ok(())
    }
}
