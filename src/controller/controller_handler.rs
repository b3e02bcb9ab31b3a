use std::future::Future;
use std::sync::Arc;

use log::{error, info, warn};

use super::app_context::AppContext;
use crate::configuration::config::Config;
use crate::error_handling::types::*;
use crate::streaming::{FrameSourceConnector, FrameStore};
use crate::web_interface::WebServer;

/// Wires the relay together and drives it until shutdown.
pub struct Controller {
    context: Arc<AppContext>,
    connector: FrameSourceConnector,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        // fail early on an address we could never bind
        config.socket_addr()?;

        let store = Arc::new(FrameStore::new());
        let connector = FrameSourceConnector::new(
            config.settings.source_url.clone(),
            store.clone(),
            config.settings.connector.clone(),
        )
        .map_err(|e| ControllerError::InitializationFailed(e.to_string()))?;

        let context = Arc::new(AppContext::new(config, store, connector.stats()));

        Ok(Self { context, connector })
    }

    pub fn context(&self) -> Arc<AppContext> {
        self.context.clone()
    }

    /// Runs until Ctrl-C.
    pub async fn run(self) -> Result<(), ControllerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await
    }

    /// Runs until `shutdown` resolves, then stops recording and the upstream
    /// connector.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ControllerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let context = self.context;
        let addr = context.config.socket_addr()?;

        info!("Camera input: {}", context.config.camera.camera_url);
        info!("Clips directory: {}", context.clips_dir().display());
        info!("Frame source: {}", context.config.settings.source_url);

        let connector_task = self.connector.spawn();

        let served = WebServer::new(context.clone()).serve(addr, shutdown).await;
        if let Err(e) = &served {
            error!("{}", e);
        }

        Self::shutdown(&context).await;
        connector_task.abort();
        if let Err(e) = connector_task.await {
            if !e.is_cancelled() {
                warn!("Frame source connector ended abnormally: {}", e);
            }
        }

        served.map_err(ControllerError::from)
    }

    async fn shutdown(context: &AppContext) {
        info!("Shutting down");
        context.recorder.shutdown().await;
    }
}
