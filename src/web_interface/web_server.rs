use std::net::SocketAddr;
use std::sync::Arc;

use log::info;

use crate::error_handling::types::WebError;
use crate::storage::ArchiveStorage;
use crate::web_interface::routes;

use warp::Filter;

/// Web server for the archive HTTP API.
pub struct WebServer {
    storage: Arc<ArchiveStorage>,
    quota_bytes: u64,
}

impl WebServer {
    pub fn new(storage: Arc<ArchiveStorage>, quota_bytes: u64) -> Self {
        Self {
            storage,
            quota_bytes,
        }
    }

    /// Starts the web server on the given port. Runs until the process exits.
    pub async fn start(&self, port: u16) -> Result<(), WebError> {
        let routes = routes::dashboard_route()
            .or(routes::list_days_route(Arc::clone(&self.storage)))
            .or(routes::list_segments_route(Arc::clone(&self.storage)))
            .or(routes::resource_route(
                Arc::clone(&self.storage),
                self.quota_bytes,
            ))
            .or(routes::delete_day_route(Arc::clone(&self.storage)))
            .or(routes::segment_file_route(Arc::clone(&self.storage)));

        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        info!("Archive API listening on {}", addr);

        // Start server (warp 0.4)
        warp::serve(routes).run(addr).await;

        Ok(())
    }
}
