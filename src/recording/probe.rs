//! Transport-level reachability pre-check of the camera endpoint.
//!
//! Launching the capture backend against a dead camera burns the whole
//! capture window; a bounded TCP connect fails fast instead. The probe never
//! reads stream content - the socket is opened and dropped immediately.

use std::time::Duration;

use log::{debug, warn};
use tokio::net::TcpStream;

use crate::recording::types::CameraEndpoint;

pub struct ReachabilityProbe {
    timeout: Duration,
}

impl ReachabilityProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns true only if a TCP connection to the endpoint succeeds within
    /// the configured bound. Parse failures, refusals and timeouts all map to
    /// false.
    pub async fn probe(&self, endpoint: &CameraEndpoint) -> bool {
        let Some((host, port)) = endpoint.connect_addr() else {
            warn!("Probe skipped: cannot derive host/port from {}", endpoint.url());
            return false;
        };

        match tokio::time::timeout(self.timeout, TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(_stream)) => {
                debug!("Probe ok: {}:{} accepted a connection", host, port);
                true
            }
            Ok(Err(e)) => {
                debug!("Probe failed: {}:{} refused: {}", host, port, e);
                false
            }
            Err(_) => {
                debug!(
                    "Probe failed: {}:{} unreachable within {:?}",
                    host, port, self.timeout
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::types::CameraEndpoint;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_succeeds_against_listening_socket() {
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let endpoint = CameraEndpoint::new(format!("rtsp://127.0.0.1:{}/live", addr.port()));
        let probe = ReachabilityProbe::new(Duration::from_secs(2));
        assert!(probe.probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_probe_fails_against_closed_port() {
        // Bind then drop to get a port that is very likely closed.
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = CameraEndpoint::new(format!("rtsp://127.0.0.1:{}/live", addr.port()));
        let probe = ReachabilityProbe::new(Duration::from_secs(2));
        assert!(!probe.probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_probe_fails_on_unparseable_endpoint() {
        let probe = ReachabilityProbe::new(Duration::from_secs(1));
        assert!(!probe.probe(&CameraEndpoint::new("rtsp://")).await);
    }
}
