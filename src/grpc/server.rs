//! gRPC server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::{error, info};

use super::proto::granary::quota::v1::quota_service_server::QuotaServiceServer;
use super::service::QuotaServiceImpl;
use crate::error::{GranaryError, Result};
use crate::quota::QuotaLimiter;
use crate::store::QuotaStore;

/// gRPC server for the purchase quota service.
pub struct GrpcServer<S: QuotaStore + 'static> {
    /// Address to bind to
    addr: SocketAddr,
    /// The quota limiter instance
    limiter: Arc<QuotaLimiter<S>>,
}

impl<S: QuotaStore + 'static> GrpcServer<S> {
    /// Create a new gRPC server.
    pub fn new(addr: SocketAddr, limiter: Arc<QuotaLimiter<S>>) -> Self {
        Self { addr, limiter }
    }

    /// Start the gRPC server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        let service = QuotaServiceImpl::new(self.limiter);

        info!(
            addr = %self.addr,
            "Starting gRPC server for QuotaService"
        );

        Server::builder()
            .add_service(QuotaServiceServer::new(service))
            .serve(self.addr)
            .await
            .map_err(|e| {
                error!(error = %e, "gRPC server failed");
                GranaryError::Grpc(e)
            })
    }

    /// Start the gRPC server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let service = QuotaServiceImpl::new(self.limiter);

        info!(
            addr = %self.addr,
            "Starting gRPC server for QuotaService with graceful shutdown"
        );

        Server::builder()
            .add_service(QuotaServiceServer::new(service))
            .serve_with_shutdown(self.addr, signal)
            .await
            .map_err(|e| {
                error!(error = %e, "gRPC server failed");
                GranaryError::Grpc(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuotaConfig;
    use crate::store::MemoryStore;

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let limiter = Arc::new(QuotaLimiter::new(
            MemoryStore::new(),
            QuotaConfig::default(),
        ));
        let _server = GrpcServer::new(addr, limiter);
    }
}
