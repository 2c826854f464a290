//! gRPC server module for the purchase quota service.

mod server;
mod service;

pub use server::GrpcServer;
pub use service::QuotaServiceImpl;

// Include the generated protobuf code
pub mod proto {
    pub mod granary {
        pub mod quota {
            pub mod v1 {
                tonic::include_proto!("granary.quota.v1");
            }
        }
    }
}

// Re-export commonly used types
pub use proto::granary::quota::v1::{
    quota_service_server::QuotaServiceServer,
    BuyRequest, BuyResponse, StatsRequest, StatsResponse,
};
