//! Purchase quota service implementation.

use std::sync::Arc;
use chrono::Utc;
use tonic::{Request, Response, Status};
use tracing::{debug, info, instrument, warn};

use super::proto::granary::quota::v1::{
    buy_response::Code,
    quota_service_server::QuotaService,
    BuyRequest, BuyResponse, StatsRequest, StatsResponse,
};

use crate::quota::{Decision, DenyReason, QuotaLimiter};
use crate::store::QuotaStore;

/// Maximum accepted client identifier length.
const MAX_CLIENT_ID_LEN: usize = 64;

/// Implementation of the QuotaService gRPC interface.
pub struct QuotaServiceImpl<S: QuotaStore> {
    /// The quota limiter instance
    limiter: Arc<QuotaLimiter<S>>,
}

impl<S: QuotaStore> QuotaServiceImpl<S> {
    /// Create a new QuotaServiceImpl with the given limiter.
    pub fn new(limiter: Arc<QuotaLimiter<S>>) -> Self {
        Self { limiter }
    }
}

/// Validate a client identifier at the transport boundary.
///
/// The limiter only guards against blank identifiers; length and
/// character-set rules are enforced here, before the identifier is used
/// to derive store keys.
fn validate_client_id(raw: &str) -> Result<&str, Status> {
    let client_id = raw.trim();

    if client_id.is_empty() {
        return Err(Status::invalid_argument("client_id is required"));
    }
    if client_id.len() > MAX_CLIENT_ID_LEN {
        return Err(Status::invalid_argument("client_id too long"));
    }
    if !client_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-'))
    {
        return Err(Status::invalid_argument("client_id has invalid characters"));
    }

    Ok(client_id)
}

#[tonic::async_trait]
impl<S: QuotaStore + 'static> QuotaService for QuotaServiceImpl<S> {
    /// Attempt to purchase one unit for a client.
    ///
    /// An over-limit outcome is reported in the response body rather than
    /// as an RPC error, so callers can tell "evaluated and denied" apart
    /// from "could not be evaluated at all".
    #[instrument(skip(self, request), fields(client_id = %request.get_ref().client_id))]
    async fn buy(
        &self,
        request: Request<BuyRequest>,
    ) -> Result<Response<BuyResponse>, Status> {
        let req = request.into_inner();
        let client_id = validate_client_id(&req.client_id)?;

        debug!(client_id = %client_id, "Processing purchase request");

        let decision = self.limiter.try_buy(client_id).await.map_err(|e| {
            warn!(error = %e, "Quota store unavailable");
            Status::unavailable("quota store unavailable")
        })?;

        let response = match decision {
            Decision::Admitted(admission) => {
                info!(
                    client_id = %client_id,
                    total = admission.total,
                    current = admission.current,
                    "Purchase admitted"
                );
                BuyResponse {
                    code: Code::Ok.into(),
                    total: admission.total,
                    limit: admission.limit,
                    remaining: admission.remaining(),
                    reset_epoch_seconds: Utc::now().timestamp() + admission.ttl_seconds as i64,
                    retry_after: None,
                    message: String::new(),
                }
            }
            Decision::Denied(denial) => match denial.reason {
                DenyReason::Validation => {
                    return Err(Status::invalid_argument(denial.message));
                }
                DenyReason::RateLimited => {
                    let retry_after = denial.retry_after_seconds.unwrap_or_default();
                    info!(
                        client_id = %client_id,
                        retry_after = retry_after,
                        "Purchase denied"
                    );
                    BuyResponse {
                        code: Code::OverLimit.into(),
                        total: 0,
                        limit: self.limiter.config().limit,
                        remaining: 0,
                        reset_epoch_seconds: Utc::now().timestamp() + retry_after as i64,
                        retry_after: Some(prost_types::Duration {
                            seconds: retry_after as i64,
                            nanos: 0,
                        }),
                        message: denial.message,
                    }
                }
            },
        };

        Ok(Response::new(response))
    }

    /// Read the lifetime total of admitted purchases for a client.
    #[instrument(skip(self, request), fields(client_id = %request.get_ref().client_id))]
    async fn get_stats(
        &self,
        request: Request<StatsRequest>,
    ) -> Result<Response<StatsResponse>, Status> {
        let req = request.into_inner();
        let client_id = validate_client_id(&req.client_id)?;

        let total = self.limiter.total(client_id).await.map_err(|e| {
            warn!(error = %e, "Quota store unavailable");
            Status::unavailable("quota store unavailable")
        })?;

        Ok(Response::new(StatsResponse { total }))
    }
}
