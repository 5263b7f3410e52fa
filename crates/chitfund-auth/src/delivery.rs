//! Delivery of one-time codes to users.

use chitfund_core::error::ChitFundResult;
use chitfund_core::models::user::Identity;
use tracing::debug;

/// Sends a one-time code over the channel its identity names (email
/// or SMS).
pub trait CodeDelivery: Send + Sync {
    fn deliver(
        &self,
        identity: &Identity,
        code: &str,
    ) -> impl Future<Output = ChitFundResult<()>> + Send;
}

/// Development channel: writes the code to the log at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCodeDelivery;

impl CodeDelivery for TracingCodeDelivery {
    async fn deliver(&self, identity: &Identity, code: &str) -> ChitFundResult<()> {
        debug!(identity = identity.key(), code, "One-time code issued");
        Ok(())
    }
}
