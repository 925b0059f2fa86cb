//! Mutation executor: write operations plus the invalidation that keeps
//! dependent queries fresh.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::mutation::MutationDescriptor;
use crate::domain::ClientError;
use crate::infrastructure::cache::QueryCache;
use crate::infrastructure::transport::{RequestSpec, Transport};

/// Performs writes through the transport gateway and, on success, marks the
/// declared query patterns stale and refetches their subscribed entries.
#[derive(Debug, Clone)]
pub struct MutationExecutor {
    transport: Arc<dyn Transport>,
    cache: QueryCache,
}

impl MutationExecutor {
    pub fn new(transport: Arc<dyn Transport>, cache: QueryCache) -> Self {
        Self { transport, cache }
    }

    /// Runs the write. A failed request performs no invalidation at all; the
    /// cache stays exactly as it was before the attempt.
    pub async fn execute(
        &self,
        spec: RequestSpec,
        descriptor: &MutationDescriptor,
    ) -> Result<Value, ClientError> {
        let value = self.transport.request(spec).await?;

        for pattern in descriptor.invalidates() {
            debug!(?pattern, "mutation succeeded, invalidating");
            self.cache.invalidate(pattern).await;
        }

        Ok(value)
    }
}
