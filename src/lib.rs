//! Attendance Dashboard Client
//!
//! The data layer of a face-recognition attendance dashboard:
//! - A shared query cache with stale-while-revalidate reads and
//!   request de-duplication
//! - Watch handles that stream entry snapshots to views and drive
//!   background polling while subscribed
//! - Mutations (register, delete, recognize) that invalidate and
//!   refresh the queries they affect
//! - A submission pipeline for multipart image uploads

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::ClientError;

use std::sync::Arc;

use domain::api::DeleteResponse;
use domain::mutation::MutationDescriptor;
use domain::query::{PollingTable, QueryKey};
use infrastructure::{
    api, ApiLoader, HttpTransport, MutationExecutor, Poller, QueryCache, QueryWatch,
    SubmissionPipeline, Transport,
};

/// Entry point wiring the transport, cache, poller, and mutation executor
/// together. Cloning is cheap; all clones share the same cache.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    cache: QueryCache,
    poller: Arc<Poller>,
    transport: Arc<dyn Transport>,
    mutations: Arc<MutationExecutor>,
}

impl DashboardClient {
    pub fn new(config: &AppConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::with_timeout(&config.api.base_url, config.api.timeout())?;
        Ok(Self::with_transport(
            Arc::new(transport),
            PollingTable::dashboard_defaults(),
        ))
    }

    /// Builds a client over any transport, registering a loader for every
    /// dashboard query so invalidation and polling can refetch them.
    pub fn with_transport(transport: Arc<dyn Transport>, table: PollingTable) -> Self {
        let cache = QueryCache::new();
        let loader = Arc::new(ApiLoader::new(transport.clone()));
        for name in [
            domain::api::queries::STUDENTS,
            domain::api::queries::ATTENDANCE_STATS,
            domain::api::queries::TODAY_ATTENDANCE,
            domain::api::queries::ATTENDANCE_HISTORY,
        ] {
            cache.register_loader(name, loader.clone());
        }

        let poller = Arc::new(Poller::new(cache.clone(), table));
        let mutations = Arc::new(MutationExecutor::new(transport.clone(), cache.clone()));

        Self {
            cache,
            poller,
            transport,
            mutations,
        }
    }

    /// Subscribes to a query, fetching it if it has never been loaded and
    /// arming its polling timer while the watch is alive.
    pub fn watch(&self, key: QueryKey) -> QueryWatch {
        QueryWatch::bind(&self.cache, &self.poller, key)
    }

    /// A fresh pipeline for one image submission flow.
    pub fn submission(&self) -> SubmissionPipeline {
        SubmissionPipeline::new(self.mutations.clone())
    }

    /// Deletes a registered student and refreshes the views that listed them.
    pub async fn delete_student(&self, name: &str) -> Result<DeleteResponse, ClientError> {
        let value = self
            .mutations
            .execute(
                api::delete_student(name),
                &MutationDescriptor::delete_identity(),
            )
            .await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::decode(format!("Malformed response: {}", e)))
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}
