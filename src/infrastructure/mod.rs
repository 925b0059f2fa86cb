pub mod api;
pub mod cache;
pub mod logging;
pub mod mutation;
pub mod pipeline;
pub mod poller;
pub mod subscription;
pub mod transport;

pub use api::ApiLoader;
pub use cache::{QueryCache, QueryLoader, SubscriptionGuard};
pub use mutation::MutationExecutor;
pub use pipeline::SubmissionPipeline;
pub use poller::Poller;
pub use subscription::QueryWatch;
pub use transport::{HttpTransport, RequestSpec, Transport};
