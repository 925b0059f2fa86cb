//! Query identity, cached entry state, and polling policies

pub mod entry;
pub mod key;
pub mod policy;

pub use entry::{QueryEntry, QueryStatus};
pub use key::{QueryKey, QueryPattern};
pub use policy::{PollingPolicy, PollingTable};
