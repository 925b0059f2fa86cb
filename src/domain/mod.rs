//! Domain types: errors, query identity and state, mutation descriptors,
//! API models, and the submission state machine.

pub mod api;
pub mod error;
pub mod mutation;
pub mod query;
pub mod submission;

pub use error::ClientError;
pub use mutation::MutationDescriptor;
pub use query::{PollingPolicy, PollingTable, QueryEntry, QueryKey, QueryPattern, QueryStatus};
pub use submission::{ImageFile, RegistrationForm, SubmissionOutcome, SubmissionState};
