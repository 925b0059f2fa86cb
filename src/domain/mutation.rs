//! Mutation descriptors: which cached queries a successful write invalidates

use crate::domain::api::queries;
use crate::domain::query::QueryPattern;

/// Declares the set of query patterns a mutation invalidates on success.
///
/// Invalidation never happens on failure; the cache stays exactly as it was
/// before the mutation attempt.
#[derive(Debug, Clone, Default)]
pub struct MutationDescriptor {
    invalidates: Vec<QueryPattern>,
}

impl MutationDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidating(mut self, pattern: impl Into<QueryPattern>) -> Self {
        self.invalidates.push(pattern.into());
        self
    }

    pub fn invalidates(&self) -> &[QueryPattern] {
        &self.invalidates
    }

    /// Registering an identity changes the roster and the stats card.
    pub fn register_identity() -> Self {
        Self::new()
            .invalidating(QueryPattern::name(queries::STUDENTS))
            .invalidating(QueryPattern::name(queries::ATTENDANCE_STATS))
    }

    /// Deleting an identity invalidates the same queries as registering one.
    pub fn delete_identity() -> Self {
        Self::register_identity()
    }

    /// Recognition logs attendance server-side, so every attendance view
    /// refreshes after it.
    pub fn recognize_faces() -> Self {
        Self::new()
            .invalidating(QueryPattern::name(queries::ATTENDANCE_STATS))
            .invalidating(QueryPattern::name(queries::TODAY_ATTENDANCE))
            .invalidating(QueryPattern::name(queries::ATTENDANCE_HISTORY))
    }
}
