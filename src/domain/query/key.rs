//! Query identity and invalidation patterns

use std::collections::BTreeMap;

/// Identity of a cacheable request: a query name plus its parameters.
///
/// Two keys are equal iff the name and every parameter match by value.
/// Parameters are kept sorted so the canonical form is stable regardless of
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    name: String,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter to the key.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Canonical string form, `name:param=value:...`, used for logging and
    /// as a stable cache index.
    pub fn as_cache_key(&self) -> String {
        let mut parts = vec![self.name.clone()];

        for (k, v) in &self.params {
            parts.push(format!("{}={}", k, v));
        }

        parts.join(":")
    }
}

/// Pattern a mutation declares to select the cached queries it invalidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPattern {
    /// Matches every parameterization of the named query.
    Name(String),
    /// Matches exactly one key.
    Exact(QueryKey),
}

impl QueryPattern {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::Name(name) => key.name() == name,
            Self::Exact(exact) => key == exact,
        }
    }
}

impl From<QueryKey> for QueryPattern {
    fn from(key: QueryKey) -> Self {
        Self::Exact(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_equal_by_value() {
        let a = QueryKey::new("attendance-history").with_param("days", "14");
        let b = QueryKey::new("attendance-history").with_param("days", "14");
        let c = QueryKey::new("attendance-history").with_param("days", "7");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_cache_key_params_are_sorted() {
        let key = QueryKey::new("report")
            .with_param("zebra", "z")
            .with_param("apple", "a")
            .with_param("mango", "m");

        assert_eq!(key.as_cache_key(), "report:apple=a:mango=m:zebra=z");
    }

    #[test]
    fn test_cache_key_without_params() {
        assert_eq!(QueryKey::new("students").as_cache_key(), "students");
    }

    #[test]
    fn test_name_pattern_ignores_params() {
        let pattern = QueryPattern::name("attendance-history");

        assert!(pattern.matches(&QueryKey::new("attendance-history")));
        assert!(pattern.matches(&QueryKey::new("attendance-history").with_param("days", "14")));
        assert!(!pattern.matches(&QueryKey::new("students")));
    }

    #[test]
    fn test_exact_pattern_requires_full_match() {
        let key = QueryKey::new("attendance-history").with_param("days", "14");
        let pattern = QueryPattern::from(key.clone());

        assert!(pattern.matches(&key));
        assert!(!pattern.matches(&QueryKey::new("attendance-history").with_param("days", "7")));
        assert!(!pattern.matches(&QueryKey::new("attendance-history")));
    }
}
