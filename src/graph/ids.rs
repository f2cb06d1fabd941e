//! Identifier assignment for reconstructed entities.

use crate::utils::config::MAX_ID_LEN;
use std::collections::HashSet;
use uuid::Uuid;

/// How identifiers from the export are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Reuse export identifiers when valid, so a re-import addresses the
    /// same entities
    #[default]
    Reuse,
    /// Give every entity a fresh UUID
    Fresh,
}

/// Whether an export identifier can be reused verbatim
///
/// 1 to 128 characters from `[A-Za-z0-9-_.:]`.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

/// Hands out identifiers that are unique within one run
#[derive(Debug, Default)]
pub struct IdAllocator {
    policy: IdPolicy,
    used: HashSet<String>,
}

impl IdAllocator {
    pub fn new(policy: IdPolicy) -> Self {
        Self {
            policy,
            used: HashSet::new(),
        }
    }

    /// Assign an identifier for an entity whose export id is `original`
    pub fn assign(&mut self, original: Option<&str>) -> String {
        if self.policy == IdPolicy::Reuse {
            if let Some(id) = original.filter(|id| is_valid_id(id)) {
                if self.used.insert(id.to_string()) {
                    return id.to_string();
                }
            }
        }
        self.fresh()
    }

    fn fresh(&mut self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.used.insert(id.clone()) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("7f3c9a2e-1b4d-4e8a-9c6f-2d5b8e1a3f7c"));
        assert!(is_valid_id("trace:run.1_a"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("has space"));
        assert!(!is_valid_id("ünïcode"));
        assert!(!is_valid_id(&"x".repeat(MAX_ID_LEN + 1)));
    }

    #[test]
    fn test_reuse_valid_ids() {
        let mut ids = IdAllocator::new(IdPolicy::Reuse);
        assert_eq!(ids.assign(Some("o1")), "o1");
        assert_ne!(ids.assign(Some("o1")), "o1");
        assert_ne!(ids.assign(Some("bad id")), "bad id");
    }

    #[test]
    fn test_fresh_ignores_export_ids() {
        let mut ids = IdAllocator::new(IdPolicy::Fresh);
        let id = ids.assign(Some("o1"));
        assert_ne!(id, "o1");
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let mut ids = IdAllocator::new(IdPolicy::Reuse);
        let assigned: HashSet<String> = (0..100).map(|_| ids.assign(None)).collect();
        assert_eq!(assigned.len(), 100);
    }
}
