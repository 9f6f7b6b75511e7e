// src/checker/cache.rs
// =============================================================================
// The verification cache: absolute URL -> outcome of its one and only check.
//
// lookup() returns Option<&CheckOutcome>:
//   None            = never checked
//   Some(Ok(()))    = checked, answered 200
//   Some(Err(e))    = checked, broken because of e
//
// No eviction. It lives for one run and memory grows with the number of
// distinct URLs discovered.
// =============================================================================

use crate::error::CheckOutcome;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct VerificationCache {
    outcomes: HashMap<String, CheckOutcome>,
}

impl VerificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, url: &str) -> Option<&CheckOutcome> {
        self.outcomes.get(url)
    }

    // The first outcome recorded for a URL is final. A second store for the
    // same key is a driver bug, so it is ignored rather than overwriting.
    pub fn store(&mut self, url: String, outcome: CheckOutcome) {
        self.outcomes.entry(url).or_insert(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckError;
    use reqwest::StatusCode;

    #[test]
    fn test_miss_is_distinct_from_success() {
        let mut cache = VerificationCache::new();
        assert!(cache.lookup("http://x/a").is_none());

        cache.store("http://x/a".to_string(), Ok(()));
        assert!(matches!(cache.lookup("http://x/a"), Some(Ok(()))));
    }

    #[test]
    fn test_failure_is_remembered() {
        let mut cache = VerificationCache::new();
        cache.store(
            "http://x/img.png".to_string(),
            Err(CheckError::Status(StatusCode::NOT_FOUND)),
        );

        let cached = cache.lookup("http://x/img.png").unwrap();
        assert_eq!(
            cached.as_ref().unwrap_err().to_string(),
            "responded with 404 Not Found"
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_first_outcome_wins() {
        let mut cache = VerificationCache::new();
        cache.store("http://x/a".to_string(), Err(CheckError::Cancelled));
        cache.store("http://x/a".to_string(), Ok(()));

        assert!(matches!(
            cache.lookup("http://x/a"),
            Some(Err(CheckError::Cancelled))
        ));
        assert_eq!(cache.len(), 1);
    }
}
