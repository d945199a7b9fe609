use tally_core::CodeFamily;
use tally_store::CodeRepository;
use tracing::{debug, warn};

use crate::sequence::Candidate;
use crate::{AllocationError, AllocationResult};

/// Probes the store until a candidate no existing record carries.
#[derive(Clone, Copy, Debug)]
pub struct DuplicateGuard {
    max_attempts: u32,
}

impl DuplicateGuard {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn settle(
        &self,
        repository: &dyn CodeRepository,
        family: CodeFamily,
        prefix: &str,
        candidate: Candidate,
    ) -> AllocationResult<Candidate> {
        let mut current = candidate;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if !repository.exists(family, &current.code).await? {
                if attempts > 2 {
                    warn!(
                        family = %family,
                        code = %current.code,
                        skipped = attempts - 1,
                        "duplicate guard skipped several taken codes"
                    );
                }
                return Ok(current);
            }
            debug!(
                family = %family,
                code = %current.code,
                attempt = attempts,
                "candidate already taken"
            );
            if attempts >= self.max_attempts {
                return Err(AllocationError::RetriesExhausted {
                    family,
                    attempts,
                    last_candidate: current.code,
                });
            }
            current = current.successor(family, prefix)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{DocumentContext, NewRecord};
    use tally_store::InMemoryStore;

    fn store_with(codes: &[&str]) -> InMemoryStore {
        let store = InMemoryStore::new();
        let at = NaiveDate::from_ymd_opt(2025, 4, 2)
            .and_then(|day| day.and_hms_opt(10, 0, 0))
            .unwrap();
        for code in codes {
            store.push(NewRecord::new(
                CodeFamily::RawMaterial,
                *code,
                &DocumentContext::new(),
                at,
            ));
        }
        store
    }

    #[tokio::test]
    async fn free_candidate_passes_through() {
        let store = store_with(&["RM0001"]);
        let settled = DuplicateGuard::new(10)
            .settle(&store, CodeFamily::RawMaterial, "RM", Candidate::new("RM", 2, 4))
            .await
            .unwrap();
        assert_eq!(settled.code, "RM0002");
    }

    #[tokio::test]
    async fn skips_taken_codes() {
        let store = store_with(&["RM0002", "RM0003"]);
        let settled = DuplicateGuard::new(10)
            .settle(&store, CodeFamily::RawMaterial, "RM", Candidate::new("RM", 2, 4))
            .await
            .unwrap();
        assert_eq!(settled.code, "RM0004");
        assert_eq!(settled.value, 4);
    }

    #[tokio::test]
    async fn gives_up_after_bound() {
        let store = store_with(&["RM0001", "RM0002", "RM0003"]);
        let err = DuplicateGuard::new(3)
            .settle(&store, CodeFamily::RawMaterial, "RM", Candidate::new("RM", 1, 4))
            .await
            .unwrap_err();
        match err {
            AllocationError::RetriesExhausted {
                attempts,
                last_candidate,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_candidate, "RM0003");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_bound_is_clamped() {
        assert_eq!(DuplicateGuard::new(0).max_attempts(), 1);
    }
}
