use tally_core::{format_code, CodeFamily, ScopeQuery, SequenceStart};
use tally_store::CodeRepository;
use tracing::debug;

use crate::{AllocationError, AllocationResult};

/// A code not yet verified to be free.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub value: u64,
    pub code: String,
}

impl Candidate {
    pub fn new(prefix: &str, value: u64, width: usize) -> Self {
        Self {
            value,
            code: format_code(prefix, value, width),
        }
    }

    pub fn successor(&self, family: CodeFamily, prefix: &str) -> AllocationResult<Self> {
        let value = self
            .value
            .checked_add(1)
            .ok_or_else(|| AllocationError::SequenceOverflow {
                family,
                prefix: prefix.to_string(),
            })?;
        Ok(Self::new(prefix, value, family.config().padding_width))
    }
}

/// Read the latest record of the scope and derive the next candidate under `prefix`.
pub async fn first_candidate(
    repository: &dyn CodeRepository,
    family: CodeFamily,
    prefix: &str,
    query: &ScopeQuery,
) -> AllocationResult<Candidate> {
    let last = repository.most_recent(query).await?;
    let start = SequenceStart::from_last(prefix, last.as_ref().map(|record| record.code.as_str()));
    if let (SequenceStart::Reset, Some(record)) = (start, last.as_ref()) {
        debug!(
            family = %family,
            prefix,
            last_code = %record.code,
            "last code does not continue the current prefix; restarting at 1"
        );
    }
    let value = start
        .next_value()
        .ok_or_else(|| AllocationError::SequenceOverflow {
            family,
            prefix: prefix.to_string(),
        })?;
    Ok(Candidate::new(prefix, value, family.config().padding_width))
}
