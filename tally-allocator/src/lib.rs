//! Sequential code allocation for business documents and master data.
//!
//! A code is `prefix ‖ zero-padded number`, where the prefix is built from the location's
//! short code, the financial-year number and a configured type prefix. Allocation reads the
//! most recent record of the scope, increments its number, and probes the store until the
//! candidate is free. Nothing is written; see [`CodeAllocator::allocate_with`] for the
//! persist-under-lock variant.

mod adjustment;
mod allocator;
mod error;
mod guard;
mod locks;
mod resolver;
mod sequence;

pub use adjustment::{adjustment_code, ADJUSTMENT_STAMP_FORMAT};
pub use allocator::{AllocatorDeps, AllocatorOptions, CodeAllocator, MAX_BATCH_SIZE};
pub use error::{AllocationError, AllocationResult, CodeKind};
pub use guard::DuplicateGuard;
pub use locks::{ScopeLease, ScopeLocks};
pub use resolver::ScopeResolver;
pub use sequence::{first_candidate, Candidate};
