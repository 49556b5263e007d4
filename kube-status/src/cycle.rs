//! Cycle detection over readiness identifier chains
//!
//! A readiness request carries the ordered list of instance IDs it has
//! already passed through (oldest first). Each service appends its own ID
//! before forwarding the request to its dependencies, so a dependency cycle
//! shows up as the same ID appearing twice in the chain. The graph is only
//! ever discovered one hop at a time, which is why the check runs over the
//! chain itself rather than over any global topology.

use std::collections::HashSet;

/// Returns the first identifier that repeats an earlier entry, if any
///
/// Comparison is exact string equality; IDs are expected in canonical
/// UUID form already.
pub fn find_repeat<S: AsRef<str>>(chain: &[S]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(chain.len());
    chain
        .iter()
        .map(|id| id.as_ref())
        .find(|id| !seen.insert(*id))
}

/// Whether any identifier appears more than once in `chain`
pub fn detect_cycle<S: AsRef<str>>(chain: &[S]) -> bool {
    find_repeat(chain).is_some()
}
