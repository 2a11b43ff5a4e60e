/// Snapshot of a context's validation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextStats {
    pub commands_accepted: u64,
    pub commands_rejected: u64,

    pub draws_dispatched: u64,
    pub clears_dispatched: u64,
    pub reads_dispatched: u64,

    pub completeness_cache_hits: u64,
    pub completeness_recomputations: u64,
}

impl ContextStats {
    pub(crate) fn record_outcome(&mut self, accepted: bool) {
        if accepted {
            self.commands_accepted += 1;
        } else {
            self.commands_rejected += 1;
        }
    }

    pub(crate) fn record_evaluations(&mut self, cache_hits: u64, recomputations: u64) {
        self.completeness_cache_hits += cache_hits;
        self.completeness_recomputations += recomputations;
    }
}
