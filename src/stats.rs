use std::sync::atomic::{AtomicUsize, Ordering};

static BLOCKS_ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static BLOCKS_FREED: AtomicUsize = AtomicUsize::new(0);

/// Control block statistics, for diagnosing memory leaks and the like.
///
/// The counters are process-wide and only ever grow. A snapshot taken while
/// other threads are creating or dropping handles is stale by the time it is
/// read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats
{
    /// Control blocks allocated since the process started.
    pub allocated: usize,

    /// Control blocks freed since the process started.
    pub freed: usize,
}

impl Stats
{
    /// Number of control blocks still alive at the time of the snapshot.
    pub fn live(&self) -> usize { self.allocated.saturating_sub(self.freed) }
}

/// Take a snapshot of the process-wide control block counters.
pub fn get_stats() -> Stats
{
    let freed = BLOCKS_FREED.load(Ordering::Relaxed);
    let allocated = BLOCKS_ALLOCATED.load(Ordering::Relaxed);
    Stats { allocated, freed }
}

pub(crate) fn record_allocation() { BLOCKS_ALLOCATED.fetch_add(1, Ordering::Relaxed); }

pub(crate) fn record_free() { BLOCKS_FREED.fetch_add(1, Ordering::Relaxed); }
