pub mod array;
pub mod redundant;
pub mod time_period;

pub use array::ArrayEngine;
pub use redundant::RedundantEngine;
pub use time_period::TimePeriod;

/// A single scored entry in a rank: an opaque id, a sort key, and an opaque value blob.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RankUnit {
    pub id: u64,
    pub key: u64,
    pub value: Vec<u8>,
}

/// Static parameters a rank engine is built with. `redundant_node_num == 0` selects a plain
/// [`ArrayEngine`]; any other value selects a [`RedundantEngine`] wrapping one.
#[derive(Debug, Clone, Default)]
pub struct RankEngineConfig {
    pub max_size: u32,
    pub redundant_node_num: u32,
    pub clear_period: TimePeriod,
    pub snapshot_period: TimePeriod,
    pub no_update_period: TimePeriod,
}

/// The sorted, size-bounded, score-ordered container behind a named rank.
///
/// Units are kept ordered by descending `key`; among equal keys the most recently updated unit
/// ranks first (see [`array::ArrayEngine`] for the tie-break mechanism).
pub trait RankEngine: Send {
    fn config(&self) -> &RankEngineConfig;

    fn size(&self) -> u32;

    fn get(&self, id: u64) -> (bool, u32, RankUnit);

    fn get_by_rank(&self, pos: u32) -> (bool, RankUnit);

    fn get_range(&self, pos: u32, num: u32) -> Vec<RankUnit>;

    /// Inserts or overwrites `unit`. Returns `(true, previous)` if a unit with this id already
    /// existed, `(false, RankUnit::default())` otherwise, including when a full rank silently
    /// evicted its lowest-ranked occupant to make room.
    fn update(&mut self, unit: RankUnit) -> (bool, RankUnit);

    fn delete(&mut self, id: u64) -> (bool, u32, RankUnit);

    fn clear(&mut self);

    /// A full, independent physical copy of this engine, including any hidden tail held by a
    /// [`RedundantEngine`]'s underlying storage.
    fn create_snapshot(&self) -> Box<dyn RankEngine>;

    /// Replaces this engine's visible contents with `units`, which must already be sorted by
    /// descending key (as returned by [`RankEngine::get_range`]). Extra entries beyond this
    /// engine's own `max_size` are dropped.
    fn replace_with(&mut self, units: Vec<RankUnit>);

    /// Deep-copies `other`'s current visible contents into `self`, truncated to `self`'s own
    /// capacity. Used by the periodic primary-to-snapshot reseed.
    fn copy_from(&mut self, other: &dyn RankEngine) {
        let units = other.get_range(0, other.size());
        self.replace_with(units);
    }

    fn last_clear_time(&self) -> u64;
    fn set_last_clear_time(&mut self, t: u64);
    fn last_snapshot_time(&self) -> u64;
    fn set_last_snapshot_time(&mut self, t: u64);
}

/// Builds the engine variant appropriate to `config.redundant_node_num`.
pub fn new_engine(config: RankEngineConfig) -> Box<dyn RankEngine> {
    if config.redundant_node_num > 0 {
        Box::new(RedundantEngine::new(config))
    } else {
        Box::new(ArrayEngine::new(config))
    }
}
