use super::{ArrayEngine, RankEngine, RankEngineConfig, RankUnit};

/// Decorates an [`ArrayEngine`] with a hidden tail of `redundant_node_num` extra slots.
///
/// The underlying engine is sized to `max_size + redundant_node_num`; everything at or beyond
/// the visible `max_size` boundary is invisible to callers but still absorbs evictions, so a
/// unit that falls off the visible rank survives in the tail and can reappear once enough
/// higher-ranked units are removed ahead of it.
#[derive(Debug, Clone)]
pub struct RedundantEngine {
    config: RankEngineConfig,
    underlying: ArrayEngine,
    last_clear_time: u64,
    last_snapshot_time: u64,
}

impl RedundantEngine {
    pub fn new(config: RankEngineConfig) -> Self {
        let mut underlying_config = config.clone();
        underlying_config.max_size = config.max_size + config.redundant_node_num;
        underlying_config.redundant_node_num = 0;
        Self {
            config,
            underlying: ArrayEngine::new(underlying_config),
            last_clear_time: 0,
            last_snapshot_time: 0,
        }
    }
}

impl RankEngine for RedundantEngine {
    fn config(&self) -> &RankEngineConfig {
        &self.config
    }

    fn size(&self) -> u32 {
        self.underlying.size().min(self.config.max_size)
    }

    fn get(&self, id: u64) -> (bool, u32, RankUnit) {
        let (exist, pos, u) = self.underlying.get(id);
        if pos >= self.config.max_size {
            return (false, 0, RankUnit::default());
        }
        (exist, pos, u)
    }

    fn get_by_rank(&self, pos: u32) -> (bool, RankUnit) {
        if pos >= self.config.max_size {
            return (false, RankUnit::default());
        }
        self.underlying.get_by_rank(pos)
    }

    fn get_range(&self, pos: u32, num: u32) -> Vec<RankUnit> {
        let size = self.size();
        if pos >= size {
            return Vec::new();
        }
        let n = num.min(size - pos);
        self.underlying.get_range(pos, n)
    }

    fn update(&mut self, unit: RankUnit) -> (bool, RankUnit) {
        let (mut exist, pos, mut last) = self.underlying.get(unit.id);
        if pos >= self.config.max_size {
            exist = false;
            last = RankUnit::default();
        }
        self.underlying.update(unit);
        (exist, last)
    }

    fn delete(&mut self, id: u64) -> (bool, u32, RankUnit) {
        let (exist, pos, u) = self.underlying.delete(id);
        if pos >= self.config.max_size {
            return (false, 0, RankUnit::default());
        }
        (exist, pos, u)
    }

    fn clear(&mut self) {
        self.underlying.clear();
    }

    fn create_snapshot(&self) -> Box<dyn RankEngine> {
        Box::new(RedundantEngine {
            config: self.config.clone(),
            underlying: self.underlying.clone(),
            last_clear_time: self.last_clear_time,
            last_snapshot_time: self.last_snapshot_time,
        })
    }

    fn replace_with(&mut self, units: Vec<RankUnit>) {
        let cap = self.config.max_size as usize;
        let units: Vec<RankUnit> = if cap != 0 {
            units.into_iter().take(cap).collect()
        } else {
            units
        };
        self.underlying.replace_with(units);
    }

    fn last_clear_time(&self) -> u64 {
        self.last_clear_time
    }

    fn set_last_clear_time(&mut self, t: u64) {
        self.last_clear_time = t;
    }

    fn last_snapshot_time(&self) -> u64 {
        self.last_snapshot_time
    }

    fn set_last_snapshot_time(&mut self, t: u64) {
        self.last_snapshot_time = t;
    }
}
