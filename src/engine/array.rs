use super::{RankEngine, RankEngineConfig, RankUnit};

/// A unit plus the monotonic sequence number it was last written with.
///
/// Sorting by `(key desc, seq desc)` instead of `key` alone gives equal-key ties a well-defined,
/// documented direction: the most recently written unit ranks first.
#[derive(Debug, Clone)]
struct Entry {
    unit: RankUnit,
    seq: u64,
}

/// A sorted, size-bounded, score-ordered array of [`RankUnit`]s.
///
/// Every mutation re-sorts the full backing vector, mirroring the reference implementation's
/// stable-sort-after-every-write approach. Ranks are small enough in practice (tens to low
/// thousands of units) that this is simpler and fast enough in wall-clock terms, not just
/// algorithmically defensible.
#[derive(Debug, Clone)]
pub struct ArrayEngine {
    config: RankEngineConfig,
    data: Vec<Entry>,
    next_seq: u64,
    last_clear_time: u64,
    last_snapshot_time: u64,
}

impl ArrayEngine {
    pub fn new(config: RankEngineConfig) -> Self {
        Self {
            config,
            data: Vec::new(),
            next_seq: 0,
            last_clear_time: 0,
            last_snapshot_time: 0,
        }
    }

    fn resort(&mut self) {
        self.data
            .sort_by(|a, b| b.unit.key.cmp(&a.unit.key).then(b.seq.cmp(&a.seq)));
    }

    fn position_of(&self, id: u64) -> Option<usize> {
        self.data.iter().position(|e| e.unit.id == id)
    }
}

impl RankEngine for ArrayEngine {
    fn config(&self) -> &RankEngineConfig {
        &self.config
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn get(&self, id: u64) -> (bool, u32, RankUnit) {
        match self.position_of(id) {
            Some(pos) => (true, pos as u32, self.data[pos].unit.clone()),
            None => (false, 0, RankUnit::default()),
        }
    }

    fn get_by_rank(&self, pos: u32) -> (bool, RankUnit) {
        if pos >= self.size() {
            return (false, RankUnit::default());
        }
        (true, self.data[pos as usize].unit.clone())
    }

    fn get_range(&self, pos: u32, num: u32) -> Vec<RankUnit> {
        if pos >= self.size() {
            return Vec::new();
        }
        let n = num.min(self.size() - pos) as usize;
        let pos = pos as usize;
        self.data[pos..pos + n]
            .iter()
            .map(|e| e.unit.clone())
            .collect()
    }

    fn update(&mut self, unit: RankUnit) -> (bool, RankUnit) {
        self.next_seq += 1;
        let seq = self.next_seq;
        if let Some(pos) = self.position_of(unit.id) {
            let old = self.data[pos].unit.clone();
            self.data[pos] = Entry { unit, seq };
            self.resort();
            return (true, old);
        }
        if self.config.max_size != 0 && self.size() >= self.config.max_size {
            let last = self.data.len() - 1;
            self.data[last] = Entry { unit, seq };
        } else {
            self.data.push(Entry { unit, seq });
        }
        self.resort();
        (false, RankUnit::default())
    }

    fn delete(&mut self, id: u64) -> (bool, u32, RankUnit) {
        match self.position_of(id) {
            Some(pos) => {
                let entry = self.data.remove(pos);
                (true, pos as u32, entry.unit)
            }
            None => (false, 0, RankUnit::default()),
        }
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    fn create_snapshot(&self) -> Box<dyn RankEngine> {
        Box::new(self.clone())
    }

    fn replace_with(&mut self, units: Vec<RankUnit>) {
        let cap = self.config.max_size as usize;
        let units: Vec<RankUnit> = if cap != 0 {
            units.into_iter().take(cap).collect()
        } else {
            units
        };
        let n = units.len() as u64;
        self.data = units
            .into_iter()
            .enumerate()
            .map(|(i, unit)| Entry {
                unit,
                seq: self.next_seq + (n - i as u64),
            })
            .collect();
        self.next_seq += n + 1;
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
