use crate::types::{canonical_program, Program, TaskPattern};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub task_type: TaskPattern,
    pub program: Program,
    pub success_rate: f64,
    pub use_count: u64,
    pub last_used: u64,
}

/// Serializable bank state, embedded in checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankSnapshot {
    pub entries: Vec<StrategyEntry>,
    pub clock: u64,
}

/// Cross-task store of programs that worked, keyed by task pattern.
///
/// Recency is a logical clock bumped on every store and retrieve, and
/// eviction is least-recently-used across the whole bank rather than per
/// pattern, so a hot pattern may crowd out entries for a cold one.
#[derive(Debug)]
pub struct StrategyBank {
    inner: Mutex<BankSnapshot>,
    capacity: usize,
}

impl StrategyBank {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BankSnapshot::default()),
            capacity,
        }
    }

    pub fn from_snapshot(snapshot: BankSnapshot, capacity: usize) -> Self {
        let bank = Self {
            inner: Mutex::new(snapshot),
            capacity,
        };
        {
            let mut inner = bank.inner.lock().unwrap();
            while inner.entries.len() > capacity {
                evict_least_recent(&mut inner.entries);
            }
        }
        bank
    }

    /// Record a program that reached `success_rate` on a task of the given
    /// pattern. Re-storing an existing (pattern, program) pair refreshes
    /// its rate and recency instead of duplicating it.
    pub fn store(&self, task_type: TaskPattern, program: Program, success_rate: f64) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let now = inner.clock;
        let key = canonical_program(&program);
        if let Some(entry) = inner
            .entries
            .iter_mut()
            .find(|e| e.task_type == task_type && canonical_program(&e.program) == key)
        {
            entry.success_rate = success_rate;
            entry.last_used = now;
            return;
        }
        if inner.entries.len() >= self.capacity {
            evict_least_recent(&mut inner.entries);
        }
        inner.entries.push(StrategyEntry {
            task_type,
            program,
            success_rate,
            use_count: 0,
            last_used: now,
        });
    }

    /// Up to `k` stored programs for the pattern, best success rate first
    /// (most recently used breaking ties). Retrieval counts as a use.
    pub fn retrieve(&self, task_type: TaskPattern, k: usize) -> Vec<Program> {
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let now = inner.clock;
        let mut ranked: Vec<usize> = (0..inner.entries.len())
            .filter(|&i| inner.entries[i].task_type == task_type)
            .collect();
        ranked.sort_by(|&a, &b| {
            let (ea, eb) = (&inner.entries[a], &inner.entries[b]);
            eb.success_rate
                .total_cmp(&ea.success_rate)
                .then(eb.last_used.cmp(&ea.last_used))
        });
        ranked.truncate(k);
        let mut programs = Vec::with_capacity(ranked.len());
        for i in ranked {
            let entry = &mut inner.entries[i];
            entry.use_count += 1;
            entry.last_used = now;
            programs.push(entry.program.clone());
        }
        programs
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> BankSnapshot {
        self.inner.lock().unwrap().clone()
    }
}

fn evict_least_recent(entries: &mut Vec<StrategyEntry>) {
    if let Some(victim) = entries
        .iter()
        .enumerate()
        .min_by_key(|(_, e)| e.last_used)
        .map(|(i, _)| i)
    {
        let evicted = entries.remove(victim);
        log::debug!(
            "Strategy bank evicted {} entry with rate {:.2}",
            evicted.task_type,
            evicted.success_rate
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProgramStep;

    fn program(name: &str) -> Program {
        vec![ProgramStep::new(name, vec![])]
    }

    #[test]
    fn test_retrieve_orders_by_success_rate() {
        let bank = StrategyBank::new(8);
        bank.store(TaskPattern::Rotation, program("rotate90"), 0.5);
        bank.store(TaskPattern::Rotation, program("rotate180"), 0.9);
        bank.store(TaskPattern::Rotation, program("rotate270"), 0.7);
        let got = bank.retrieve(TaskPattern::Rotation, 2);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0][0].primitive, "rotate180");
        assert_eq!(got[1][0].primitive, "rotate270");
    }

    #[test]
    fn test_retrieve_filters_by_pattern() {
        let bank = StrategyBank::new(8);
        bank.store(TaskPattern::Rotation, program("rotate90"), 0.9);
        bank.store(TaskPattern::ColorRemap, program("recolor"), 0.9);
        let got = bank.retrieve(TaskPattern::ColorRemap, 4);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0][0].primitive, "recolor");
        assert!(bank.retrieve(TaskPattern::Gravity, 4).is_empty());
    }

    #[test]
    fn test_store_refreshes_existing_entry() {
        let bank = StrategyBank::new(8);
        bank.store(TaskPattern::Scaling, program("scale_up"), 0.4);
        bank.store(TaskPattern::Scaling, program("scale_up"), 0.8);
        assert_eq!(bank.len(), 1);
        let snapshot = bank.snapshot();
        assert!((snapshot.entries[0].success_rate - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_eviction_is_least_recently_used_across_patterns() {
        let bank = StrategyBank::new(2);
        bank.store(TaskPattern::Rotation, program("rotate90"), 0.9);
        bank.store(TaskPattern::Tiling, program("tile"), 0.9);
        // Touch the rotation entry so tiling becomes the eviction victim.
        bank.retrieve(TaskPattern::Rotation, 1);
        bank.store(TaskPattern::Gravity, program("gravity"), 0.9);
        assert_eq!(bank.len(), 2);
        assert!(bank.retrieve(TaskPattern::Tiling, 1).is_empty());
        assert_eq!(bank.retrieve(TaskPattern::Rotation, 1).len(), 1);
    }

    #[test]
    fn test_retrieve_bumps_use_count() {
        let bank = StrategyBank::new(4);
        bank.store(TaskPattern::Symmetry, program("flip_h"), 0.6);
        bank.retrieve(TaskPattern::Symmetry, 1);
        bank.retrieve(TaskPattern::Symmetry, 1);
        assert_eq!(bank.snapshot().entries[0].use_count, 2);
    }

    #[test]
    fn test_snapshot_survives_restore_and_trims_to_capacity() {
        let bank = StrategyBank::new(4);
        bank.store(TaskPattern::Rotation, program("rotate90"), 0.9);
        bank.store(TaskPattern::Tiling, program("tile"), 0.8);
        bank.store(TaskPattern::Gravity, program("gravity"), 0.7);
        let restored = StrategyBank::from_snapshot(bank.snapshot(), 2);
        assert_eq!(restored.len(), 2);
        // The oldest entry is dropped when the restored capacity is smaller.
        assert!(restored.retrieve(TaskPattern::Rotation, 1).is_empty());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let bank = StrategyBank::new(0);
        bank.store(TaskPattern::Rotation, program("rotate90"), 0.9);
        assert!(bank.is_empty());
    }
}
