use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use itertools::Itertools;

use crate::core::{
    domain::{Category, Outcome},
    traits::sink::{ResultSink, SinkError},
};

/// Keeps every recorded outcome in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    next_seq: AtomicUsize,
    outcomes: DashMap<usize, Outcome>,
    lines: DashMap<Category, Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded outcomes in arrival order.
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .sorted_by_key(|(seq, _)| *seq)
            .map(|(_, outcome)| outcome)
            .collect()
    }

    /// Records that would have been appended to `category`.
    #[allow(dead_code)] // read by tests
    pub fn lines(&self, category: Category) -> Vec<String> {
        self.lines
            .get(&category)
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ResultSink for MemorySink {
    async fn init(&self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn record(&self, outcome: &Outcome) -> Result<(), SinkError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.outcomes.insert(seq, outcome.clone());
        if let Some((category, line)) = outcome.record() {
            self.lines.entry(category).or_default().push(line);
        }
        Ok(())
    }
}
