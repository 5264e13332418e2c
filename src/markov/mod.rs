//! Markov Chain Engine
//!
//! Word-level language model learned from chat messages.
//!
//! # Architecture
//!
//! ```text
//! chat message ──► add_string ──► MarkovGraph ◄── del_words / gc / check
//!                                     │
//!                                     └──► generate / find_words ──► markov command
//! ```
//!
//! [`MarkovChain`] is the shared, lock-guarded handle; [`MarkovGraph`] holds
//! the data and algorithms and is the serializable snapshot.

mod graph;

pub use graph::{GenerateOptions, MarkovGraph, MarkovNode, MarkovStats, Successor, EMPTY_MESSAGE};

use parking_lot::RwLock;
use rand::Rng;
use tracing::{info, warn};

use crate::error::MarkovError;

/// Shared Markov model
#[derive(Debug, Default)]
pub struct MarkovChain {
    graph: RwLock<MarkovGraph>,
    options: GenerateOptions,
}

impl MarkovChain {
    pub fn new(options: GenerateOptions) -> Self {
        Self::from_graph(MarkovGraph::new(), options)
    }

    /// Wrap a previously saved graph
    pub fn from_graph(graph: MarkovGraph, options: GenerateOptions) -> Self {
        Self {
            graph: RwLock::new(graph),
            options,
        }
    }

    /// Copy of the current graph
    pub fn snapshot(&self) -> MarkovGraph {
        self.graph.read().clone()
    }

    pub fn add_string(&self, text: &str) -> usize {
        self.graph.write().add_string(text)
    }

    /// Random sentence using the thread-local RNG
    pub fn generate(&self, seed: Option<&str>) -> String {
        self.generate_with(&mut rand::thread_rng(), seed)
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R, seed: Option<&str>) -> String {
        self.graph.read().generate(rng, seed, self.options)
    }

    pub fn find_words(&self, pattern: &str) -> Result<Vec<String>, MarkovError> {
        self.graph.read().find_words(pattern)
    }

    pub fn del_words(&self, pattern: &str) -> Result<Vec<String>, MarkovError> {
        let removed = self.graph.write().del_words(pattern)?;
        if !removed.is_empty() {
            info!("Markov: deleted {} words matching {:?}", removed.len(), pattern);
        }
        Ok(removed)
    }

    pub fn gc(&self) -> Vec<String> {
        let collected = self.graph.write().gc();
        if !collected.is_empty() {
            info!("Markov: garbage collected {} words", collected.len());
        }
        collected
    }

    /// Verify and repair cached totals; false if anything was repaired
    pub fn check(&self) -> bool {
        let consistent = self.graph.write().check();
        if !consistent {
            warn!("Markov: model was inconsistent and has been repaired");
        }
        consistent
    }

    pub fn stats(&self) -> MarkovStats {
        self.graph.read().stats()
    }
}
