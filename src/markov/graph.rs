//! Markov word graph
//!
//! One node per distinct observed word plus a synthetic start node. Each node
//! counts how often every successor (a word or the end marker) followed it.
//! Edge maps keep insertion order so weighted draws are reproducible for a
//! given random sequence.

use indexmap::IndexMap;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::MarkovError;

/// Returned by generation when the model cannot produce any word
pub const EMPTY_MESSAGE: &str = "<empty message>";

/// Destination of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Successor {
    Word(String),
    End,
}

/// A graph vertex with its weighted outgoing edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkovNode {
    #[serde(with = "indexmap::map::serde_seq")]
    edges: IndexMap<Successor, u64>,
    /// Cached sum of all edge counts
    total: u64,
}

impl MarkovNode {
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Observed count of `successor` after this node
    pub fn count(&self, successor: &Successor) -> u64 {
        self.edges.get(successor).copied().unwrap_or(0)
    }

    pub fn edges(&self) -> impl Iterator<Item = (&Successor, u64)> {
        self.edges.iter().map(|(s, c)| (s, *c))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn observe(&mut self, successor: Successor) {
        *self.edges.entry(successor).or_insert(0) += 1;
        self.total += 1;
    }

    /// Drop edges into any of `words`, keeping the cached total in step
    fn forget(&mut self, words: &HashSet<String>) {
        let mut dropped = 0;
        self.edges.retain(|successor, count| match successor {
            Successor::Word(w) if words.contains(w) => {
                dropped += *count;
                false
            }
            _ => true,
        });
        self.total = self.total.saturating_sub(dropped);
    }

    /// Successor whose cumulative count first exceeds `draw`
    fn pick(&self, draw: u64) -> Option<&Successor> {
        let mut running = 0;
        for (successor, count) in &self.edges {
            running += count;
            if running > draw {
                return Some(successor);
            }
        }
        None
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Successor> {
        if self.total == 0 {
            return None;
        }
        self.pick(rng.gen_range(0..self.total))
    }

    /// Recompute the cached total; false if it was wrong
    fn recount(&mut self) -> bool {
        let sum: u64 = self.edges.values().sum();
        if sum == self.total {
            return true;
        }
        self.total = sum;
        false
    }
}

/// Limits applied during generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Draws from the start node spent looking for the seed word
    pub seed_attempts: usize,
    /// Maximum words in one sentence
    pub max_words: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            seed_attempts: 100,
            max_words: 200,
        }
    }
}

/// Size of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkovStats {
    pub words: usize,
    pub edges: usize,
    /// Number of ingested non-empty messages
    pub messages: u64,
}

/// The language model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkovGraph {
    start: MarkovNode,
    words: IndexMap<String, MarkovNode>,
}

impl MarkovGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> &MarkovNode {
        &self.start
    }

    pub fn node(&self, word: &str) -> Option<&MarkovNode> {
        self.words.get(word)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    /// Words in insertion order
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn stats(&self) -> MarkovStats {
        MarkovStats {
            words: self.words.len(),
            edges: self.start.edge_count()
                + self.words.values().map(MarkovNode::edge_count).sum::<usize>(),
            messages: self.start.total,
        }
    }

    /// Learn one message; returns the number of words walked
    pub fn add_string(&mut self, text: &str) -> usize {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return 0;
        }

        let mut previous: Option<&str> = None;
        for token in &tokens {
            self.observe(previous, Successor::Word(token.to_string()));
            previous = Some(token);
        }
        self.observe(previous, Successor::End);
        tokens.len()
    }

    fn observe(&mut self, from: Option<&str>, to: Successor) {
        if let Successor::Word(word) = &to {
            if !self.words.contains_key(word) {
                self.words.insert(word.clone(), MarkovNode::default());
            }
        }
        let node = match from {
            None => &mut self.start,
            Some(word) => self.words.entry(word.to_string()).or_default(),
        };
        node.observe(to);
    }

    /// Random sentence, optionally starting with `seed`
    ///
    /// The seed only constrains the first transition: up to
    /// `seed_attempts` draws from the start node are made, and if none lands
    /// on the seed generation continues unconstrained.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        seed: Option<&str>,
        options: GenerateOptions,
    ) -> String {
        let mut sentence: Vec<&str> = Vec::new();
        let mut current = &self.start;

        if let Some(seed) = seed {
            let hit = (0..options.seed_attempts).find_map(|_| match current.draw(rng) {
                Some(Successor::Word(w)) if w == seed => Some(w.as_str()),
                _ => None,
            });
            match hit.and_then(|w| self.words.get(w).map(|node| (w, node))) {
                Some((word, node)) => {
                    sentence.push(word);
                    current = node;
                }
                None => debug!(
                    "Seed {:?} not drawn after {} attempts",
                    seed, options.seed_attempts
                ),
            }
        }

        while sentence.len() < options.max_words {
            match current.draw(rng) {
                Some(Successor::Word(word)) => match self.words.get(word) {
                    Some(node) => {
                        sentence.push(word);
                        current = node;
                    }
                    None => break,
                },
                Some(Successor::End) | None => break,
            }
        }

        let text = sentence.join(" ").trim().to_string();
        if text.is_empty() {
            EMPTY_MESSAGE.to_string()
        } else {
            text
        }
    }

    /// Words matching `pattern`, in insertion order
    pub fn find_words(&self, pattern: &str) -> Result<Vec<String>, MarkovError> {
        let re = compile(pattern)?;
        Ok(self.words.keys().filter(|w| re.is_match(w)).cloned().collect())
    }

    /// Remove every word matching `pattern` together with all edges into it
    pub fn del_words(&mut self, pattern: &str) -> Result<Vec<String>, MarkovError> {
        let removed = self.find_words(pattern)?;
        if removed.is_empty() {
            return Ok(removed);
        }

        let doomed: HashSet<String> = removed.iter().cloned().collect();
        self.words.retain(|word, _| !doomed.contains(word));
        for node in std::iter::once(&mut self.start).chain(self.words.values_mut()) {
            node.forget(&doomed);
        }

        debug!("Deleted {} words matching {:?}", removed.len(), pattern);
        Ok(removed)
    }

    /// Remove word nodes no longer reachable from the start node
    pub fn gc(&mut self) -> Vec<String> {
        let unreachable: HashSet<String> = {
            let mut reachable: HashSet<&str> = HashSet::new();
            let mut pending: Vec<&str> = successor_words(&self.start).collect();

            while let Some(word) = pending.pop() {
                if reachable.insert(word) {
                    if let Some(node) = self.words.get(word) {
                        pending.extend(successor_words(node));
                    }
                }
            }

            self.words
                .keys()
                .filter(|w| !reachable.contains(w.as_str()))
                .cloned()
                .collect()
        };

        let collected: Vec<String> = self
            .words
            .keys()
            .filter(|w| unreachable.contains(*w))
            .cloned()
            .collect();
        self.words.retain(|word, _| !unreachable.contains(word));

        if !collected.is_empty() {
            debug!("Collected {} unreachable words", collected.len());
        }
        collected
    }

    /// Verify every cached total, repairing mismatches
    ///
    /// Returns false when at least one node had to be repaired, even though
    /// the graph is consistent afterwards.
    pub fn check(&mut self) -> bool {
        let mut consistent = true;
        if !self.start.recount() {
            warn!("Repaired edge total of the start node");
            consistent = false;
        }
        for (word, node) in self.words.iter_mut() {
            if !node.recount() {
                warn!("Repaired edge total of {:?}", word);
                consistent = false;
            }
        }
        consistent
    }
}

fn successor_words(node: &MarkovNode) -> impl Iterator<Item = &str> {
    node.edges.keys().filter_map(|successor| match successor {
        Successor::Word(w) => Some(w.as_str()),
        Successor::End => None,
    })
}

fn compile(pattern: &str) -> Result<Regex, MarkovError> {
    Regex::new(pattern).map_err(|source| MarkovError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
