//! Markov Model Integration Tests
//!
//! Learning, generation, deletion, garbage collection and snapshots.

use cmdbot::markov::{GenerateOptions, MarkovChain, MarkovGraph, Successor, EMPTY_MESSAGE};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use tokio_test::assert_ok;

fn create_test_chain(messages: &[&str]) -> MarkovChain {
    let chain = MarkovChain::new(GenerateOptions::default());
    for message in messages {
        chain.add_string(message);
    }
    chain
}

#[test]
fn test_generation_follows_learned_edges() {
    let chain = create_test_chain(&["a b a c"]);
    assert!(chain.check());

    let allowed: HashSet<(&str, &str)> = [("a", "b"), ("a", "c"), ("b", "a")].into_iter().collect();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let sentence = chain.generate_with(&mut rng, None);
        let words: Vec<&str> = sentence.split(' ').collect();
        assert_eq!(words[0], "a", "generation must start where learning started: {}", sentence);
        for pair in words.windows(2) {
            assert!(allowed.contains(&(pair[0], pair[1])), "unexpected edge in {:?}", sentence);
        }
        let last = *words.last().unwrap();
        assert!(last == "c" || words.len() == GenerateOptions::default().max_words);
    }
}

#[test]
fn test_learned_counts() {
    let graph = create_test_chain(&["a b a c"]).snapshot();

    let a = graph.node("a").unwrap();
    assert_eq!(a.count(&Successor::Word("b".into())), 1);
    assert_eq!(a.count(&Successor::Word("c".into())), 1);
    assert_eq!(a.total(), 2);
    assert_eq!(graph.node("c").unwrap().count(&Successor::End), 1);
    assert_eq!(graph.start().count(&Successor::Word("a".into())), 1);
}

#[test]
fn test_delete_then_collect_unreachable() {
    let chain = create_test_chain(&["x y z"]);

    let deleted = assert_ok!(chain.del_words("^y$"));
    assert_eq!(deleted, vec!["y"]);

    let graph = chain.snapshot();
    assert!(!graph.contains("y"));
    for word in graph.words() {
        let node = graph.node(word).unwrap();
        assert_eq!(node.count(&Successor::Word("y".into())), 0);
    }
    assert_eq!(graph.start().count(&Successor::Word("y".into())), 0);

    assert_eq!(chain.gc(), vec!["z"]);
    let graph = chain.snapshot();
    assert!(!graph.contains("z"));
    assert!(graph.contains("x"));
    assert!(chain.gc().is_empty());
}

#[test]
fn test_find_by_regex() {
    let chain = create_test_chain(&["a1 b1", "a2 a22"]);
    let found: HashSet<String> = assert_ok!(chain.find_words("^a.$")).into_iter().collect();
    assert_eq!(found, ["a1".to_string(), "a2".to_string()].into_iter().collect());

    assert!(chain.find_words("[").is_err());
}

#[test]
fn test_empty_model_generates_placeholder() {
    let chain = create_test_chain(&[]);
    assert_eq!(chain.generate(None), EMPTY_MESSAGE);
    assert_eq!(chain.generate(Some("anything")), EMPTY_MESSAGE);

    chain.add_string("   ");
    assert_eq!(chain.stats().messages, 0);
}

#[test]
fn test_seeded_generation_prefers_seed() {
    let chain = create_test_chain(&["red apple", "green pear", "blue sky"]);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        assert_eq!(chain.generate_with(&mut rng, Some("green")), "green pear");
    }
}

#[test]
fn test_max_words_cap() {
    let chain = MarkovChain::new(GenerateOptions {
        seed_attempts: 10,
        max_words: 5,
    });
    chain.add_string("la la la la la la la la la la la la");
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..20 {
        assert!(chain.generate_with(&mut rng, None).split(' ').count() <= 5);
    }
}

#[test]
fn test_snapshot_restores_model() {
    let chain = create_test_chain(&["one two three", "two three four"]);
    let json = serde_json::to_string(&chain.snapshot()).unwrap();

    let graph: MarkovGraph = serde_json::from_str(&json).unwrap();
    let restored = MarkovChain::from_graph(graph, GenerateOptions::default());
    assert_eq!(restored.stats(), chain.stats());
    assert!(restored.check());
}
