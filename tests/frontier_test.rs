//! Frontier ordering and bookkeeping through the public API

use kodegen_tools_goalcrawl::crawl_engine::{Frontier, FrontierEntry};
use kodegen_tools_goalcrawl::utils::normalize_url;

fn entry(name: &str, value: f64) -> FrontierEntry {
    FrontierEntry::new(format!("https://x.test/{name}"), value, 1)
}

fn drain(frontier: &mut Frontier) -> Vec<String> {
    std::iter::from_fn(|| frontier.dequeue())
        .map(|e| e.url.trim_start_matches("https://x.test/").to_string())
        .collect()
}

#[test]
fn dequeues_highest_expected_value_first() {
    let mut frontier = Frontier::new();
    frontier.push(entry("a", 0.2));
    frontier.push(entry("b", 0.9));
    frontier.push(entry("c", 0.5));

    assert_eq!(frontier.len(), 3);
    assert_eq!(frontier.peek().map(|e| e.url.as_str()), Some("https://x.test/b"));
    assert_eq!(drain(&mut frontier), vec!["b", "c", "a"]);
    assert!(frontier.is_empty());
    assert!(frontier.dequeue().is_none());
}

#[test]
fn ties_interleaved_with_other_priorities_keep_enqueue_order() {
    let mut frontier = Frontier::new();
    frontier.push(entry("t1", 0.5));
    frontier.push(entry("hi", 0.8));
    frontier.push(entry("t2", 0.5));
    frontier.push(entry("lo", 0.1));
    frontier.push(entry("t3", 0.5));

    assert_eq!(drain(&mut frontier), vec!["hi", "t1", "t2", "t3", "lo"]);
}

#[test]
fn out_of_range_values_are_clamped() {
    let mut frontier = Frontier::new();
    frontier.push(entry("huge", 7.0));
    frontier.push(entry("one", 1.0));
    frontier.push(entry("nan", f64::NAN));
    frontier.push(entry("zero", 0.0));

    // 7.0 clamps to 1.0 and NaN to 0.0, so ties fall back to enqueue order
    assert_eq!(drain(&mut frontier), vec!["huge", "one", "nan", "zero"]);
}

#[test]
fn queued_keys_follow_entries_in_and_out() {
    let mut frontier = Frontier::new();
    frontier.push(FrontierEntry::new("https://x.test/docs/", 0.5, 1));
    frontier.push(FrontierEntry::new("https://x.test/docs#intro", 0.4, 1));

    let key = normalize_url("https://x.test/docs");
    assert!(frontier.contains_key(&key));
    frontier.dequeue();
    assert!(frontier.contains_key(&key));
    frontier.dequeue();
    assert!(!frontier.contains_key(&key));
}
