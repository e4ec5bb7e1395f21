//! Crawl state for one traversal
//!
//! This module owns the frontier, the visited set and the accumulated results
//! of a single crawl. The scheduler is the only mutator.

use crate::state::PageContent;
use crate::url::is_same_domain;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use url::Url;

/// Lifecycle of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// State has been created and seeded, nothing fetched yet
    Init,

    /// The frontier is being drained
    Running,

    /// The frontier is empty, or the crawl was stopped early
    Done,
}

impl CrawlPhase {
    /// Returns true if moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (*self, next),
            (Self::Init, Self::Running) | (Self::Init, Self::Done) | (Self::Running, Self::Done)
        )
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// A frontier entry whose fetch failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPage {
    pub url: String,
    pub error: String,
}

/// Everything a finished crawl hands to its host
#[derive(Debug, Clone)]
pub struct CrawlResults {
    /// The seed the crawl started from
    pub seed_url: String,

    /// Host every crawled URL shares
    pub base_domain: String,

    /// Extracted content for every successfully fetched URL
    pub pages: BTreeMap<String, PageContent>,

    /// URLs whose fetch failed, in processing order
    pub failures: Vec<FailedPage>,

    /// Every fetch attempt, in processing order
    pub fetch_order: Vec<String>,

    /// True if the crawl stopped before the frontier was empty
    pub cancelled: bool,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResults {
    /// Number of successfully extracted pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total links across all pages
    pub fn link_count(&self) -> usize {
        self.pages.values().map(|p| p.links.len()).sum()
    }

    /// Total downloaded images across all pages
    pub fn image_count(&self) -> usize {
        self.pages.values().map(|p| p.images.len()).sum()
    }

    /// Wall-clock duration of the crawl
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Mutable state of a crawl in progress
#[derive(Debug)]
pub struct CrawlState {
    seed_url: Url,
    base_domain: String,
    phase: CrawlPhase,
    visited: HashSet<String>,
    frontier: VecDeque<Url>,
    results: BTreeMap<String, PageContent>,
    failures: Vec<FailedPage>,
    fetch_order: Vec<String>,
    started_at: DateTime<Utc>,
}

impl CrawlState {
    /// Creates a fresh state with only the seed in the frontier
    pub fn new(seed_url: Url, base_domain: String) -> Self {
        let mut frontier = VecDeque::new();
        frontier.push_back(seed_url.clone());

        Self {
            seed_url,
            base_domain,
            phase: CrawlPhase::Init,
            visited: HashSet::new(),
            frontier,
            results: BTreeMap::new(),
            failures: Vec::new(),
            fetch_order: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Moves to `next`, returning false if the transition is not allowed
    pub fn transition(&mut self, next: CrawlPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            return false;
        }
        self.phase = next;
        true
    }

    /// Pops the next unvisited URL and marks it visited
    ///
    /// Frontier entries that were visited after being enqueued are dropped.
    pub fn next_unvisited(&mut self) -> Option<Url> {
        while let Some(url) = self.frontier.pop_front() {
            if self.visited.insert(url.as_str().to_string()) {
                return Some(url);
            }
            tracing::trace!("Skipping already visited {}", url);
        }
        None
    }

    /// Appends a URL to the frontier unless it was visited or is off-domain
    ///
    /// Returns true if the URL was enqueued.
    pub fn enqueue(&mut self, url: Url) -> bool {
        if self.is_visited(url.as_str()) || !is_same_domain(&url, &self.base_domain) {
            return false;
        }
        self.frontier.push_back(url);
        true
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Returns true if the frontier still holds a URL that was never visited
    ///
    /// Visited duplicates at the head of the frontier are dropped on the way.
    pub fn has_unvisited(&mut self) -> bool {
        while let Some(url) = self.frontier.front() {
            if !self.is_visited(url.as_str()) {
                return true;
            }
            tracing::trace!("Dropping already visited {}", url);
            self.frontier.pop_front();
        }
        false
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Number of frontier items processed so far
    pub fn processed(&self) -> usize {
        self.fetch_order.len()
    }

    /// Notes that a fetch is being attempted for `url`
    pub fn record_attempt(&mut self, url: &Url) {
        self.fetch_order.push(url.as_str().to_string());
    }

    /// Stores the content of a successfully fetched page
    pub fn record_success(&mut self, url: &Url, content: PageContent) {
        self.results.insert(url.as_str().to_string(), content);
    }

    /// Records a failed fetch; the URL stays visited
    pub fn record_failure(&mut self, url: &Url, error: String) {
        self.failures.push(FailedPage {
            url: url.as_str().to_string(),
            error,
        });
    }

    /// Ends the crawl and hands out the accumulated results
    pub fn finish(mut self, cancelled: bool) -> CrawlResults {
        self.transition(CrawlPhase::Done);

        CrawlResults {
            seed_url: self.seed_url.into(),
            base_domain: self.base_domain,
            pages: self.results,
            failures: self.failures,
            fetch_order: self.fetch_order,
            cancelled,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn new_state() -> CrawlState {
        CrawlState::new(url("https://example.com/"), "example.com".to_string())
    }

    #[test]
    fn test_new_state_is_seeded() {
        let state = new_state();
        assert_eq!(state.phase(), CrawlPhase::Init);
        assert_eq!(state.frontier_len(), 1);
        assert_eq!(state.processed(), 0);
    }

    #[test]
    fn test_phase_transitions() {
        assert!(CrawlPhase::Init.can_transition_to(CrawlPhase::Running));
        assert!(CrawlPhase::Init.can_transition_to(CrawlPhase::Done));
        assert!(CrawlPhase::Running.can_transition_to(CrawlPhase::Done));
        assert!(!CrawlPhase::Done.can_transition_to(CrawlPhase::Running));
        assert!(!CrawlPhase::Running.can_transition_to(CrawlPhase::Init));
        assert!(!CrawlPhase::Running.can_transition_to(CrawlPhase::Running));
    }

    #[test]
    fn test_invalid_transition_keeps_phase() {
        let mut state = new_state();
        assert!(state.transition(CrawlPhase::Running));
        assert!(!state.transition(CrawlPhase::Init));
        assert_eq!(state.phase(), CrawlPhase::Running);
    }

    #[test]
    fn test_fifo_order() {
        let mut state = new_state();
        assert_eq!(state.next_unvisited().unwrap().as_str(), "https://example.com/");

        state.enqueue(url("https://example.com/a"));
        state.enqueue(url("https://example.com/b"));

        assert_eq!(state.next_unvisited().unwrap().as_str(), "https://example.com/a");
        assert_eq!(state.next_unvisited().unwrap().as_str(), "https://example.com/b");
        assert!(state.next_unvisited().is_none());
    }

    #[test]
    fn test_duplicate_entries_are_skipped_on_dequeue() {
        let mut state = new_state();
        state.next_unvisited();

        assert!(state.enqueue(url("https://example.com/a")));
        assert!(state.enqueue(url("https://example.com/a")));
        assert_eq!(state.frontier_len(), 2);

        assert!(state.next_unvisited().is_some());
        assert!(state.next_unvisited().is_none());
        assert_eq!(state.frontier_len(), 0);
    }

    #[test]
    fn test_has_unvisited_drops_visited_duplicates() {
        let mut state = new_state();
        state.next_unvisited();
        state.enqueue(url("https://example.com/a"));
        state.enqueue(url("https://example.com/a"));
        state.next_unvisited();

        assert_eq!(state.frontier_len(), 1);
        assert!(!state.has_unvisited());
        assert_eq!(state.frontier_len(), 0);
    }

    #[test]
    fn test_has_unvisited_keeps_pending_work() {
        let mut state = new_state();
        state.next_unvisited();
        state.enqueue(url("https://example.com/a"));
        state.enqueue(url("https://example.com/b"));
        state.next_unvisited();
        state.enqueue(url("https://example.com/a"));

        assert!(state.has_unvisited());
        assert_eq!(state.next_unvisited().unwrap().as_str(), "https://example.com/b");
        assert!(!state.has_unvisited());
    }

    #[test]
    fn test_visited_urls_are_not_enqueued() {
        let mut state = new_state();
        state.next_unvisited();

        assert!(!state.enqueue(url("https://example.com/")));
        assert_eq!(state.frontier_len(), 0);
    }

    #[test]
    fn test_off_domain_urls_are_not_enqueued() {
        let mut state = new_state();
        assert!(!state.enqueue(url("https://other.com/x")));
        assert!(!state.enqueue(url("https://sub.example.com/x")));
        assert_eq!(state.frontier_len(), 1);
    }

    #[test]
    fn test_failure_is_visited_but_not_a_result() {
        let mut state = new_state();
        let seed = state.next_unvisited().unwrap();
        state.record_attempt(&seed);
        state.record_failure(&seed, "HTTP 404".to_string());

        assert!(state.is_visited(seed.as_str()));

        let results = state.finish(false);
        assert!(results.pages.is_empty());
        assert_eq!(results.failures.len(), 1);
        assert_eq!(results.fetch_order, vec!["https://example.com/".to_string()]);
    }

    #[test]
    fn test_finish_collects_results() {
        let mut state = new_state();
        state.transition(CrawlPhase::Running);
        let seed = state.next_unvisited().unwrap();
        state.record_attempt(&seed);
        state.record_success(
            &seed,
            PageContent {
                title: "Home".to_string(),
                ..PageContent::default()
            },
        );

        let results = state.finish(true);
        assert_eq!(results.page_count(), 1);
        assert_eq!(results.pages["https://example.com/"].title, "Home");
        assert!(results.cancelled);
        assert_eq!(results.base_domain, "example.com");
        assert!(results.duration() >= chrono::Duration::zero());
    }
}
