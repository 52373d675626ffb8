//! Duplicate-avoiding retry loop.
//!
//! Each generation request is a small state machine:
//!
//! ```text
//! ATTEMPT --not duplicate--> ACCEPTED
//!    |  \--duplicate, attempts left--> ATTEMPT (new topic)
//!    \-----duplicate, none left------> EXHAUSTED
//! ```
//!
//! An exhausted run still returns its last candidate; availability wins over
//! strict deduplication. Either terminal state appends exactly one entry to
//! the post history.

use crate::draft::{Drafter, TopicSource};
use crate::error::CompletionError;
use crate::history::HistoryStore;
use crate::models::Candidate;
use crate::similarity::SimilarityClassifier;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The candidate passed the duplicate check.
    Accepted,
    /// Every attempt was a duplicate; the last candidate is used anyway.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub candidate: Candidate,
    pub outcome: Outcome,
    pub attempts: usize,
}

/// State threaded through the attempts.
#[derive(Debug, Default)]
struct LoopState {
    attempt: usize,
    excluded_topics: HashSet<String>,
    rejected_titles: Vec<String>,
    last_candidate: Option<Candidate>,
}

pub struct RetryOrchestrator<'a, D> {
    drafter: &'a D,
    classifier: &'a SimilarityClassifier,
    history: &'a HistoryStore,
    topics: &'a [String],
    max_retries: usize,
}

impl<'a, D: Drafter> RetryOrchestrator<'a, D> {
    pub fn new(
        drafter: &'a D,
        classifier: &'a SimilarityClassifier,
        history: &'a HistoryStore,
        topics: &'a [String],
        max_retries: usize,
    ) -> Self {
        Self {
            drafter,
            classifier,
            history,
            topics,
            max_retries: max_retries.max(1),
        }
    }

    /// Pick an untried fallback topic, or any topic once all have been tried.
    fn next_topic<R: Rng + ?Sized>(&self, state: &mut LoopState, rng: &mut R) -> TopicSource {
        let untried: Vec<&String> = self
            .topics
            .iter()
            .filter(|t| !state.excluded_topics.contains(*t))
            .collect();
        let topic = match untried.choose(rng) {
            Some(topic) => (*topic).clone(),
            None => self
                .topics
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| "AI technology".to_string()),
        };
        state.excluded_topics.insert(topic.clone());
        TopicSource::Topic(topic)
    }

    /// Generate a candidate, retrying on duplicates.
    ///
    /// With a digest every attempt writes from it, steering away from titles
    /// already rejected. Without one, each attempt draws a fresh fallback topic.
    /// Completion failures end the run.
    #[instrument(level = "info", skip_all, fields(max_retries = self.max_retries, digest = digest.is_some()))]
    pub async fn run<R: Rng + ?Sized>(
        &self,
        digest: Option<&str>,
        rng: &mut R,
    ) -> Result<Generation, CompletionError> {
        let history = self.history.load().await;
        let mut state = LoopState::default();
        let mut outcome = Outcome::Exhausted;

        while state.attempt < self.max_retries {
            state.attempt += 1;
            let source = match digest {
                Some(digest) => TopicSource::Digest(digest.to_string()),
                None => self.next_topic(&mut state, rng),
            };
            info!(attempt = state.attempt, max = self.max_retries, "Generating draft");

            let candidate = if state.attempt == self.max_retries {
                self.drafter.generate(&source, &state.rejected_titles).await?
            } else {
                self.drafter.draft(&source, &state.rejected_titles).await?
            };
            let duplicate = self
                .classifier
                .is_duplicate(&candidate.title, &candidate.content, &history);

            if !duplicate {
                info!(title = %candidate.title, attempt = state.attempt, "Draft accepted");
                state.last_candidate = Some(candidate);
                outcome = Outcome::Accepted;
                break;
            }

            if state.attempt < self.max_retries {
                info!(title = %candidate.title, "Duplicate draft; retrying with another topic");
            }
            state.rejected_titles.push(candidate.title.clone());
            state.last_candidate = Some(candidate);
        }

        // max_retries >= 1, so at least one draft exists here.
        let Some(candidate) = state.last_candidate.take() else {
            return Err(CompletionError::Empty);
        };
        if outcome == Outcome::Exhausted {
            warn!(
                title = %candidate.title,
                attempts = state.attempt,
                "Retries exhausted; continuing with a possible duplicate"
            );
        }

        // Drafts from the last attempt were already length-repaired.
        let candidate = if state.attempt < self.max_retries {
            self.drafter.extend_if_short(candidate).await
        } else {
            candidate
        };
        self.history.record(&candidate).await;

        Ok(Generation {
            candidate,
            outcome,
            attempts: state.attempt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryEntry;
    use chrono::Local;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Returns queued titles in order, repeating the last one.
    #[derive(Default)]
    struct StubDrafter {
        titles: RefCell<VecDeque<String>>,
        sources: RefCell<Vec<TopicSource>>,
        avoided: RefCell<Vec<Vec<String>>>,
        extended: RefCell<usize>,
    }

    impl StubDrafter {
        fn new(titles: &[&str]) -> Self {
            Self {
                titles: RefCell::new(titles.iter().map(|t| t.to_string()).collect()),
                ..Default::default()
            }
        }
    }

    impl Drafter for StubDrafter {
        async fn draft(&self, source: &TopicSource, avoid: &[String]) -> Result<Candidate, CompletionError> {
            self.sources.borrow_mut().push(source.clone());
            self.avoided.borrow_mut().push(avoid.to_vec());
            let mut titles = self.titles.borrow_mut();
            let title = if titles.len() > 1 {
                titles.pop_front().unwrap_or_default()
            } else {
                titles.front().cloned().unwrap_or_default()
            };
            Ok(Candidate {
                title,
                content: "<p>body</p>".into(),
                theme: source.theme(),
            })
        }

        async fn extend_if_short(&self, mut candidate: Candidate) -> Candidate {
            *self.extended.borrow_mut() += 1;
            candidate.content.push_str("<p>more</p>");
            candidate
        }
    }

    struct FailingDrafter;

    impl Drafter for FailingDrafter {
        async fn draft(&self, _source: &TopicSource, _avoid: &[String]) -> Result<Candidate, CompletionError> {
            Err(CompletionError::Auth("invalid_api_key".into()))
        }

        async fn extend_if_short(&self, candidate: Candidate) -> Candidate {
            candidate
        }
    }

    async fn seeded_store(dir: &tempfile::TempDir, titles: &[&str]) -> HistoryStore {
        let store = HistoryStore::new(dir.path().join("post_history.json"));
        let entries = titles
            .iter()
            .map(|t| HistoryEntry {
                title: t.to_string(),
                date: Local::now(),
                theme: String::new(),
                content_preview: String::new(),
            })
            .collect();
        store.save(entries).await;
        store
    }

    fn topics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_always_duplicate_exhausts_and_records_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir, &["AI News Today"]).await;
        let drafter = StubDrafter::new(&["AI News Today"]);
        let classifier = SimilarityClassifier::default();
        let topics = topics(&["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(7);

        let generation = RetryOrchestrator::new(&drafter, &classifier, &store, &topics, 4)
            .run(None, &mut rng)
            .await
            .unwrap();

        assert_eq!(generation.outcome, Outcome::Exhausted);
        assert_eq!(generation.attempts, 4);
        assert_eq!(drafter.sources.borrow().len(), 4);
        assert_eq!(generation.candidate.title, "AI News Today");
        assert_eq!(*drafter.extended.borrow(), 1);

        let history = store.load().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].title, "AI News Today");
        assert_eq!(history[1].content_preview, "bodymore");
    }

    #[tokio::test]
    async fn test_accepts_after_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir, &["Old post"]).await;
        let drafter = StubDrafter::new(&["Old post", "Brand new angle on agents"]);
        let classifier = SimilarityClassifier::default();
        let topics = topics(&["a"]);
        let mut rng = StdRng::seed_from_u64(1);

        let generation = RetryOrchestrator::new(&drafter, &classifier, &store, &topics, 5)
            .run(Some("- [Feed] News: blurb"), &mut rng)
            .await
            .unwrap();

        assert_eq!(generation.outcome, Outcome::Accepted);
        assert_eq!(generation.attempts, 2);
        assert_eq!(generation.candidate.title, "Brand new angle on agents");
        assert_eq!(generation.candidate.theme, "- [Feed] News: blurb");
        assert_eq!(*drafter.extended.borrow(), 1);

        let sources = drafter.sources.borrow();
        assert!(sources.iter().all(|s| matches!(s, TopicSource::Digest(_))));
        let avoided = drafter.avoided.borrow();
        assert!(avoided[0].is_empty());
        assert_eq!(avoided[1], vec!["Old post".to_string()]);

        assert_eq!(store.load().await.len(), 2);
    }

    #[tokio::test]
    async fn test_accepted_on_last_attempt_is_extended_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir, &["Old post"]).await;
        let drafter = StubDrafter::new(&["Old post", "Brand new angle on agents"]);
        let classifier = SimilarityClassifier::default();
        let topics = topics(&["a", "b"]);
        let mut rng = StdRng::seed_from_u64(5);

        let generation = RetryOrchestrator::new(&drafter, &classifier, &store, &topics, 2)
            .run(None, &mut rng)
            .await
            .unwrap();

        assert_eq!(generation.outcome, Outcome::Accepted);
        assert_eq!(generation.attempts, 2);
        assert_eq!(generation.candidate.content, "<p>body</p><p>more</p>");
        assert_eq!(*drafter.extended.borrow(), 1);
    }

    #[tokio::test]
    async fn test_topics_are_not_repeated_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir, &["dup"]).await;
        let drafter = StubDrafter::new(&["dup"]);
        let classifier = SimilarityClassifier::default();
        let topics = topics(&["one", "two", "three"]);
        let mut rng = StdRng::seed_from_u64(42);

        RetryOrchestrator::new(&drafter, &classifier, &store, &topics, 5)
            .run(None, &mut rng)
            .await
            .unwrap();

        let sources = drafter.sources.borrow();
        let first_three: HashSet<String> = sources[..3]
            .iter()
            .map(|s| match s {
                TopicSource::Topic(t) => t.clone(),
                TopicSource::Digest(_) => panic!("no digest was given"),
            })
            .collect();
        assert_eq!(first_three.len(), 3);
        assert_eq!(sources.len(), 5);
    }

    #[tokio::test]
    async fn test_first_attempt_accepted_on_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("post_history.json"));
        let drafter = StubDrafter::new(&["Fresh"]);
        let classifier = SimilarityClassifier::default();
        let topics = topics(&["only topic"]);
        let mut rng = StdRng::seed_from_u64(3);

        let generation = RetryOrchestrator::new(&drafter, &classifier, &store, &topics, 5)
            .run(None, &mut rng)
            .await
            .unwrap();

        assert_eq!(generation.outcome, Outcome::Accepted);
        assert_eq!(generation.attempts, 1);
        assert_eq!(generation.candidate.theme, "only topic");
        assert_eq!(store.load().await.len(), 1);
    }

    #[tokio::test]
    async fn test_completion_failure_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("post_history.json"));
        let classifier = SimilarityClassifier::default();
        let topics = topics(&["t"]);
        let mut rng = StdRng::seed_from_u64(0);

        let result = RetryOrchestrator::new(&FailingDrafter, &classifier, &store, &topics, 3)
            .run(None, &mut rng)
            .await;

        assert!(matches!(result, Err(CompletionError::Auth(_))));
        assert!(store.load().await.is_empty());
    }
}
