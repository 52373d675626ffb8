//! Ordered fallback chains.
//!
//! A chain is a list of named strategies. Each strategy is a lazily started
//! future resolving to `Option<T>`; the first `Some` wins and the remaining
//! strategies are never polled. Both the news sourcer and the image sourcer
//! are expressed this way.

use futures::future::LocalBoxFuture;
use tracing::{debug, info};

pub struct Strategy<'a, T> {
    pub name: &'static str,
    pub attempt: LocalBoxFuture<'a, Option<T>>,
}

impl<'a, T> Strategy<'a, T> {
    pub fn new(name: &'static str, attempt: LocalBoxFuture<'a, Option<T>>) -> Self {
        Self { name, attempt }
    }
}

/// Run strategies in order and return the first result along with the name
/// of the strategy that produced it.
pub async fn first_success<'a, T>(chain: Vec<Strategy<'a, T>>) -> Option<(&'static str, T)> {
    for Strategy { name, attempt } in chain {
        debug!(strategy = name, "Trying strategy");
        if let Some(value) = attempt.await {
            info!(strategy = name, "Strategy succeeded");
            return Some((name, value));
        }
        info!(strategy = name, "Strategy produced nothing; falling back");
    }
    None
}
