//! Search session state and the controller that drives it.
//!
//! The controller owns a single [`SearchState`] and publishes every change
//! through a `tokio::sync::watch` channel. Presentation code subscribes to
//! the channel and renders from snapshots; it never mutates state itself.

use crate::agent::{AgentError, BusinessFinder};
use crate::business::{Business, Source};
use crate::query::{validate_pincode, BusinessQuery};
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Shown when a request fails without saying why
pub const UNKNOWN_ERROR: &str = "An unknown error occurred.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Please enter a valid 6-digit pincode.")]
    Validation,
    #[error("{0}")]
    Request(String),
    #[error("a search is already in progress")]
    Busy,
    #[error("start a search before loading more results")]
    NoActiveSearch,
}

/// Coarse view of the state, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Searching,
    LoadingMore,
    ResultsEmpty,
    ResultsPresent,
    Errored,
}

/// Everything the presentation layer needs to render a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub pincode: String,
    pub area: String,
    /// Display order; names are unique
    pub businesses: Vec<Business>,
    /// First-seen order; uris are unique
    pub sources: Vec<Source>,
    pub has_searched: bool,
    pub has_more: bool,
    pub error: Option<String>,
    pub is_searching: bool,
    pub is_loading_more: bool,
}

impl SearchState {
    pub fn phase(&self) -> Phase {
        if self.is_searching {
            Phase::Searching
        } else if self.is_loading_more {
            Phase::LoadingMore
        } else if self.error.is_some() && self.businesses.is_empty() {
            Phase::Errored
        } else if !self.has_searched {
            Phase::Idle
        } else if self.businesses.is_empty() {
            Phase::ResultsEmpty
        } else {
            Phase::ResultsPresent
        }
    }

    /// True while either request is outstanding
    pub fn is_busy(&self) -> bool {
        self.is_searching || self.is_loading_more
    }

    pub fn business_names(&self) -> Vec<String> {
        self.businesses.iter().map(|b| b.name.clone()).collect()
    }
}

/// Append businesses whose names are not yet present, keeping their order.
///
/// Returns how many were appended.
pub fn merge_businesses(existing: &mut Vec<Business>, incoming: Vec<Business>) -> usize {
    let mut seen: HashSet<String> = existing.iter().map(|b| b.name.clone()).collect();
    let before = existing.len();
    existing.extend(incoming.into_iter().filter(|b| seen.insert(b.name.clone())));
    existing.len() - before
}

/// Append sources whose uris are not yet present. The first copy of a uri wins.
pub fn merge_sources(existing: &mut Vec<Source>, incoming: Vec<Source>) {
    let mut seen: HashSet<String> = existing.iter().map(|s| s.uri.clone()).collect();
    existing.extend(incoming.into_iter().filter(|s| seen.insert(s.uri.clone())));
}

fn failure_message(err: &AgentError) -> String {
    err.message().unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

#[derive(Debug, Clone, Copy)]
enum Flight {
    Search,
    LoadMore,
}

impl Flight {
    fn set(self, state: &mut SearchState, value: bool) {
        match self {
            Flight::Search => state.is_searching = value,
            Flight::LoadMore => state.is_loading_more = value,
        }
    }
}

/// Clears its loading flag when dropped, so an abandoned request
/// never leaves the session stuck in a pending phase.
struct InFlight<'a> {
    state: &'a watch::Sender<SearchState>,
    kind: Flight,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a watch::Sender<SearchState>, kind: Flight) -> Self {
        Self {
            state,
            kind,
            armed: true,
        }
    }

    /// Apply the outcome and clear the flag in one published update
    fn finish(mut self, apply: impl FnOnce(&mut SearchState)) {
        let kind = self.kind;
        self.state.send_modify(|state| {
            apply(state);
            kind.set(state, false);
        });
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            let kind = self.kind;
            debug!(?kind, "request abandoned, clearing loading flag");
            self.state.send_modify(|state| kind.set(state, false));
        }
    }
}

/// Drives searches and pagination against a [`BusinessFinder`].
pub struct SearchController<F> {
    finder: F,
    state: watch::Sender<SearchState>,
    page_size: usize,
}

impl<F: BusinessFinder> SearchController<F> {
    /// `page_size` is the number of results that counts as a full page.
    /// It is raised to 1 if zero, so an empty page always ends pagination.
    pub fn new(finder: F, page_size: usize) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            finder,
            state,
            page_size: page_size.max(1),
        }
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Start a fresh search, discarding previous results.
    ///
    /// The outcome is also recorded in the state; the return value is a
    /// convenience for callers that do not subscribe.
    pub async fn search(&self, pincode: &str, area: &str) -> Result<(), SearchError> {
        let mut accepted = Ok(());
        self.state.send_if_modified(|state| {
            if state.is_busy() {
                accepted = Err(SearchError::Busy);
                return false;
            }
            if let Err(err) = validate_pincode(pincode) {
                state.error = Some(err.to_string());
                accepted = Err(err);
                return true;
            }
            state.pincode = pincode.to_string();
            state.area = area.to_string();
            state.businesses.clear();
            state.sources.clear();
            state.error = None;
            state.has_searched = true;
            state.has_more = false;
            Flight::Search.set(state, true);
            true
        });
        accepted?;

        let flight = InFlight::new(&self.state, Flight::Search);
        info!(pincode, area, "starting search");

        let query = BusinessQuery::new(pincode, area);
        match self.finder.find(&query).await {
            Ok(page) => {
                let page_size = self.page_size;
                flight.finish(|state| {
                    let returned = page.businesses.len();
                    merge_businesses(&mut state.businesses, page.businesses);
                    merge_sources(&mut state.sources, page.sources);
                    state.has_more = returned == page_size;
                    info!(returned, has_more = state.has_more, "search finished");
                });
                Ok(())
            }
            Err(err) => {
                let message = failure_message(&err);
                warn!(error = %err, "search failed");
                flight.finish(|state| state.error = Some(message.clone()));
                Err(SearchError::Request(message))
            }
        }
    }

    /// Fetch the next page for the current pincode and area, appending
    /// only businesses that are not already listed.
    pub async fn load_more(&self) -> Result<(), SearchError> {
        let mut accepted = Err(SearchError::NoActiveSearch);
        self.state.send_if_modified(|state| {
            if state.is_busy() {
                accepted = Err(SearchError::Busy);
                return false;
            }
            if !state.has_searched {
                return false;
            }
            accepted = Ok(BusinessQuery::new(state.pincode.clone(), state.area.clone())
                .excluding(state.business_names()));
            Flight::LoadMore.set(state, true);
            true
        });
        let query = accepted?;

        let flight = InFlight::new(&self.state, Flight::LoadMore);
        info!(
            pincode = %query.pincode,
            excluded = query.exclude.len(),
            "loading more"
        );

        match self.finder.find(&query).await {
            Ok(page) => {
                let page_size = self.page_size;
                flight.finish(|state| {
                    let returned = page.businesses.len();
                    let added = merge_businesses(&mut state.businesses, page.businesses);
                    merge_sources(&mut state.sources, page.sources);
                    if returned < page_size {
                        state.has_more = false;
                    }
                    info!(returned, added, has_more = state.has_more, "load more finished");
                });
                Ok(())
            }
            Err(err) => {
                let message = failure_message(&err);
                warn!(error = %err, "load more failed");
                flight.finish(|state| {
                    state.error = Some(message.clone());
                    state.has_more = false;
                });
                Err(SearchError::Request(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::BusinessPage;
    use async_trait::async_trait;
    use std::time::Duration;

    fn names(businesses: &[Business]) -> Vec<&str> {
        businesses.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn merge_businesses_appends_only_new_names() {
        let mut existing = vec![Business::new("A", "1"), Business::new("B", "2")];
        let added = merge_businesses(
            &mut existing,
            vec![Business::new("B", "other"), Business::new("C", "3")],
        );
        assert_eq!(added, 1);
        assert_eq!(names(&existing), ["A", "B", "C"]);
        assert_eq!(existing[1].address, "2");
    }

    #[test]
    fn merge_businesses_dedups_within_incoming() {
        let mut existing = Vec::new();
        let added = merge_businesses(
            &mut existing,
            vec![
                Business::new("X", "1"),
                Business::new("Y", "2"),
                Business::new("X", "3"),
            ],
        );
        assert_eq!(added, 2);
        assert_eq!(names(&existing), ["X", "Y"]);
    }

    #[test]
    fn merge_businesses_is_case_sensitive() {
        let mut existing = vec![Business::new("Cafe", "1")];
        merge_businesses(&mut existing, vec![Business::new("cafe", "1")]);
        assert_eq!(names(&existing), ["Cafe", "cafe"]);
    }

    #[test]
    fn merge_sources_keeps_first_title() {
        let mut existing = vec![Source::new("x", "old")];
        merge_sources(
            &mut existing,
            vec![Source::new("x", "new"), Source::new("y", "y")],
        );
        assert_eq!(existing, vec![Source::new("x", "old"), Source::new("y", "y")]);
    }

    #[test]
    fn phase_follows_flags() {
        let mut state = SearchState::default();
        assert_eq!(state.phase(), Phase::Idle);

        state.error = Some(SearchError::Validation.to_string());
        assert_eq!(state.phase(), Phase::Errored);

        state.error = None;
        state.has_searched = true;
        state.is_searching = true;
        assert_eq!(state.phase(), Phase::Searching);

        state.is_searching = false;
        assert_eq!(state.phase(), Phase::ResultsEmpty);

        state.businesses.push(Business::new("A", "1"));
        assert_eq!(state.phase(), Phase::ResultsPresent);

        state.is_loading_more = true;
        assert_eq!(state.phase(), Phase::LoadingMore);

        state.is_loading_more = false;
        state.error = Some("boom".into());
        assert_eq!(state.phase(), Phase::ResultsPresent);
    }

    struct NeverFinder;

    #[async_trait]
    impl BusinessFinder for NeverFinder {
        async fn find(&self, _query: &BusinessQuery) -> Result<BusinessPage, AgentError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn abandoned_search_clears_loading_flag() {
        let controller = SearchController::new(NeverFinder, 30);
        let outcome =
            tokio::time::timeout(Duration::from_millis(20), controller.search("110001", "")).await;
        assert!(outcome.is_err());

        let state = controller.snapshot();
        assert!(!state.is_searching);
        assert!(state.has_searched);
        assert_eq!(state.phase(), Phase::ResultsEmpty);
    }

    struct EmptyFinder;

    #[async_trait]
    impl BusinessFinder for EmptyFinder {
        async fn find(&self, _query: &BusinessQuery) -> Result<BusinessPage, AgentError> {
            Ok(BusinessPage::default())
        }
    }

    #[tokio::test]
    async fn zero_page_size_still_ends_pagination() {
        let controller = SearchController::new(EmptyFinder, 0);
        assert_eq!(controller.page_size(), 1);

        controller.search("110001", "").await.unwrap();
        assert!(!controller.snapshot().has_more);

        controller.load_more().await.unwrap();
        assert!(!controller.snapshot().has_more);
    }

    #[tokio::test]
    async fn load_more_before_search_is_rejected() {
        let controller = SearchController::new(NeverFinder, 30);
        assert_eq!(
            controller.load_more().await,
            Err(SearchError::NoActiveSearch)
        );
        assert_eq!(controller.snapshot(), SearchState::default());
    }
}
