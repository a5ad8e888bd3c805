//! The listing search pipeline.
//!
//! Filter edits are debounced, normalized (invalid input stays local and
//! never reaches the network), fetched through a [`QueryExecutor`], then
//! re-filtered, sorted and favorites-filtered on the client. Every state
//! change is published as a [`SearchView`].
//!
//! A failed fetch, or a failed favorites load while favorites-only is on,
//! settles as [`QueryResult::Error`] and can be re-run with
//! [`SearchController::retry`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use propdb_core::{
    process, ClientConfig, FilterCriteria, ListQuery, PostProcessed, Property, PropertyPage,
    RawFilter, SortOption, ValidationErrors,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::PropertyApi;
use crate::error::ClientError;
use crate::executor::{QueryExecutor, QueryResult, Snapshot};
use crate::favorites::FavoritesStore;
use crate::stabilize::Debounce;

const DEFAULT_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub debounce: Duration,
    /// Listings requested per fetch.
    pub page_limit: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl SearchSettings {
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            ..Self::default()
        }
    }
}

/// Everything a results screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    /// The filter exactly as last edited.
    pub raw: RawFilter,
    /// Field errors for `raw`; while present, no request is issued for it.
    pub filter_errors: Option<ValidationErrors>,
    /// Criteria of the most recently issued request.
    pub criteria: FilterCriteria,
    pub sort: SortOption,
    pub favorites_only: bool,
    pub results: QueryResult<PostProcessed>,
    /// Offset of the next server page; `None` once everything is loaded.
    pub next_cursor: Option<u64>,
}

impl Default for SearchView {
    fn default() -> Self {
        Self {
            raw: RawFilter::default(),
            filter_errors: None,
            criteria: FilterCriteria::default(),
            sort: SortOption::default(),
            favorites_only: false,
            results: QueryResult::Idle,
            next_cursor: None,
        }
    }
}

#[derive(Debug)]
enum Command {
    EditFilter(RawFilter),
    SetSort(SortOption),
    SetFavoritesOnly(bool),
    RefreshFavorites,
    Retry,
    LoadMore,
}

/// Handle to a running search pipeline. Dropping it stops the pipeline.
pub struct SearchController {
    commands: mpsc::UnboundedSender<Command>,
    views: watch::Receiver<SearchView>,
    task: JoinHandle<()>,
}

impl SearchController {
    /// Start the pipeline on the current tokio runtime.
    pub fn spawn(
        api: Arc<dyn PropertyApi>,
        favorites: Option<Arc<dyn FavoritesStore>>,
        settings: SearchSettings,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (view_tx, views) = watch::channel(SearchView::default());
        let executor = QueryExecutor::new();
        let worker = Worker {
            api,
            favorites_store: favorites,
            results: executor.subscribe(),
            executor,
            debounce: Debounce::new(settings.debounce),
            page_limit: settings.page_limit,
            last_query: None,
            favorites: None,
            favorites_failure: None,
            view_tx,
        };
        let task = tokio::spawn(worker.run(command_rx));

        Self {
            commands,
            views,
            task,
        }
    }

    /// Replace the filter. The request goes out once edits settle.
    pub fn edit_filter(&self, raw: RawFilter) {
        self.send(Command::EditFilter(raw));
    }

    /// Change the order. Takes effect immediately, without refetching.
    pub fn set_sort(&self, sort: SortOption) {
        self.send(Command::SetSort(sort));
    }

    /// Show only favorited listings. Loads the favorites set when enabled.
    pub fn set_favorites_only(&self, enabled: bool) {
        self.send(Command::SetFavoritesOnly(enabled));
    }

    /// Reload the favorites set, e.g. after toggling one elsewhere.
    pub fn refresh_favorites(&self) {
        self.send(Command::RefreshFavorites);
    }

    /// Re-issue the last request without waiting out the debounce.
    ///
    /// A favorites set that failed to load is fetched again first.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Fetch the page after the loaded ones and append it.
    ///
    /// Does nothing unless the current result is a success with a
    /// `next_cursor`. The view is `Loading` until the longer list arrives.
    pub fn load_more(&self) {
        self.send(Command::LoadMore);
    }

    #[must_use]
    pub fn views(&self) -> watch::Receiver<SearchView> {
        self.views.clone()
    }

    #[must_use]
    pub fn current(&self) -> SearchView {
        self.views.borrow().clone()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("search pipeline is no longer running");
        }
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Worker {
    api: Arc<dyn PropertyApi>,
    favorites_store: Option<Arc<dyn FavoritesStore>>,
    executor: QueryExecutor<PropertyPage>,
    results: watch::Receiver<Snapshot<PropertyPage>>,
    debounce: Debounce<RawFilter>,
    page_limit: u32,
    /// First-page query of the most recent submit.
    last_query: Option<ListQuery>,
    favorites: Option<HashSet<String>>,
    favorites_failure: Option<Arc<ClientError>>,
    view_tx: watch::Sender<SearchView>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let deadline = self.debounce.deadline();
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle(command).await;
                }
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    if let Some(raw) = self.debounce.poll(Instant::now()) {
                        self.submit(&raw);
                    }
                }
                changed = self.results.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.publish_results();
                }
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::EditFilter(raw) => {
                self.view_tx.send_modify(|view| view.raw = raw.clone());
                if let Some(due) = self.debounce.push(raw, Instant::now()) {
                    self.submit(&due);
                }
            }
            Command::SetSort(sort) => {
                self.view_tx.send_modify(|view| view.sort = sort);
                self.publish_results();
            }
            Command::SetFavoritesOnly(enabled) => {
                if enabled && self.favorites.is_none() {
                    self.load_favorites().await;
                }
                self.view_tx.send_modify(|view| view.favorites_only = enabled);
                self.publish_results();
            }
            Command::RefreshFavorites => {
                self.load_favorites().await;
                self.publish_results();
            }
            Command::Retry => {
                if self.favorites_failure.is_some() {
                    self.load_favorites().await;
                }
                match self.last_query.clone() {
                    Some(query) => self.fetch(query),
                    None => tracing::debug!("nothing to retry"),
                }
                self.publish_results();
            }
            Command::LoadMore => self.load_more(),
        }
    }

    /// Normalize a settled filter and, if valid, fetch it.
    fn submit(&mut self, raw: &RawFilter) {
        let criteria = match raw.normalize() {
            Ok(criteria) => criteria,
            Err(errors) => {
                tracing::debug!(%errors, "filter invalid, not fetching");
                self.view_tx
                    .send_modify(|view| view.filter_errors = Some(errors));
                return;
            }
        };

        let mut query = ListQuery::new(criteria.clone(), self.view_tx.borrow().sort);
        query.limit = Some(self.page_limit);
        self.view_tx.send_modify(|view| {
            view.filter_errors = None;
            view.criteria = criteria;
        });

        self.last_query = Some(query.clone());
        self.fetch(query);
    }

    fn fetch(&mut self, query: ListQuery) {
        let api = Arc::clone(&self.api);
        self.executor
            .spawn(async move { api.list_properties(&query).await });
    }

    /// Request the page at `next_cursor` and append it to the loaded items.
    ///
    /// Runs through the executor, so a newer submit still supersedes it.
    fn load_more(&mut self) {
        let loaded = self.results.borrow().result.clone();
        let (Some(base), QueryResult::Success(page)) = (&self.last_query, loaded) else {
            tracing::debug!("no loaded page to extend");
            return;
        };
        let Some(cursor) = page.next_cursor else {
            tracing::debug!("all pages already loaded");
            return;
        };

        let mut query = base.clone();
        query.cursor = Some(cursor);
        let api = Arc::clone(&self.api);
        self.executor.spawn(async move {
            let next = api.list_properties(&query).await?;
            let mut items = page.items;
            items.extend(next.items);
            Ok::<_, ClientError>(PropertyPage {
                items,
                next_cursor: next.next_cursor,
            })
        });
    }

    async fn load_favorites(&mut self) {
        let Some(store) = &self.favorites_store else {
            self.favorites = Some(HashSet::new());
            return;
        };
        match store.list().await {
            Ok(ids) => {
                self.favorites = Some(ids);
                self.favorites_failure = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load favorites");
                self.favorites = None;
                self.favorites_failure = Some(Arc::new(e));
            }
        }
    }

    /// Re-derive the visible results from the latest fetch.
    fn publish_results(&mut self) {
        let fetched = self.results.borrow_and_update().result.clone();
        if matches!(fetched, QueryResult::Error { .. }) {
            // Re-entering the same filter must fetch again.
            self.debounce.forget_latest();
        }
        let favorites = &self.favorites;
        let favorites_failure = &self.favorites_failure;
        self.view_tx.send_modify(|view| {
            if let (true, Some(_), Some(cause)) =
                (view.favorites_only, fetched.value(), favorites_failure)
            {
                view.next_cursor = None;
                view.results = QueryResult::Error {
                    message: format!("failed to load favorites: {cause}"),
                    cause: Arc::clone(cause),
                };
                return;
            }
            view.next_cursor = fetched.value().and_then(|page| page.next_cursor);

            let criteria = &view.criteria;
            let sort = view.sort;
            let favorites = view
                .favorites_only
                .then(|| favorites.clone().unwrap_or_default());
            view.results = fetched.map(|page| {
                let matching: Vec<Property> = page
                    .items
                    .into_iter()
                    .filter(|p| criteria.matches(p))
                    .collect();
                process(&matching, sort, favorites.as_ref())
            });
        });
    }
}
