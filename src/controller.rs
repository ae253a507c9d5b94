use std::sync::Arc;

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use image::DynamicImage;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ControllerError, FetchError};
use crate::fetcher::PhotoService;
use crate::models::{PhotoRecord, SearchQuery, SearchResult};

pub const LOADING: &str = "Loading...";
pub const NO_MATCHES: &str = "No matches";
pub const ERROR_OCCURRED: &str = "Error occurred";
pub const IMAGE_UNAVAILABLE: &str = "Image unavailable";

/// Explicit cancellation handle for one in-flight request
#[derive(Debug, Clone)]
pub struct CancelHandle {
    id: Uuid,
    abort: AbortHandle,
}

impl CancelHandle {
    fn new() -> (Self, AbortRegistration) {
        let (abort, registration) = AbortHandle::new_pair();
        (Self { id: Uuid::new_v4(), abort }, registration)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel(&self) {
        self.abort.abort();
    }
}

/// Completion reports posted back to the event loop by network tasks
#[derive(Debug)]
pub enum Message {
    SearchFinished {
        id: Uuid,
        query: SearchQuery,
        result: Result<Vec<PhotoRecord>, FetchError>,
    },
    SearchCancelled {
        id: Uuid,
    },
    ImageFinished {
        id: Uuid,
        index: usize,
        result: Result<DynamicImage, FetchError>,
    },
    ImageCancelled {
        id: Uuid,
    },
}

#[derive(Debug)]
pub enum SearchState {
    Idle,
    Loading { query: SearchQuery },
    Populated(SearchResult),
    Empty { query: SearchQuery },
    Failed { query: SearchQuery, reason: String },
}

#[derive(Debug)]
pub enum ImageState {
    Blank,
    Loading { index: usize },
    Ready { index: usize, image: DynamicImage },
    Unavailable { index: usize, reason: String },
}

/// One row of the result list
#[derive(Debug, PartialEq, Eq)]
pub enum ListEntry<'a> {
    Placeholder(&'static str),
    Photo(&'a PhotoRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    fn search_failed() -> Self {
        Self {
            title: "Flickr Error".to_string(),
            message: "Unable to get results from Flickr".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new search is now loading
    Started,
    /// Another search is still running; answer with `resolve_confirmation`
    ConfirmationRequired,
    /// The user chose to keep the running search
    Declined,
}

pub struct SearchController {
    service: Arc<dyn PhotoService>,
    tx: UnboundedSender<Message>,
    state: SearchState,
    search_task: Option<CancelHandle>,
    pending_query: Option<SearchQuery>,
    selected: Option<usize>,
    image: ImageState,
    image_task: Option<CancelHandle>,
    notification: Option<Notification>,
}

impl SearchController {
    pub fn new(service: Arc<dyn PhotoService>, tx: UnboundedSender<Message>) -> Self {
        Self {
            service,
            tx,
            state: SearchState::Idle,
            search_task: None,
            pending_query: None,
            selected: None,
            image: ImageState::Blank,
            image_task: None,
            notification: None,
        }
    }

    /// Starts a search for `tags`, unless one is already running, in which
    /// case the query is held until the user answers the cancel prompt.
    pub fn submit_search(&mut self, tags: &str) -> SubmitOutcome {
        let query = SearchQuery::new(tags);

        if self.is_searching() {
            debug!(tags, "search in flight, asking before cancelling it");
            self.pending_query = Some(query);
            return SubmitOutcome::ConfirmationRequired;
        }

        self.start_search(query);
        SubmitOutcome::Started
    }

    /// Answers the cancel prompt raised by `submit_search`
    pub fn resolve_confirmation(&mut self, cancel_running: bool) -> Result<SubmitOutcome, ControllerError> {
        let query = self
            .pending_query
            .take()
            .ok_or(ControllerError::NoPendingConfirmation)?;

        if !cancel_running {
            debug!(tags = query.as_str(), "kept the running search");
            return Ok(SubmitOutcome::Declined);
        }

        if let Some(task) = self.search_task.take() {
            info!(id = %task.id(), "cancelling running search");
            task.cancel();
        }
        self.start_search(query);
        Ok(SubmitOutcome::Started)
    }

    fn start_search(&mut self, query: SearchQuery) {
        self.cancel_image();
        self.selected = None;
        self.image = ImageState::Blank;
        self.state = SearchState::Loading { query: query.clone() };

        let (handle, registration) = CancelHandle::new();
        let id = handle.id();
        info!(%id, tags = query.as_str(), "starting search");

        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let search_query = query.clone();
        tokio::spawn(async move {
            let work = Abortable::new(
                async move { service.search(&search_query).await },
                registration,
            );
            let outcome = work.await;
            let message = match outcome {
                Ok(result) => Message::SearchFinished { id, query, result },
                Err(_) => Message::SearchCancelled { id },
            };
            // The receiver is gone only when the viewer has shut down
            let _ = tx.send(message);
        });

        self.search_task = Some(handle);
    }

    /// Shows the photo at `index` of the current results, replacing whatever
    /// was displayed. A fetch still running for an earlier selection is
    /// cancelled.
    pub fn select_photo(&mut self, index: usize) -> Result<(), ControllerError> {
        let record = match &self.state {
            SearchState::Populated(result) => result.get(index).cloned(),
            _ => None,
        }
        .ok_or(ControllerError::NotInResult { index })?;

        self.cancel_image();
        self.selected = Some(index);
        self.image = ImageState::Loading { index };

        let (handle, registration) = CancelHandle::new();
        let id = handle.id();
        let url = record.image_url();
        debug!(%id, index, url = url.as_str(), "selecting photo");

        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let work = Abortable::new(
                async move { service.fetch_image(&url).await },
                registration,
            );
            let outcome = work.await;
            let message = match outcome {
                Ok(result) => Message::ImageFinished { id, index, result },
                Err(_) => Message::ImageCancelled { id },
            };
            let _ = tx.send(message);
        });

        self.image_task = Some(handle);
        Ok(())
    }

    fn cancel_image(&mut self) {
        if let Some(task) = self.image_task.take() {
            debug!(id = %task.id(), "cancelling image fetch");
            task.cancel();
        }
    }

    /// Applies a completion report from a network task
    pub fn handle(&mut self, message: Message) {
        match message {
            Message::SearchFinished { id, query, result } => {
                if !is_current(&self.search_task, id) {
                    debug!(%id, "dropping result of a superseded search");
                    return;
                }
                self.search_task = None;

                self.state = match result {
                    Ok(photos) if photos.is_empty() => SearchState::Empty { query },
                    Ok(photos) => SearchState::Populated(SearchResult::new(query, photos)),
                    Err(e) => {
                        warn!(%id, error = %e, "search failed");
                        self.notification = Some(Notification::search_failed());
                        SearchState::Failed { query, reason: e.to_string() }
                    }
                };
            }
            Message::SearchCancelled { id } => {
                debug!(%id, "search cancelled");
            }
            Message::ImageFinished { id, index, result } => {
                if !is_current(&self.image_task, id) {
                    debug!(%id, index, "dropping superseded image");
                    return;
                }
                self.image_task = None;

                self.image = match result {
                    Ok(image) => ImageState::Ready { index, image },
                    Err(e) => {
                        warn!(%id, index, error = %e, "image fetch failed");
                        ImageState::Unavailable { index, reason: e.to_string() }
                    }
                };
            }
            Message::ImageCancelled { id } => {
                debug!(%id, "image fetch cancelled");
            }
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn is_searching(&self) -> bool {
        self.search_task.is_some()
    }

    /// Query waiting on the cancel prompt, if any
    pub fn awaiting_confirmation(&self) -> Option<&SearchQuery> {
        self.pending_query.as_ref()
    }

    pub fn result(&self) -> Option<&SearchResult> {
        match &self.state {
            SearchState::Populated(result) => Some(result),
            _ => None,
        }
    }

    /// What the result list shows right now
    pub fn list_entries(&self) -> Vec<ListEntry<'_>> {
        match &self.state {
            SearchState::Idle => Vec::new(),
            SearchState::Loading { .. } => vec![ListEntry::Placeholder(LOADING)],
            SearchState::Empty { .. } => vec![ListEntry::Placeholder(NO_MATCHES)],
            SearchState::Failed { .. } => vec![ListEntry::Placeholder(ERROR_OCCURRED)],
            SearchState::Populated(result) => result.photos.iter().map(ListEntry::Photo).collect(),
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn image(&self) -> &ImageState {
        &self.image
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }
}

fn is_current(task: &Option<CancelHandle>, id: Uuid) -> bool {
    task.as_ref().is_some_and(|t| t.id() == id)
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
