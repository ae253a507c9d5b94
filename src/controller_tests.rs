use super::*;
use crate::error::FetchError;
use async_trait::async_trait;
use image::DynamicImage;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::oneshot;

type SearchGate = oneshot::Receiver<Result<Vec<PhotoRecord>, FetchError>>;
type ImageGate = oneshot::Receiver<Result<DynamicImage, FetchError>>;

/// Photo service whose responses are released by the test, one gate per call
#[derive(Default)]
struct ScriptedService {
    searches: Mutex<HashMap<String, SearchGate>>,
    images: Mutex<HashMap<String, ImageGate>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn gate_search(&self, tags: &str) -> oneshot::Sender<Result<Vec<PhotoRecord>, FetchError>> {
        let (tx, rx) = oneshot::channel();
        self.searches.lock().unwrap().insert(tags.to_string(), rx);
        tx
    }

    fn gate_image(&self, url: &str) -> oneshot::Sender<Result<DynamicImage, FetchError>> {
        let (tx, rx) = oneshot::channel();
        self.images.lock().unwrap().insert(url.to_string(), rx);
        tx
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoService for ScriptedService {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<PhotoRecord>, FetchError> {
        self.calls.lock().unwrap().push(format!("search:{}", query.as_str()));
        let gate = self.searches.lock().unwrap().remove(query.as_str());
        match gate {
            Some(gate) => gate.await.unwrap_or_else(|_| Err(FetchError::Parse("gate dropped".into()))),
            None => Err(FetchError::Parse(format!("unscripted search {}", query.as_str()))),
        }
    }

    async fn fetch_image(&self, url: &str) -> Result<DynamicImage, FetchError> {
        self.calls.lock().unwrap().push(format!("image:{}", url));
        let gate = self.images.lock().unwrap().remove(url);
        match gate {
            Some(gate) => gate.await.unwrap_or_else(|_| Err(FetchError::Parse("gate dropped".into()))),
            None => Err(FetchError::Parse(format!("unscripted image {}", url))),
        }
    }
}

fn photo(id: &str) -> PhotoRecord {
    PhotoRecord {
        id: id.to_string(),
        title: format!("photo {}", id),
        secret: "abc".to_string(),
        server: "2".to_string(),
        farm: "3".to_string(),
    }
}

fn setup() -> (Arc<ScriptedService>, SearchController, UnboundedReceiver<Message>) {
    let service = Arc::new(ScriptedService::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = SearchController::new(service.clone(), tx);
    (service, controller, rx)
}

async fn pump(controller: &mut SearchController, rx: &mut UnboundedReceiver<Message>) {
    let message = rx.recv().await.unwrap();
    controller.handle(message);
}

fn populated_ids(controller: &SearchController) -> Option<Vec<String>> {
    controller
        .result()
        .map(|r| r.photos.iter().map(|p| p.id.clone()).collect())
}

#[tokio::test]
async fn test_submit_shows_loading_then_results() {
    let (service, mut controller, mut rx) = setup();
    let gate = service.gate_search("cat dog");

    assert!(controller.list_entries().is_empty());
    assert_eq!(controller.submit_search("cat dog"), SubmitOutcome::Started);
    assert!(matches!(controller.state(), SearchState::Loading { .. }));
    assert_eq!(controller.list_entries(), vec![ListEntry::Placeholder(LOADING)]);

    gate.send(Ok(vec![photo("1"), photo("2")])).unwrap();
    pump(&mut controller, &mut rx).await;

    assert!(!controller.is_searching());
    assert_eq!(populated_ids(&controller), Some(vec!["1".to_string(), "2".to_string()]));
    assert_eq!(controller.list_entries().len(), 2);
    assert_eq!(controller.result().unwrap().query.as_str(), "cat dog");
    assert!(controller.notification().is_none());
}

#[tokio::test]
async fn test_empty_result_is_no_matches_without_notification() {
    let (service, mut controller, mut rx) = setup();
    let gate = service.gate_search("zzzz");

    controller.submit_search("zzzz");
    gate.send(Ok(Vec::new())).unwrap();
    pump(&mut controller, &mut rx).await;

    assert!(matches!(controller.state(), SearchState::Empty { .. }));
    assert_eq!(controller.list_entries(), vec![ListEntry::Placeholder(NO_MATCHES)]);
    assert!(controller.notification().is_none());
}

#[tokio::test]
async fn test_network_failure_notifies_and_shows_placeholder() {
    let (service, mut controller, mut rx) = setup();
    let gate = service.gate_search("cat");

    controller.submit_search("cat");
    gate.send(Err(FetchError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)))
        .unwrap();
    pump(&mut controller, &mut rx).await;

    assert!(matches!(controller.state(), SearchState::Failed { .. }));
    assert_eq!(controller.list_entries(), vec![ListEntry::Placeholder(ERROR_OCCURRED)]);
    let notification = controller.notification().cloned().unwrap();
    assert_eq!(notification.message, "Unable to get results from Flickr");

    controller.dismiss_notification();
    assert!(controller.notification().is_none());
    assert_eq!(service.calls(), vec!["search:cat".to_string()]);
}

#[tokio::test]
async fn test_declining_cancel_keeps_first_search() {
    let (service, mut controller, mut rx) = setup();
    let first = service.gate_search("cat");
    let _second = service.gate_search("dog");

    controller.submit_search("cat");
    assert_eq!(controller.submit_search("dog"), SubmitOutcome::ConfirmationRequired);
    assert_eq!(controller.awaiting_confirmation().map(|q| q.as_str()), Some("dog"));

    assert_eq!(controller.resolve_confirmation(false), Ok(SubmitOutcome::Declined));
    assert!(controller.awaiting_confirmation().is_none());
    assert!(controller.is_searching());

    first.send(Ok(vec![photo("7")])).unwrap();
    pump(&mut controller, &mut rx).await;

    assert_eq!(populated_ids(&controller), Some(vec!["7".to_string()]));
    assert_eq!(controller.result().unwrap().query.as_str(), "cat");
    assert_eq!(service.calls(), vec!["search:cat".to_string()]);
}

#[tokio::test]
async fn test_confirming_cancel_discards_first_search() {
    let (service, mut controller, mut rx) = setup();
    let first = service.gate_search("cat");
    let second = service.gate_search("dog");

    controller.submit_search("cat");
    controller.submit_search("dog");
    assert_eq!(controller.resolve_confirmation(true), Ok(SubmitOutcome::Started));
    assert_eq!(controller.list_entries(), vec![ListEntry::Placeholder(LOADING)]);

    // The first task may already be torn down
    let _ = first.send(Ok(vec![photo("cat-1")]));
    second.send(Ok(vec![photo("dog-1")])).unwrap();

    // One cancellation report and one result
    for _ in 0..2 {
        pump(&mut controller, &mut rx).await;
        assert_ne!(populated_ids(&controller), Some(vec!["cat-1".to_string()]));
    }

    assert_eq!(populated_ids(&controller), Some(vec!["dog-1".to_string()]));
}

#[tokio::test]
async fn test_result_delivered_after_cancel_is_dropped() {
    let (service, mut controller, mut rx) = setup();
    let first = service.gate_search("cat");
    let _second = service.gate_search("dog");

    controller.submit_search("cat");
    first.send(Ok(vec![photo("cat-1")])).unwrap();
    // The first search has finished but its report is still queued
    let stale = rx.recv().await.unwrap();

    assert_eq!(controller.submit_search("dog"), SubmitOutcome::ConfirmationRequired);
    controller.resolve_confirmation(true).unwrap();
    controller.handle(stale);

    assert!(matches!(controller.state(), SearchState::Loading { query } if query.as_str() == "dog"));
    assert!(controller.is_searching());
}

#[tokio::test]
async fn test_resolve_without_prompt() {
    let (_service, mut controller, _rx) = setup();
    assert_eq!(
        controller.resolve_confirmation(true),
        Err(ControllerError::NoPendingConfirmation)
    );
}

#[tokio::test]
async fn test_select_requires_membership() {
    let (service, mut controller, mut rx) = setup();
    assert_eq!(controller.select_photo(0), Err(ControllerError::NotInResult { index: 0 }));

    let gate = service.gate_search("cat");
    controller.submit_search("cat");
    gate.send(Ok(vec![photo("1")])).unwrap();
    pump(&mut controller, &mut rx).await;

    assert_eq!(controller.select_photo(1), Err(ControllerError::NotInResult { index: 1 }));
    assert!(matches!(controller.image(), ImageState::Blank));
    assert_eq!(controller.selected(), None);
}

#[tokio::test]
async fn test_select_photo_displays_image() {
    let (service, mut controller, mut rx) = setup();
    let gate = service.gate_search("cat");
    controller.submit_search("cat");
    gate.send(Ok(vec![photo("1")])).unwrap();
    pump(&mut controller, &mut rx).await;

    let image_gate = service.gate_image("http://farm3.staticflickr.com/2/1_abc.jpg");
    controller.select_photo(0).unwrap();
    assert!(matches!(controller.image(), ImageState::Loading { index: 0 }));

    image_gate.send(Ok(DynamicImage::new_rgb8(4, 2))).unwrap();
    pump(&mut controller, &mut rx).await;

    match controller.image() {
        ImageState::Ready { index, image } => {
            assert_eq!(*index, 0);
            assert_eq!(image.width(), 4);
        }
        other => panic!("expected a ready image, got {:?}", other),
    }
    assert_eq!(controller.selected(), Some(0));
}

#[tokio::test]
async fn test_new_selection_supersedes_pending_image() {
    let (service, mut controller, mut rx) = setup();
    let gate = service.gate_search("cat");
    controller.submit_search("cat");
    gate.send(Ok(vec![photo("1"), photo("2")])).unwrap();
    pump(&mut controller, &mut rx).await;

    let slow = service.gate_image("http://farm3.staticflickr.com/2/1_abc.jpg");
    let fast = service.gate_image("http://farm3.staticflickr.com/2/2_abc.jpg");

    controller.select_photo(0).unwrap();
    controller.select_photo(1).unwrap();
    fast.send(Ok(DynamicImage::new_rgb8(8, 8))).unwrap();
    let _ = slow.send(Ok(DynamicImage::new_rgb8(1, 1)));

    for _ in 0..2 {
        pump(&mut controller, &mut rx).await;
    }

    assert!(matches!(controller.image(), ImageState::Ready { index: 1, .. }));
}

#[tokio::test]
async fn test_image_failure_shows_unavailable() {
    let (service, mut controller, mut rx) = setup();
    let gate = service.gate_search("cat");
    controller.submit_search("cat");
    gate.send(Ok(vec![photo("1")])).unwrap();
    pump(&mut controller, &mut rx).await;

    let image_gate = service.gate_image("http://farm3.staticflickr.com/2/1_abc.jpg");
    controller.select_photo(0).unwrap();
    image_gate
        .send(Err(FetchError::Status(reqwest::StatusCode::NOT_FOUND)))
        .unwrap();
    pump(&mut controller, &mut rx).await;

    assert!(matches!(controller.image(), ImageState::Unavailable { index: 0, .. }));
    assert!(controller.notification().is_none());
}

#[tokio::test]
async fn test_new_search_clears_image() {
    let (service, mut controller, mut rx) = setup();
    let gate = service.gate_search("cat");
    controller.submit_search("cat");
    gate.send(Ok(vec![photo("1")])).unwrap();
    pump(&mut controller, &mut rx).await;

    let image_gate = service.gate_image("http://farm3.staticflickr.com/2/1_abc.jpg");
    controller.select_photo(0).unwrap();
    image_gate.send(Ok(DynamicImage::new_rgb8(2, 2))).unwrap();
    pump(&mut controller, &mut rx).await;

    let _next = service.gate_search("dog");
    assert_eq!(controller.submit_search("dog"), SubmitOutcome::Started);
    assert!(matches!(controller.image(), ImageState::Blank));
    assert_eq!(controller.selected(), None);
}
