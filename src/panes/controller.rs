use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use flume::{Receiver, TryRecvError};
use log::{debug, info, warn};

use crate::parsing::Document;
use crate::wiki_client::{DocumentSource, FetchError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneStatus {
    Pending,
    Ready(Arc<Document>),
    Failed(FetchError),
}

impl PaneStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, PaneStatus::Pending)
    }

    pub fn document(&self) -> Option<&Arc<Document>> {
        match self {
            PaneStatus::Ready(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Fetch lifecycle of one open title.
///
/// The fetch starts as soon as the controller is created and runs on its own
/// thread, so panes load independently of each other. A failed fetch is not
/// retried; closing and reopening the pane creates a new controller.
///
/// Dropping the controller cancels it: the worker still finishes the request
/// it is blocked on, but it skips parsing and throws the result away.
pub struct PaneController {
    title: String,
    status: PaneStatus,
    /// Bumped each time `status` changes, for views that cache renders
    generation: u64,
    response_rx: Option<Receiver<Result<Document, FetchError>>>,
    cancelled: Arc<AtomicBool>,
}

impl PaneController {
    pub fn spawn(title: impl Into<String>, source: Arc<dyn DocumentSource>) -> Self {
        let title = title.into();
        let (response_tx, response_rx) = flume::bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_title = title.clone();
        let worker_cancelled = Arc::clone(&cancelled);
        std::thread::spawn(move || {
            let result = source.fetch_html(&worker_title);
            if worker_cancelled.load(Ordering::Acquire) {
                debug!("Discarding fetch result for closed pane {worker_title:?}");
                return;
            }
            let result = result.map(|html| Document::parse(&html));
            // The receiver is gone when the pane closed mid-parse
            let _ = response_tx.send(result);
        });

        info!("Started fetch for {title:?}");
        Self {
            title,
            status: PaneStatus::Pending,
            generation: 0,
            response_rx: Some(response_rx),
            cancelled,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> &PaneStatus {
        &self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Picks up a finished fetch, if any. Returns true when the status changed.
    pub fn poll(&mut self) -> bool {
        let Some(rx) = &self.response_rx else {
            return false;
        };

        let next = match rx.try_recv() {
            Ok(Ok(doc)) => {
                info!("Loaded {:?} ({:?})", self.title, doc.title);
                PaneStatus::Ready(Arc::new(doc))
            }
            Ok(Err(e)) => {
                warn!("Fetch for {:?} failed: {}", self.title, e.detail());
                PaneStatus::Failed(e)
            }
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                PaneStatus::Failed(FetchError::transport("fetch worker exited"))
            }
        };

        self.status = next;
        self.generation += 1;
        self.response_rx = None;
        true
    }
}

impl Drop for PaneController {
    fn drop(&mut self) {
        if self.status.is_pending() {
            debug!("Cancelling in-flight fetch for {:?}", self.title);
        }
        self.cancelled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    struct StaticSource(Result<String, FetchError>);

    impl DocumentSource for StaticSource {
        fn fetch_html(&self, _title: &str) -> Result<String, FetchError> {
            self.0.clone()
        }
    }

    struct CountingSource(Mutex<Vec<String>>);

    impl DocumentSource for CountingSource {
        fn fetch_html(&self, title: &str) -> Result<String, FetchError> {
            self.0.lock().unwrap().push(title.to_string());
            Ok(String::new())
        }
    }

    fn wait_settled(controller: &mut PaneController) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !controller.poll() {
            assert!(Instant::now() < deadline, "fetch never completed");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn starts_pending_then_ready() {
        let source = Arc::new(StaticSource(Ok(
            "<html><head><title>Cat</title></head><body><p>Meow</p></body></html>".to_string(),
        )));
        let mut controller = PaneController::spawn("Cat", source);
        assert_eq!(controller.generation(), 0);

        wait_settled(&mut controller);

        let doc = controller.status().document().unwrap();
        assert_eq!(doc.title, "Cat");
        assert_eq!(controller.generation(), 1);
        assert!(!controller.poll());
    }

    #[test]
    fn failure_is_kept() {
        let source = Arc::new(StaticSource(Err(FetchError::Status { status: 404 })));
        let mut controller = PaneController::spawn("Nope", source);

        wait_settled(&mut controller);

        assert_eq!(
            controller.status(),
            &PaneStatus::Failed(FetchError::Status { status: 404 })
        );
        assert!(!controller.poll());
    }

    #[test]
    fn fetches_exactly_once() {
        let source = Arc::new(CountingSource(Mutex::new(Vec::new())));
        let mut controller = PaneController::spawn("Cat", source.clone());
        wait_settled(&mut controller);
        for _ in 0..3 {
            controller.poll();
        }

        assert_eq!(*source.0.lock().unwrap(), ["Cat"]);
    }
}
