//! Scripted panel transport for tests.
//!
//! Replies are queued per (method, path). Each request consumes the next
//! queued reply; the last one repeats once the queue is down to one entry.
//! Requests to unscripted paths get a 404.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::panel::transport::{PanelMethod, PanelRequest, PanelResponse, PanelTransport, TransportError};

type Reply = Result<PanelResponse, TransportError>;

#[derive(Default)]
struct MockState {
    replies: HashMap<(PanelMethod, String), VecDeque<Reply>>,
    calls: Vec<PanelRequest>,
}

/// Mock transport that records every request.
///
/// # Example
/// ```ignore
/// let mock = MockTransport::new();
/// mock.respond(PanelMethod::Get, "/system/partitions-1/state", 200, r#"{"state":"unset"}"#);
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply for `method path`.
    pub fn push(&self, method: PanelMethod, path: &str, reply: Reply) {
        self.lock()
            .replies
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Queue an HTTP response.
    pub fn respond(&self, method: PanelMethod, path: &str, status: u16, body: &str) {
        self.push(method, path, Ok(PanelResponse::new(status, body)));
    }

    /// Queue a transport failure.
    pub fn fail(&self, method: PanelMethod, path: &str, error: TransportError) {
        self.push(method, path, Err(error));
    }

    /// Drop all queued replies; recorded calls are kept.
    pub fn clear_replies(&self) {
        self.lock().replies.clear();
    }

    pub fn calls(&self) -> Vec<PanelRequest> {
        self.lock().calls.clone()
    }

    /// Number of requests made to `method path`.
    pub fn count(&self, method: PanelMethod, path: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }
}

#[async_trait]
impl PanelTransport for MockTransport {
    async fn send(&self, request: &PanelRequest) -> Result<PanelResponse, TransportError> {
        let mut state = self.lock();
        state.calls.push(request.clone());

        let key = (request.method, request.path.clone());
        match state.replies.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Ok(PanelResponse::new(404, ""))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(PanelResponse::new(404, ""))),
            None => Ok(PanelResponse::new(404, "")),
        }
    }
}
