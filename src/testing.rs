//! Mock implementations for testing
//!
//! These mocks let the orchestrator and adapter be exercised without a
//! database or a network.

use crate::invoke::{
    Invocation, InvokeError, Invoker, PayloadEncoding, RemoteReply, ResponseMeta,
    TransitionTransport,
};
use crate::policy::{TransitionRequest, TransitionResult};
use crate::session_key::SessionKey;
use crate::store::{Session, SessionStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Transport
// ============================================================================

/// Transport that returns queued replies
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<RemoteReply, InvokeError>>>,
    requests: Mutex<Vec<TransitionRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_reply(&self, reply: RemoteReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_error(&self, error: InvokeError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<TransitionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransitionTransport for MockTransport {
    async fn send(&self, request: &TransitionRequest) -> Result<RemoteReply, InvokeError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InvokeError::connect("No mock reply queued")))
    }

    fn target(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Mock Invoker
// ============================================================================

/// One recorded call to [`MockInvoker`]
#[derive(Debug, Clone)]
pub struct InvokeCall {
    pub key: SessionKey,
    pub current_stage: String,
    pub message: String,
}

/// Invoker that returns queued outcomes
pub struct MockInvoker {
    outcomes: Mutex<VecDeque<Result<Invocation, InvokeError>>>,
    calls: Mutex<Vec<InvokeCall>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful transition to `next_stage`
    pub fn queue_result(&self, next_stage: &str) {
        let invocation = Invocation {
            result: TransitionResult {
                next_stage: next_stage.to_string(),
                assistant_message: format!("Now at {next_stage}"),
                updated_state: BTreeMap::new(),
                ui_hints: json!({}),
            },
            meta: ResponseMeta {
                status: Some(200),
                field: "payload",
                encoding: PayloadEncoding::Structured,
                attempts: 1,
            },
        };
        self.outcomes.lock().unwrap().push_back(Ok(invocation));
    }

    pub fn queue_error(&self, error: InvokeError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_calls(&self) -> Vec<InvokeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Invoker for MockInvoker {
    async fn invoke(
        &self,
        key: &SessionKey,
        current_stage: &str,
        message: &str,
    ) -> Result<Invocation, InvokeError> {
        self.calls.lock().unwrap().push(InvokeCall {
            key: key.clone(),
            current_stage: current_stage.to_string(),
            message: message.to_string(),
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InvokeError::connect("No mock invocation queued")))
    }
}

// ============================================================================
// Mock Store
// ============================================================================

/// Failure injected into [`MockStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    NotFound,
    Backend,
}

impl StoreFault {
    fn to_error(self, key: &SessionKey) -> StoreError {
        match self {
            Self::NotFound => StoreError::NotFound(key.short().to_string()),
            Self::Backend => StoreError::Io(std::io::Error::other("mock store unavailable")),
        }
    }
}

/// One recorded write to [`MockStore`]
#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub key: SessionKey,
    pub stage: String,
    pub extra: BTreeMap<String, String>,
}

/// In-memory store that records traffic and can be told to fail
pub struct MockStore {
    sessions: Mutex<HashMap<SessionKey, Session>>,
    puts: Mutex<Vec<RecordedPut>>,
    get_calls: AtomicUsize,
    get_fault: Mutex<Option<StoreFault>>,
    put_fault: Mutex<Option<StoreFault>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            puts: Mutex::new(Vec::new()),
            get_calls: AtomicUsize::new(0),
            get_fault: Mutex::new(None),
            put_fault: Mutex::new(None),
        }
    }

    /// Preload a session at `stage`
    pub fn seed(&self, key: &SessionKey, stage: &str) {
        self.sessions.lock().unwrap().insert(
            key.clone(),
            Session {
                key: key.as_str().to_string(),
                stage: stage.to_string(),
                extra: BTreeMap::new(),
                updated_at: Utc::now(),
                environment: "test".to_string(),
            },
        );
    }

    pub fn fail_get(&self, fault: StoreFault) {
        *self.get_fault.lock().unwrap() = Some(fault);
    }

    pub fn fail_put(&self, fault: StoreFault) {
        *self.put_fault.lock().unwrap() = Some(fault);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn recorded_puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MockStore {
    async fn get(&self, key: &SessionKey) -> StoreResult<Option<Session>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = *self.get_fault.lock().unwrap() {
            return Err(fault.to_error(key));
        }
        Ok(self.sessions.lock().unwrap().get(key).cloned())
    }

    async fn put(
        &self,
        key: &SessionKey,
        stage: &str,
        extra: &BTreeMap<String, String>,
    ) -> StoreResult<()> {
        if let Some(fault) = *self.put_fault.lock().unwrap() {
            return Err(fault.to_error(key));
        }
        self.puts.lock().unwrap().push(RecordedPut {
            key: key.clone(),
            stage: stage.to_string(),
            extra: extra.clone(),
        });
        self.sessions.lock().unwrap().insert(
            key.clone(),
            Session {
                key: key.as_str().to_string(),
                stage: stage.to_string(),
                extra: extra.clone(),
                updated_at: Utc::now(),
                environment: "test".to_string(),
            },
        );
        Ok(())
    }
}
