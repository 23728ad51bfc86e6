//! Test doubles shared by the module tests.

use crate::api::{ApiRequest, ApiResponse, Transport};
use crate::models::{Session, UserSummary};
use crate::session::{SessionStore, TOKEN_KEY, USER_KEY};
use crate::storage::{KeyValueStore, MemoryStore};
use anyhow::anyhow;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

enum Scripted {
    Reply(ApiResponse),
    Fail(String),
}

type Hook = Box<dyn Fn(&ApiRequest)>;

/// Replays queued responses in order and records every request it receives.
#[derive(Clone, Default)]
pub struct MockTransport {
    queue: Rc<RefCell<VecDeque<Scripted>>>,
    sent: Rc<RefCell<Vec<ApiRequest>>>,
    on_send: Rc<RefCell<Option<Hook>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: Value) {
        self.queue.borrow_mut().push_back(Scripted::Reply(ApiResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn respond_empty(&self, status: u16) {
        self.queue.borrow_mut().push_back(Scripted::Reply(ApiResponse {
            status,
            body: String::new(),
        }));
    }

    pub fn fail(&self, message: &str) {
        self.queue
            .borrow_mut()
            .push_back(Scripted::Fail(message.to_string()));
    }

    /// Run `hook` while each request is "in flight", e.g. to navigate away.
    pub fn on_send(&self, hook: impl Fn(&ApiRequest) + 'static) {
        *self.on_send.borrow_mut() = Some(Box::new(hook));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.sent.borrow().clone()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.sent.borrow().last().and_then(|r| r.body.clone())
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse> {
        self.sent.borrow_mut().push(request.clone());
        if let Some(hook) = self.on_send.borrow().as_ref() {
            hook(request);
        }
        match self.queue.borrow_mut().pop_front() {
            Some(Scripted::Reply(resp)) => Ok(resp),
            Some(Scripted::Fail(msg)) => Err(anyhow!("{}", msg)),
            None => Err(anyhow!("no scripted response for {}", request.path)),
        }
    }
}

pub fn sample_session() -> Session {
    Session {
        token: "jwt-123".to_string(),
        user: UserSummary {
            id: Some(1),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
        },
    }
}

pub fn anonymous_store() -> Rc<SessionStore> {
    Rc::new(SessionStore::open(Box::new(MemoryStore::new())))
}

pub fn authenticated_store() -> Rc<SessionStore> {
    let store = anonymous_store();
    store.set(sample_session()).unwrap();
    store
}

/// Serves a persisted session but refuses every write, like a read-only disk.
pub struct ReadOnlyStore {
    entries: HashMap<String, String>,
}

impl ReadOnlyStore {
    pub fn with_session(session: &Session) -> Self {
        let mut entries = HashMap::new();
        entries.insert(TOKEN_KEY.to_string(), session.token.clone());
        entries.insert(
            USER_KEY.to_string(),
            serde_json::to_string(&session.user).unwrap(),
        );
        Self { entries }
    }
}

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
        Err(anyhow!("read-only file system"))
    }

    fn remove(&self, _key: &str) -> anyhow::Result<()> {
        Err(anyhow!("read-only file system"))
    }
}
