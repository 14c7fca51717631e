//! Scripted transport for tests
//!
//! Replies are queued per route (`"POST upload"`). Every request is recorded,
//! including ones with no scripted reply, which fail as network errors. A
//! reply can be held behind a `Notify` gate to simulate a slow backend.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::transport::{HttpReply, HttpRequest, Transport};
use crate::error::TransportError;

struct Scripted {
    reply: Result<HttpReply, TransportError>,
    gate: Option<Arc<Notify>>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, route: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back(scripted);
    }

    pub fn reply(&self, route: &str, reply: HttpReply) {
        self.push(route, Scripted { reply: Ok(reply), gate: None });
    }

    pub fn fail(&self, route: &str, message: &str) {
        self.push(
            route,
            Scripted {
                reply: Err(TransportError::Network(message.to_string())),
                gate: None,
            },
        );
    }

    /// Queue a reply that is only released after `gate.notify_one()`
    pub fn reply_gated(&self, route: &str, reply: HttpReply) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(
            route,
            Scripted {
                reply: Ok(reply),
                gate: Some(Arc::clone(&gate)),
            },
        );
        gate
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn routes_called(&self) -> Vec<String> {
        self.calls().iter().map(HttpRequest::route).collect()
    }

    pub fn count(&self, route: &str) -> usize {
        self.routes_called().iter().filter(|r| r.as_str() == route).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, TransportError> {
        let route = request.route();
        self.calls.lock().unwrap().push(request);

        let scripted = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(Scripted { reply, gate }) => {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                reply
            }
            None => Err(TransportError::Network(format!("no scripted reply for {}", route))),
        }
    }
}
