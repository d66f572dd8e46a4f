//! Transport double that replays a fixed script of outcomes.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{HeaderMap, HttpRequest, HttpResponse, Transport, TransportError};

pub(crate) enum Step {
    Status(u16, &'static str),
    Fail,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    pub(crate) seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Status(200, "{}"));
        match step {
            Step::Status(status, body) => Ok(HttpResponse {
                status,
                headers: HeaderMap::new(),
                body: body.as_bytes().to_vec(),
            }),
            Step::Fail => Err(TransportError::Connect("connection reset".into())),
        }
    }
}
