//! Scripted server state.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::client::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with this response
    Respond(HttpResponse),
    /// Fail at the transport level (connection refused, timeout...)
    Fail(String),
}

#[derive(Debug, Default)]
struct Routes {
    replies: HashMap<(Method, String), VecDeque<Reply>>,
}

/// Scripted server implementing [`Transport`]
#[derive(Debug, Default)]
pub struct MockServer {
    routes: Mutex<Routes>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `(method, url)`
    pub fn on(&self, method: Method, url: &str, response: HttpResponse) -> &Self {
        self.push(method, url, Reply::Respond(response))
    }

    /// Queue a JSON 200 response for a GET of `url`
    pub fn on_json(&self, url: &str, json: &str) -> &Self {
        self.on(
            Method::Get,
            url,
            HttpResponse::new(200)
                .with_header("content-type", "application/json")
                .with_body(json),
        )
    }

    /// Queue a transport failure for `(method, url)`
    pub fn fail(&self, method: Method, url: &str, message: &str) -> &Self {
        self.push(method, url, Reply::Fail(message.to_string()))
    }

    pub fn push(&self, method: Method, url: &str, reply: Reply) -> &Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes
                .replies
                .entry((method, url.to_string()))
                .or_default()
                .push_back(reply);
        }
        self
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Requests received for one route
    pub fn requests_to(&self, method: Method, url: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url == url)
            .collect()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests_to(method, url).len()
    }

    /// Position of the first request to a route, for ordering assertions
    pub fn first_index(&self, method: Method, url: &str) -> Option<usize> {
        self.requests()
            .iter()
            .position(|r| r.method == method && r.url == url)
    }

    fn next_reply(&self, method: Method, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().ok()?;
        let queue = routes.replies.get_mut(&(method, url.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Transport for MockServer {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.next_reply(request.method, &request.url) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(TransportError::ConnectionFailed(message)),
            None => Ok(HttpResponse::new(404).with_body("Not Found")),
        }
    }
}
