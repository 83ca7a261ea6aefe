//! Mock Server Implementation
//!
//! A scripted, in-process stand-in for the automation server. Tests queue
//! responses per route and read back every request the client sent.
//!
//! # Routes
//!
//! A route is `(method, url)` with the query string excluded. Each route
//! holds a FIFO of scripted replies; the last reply is sticky and keeps
//! being served once the queue drains. Unscripted routes answer 404.

mod server;

pub use server::{MockServer, Reply};
