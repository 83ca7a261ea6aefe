//! HTTP client for the automation server
//!
//! Split into the transport abstraction and the typed lifecycle calls.

pub mod jenkins;
pub mod transport;

pub use jenkins::{ClientResult, JenkinsClient};
pub use transport::{
    Credentials, HttpRequest, HttpResponse, Method, RawBody, ReqwestTransport, Transport,
    TransportError,
};
