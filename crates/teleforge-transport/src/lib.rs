//! HTTP plumbing for teleforge bots: a reqwest-backed [`Transport`]
//! implementation and a long-polling update source.
//!
//! [`Transport`]: teleforge_core::Transport

pub mod http;
pub mod polling;

pub use http::HttpTransport;
pub use polling::LongPoller;
