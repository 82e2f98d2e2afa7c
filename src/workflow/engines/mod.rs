//! Concrete [`CandidateEngine`](crate::workflow::engine::CandidateEngine)
//! implementations.

pub mod http;

pub use http::HttpEngine;
