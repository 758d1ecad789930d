//! State module for tracking crawl progress
//!
//! `RequestState` tracks each crawl request from queueing to its terminal
//! outcome; the final state of every request is recorded in storage.

mod request_state;

pub use request_state::RequestState;
