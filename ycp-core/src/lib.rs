#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod comment_log;
pub mod config;
pub mod context;
pub mod events;
pub mod framework;
pub mod processors;
pub mod sink;
pub mod sources;
pub mod store;
pub mod utils;
