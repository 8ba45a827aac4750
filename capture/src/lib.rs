pub mod config;
pub mod dom;
pub mod error;
pub mod extract;
pub mod inject;
pub mod platform;
pub mod queue;
pub mod service;
pub mod session;
pub mod store;
pub mod summarize;
pub mod usage;
