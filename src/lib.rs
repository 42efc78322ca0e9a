//! pagecore: the dispatch-and-registry core of a small web framework.
//!
//! It defines the adapter registry, namespaced session and cookie storage,
//! the page and REST API routers, and the per-request orchestration tying
//! them together.

pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod demo;
pub mod logging;
pub mod orchestration;
pub mod storage;
pub mod utils;
pub mod web;
