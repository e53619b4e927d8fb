//! Core recipebox library (session, API access, resource clients, config).

pub mod app;
pub mod config;
pub mod events;
pub mod http;
pub mod logging;
pub mod preferences;
pub mod resources;
pub mod session;
pub mod storage;
pub mod view;
