pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod format;
pub mod storage;
pub mod store;
pub mod validation;

mod integration_tests;
