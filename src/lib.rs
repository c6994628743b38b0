pub mod api;
pub mod batch;
pub mod config;
pub mod domain;
pub mod export;
pub mod ui;
