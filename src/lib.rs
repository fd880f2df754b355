// Tip ledger API: deposit lifecycle, persistence and HTTP query layer

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
