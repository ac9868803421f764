pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod notify;
pub mod observability;
pub mod route;
pub mod session;
pub mod state;
