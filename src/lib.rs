// Library exports for triptych
// The binary and the integration tests both build on these modules

pub mod auth;
pub mod commerce;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod flash;
pub mod network;
pub mod pagination;
pub mod routes;
pub mod server;
pub mod state;
pub mod time;
pub mod wiki;
