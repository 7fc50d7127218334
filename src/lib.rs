// Library exports for Warble
// This allows integration tests and the binary to share the service modules

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod gateway;
pub mod graph;
pub mod identity;
pub mod likes;
pub mod media;
pub mod routes;
pub mod state;
pub mod storage;
pub mod tweets;
