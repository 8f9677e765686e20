pub mod api;
pub mod backend;
pub mod conf;
pub mod core;
pub mod model;
pub mod plan;
pub mod report;
pub mod service;
pub mod stats;

#[cfg(feature = "testutil")]
pub mod testutil;
