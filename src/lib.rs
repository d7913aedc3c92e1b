pub mod api;
pub mod backend;
pub mod config;
pub mod confirmation;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod model;
pub mod selectors;
pub mod shutdown;
pub mod store;
