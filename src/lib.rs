pub mod archival;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ingress;
pub mod resubscribe;
pub mod schedule;
pub mod sinks;
