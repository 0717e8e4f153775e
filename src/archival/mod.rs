pub mod coordinator;
pub mod downloader;
pub mod platform;
pub mod render;

pub use coordinator::{ArchivalConfig, ArchivalCoordinator};
