//! # ubox-repo
//!
//! The on-disk repository managed by ubox: a root directory holding image
//! metadata, layers, containers and provisioned tooling.

pub mod containers;
pub mod images;
pub mod repository;

pub use containers::{ContainerEntry, ContainerMetadata};
pub use images::ImageEntry;
pub use repository::LocalRepository;
