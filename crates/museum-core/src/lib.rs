//! Museum Core - Foundational types for the museum workspace
//!
//! This crate provides the types every other museum crate depends on:
//! - `NodeId` - Stable scene node identifiers
//! - `ContentHash` - SHA-256 based content hashing
//! - `AssetHandle` - Reference-counted handle to a materialised image
//! - `Color` - RGBA colour
//! - Error types and Result alias

mod asset;
mod error;
mod hash;
mod id;
mod types;

pub use asset::AssetHandle;
pub use error::{MuseumError, Result, ServiceFailure, Stage};
pub use hash::ContentHash;
pub use id::NodeId;
pub use types::Color;
