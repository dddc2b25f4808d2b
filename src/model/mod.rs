//! Model module - Library data types and the remote library
//!
//! This module contains the data structures and the Spotify-facing side of
//! the application. It is organized into submodules by responsibility:
//!
//! - `types`: Resource kinds, resources, pages and credentials
//! - `pagination`: Page number to offset/limit conversion
//! - `error`: Failures reported by the remote library
//! - `library`: The `RemoteLibrary` contract used by the controllers
//! - `cache`: Per-user snapshot cache
//! - `spotify_client`: rspotify-backed `RemoteLibrary`

mod types;
pub mod pagination;
mod error;
mod library;
mod cache;
mod spotify_client;

// Re-export all public types for convenient access
pub use types::{Credential, PageResult, Playlist, Resource, ResourceKind};
#[cfg(test)]
pub use types::Episode;

pub use error::LibraryError;
#[cfg(test)]
pub use error::LibraryResult;

pub use library::RemoteLibrary;

pub use cache::LibraryCache;

pub use spotify_client::SpotifyLibrary;
