//! Asset generator gateway.
//!
//! Uniform interface over pluggable media-generation backends (text to
//! speech, image synthesis, subtitle text). Backends return raw content;
//! the gateway persists it through the [`ContentStore`] and hands back an
//! [`reelgen_models::AssetRef`] so job records stay small.

pub mod error;
pub mod gateway;
pub mod store;

pub use error::{GenerationError, GenerationResult};
pub use gateway::{AssetBackend, AssetGateway, GenerateOptions, GeneratedContent};
pub use store::ContentStore;
