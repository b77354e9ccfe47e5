//! Media Gallery Library
//!
//! Core of the media gallery client: hosted-backend providers, the
//! gallery flow built on top of them, and terminal renderers.
//! The binary only adds the interactive shell.

pub mod backend;
pub mod error;
pub mod gallery;
pub mod notify;
pub mod settings;
pub mod viewers;

pub use error::GalleryError;
