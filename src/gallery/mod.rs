//! Client-side gallery flow
//!
//! - [`session::SessionGate`] - observable session state
//! - [`auth_form::AuthForm`] - sign-in / sign-up
//! - [`uploader::Uploader`] - drop target and upload
//! - [`lister::Gallery`] - listing and deletion
//! - [`preview::PreviewOverlay`] - full-size preview
//! - [`controller::GalleryController`] - composition and view state

pub mod auth_form;
pub mod controller;
pub mod lifetime;
pub mod lister;
pub mod media;
pub mod preview;
pub mod session;
pub mod uploader;

pub use auth_form::{AuthForm, AuthMode, SubmitOutcome};
pub use controller::{GalleryController, Providers, View};
pub use lister::Gallery;
pub use media::{classify, MediaItem, MediaType, FALLBACK_MEDIA_TYPE};
pub use preview::{PreviewContent, PreviewOverlay, WaveformFactory, WaveformStyle, WaveformWidget};
pub use session::SessionGate;
pub use uploader::{DroppedFile, UploadOutcome, Uploader};
