//! Terminal renderers for previewed media

pub mod image;
pub mod waveform;

pub use image::{ImagePreview, ImageViewer};
pub use waveform::{TextWaveform, TextWaveforms};
