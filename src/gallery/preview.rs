//! Full-size preview overlay
//!
//! Images and videos render straight from their URL. Audio is drawn by a
//! waveform widget, which owns resources and must be released when the
//! overlay closes.

use crate::gallery::media::{MediaItem, MediaType};

/// Appearance of the audio waveform
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformStyle {
    pub wave_color: &'static str,
    pub progress_color: &'static str,
    pub cursor_color: &'static str,
    pub bar_width: u32,
    pub bar_radius: u32,
    pub height: u32,
    pub responsive: bool,
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self {
            wave_color: "#4F46E5",
            progress_color: "#818CF8",
            cursor_color: "#C7D2FE",
            bar_width: 2,
            bar_radius: 3,
            height: 100,
            responsive: true,
        }
    }
}

/// A waveform rendering widget
pub trait WaveformWidget: Send {
    /// Start loading the audio at `url`
    fn load(&mut self, url: &str);

    /// Release everything the widget holds. Called exactly once.
    fn destroy(&mut self);

    /// Render for display
    fn render(&self) -> String;
}

/// Builds waveform widgets
pub trait WaveformFactory: Send + Sync {
    fn create(&self, style: &WaveformStyle) -> Box<dyn WaveformWidget>;
}

/// What the overlay shows
pub enum PreviewContent {
    Image { url: String },
    Video { url: String, controls: bool },
    Audio { waveform: Box<dyn WaveformWidget> },
}

impl std::fmt::Debug for PreviewContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviewContent::Image { url } => f.debug_struct("Image").field("url", url).finish(),
            PreviewContent::Video { url, controls } => f
                .debug_struct("Video")
                .field("url", url)
                .field("controls", controls)
                .finish(),
            PreviewContent::Audio { .. } => f.write_str("Audio { .. }"),
        }
    }
}

#[derive(Debug)]
pub struct PreviewOverlay {
    item: MediaItem,
    content: PreviewContent,
    released: bool,
}

impl PreviewOverlay {
    /// Open an overlay for `item`
    pub fn open(item: MediaItem, waveforms: &dyn WaveformFactory) -> Self {
        let content = match item.media_type {
            MediaType::Image => PreviewContent::Image {
                url: item.url.clone(),
            },
            MediaType::Video => PreviewContent::Video {
                url: item.url.clone(),
                controls: true,
            },
            MediaType::Audio => {
                let mut waveform = waveforms.create(&WaveformStyle::default());
                waveform.load(&item.url);
                PreviewContent::Audio { waveform }
            }
        };
        tracing::debug!("Preview opened for {} ({})", item.name, item.media_type);

        Self {
            item,
            content,
            released: false,
        }
    }

    pub fn item(&self) -> &MediaItem {
        &self.item
    }

    pub fn content(&self) -> &PreviewContent {
        &self.content
    }

    /// Close the overlay and release its widget
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let PreviewContent::Audio { waveform } = &mut self.content {
            waveform.destroy();
        }
        tracing::debug!("Preview closed for {}", self.item.name);
    }
}

impl Drop for PreviewOverlay {
    fn drop(&mut self) {
        self.release();
    }
}
