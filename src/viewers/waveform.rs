//! Text waveform widget for the terminal front end
//!
//! Audio decoding is out of scope, so this widget draws a fixed track of
//! bars sized from the style and labels it with the loaded source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::gallery::preview::{WaveformFactory, WaveformStyle, WaveformWidget};

/// Terminal rows per 100 style pixels
const ROWS_PER_100PX: u32 = 3;

/// Track width in bars
const TRACK_BARS: usize = 48;

pub struct TextWaveform {
    rows: u32,
    source: Option<String>,
    destroyed: bool,
    live: Arc<AtomicUsize>,
}

impl WaveformWidget for TextWaveform {
    fn load(&mut self, url: &str) {
        tracing::debug!("Waveform loading {}", url);
        self.source = Some(url.to_string());
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.source = None;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn render(&self) -> String {
        let Some(source) = &self.source else {
            return String::from("(no audio loaded)");
        };
        let mut lines: Vec<String> = (0..self.rows).map(|_| "▮".repeat(TRACK_BARS)).collect();
        lines.push(format!("♫ {}", source));
        lines.join("\n")
    }
}

impl Drop for TextWaveform {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Creates [`TextWaveform`] widgets and tracks how many are alive
#[derive(Debug, Clone, Default)]
pub struct TextWaveforms {
    live: Arc<AtomicUsize>,
}

impl TextWaveforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widgets created and not yet destroyed
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl WaveformFactory for TextWaveforms {
    fn create(&self, style: &WaveformStyle) -> Box<dyn WaveformWidget> {
        self.live.fetch_add(1, Ordering::SeqCst);
        Box::new(TextWaveform {
            rows: (style.height * ROWS_PER_100PX / 100).max(1),
            source: None,
            destroyed: false,
            live: self.live.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_after_load() {
        let factory = TextWaveforms::new();
        let mut widget = factory.create(&WaveformStyle::default());
        widget.load("memory://media/a.mp3");

        let rendered = widget.render();
        assert_eq!(rendered.lines().count(), 4);
        assert!(rendered.ends_with("♫ memory://media/a.mp3"));
    }

    #[test]
    fn test_destroy_is_idempotent_and_tracked() {
        let factory = TextWaveforms::new();
        let mut widget = factory.create(&WaveformStyle::default());
        assert_eq!(factory.live(), 1);

        widget.destroy();
        widget.destroy();
        assert_eq!(factory.live(), 0);
        assert_eq!(widget.render(), "(no audio loaded)");

        drop(widget);
        assert_eq!(factory.live(), 0);
    }
}
