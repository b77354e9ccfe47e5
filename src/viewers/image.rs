//! Image preview for PNG, JPG, GIF rendered as a terminal thumbnail

use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Brightness ramp, darkest first
const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f64 = 2.0;

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
}

impl ImageType {
    /// Detect image type from file extension
    pub fn from_extension(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".png") {
            Some(ImageType::Png)
        } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            Some(ImageType::Jpeg)
        } else if lower.ends_with(".gif") {
            Some(ImageType::Gif)
        } else {
            None
        }
    }

    fn to_image_format(self) -> ImageFormat {
        match self {
            ImageType::Png => ImageFormat::Png,
            ImageType::Jpeg => ImageFormat::Jpeg,
            ImageType::Gif => ImageFormat::Gif,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Png => "PNG",
            ImageType::Jpeg => "JPEG",
            ImageType::Gif => "GIF",
        }
    }
}

/// A decoded image ready for display
#[derive(Debug, Clone)]
pub struct ImagePreview {
    pub width: u32,
    pub height: u32,
    pub file_size: usize,
    pub format: ImageType,
    /// Thumbnail rows, one string per terminal line
    pub thumbnail: Vec<String>,
}

impl ImagePreview {
    /// One-line summary: `PNG 640x480, 12.3 KB`
    pub fn summary(&self) -> String {
        format!(
            "{} {}x{}, {}",
            self.format.as_str(),
            self.width,
            self.height,
            format_file_size(self.file_size)
        )
    }
}

/// Decodes images and renders terminal thumbnails
pub struct ImageViewer {
    max_columns: u32,
    max_rows: u32,
}

impl ImageViewer {
    /// Create a viewer whose thumbnails fit in `max_columns` x `max_rows` cells
    pub fn new(max_columns: u32, max_rows: u32) -> Self {
        Self {
            max_columns: max_columns.max(1),
            max_rows: max_rows.max(1),
        }
    }

    /// Load image from raw bytes with format hint from filename
    pub fn load_bytes(&self, data: &[u8], filename: &str) -> Result<ImagePreview> {
        let format = ImageType::from_extension(filename)
            .ok_or_else(|| anyhow!("Unsupported image format for file: {}", filename))?;

        let img = image::load(Cursor::new(data), format.to_image_format())
            .map_err(|e| anyhow!("Failed to decode image: {}", e))?;

        Ok(ImagePreview {
            width: img.width(),
            height: img.height(),
            file_size: data.len(),
            format,
            thumbnail: self.thumbnail(&img),
        })
    }

    fn thumbnail(&self, img: &DynamicImage) -> Vec<String> {
        // Squash vertically so the thumbnail keeps its proportions in cells
        let cell_height = ((img.height() as f64 / CELL_ASPECT).round() as u32).max(1);
        let squashed = img.resize_exact(img.width().max(1), cell_height, image::imageops::FilterType::Nearest);
        let fitted = Self::scale_to_fit(&squashed, self.max_columns, self.max_rows);

        let luma = fitted.to_luma8();
        luma.rows()
            .map(|row| {
                row.map(|pixel| {
                    let idx = pixel.0[0] as usize * (ASCII_RAMP.len() - 1) / 255;
                    ASCII_RAMP[idx] as char
                })
                .collect()
            })
            .collect()
    }

    /// Scale image to fit within max dimensions while preserving aspect ratio
    pub fn scale_to_fit(img: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
        let (orig_width, orig_height) = (img.width(), img.height());

        if orig_width <= max_width && orig_height <= max_height {
            return img.clone();
        }

        let width_ratio = max_width as f64 / orig_width as f64;
        let height_ratio = max_height as f64 / orig_height as f64;
        let scale = width_ratio.min(height_ratio);

        let new_width = ((orig_width as f64 * scale) as u32).max(1);
        let new_height = ((orig_height as f64 * scale) as u32).max(1);

        img.resize_exact(new_width, new_height, image::imageops::FilterType::Nearest)
    }
}

impl Default for ImageViewer {
    fn default() -> Self {
        Self::new(64, 24)
    }
}

/// Format file size for display
pub fn format_file_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
