//! Screenshots, PDF output and diagnostic snapshots.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde_json::Value;
use tracing::debug;

use crate::browser::{ConsoleMessage, Rect, Snapshot};
use crate::error::{Error, Result};
use crate::protocol::{Command, PageCommand, Viewport, get_path_str};

use super::Driver;

// ============================================================================
// Types
// ============================================================================

/// Image format for screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// JPEG with quality (0-100).
    Jpeg(u8),
}

impl ImageFormat {
    /// PNG format.
    #[inline]
    #[must_use]
    pub fn png() -> Self {
        Self::Png
    }

    /// JPEG format, quality clamped to 100.
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.min(100))
    }

    /// MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg(_) => "image/jpeg",
        }
    }

    /// File extension.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpg",
        }
    }

    fn format_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpeg",
        }
    }

    fn quality(&self) -> Option<u8> {
        match self {
            Self::Png => None,
            Self::Jpeg(q) => Some(*q),
        }
    }

    /// Format implied by a file extension; unknown extensions give PNG.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("jpg" | "jpeg") => Self::jpeg(85),
            _ => Self::Png,
        }
    }
}

// ============================================================================
// ScreenshotBuilder
// ============================================================================

/// Configures and captures a screenshot via `Page.captureScreenshot`.
///
/// ```ignore
/// let png = driver.screenshot().capture().await?;
/// driver.screenshot().jpeg(80).save("page.jpg").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ScreenshotBuilder<'a> {
    driver: &'a Driver,
    format: ImageFormat,
    clip: Option<Viewport>,
}

impl<'a> ScreenshotBuilder<'a> {
    pub(crate) fn new(driver: &'a Driver) -> Self {
        Self {
            driver,
            format: ImageFormat::Png,
            clip: None,
        }
    }

    /// PNG output (default).
    #[must_use]
    pub fn png(mut self) -> Self {
        self.format = ImageFormat::Png;
        self
    }

    /// JPEG output with quality (0-100).
    #[must_use]
    pub fn jpeg(mut self, quality: u8) -> Self {
        self.format = ImageFormat::jpeg(quality);
        self
    }

    /// Sets the image format.
    #[must_use]
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Captures only `rect`, in page coordinates.
    #[must_use]
    pub fn clip(mut self, rect: Rect) -> Self {
        self.clip = Some(Viewport {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            scale: 1.0,
        });
        self
    }

    /// Captures and returns base64 data.
    pub async fn capture(&self) -> Result<String> {
        debug!(format = ?self.format, clipped = self.clip.is_some(), "Capturing screenshot");

        let reply = self
            .driver
            .execute(Command::Page(PageCommand::CaptureScreenshot {
                format: self.format.format_str().to_string(),
                quality: self.format.quality(),
                clip: self.clip,
                capture_beyond_viewport: self.clip.map(|_| true),
            }))
            .await?;

        get_path_str(&reply, "data")
            .map(str::to_string)
            .ok_or_else(|| Error::script(format!("screenshot reply has no data: {reply}")))
    }

    /// Captures and returns raw image bytes.
    pub async fn capture_bytes(&self) -> Result<Vec<u8>> {
        decode(&self.capture().await?)
    }

    /// Captures and writes to `path`. The builder's format wins over the
    /// file extension.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.capture_bytes().await?;
        tokio::fs::write(path.as_ref(), bytes).await?;
        Ok(())
    }
}

fn decode(data: &str) -> Result<Vec<u8>> {
    Ok(Base64Standard.decode(data)?)
}

// ============================================================================
// Driver - Screenshot
// ============================================================================

impl Driver {
    /// Screenshot builder for the viewport.
    #[must_use]
    pub fn screenshot(&self) -> ScreenshotBuilder<'_> {
        ScreenshotBuilder::new(self)
    }

    /// Saves a screenshot, picking the format from the extension.
    pub async fn save_screenshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.screenshot()
            .format(ImageFormat::from_path(path))
            .save(path)
            .await
    }

    /// Prints the page to PDF.
    ///
    /// `options` are `Page.printToPDF` parameters such as `landscape` or
    /// `printBackground`; pass `Value::Null` for defaults.
    pub async fn pdf(&self, options: Value) -> Result<Vec<u8>> {
        let params = match options {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let reply = self
            .execute(Command::Page(PageCommand::PrintToPdf(params)))
            .await?;
        let data = get_path_str(&reply, "data")
            .ok_or_else(|| Error::script("printToPDF reply has no data"))?;
        decode(data)
    }
}

// ============================================================================
// Driver - Inspector
// ============================================================================

impl Driver {
    /// URL, title, console and a viewport screenshot.
    ///
    /// A failed screenshot leaves `screenshot_base64` empty rather than
    /// failing the snapshot.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let screenshot = match self.screenshot().capture().await {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(error = %e, "Snapshot without screenshot");
                None
            }
        };
        self.build_snapshot(screenshot).await
    }

    /// [`snapshot`](Driver::snapshot) without the screenshot.
    pub async fn snapshot_light(&self) -> Result<Snapshot> {
        self.build_snapshot(None).await
    }

    async fn build_snapshot(&self, screenshot: Option<String>) -> Result<Snapshot> {
        let url = self.url().await?;
        let title = self.title().await?;
        Ok(Snapshot::new(url, title, &self.inner.console, screenshot))
    }

    /// Buffered console messages, oldest first.
    #[must_use]
    pub fn console_messages(&self) -> Vec<ConsoleMessage> {
        self.inner.console.messages()
    }

    /// Buffered console errors and uncaught exceptions.
    #[must_use]
    pub fn console_errors(&self) -> Vec<ConsoleMessage> {
        self.inner.console.errors()
    }

    /// Empties the console buffer.
    pub fn clear_console(&self) {
        self.inner.console.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format() {
        assert_eq!(ImageFormat::jpeg(150), ImageFormat::Jpeg(100));
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
        assert_eq!(ImageFormat::Jpeg(50).extension(), "jpg");
        assert_eq!(ImageFormat::Jpeg(50).format_str(), "jpeg");
        assert_eq!(ImageFormat::Png.quality(), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ImageFormat::from_path(Path::new("a/shot.JPG")), ImageFormat::Jpeg(85));
        assert_eq!(ImageFormat::from_path(Path::new("shot.png")), ImageFormat::Png);
        assert_eq!(ImageFormat::from_path(Path::new("shot")), ImageFormat::Png);
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("aGk=").expect("decode"), b"hi");
        assert!(decode("not base64!").is_err());
    }
}
