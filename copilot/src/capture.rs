//! Screen capture.
//!
//! Binds one session to the display hosting the game window and produces raw
//! pixel buffers for requested regions. All geometry coming in is
//! percent-of-screen; conversion to pixels happens here, against the bound
//! display's resolution.

use vision::{OwnedImage, Quad};

use crate::report::Reporter;

/// Source of frames for the perception pipeline.
///
/// The live implementation is [`Screen`]; [`StillScreen`] serves a fixed
/// image (calibration previews, offline captures, tests).
pub trait FrameGrabber {
    /// Bound surface size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Capture the bounding box of a pixel-space quad. `None` on capture
    /// failure (window gone, display detached) — a recognition-style miss,
    /// not an error.
    fn grab(&mut self, rect_px: &Quad) -> Option<OwnedImage>;

    fn grab_full(&mut self) -> Option<OwnedImage> {
        let (w, h) = self.dimensions();
        self.grab(&Quad::from_rect([0.0, 0.0, w as f32, h as f32]))
    }

    /// Convert a percent-of-screen quad to pixels on this surface.
    fn rect_pct_to_pixels(&self, quad: &Quad) -> Quad {
        let (w, h) = self.dimensions();
        quad.scale_from_origin(w as f32, h as f32)
    }
}

/// Live capture from the display hosting the game window.
pub struct Screen {
    monitor: Option<xcap::Monitor>,
    width: u32,
    height: u32,
    /// Legacy template-matching scale factors for this resolution.
    pub scale: (f32, f32),
}

impl Screen {
    /// Locate the display hosting the window whose app name matches
    /// `app_name` and bind to it.
    ///
    /// Unmatched window or origin falls back to the first display with a
    /// warning; captures then simply come from the wrong display and
    /// downstream recognition reports misses. Degrading beats aborting here.
    pub fn attach(app_name: &str, scales: &ScaleTable, reporter: &Reporter) -> Self {
        let origin = window_origin(app_name);
        if origin.is_none() {
            reporter.log(format!(
                "Could not find window '{app_name}'. Start the game, then re-attach."
            ));
        }

        let monitors = xcap::Monitor::all().unwrap_or_default();
        let matched = origin.and_then(|(wx, wy)| {
            monitors
                .iter()
                .find(|m| m.x().ok() == Some(wx) && m.y().ok() == Some(wy))
                .cloned()
        });

        let monitor = match matched {
            Some(m) => Some(m),
            None => {
                if origin.is_some() {
                    reporter.log(
                        "Game window not located on any display; using the first display. \
                         Check the game is not minimized.",
                    );
                }
                monitors.into_iter().next()
            }
        };

        let width = monitor.as_ref().and_then(|m| m.width().ok()).unwrap_or(0);
        let height = monitor.as_ref().and_then(|m| m.height().ok()).unwrap_or(0);
        let scale = scales.lookup(width, height);

        log::debug!("bound display {width}x{height}, scale {scale:?}");

        Self {
            monitor,
            width,
            height,
            scale,
        }
    }
}

impl FrameGrabber for Screen {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab(&mut self, rect_px: &Quad) -> Option<OwnedImage> {
        let monitor = self.monitor.as_ref()?;
        let img = match monitor.capture_image() {
            Ok(img) => img,
            Err(err) => {
                log::warn!("display capture failed: {err}");
                return None;
            }
        };
        let frame = OwnedImage::from_rgba(img.width() as usize, img.as_raw());
        Some(frame.crop_px(rect_px))
    }
}

fn window_origin(app_name: &str) -> Option<(i32, i32)> {
    let windows = xcap::Window::all().ok()?;
    let window = windows
        .into_iter()
        .find(|w| w.app_name().ok().as_deref() == Some(app_name))?;
    Some((window.x().ok()?, window.y().ok()?))
}

/// Frame grabber serving a fixed image instead of the screen.
pub struct StillScreen {
    frame: OwnedImage,
}

impl StillScreen {
    pub fn new(frame: OwnedImage) -> Self {
        Self { frame }
    }
}

impl FrameGrabber for StillScreen {
    fn dimensions(&self) -> (u32, u32) {
        (self.frame.width(), self.frame.height())
    }

    fn grab(&mut self, rect_px: &Quad) -> Option<OwnedImage> {
        Some(self.frame.crop_px(rect_px))
    }
}

// ----------

/// Resolution -> template-matching scale factors.
///
/// Entries were measured per resolution against the reference layout;
/// anything absent falls back to a straight ratio against the reference
/// resolution, which is close enough to keep matching usable.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScaleTable {
    scales: std::collections::BTreeMap<String, [f32; 2]>,
}

const REFERENCE_WIDTH: f32 = 3440.0;
const REFERENCE_HEIGHT: f32 = 1440.0;

impl Default for ScaleTable {
    fn default() -> Self {
        let mut scales = std::collections::BTreeMap::new();
        for (key, sx, sy) in [
            ("1024x768", 0.39, 0.39),
            ("1080x1080", 0.5, 0.5),
            ("1280x800", 0.48, 0.48),
            ("1280x1024", 0.5, 0.5),
            ("1600x900", 0.6, 0.6),
            ("1920x1080", 0.75, 0.75),
            ("1920x1200", 0.73, 0.73),
            ("1920x1440", 0.8, 0.8),
            ("2560x1080", 0.75, 0.75),
            ("2560x1440", 1.0, 1.0),
            ("3440x1440", 1.0, 1.0),
        ] {
            scales.insert(key.to_string(), [sx, sy]);
        }
        Self { scales }
    }
}

impl ScaleTable {
    /// Load the persisted table, writing the compiled defaults on first run.
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(table) => table,
                Err(err) => {
                    log::warn!("scale table unparsable at {path:?}: {err}; using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                let table = Self::default();
                if let Ok(json) = serde_json::to_string_pretty(&table) {
                    if let Err(err) = std::fs::write(path, json) {
                        log::warn!("could not persist default scale table: {err}");
                    }
                }
                table
            }
        }
    }

    pub fn lookup(&self, width: u32, height: u32) -> (f32, f32) {
        match self.scales.get(&format!("{width}x{height}")) {
            Some([sx, sy]) => (*sx, *sy),
            None => {
                log::warn!("no scale entry for {width}x{height}; using reference ratio");
                (
                    width as f32 / REFERENCE_WIDTH,
                    height as f32 / REFERENCE_HEIGHT,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vision::Color;

    #[test]
    fn known_resolution_uses_table_entry() {
        let table = ScaleTable::default();
        assert_eq!(table.lookup(1920, 1080), (0.75, 0.75));
    }

    #[test]
    fn unknown_resolution_falls_back_to_ratio() {
        let table = ScaleTable::default();
        let (sx, sy) = table.lookup(1720, 720);
        assert!((sx - 0.5).abs() < 1e-6);
        assert!((sy - 0.5).abs() < 1e-6);
    }

    #[test]
    fn table_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolution.json");

        // First load writes the defaults.
        let first = ScaleTable::load_or_default(&path);
        assert!(path.exists());

        // Second load reads them back.
        let second = ScaleTable::load_or_default(&path);
        assert_eq!(first.lookup(2560, 1440), second.lookup(2560, 1440));
    }

    #[test]
    fn still_screen_grabs_pct_regions() {
        let mut frame = OwnedImage::filled(100, 80, Color::BLACK);
        frame.fill_rect(50, 40, 50, 40, Color::WHITE);
        let mut still = StillScreen::new(frame);

        let rect = still.rect_pct_to_pixels(&Quad::from_rect([0.5, 0.5, 1.0, 1.0]));
        let crop = still.grab(&rect).unwrap();
        assert_eq!((crop.width(), crop.height()), (50, 40));
        assert!(crop.as_image().get_bytes().iter().all(|&b| b == 255));
    }
}
