//! End-to-end panel scenarios against scripted frames.
//!
//! Frames are synthesized in the game's visual idiom (solid accent highlight
//! on a dark backdrop) and served through the real capture/deskew/detect
//! pipeline; only OCR and keystrokes are scripted.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use copilot::calibration::{RegionEntry, Registry};
use copilot::input::{InputEvent, RecordingSink, UiCommand};
use copilot::panel::{Panel, PanelSpec, PanelState};
use copilot::status::GuiFocus;
use copilot::FrameGrabber;
use vision::text::TextReader;
use vision::{Color, OwnedImage, Quad};

const SCREEN_W: u32 = 320;
const SCREEN_H: u32 = 200;
const ACCENT: Color = Color::new(255, 140, 0);
const BACKDROP: Color = Color::new(18, 16, 24);

static TEST_PANEL: PanelSpec = PanelSpec {
    name: "test_panel",
    tabs: &["HOME", "STATUS"],
    tab_bar: Quad::from_rect([0.0, 0.0, 1.0, 0.2]),
    tab_size: (0.2, 0.5),
    rows: Quad::from_rect([0.0, 0.2, 1.0, 1.0]),
    row_size: (0.85, 0.08),
    focus: GuiFocus::ExternalPanel,
    open_select: UiCommand::Left,
};

/// Serves a fixed sequence of full-screen frames, one per grab.
struct ScriptedScreen {
    frames: Vec<OwnedImage>,
    next: usize,
}

impl ScriptedScreen {
    fn new(frames: Vec<OwnedImage>) -> Self {
        assert!(!frames.is_empty());
        Self { frames, next: 0 }
    }
}

impl FrameGrabber for ScriptedScreen {
    fn dimensions(&self) -> (u32, u32) {
        (SCREEN_W, SCREEN_H)
    }

    fn grab(&mut self, rect_px: &Quad) -> Option<OwnedImage> {
        let frame = &self.frames[self.next.min(self.frames.len() - 1)];
        self.next += 1;
        Some(frame.crop_px(rect_px))
    }
}

/// Returns scripted token lists in order; empty once exhausted.
struct ScriptedReader {
    reads: VecDeque<Vec<String>>,
}

impl ScriptedReader {
    fn new(reads: &[&[&str]]) -> Self {
        Self {
            reads: reads
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }
}

impl TextReader for ScriptedReader {
    fn read_text(&mut self, _image: &OwnedImage) -> Vec<String> {
        self.reads.pop_front().unwrap_or_default()
    }
}

fn registry_with_full_screen_panel() -> (tempfile::TempDir, Registry) {
    let dir = tempfile::tempdir().unwrap();
    let mut defaults = BTreeMap::new();
    for key in ["test_panel.bounds1", "test_panel.bounds2"] {
        defaults.insert(
            key.to_string(),
            RegionEntry { rect: [0.0, 0.0, 1.0, 1.0], text: None },
        );
    }
    let registry = Registry::load(dir.path().join("regions.json"), defaults).unwrap();
    (dir, registry)
}

fn blank_frame() -> OwnedImage {
    OwnedImage::filled(SCREEN_W, SCREEN_H, BACKDROP)
}

/// Frame with a highlighted tab in the tab bar (top 20% of the panel).
fn frame_with_tab_highlight() -> OwnedImage {
    let mut frame = blank_frame();
    frame.fill_rect(10, 4, 100, 32, ACCENT);
    frame
}

/// Frame with a highlighted list row at `y_pct` of the rows region.
fn frame_with_row_highlight(y_pct: f32) -> OwnedImage {
    let rows_top = (SCREEN_H as f32 * 0.2) as u32;
    let rows_h = SCREEN_H - rows_top;
    let y = rows_top + (rows_h as f32 * y_pct) as u32;
    let mut frame = blank_frame();
    frame.fill_rect(10, y, 300, 14, ACCENT);
    frame
}

#[test]
fn show_tab_cycles_until_the_target_tab_is_highlighted() {
    // Two reads find no highlight at all (panel still animating open); the
    // third finds the target tab already selected.
    let mut screen = ScriptedScreen::new(vec![
        blank_frame(),
        blank_frame(),
        frame_with_tab_highlight(),
    ]);
    let mut reader = ScriptedReader::new(&[&["STATUS"]]);
    let mut sink = RecordingSink::new();
    let (_dir, registry) = registry_with_full_screen_panel();
    let stop = AtomicBool::new(false);

    let mut panel = Panel::new(
        &TEST_PANEL,
        &registry,
        &mut screen,
        &mut reader,
        &mut sink,
        &stop,
    )
    .with_timing(Duration::ZERO, Duration::ZERO, 10);

    let state = panel.show_tab("STATUS");

    assert_eq!(state, PanelState::Open("STATUS".to_string()));
    // One blind cycle per missed read, none once the target was visible.
    assert_eq!(sink.taps_of(UiCommand::CyclePanel), 2);
}

#[test]
fn find_row_detects_a_full_lap_without_a_match() {
    // Scroll-to-top sees the same first row three times, then the walk
    // visits three rows before the highlight jumps back to the top.
    let mut screen = ScriptedScreen::new(vec![
        frame_with_row_highlight(0.05),
        frame_with_row_highlight(0.05),
        frame_with_row_highlight(0.05),
        frame_with_row_highlight(0.05),
        frame_with_row_highlight(0.4),
        frame_with_row_highlight(0.7),
        frame_with_row_highlight(0.05),
    ]);
    let mut reader = ScriptedReader::new(&[
        &["ALPHA HUB"],
        &["ALPHA HUB"],
        &["ALPHA HUB"],
        &["ALPHA HUB"],
        &["BETA DOCK"],
        &["GAMMA RELAY"],
    ]);
    let mut sink = RecordingSink::new();
    let (_dir, registry) = registry_with_full_screen_panel();
    let stop = AtomicBool::new(false);

    let mut panel = Panel::new(
        &TEST_PANEL,
        &registry,
        &mut screen,
        &mut reader,
        &mut sink,
        &stop,
    )
    .with_timing(Duration::ZERO, Duration::ZERO, 10);

    assert!(!panel.find_row("NOT THERE"));

    // The wraparound is recognized before a fourth step is taken: exactly
    // one down-step per visited row after the scroll-up was released.
    let release_at = sink
        .events
        .iter()
        .position(|e| *e == InputEvent::Release(UiCommand::Up))
        .expect("scroll-up released");
    let downs_after = sink.events[release_at..]
        .iter()
        .filter(|e| **e == InputEvent::Tap(UiCommand::Down))
        .count();
    assert_eq!(downs_after, 3);
}

#[test]
fn find_row_stops_on_a_match_and_leaves_it_selected() {
    let mut screen = ScriptedScreen::new(vec![
        frame_with_row_highlight(0.05),
        frame_with_row_highlight(0.05),
        frame_with_row_highlight(0.05),
        frame_with_row_highlight(0.05),
        frame_with_row_highlight(0.4),
    ]);
    let mut reader = ScriptedReader::new(&[
        &["ALPHA HUB"],
        &["ALPHA HUB"],
        &["ALPHA HUB"],
        &["ALPHA HUB"],
        &["BETA DOCK"],
    ]);
    let mut sink = RecordingSink::new();
    let (_dir, registry) = registry_with_full_screen_panel();
    let stop = AtomicBool::new(false);

    let mut panel = Panel::new(
        &TEST_PANEL,
        &registry,
        &mut screen,
        &mut reader,
        &mut sink,
        &stop,
    )
    .with_timing(Duration::ZERO, Duration::ZERO, 10);

    // OCR mangles the label slightly and the target arrives in mixed case;
    // fuzzy matching absorbs both.
    assert!(panel.find_row("Beta Docks"));
    assert_eq!(sink.taps_of(UiCommand::Down), 2);
}

#[test]
fn show_tab_sends_no_input_when_bounds_are_uncalibrated() {
    let mut screen = ScriptedScreen::new(vec![blank_frame()]);
    let mut reader = ScriptedReader::new(&[]);
    let mut sink = RecordingSink::new();
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::load(dir.path().join("regions.json"), BTreeMap::new()).unwrap();
    let stop = AtomicBool::new(false);

    let mut panel = Panel::new(
        &TEST_PANEL,
        &registry,
        &mut screen,
        &mut reader,
        &mut sink,
        &stop,
    )
    .with_timing(Duration::ZERO, Duration::ZERO, 10);

    assert_eq!(panel.show_tab("STATUS"), PanelState::Unknown);
    assert!(sink.events.is_empty());
}
