//! Cockpit panel driving and recognition.
//!
//! A [`Panel`] session binds one panel descriptor to the collaborators it
//! needs (frame grabber, text reader, input sink, optional status feed) and
//! exposes the high-level moves: open the panel, converge on a named tab,
//! close it again. Recognition works on the deskewed panel image; a cached
//! perspective pair maps detections back to screen space for overlays.
//!
//! Everything status-file-derived is a shortcut, not a requirement: with no
//! feed attached the same operations run purely on pixels.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use vision::text::TextReader;
use vision::warp::PerspectivePair;
use vision::{OwnedImage, Quad, detect, text, warp};

use crate::calibration::Registry;
use crate::capture::FrameGrabber;
use crate::input::{InputSink, UiCommand};
use crate::report::Reporter;
use crate::status::{GuiFocus, StatusFeed};
use crate::wait;

/// What the recognizer concluded about a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    /// No tab highlight found; the panel is closed or obscured.
    Closed,
    /// Panel open with the named tab selected.
    Open(String),
    /// A tab is highlighted but its label matched nothing known.
    Unknown,
}

/// Static description of one cockpit panel.
///
/// Regions are percent-of-panel, applied after deskewing; `tab_size` and
/// `row_size` are minimum highlight sizes as fractions of their respective
/// crops. Tab order matches the in-game cycling order, which is what makes
/// tab distance computable.
pub struct PanelSpec {
    /// Calibration key prefix (`<name>.bounds1` / `<name>.bounds2`).
    pub name: &'static str,
    pub tabs: &'static [&'static str],
    pub tab_bar: Quad,
    pub tab_size: (f32, f32),
    pub rows: Quad,
    pub row_size: (f32, f32),
    /// Focus value the game reports while this panel is open.
    pub focus: GuiFocus,
    /// Direction tapped (with panel focus held) to open this panel.
    pub open_select: UiCommand,
}

/// Left-hand navigation panel.
pub static NAV_PANEL: PanelSpec = PanelSpec {
    name: "nav_panel",
    tabs: &["NAVIGATION", "TRANSACTIONS", "CONTACTS", "TARGET"],
    tab_bar: Quad::from_rect([0.0, 0.0, 1.0, 0.0833]),
    tab_size: (0.23, 0.7),
    rows: Quad::from_rect([0.2218, 0.3, 0.8, 1.0]),
    row_size: (0.95, 0.08),
    focus: GuiFocus::ExternalPanel,
    open_select: UiCommand::Left,
};

/// Right-hand internal status panel.
pub static STATUS_PANEL: PanelSpec = PanelSpec {
    name: "status_panel",
    tabs: &[
        "MODULES",
        "FIRE GROUPS",
        "SHIP",
        "INVENTORY",
        "STORAGE",
        "STATUS",
    ],
    tab_bar: Quad::from_rect([0.0, 0.0, 1.0, 0.0833]),
    tab_size: (0.15, 0.7),
    rows: Quad::from_rect([0.174, 0.2265, 0.75, 0.8528]),
    row_size: (0.95, 0.1577),
    focus: GuiFocus::InternalPanel,
    open_select: UiCommand::Right,
};

const DEFAULT_SETTLE: Duration = Duration::from_millis(350);
const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(1);
const DEFAULT_RETRIES: u32 = 10;
const FOCUS_TIMEOUT: Duration = Duration::from_secs(3);

/// One panel-driving session over borrowed collaborators.
pub struct Panel<'a, G: FrameGrabber, R: TextReader, I: InputSink> {
    pub(crate) spec: &'static PanelSpec,
    pub(crate) registry: &'a Registry,
    pub(crate) grabber: &'a mut G,
    pub(crate) reader: &'a mut R,
    pub(crate) input: &'a mut I,
    pub(crate) status: Option<&'a StatusFeed>,
    pub(crate) reporter: Reporter,
    pub(crate) stop: &'a AtomicBool,
    pub(crate) settle: Duration,
    pub(crate) retry_wait: Duration,
    pub(crate) retries: u32,
    last_pair: Option<PerspectivePair>,
}

impl<'a, G: FrameGrabber, R: TextReader, I: InputSink> Panel<'a, G, R, I> {
    pub fn new(
        spec: &'static PanelSpec,
        registry: &'a Registry,
        grabber: &'a mut G,
        reader: &'a mut R,
        input: &'a mut I,
        stop: &'a AtomicBool,
    ) -> Self {
        Self {
            spec,
            registry,
            grabber,
            reader,
            input,
            status: None,
            reporter: Reporter::disabled(),
            stop,
            settle: DEFAULT_SETTLE,
            retry_wait: DEFAULT_RETRY_WAIT,
            retries: DEFAULT_RETRIES,
            last_pair: None,
        }
    }

    pub fn with_status(mut self, feed: &'a StatusFeed) -> Self {
        self.status = Some(feed);
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Override timing for fast hosts and scripted tests.
    pub fn with_timing(mut self, settle: Duration, retry_wait: Duration, retries: u32) -> Self {
        self.settle = settle;
        self.retry_wait = retry_wait;
        self.retries = retries;
        self
    }

    /// Panel quad in percent-of-screen, from the calibrated bounds pair.
    pub fn quad_pct(&self) -> Option<Quad> {
        let b1 = self.registry.quad(&format!("{}.bounds1", self.spec.name));
        let b2 = self.registry.quad(&format!("{}.bounds2", self.spec.name));
        match (b1, b2) {
            (Some(tlbr), Some(trbl)) => Some(Quad::from_bounds_pair(tlbr, trbl)),
            _ => {
                self.reporter.log(format!(
                    "Panel '{}' has no calibrated bounds; run calibration first.",
                    self.spec.name
                ));
                None
            }
        }
    }

    /// Capture the panel and straighten it onto an axis-aligned rectangle.
    pub fn capture_deskewed(&mut self) -> Option<OwnedImage> {
        let quad_pct = self.quad_pct()?;
        let quad_px = self.grabber.rect_pct_to_pixels(&quad_pct);
        self.reporter.overlay(self.spec.name, quad_px);

        let frame = self.grabber.grab(&quad_px)?;
        let local = quad_px.offset(-quad_px.left(), -quad_px.top());
        let (deskewed, pair) = warp::deskew(&frame, &local)?;
        self.last_pair = Some(pair);
        Some(deskewed)
    }

    /// Capture one percent-of-panel region of the deskewed panel.
    pub fn capture_region(&mut self, region: Quad) -> Option<OwnedImage> {
        self.capture_deskewed().map(|img| img.crop_pct(&region))
    }

    /// Transform pair from the most recent capture, for overlay mapping.
    pub fn last_pair(&self) -> Option<&PerspectivePair> {
        self.last_pair.as_ref()
    }

    /// One recognition pass over the tab bar.
    pub fn state(&mut self) -> PanelState {
        let Some(bar) = self.capture_region(self.spec.tab_bar) else {
            return PanelState::Closed;
        };
        let Some(found) = detect::highlighted_item(&bar, self.spec.tab_size.0, self.spec.tab_size.1)
        else {
            return PanelState::Closed;
        };
        let tokens = self.reader.read_text(&found.image);
        match self.match_tab(&tokens) {
            Some(idx) => PanelState::Open(self.spec.tabs[idx].to_string()),
            None => {
                log::debug!("{}: highlighted tab text {tokens:?} matched no tab", self.spec.name);
                PanelState::Unknown
            }
        }
    }

    /// First tab whose label appears in the OCR tokens, in declared order.
    fn match_tab(&self, tokens: &[String]) -> Option<usize> {
        self.spec
            .tabs
            .iter()
            .position(|tab| text::contains_text(tab, tokens))
    }

    /// Open the panel and wait for the game to confirm focus.
    ///
    /// Skips the input sequence when the status feed already reports this
    /// panel focused. Without a feed the focus gate is skipped and the settle
    /// delay has to suffice.
    pub fn show(&mut self) -> bool {
        if let Some(feed) = self.status {
            if feed.focus() == Some(self.spec.focus) {
                log::debug!("{} already focused", self.spec.name);
                return true;
            }
        }

        // Head-look drift moves the panel off its calibrated quad.
        self.input.tap(UiCommand::HeadLookReset);
        self.input.press(UiCommand::FocusPanels);
        self.input.tap(self.spec.open_select);
        self.input.release(UiCommand::FocusPanels);
        wait::settle(self.settle);

        match self.status {
            Some(feed) => {
                let focused = feed.wait_for_focus(self.spec.focus, FOCUS_TIMEOUT, self.stop);
                if !focused {
                    self.reporter
                        .log(format!("Panel '{}' did not gain focus.", self.spec.name));
                }
                focused
            }
            None => true,
        }
    }

    /// Converge on the named tab by reading the highlight and cycling.
    ///
    /// The highlight is read *before* each cycle tap, so an already-correct
    /// tab costs no input. A recognized wrong tab is corrected in one burst
    /// of taps using the declared tab order; an unrecognized read falls back
    /// to cycling one tab at a time.
    pub fn show_tab(&mut self, target: &str) -> PanelState {
        let Some(target_idx) = self.spec.tabs.iter().position(|t| *t == target) else {
            log::warn!("{}: unknown tab '{target}'", self.spec.name);
            return PanelState::Unknown;
        };
        // Without calibrated bounds every capture is garbage; bail before
        // sending any input.
        if self.quad_pct().is_none() {
            return PanelState::Unknown;
        }

        for _ in 0..self.retries {
            if wait::stop_requested(self.stop) {
                return PanelState::Unknown;
            }
            match self.state() {
                PanelState::Open(tab) if tab == target => return PanelState::Open(tab),
                PanelState::Open(tab) => {
                    let cur = self
                        .spec
                        .tabs
                        .iter()
                        .position(|t| *t == tab)
                        .unwrap_or(target_idx);
                    let steps =
                        (target_idx as i32 - cur as i32).rem_euclid(self.spec.tabs.len() as i32);
                    self.input.tap_repeat(UiCommand::CyclePanel, steps as u32);
                    wait::settle(self.settle);
                }
                PanelState::Closed | PanelState::Unknown => {
                    self.input.tap(UiCommand::CyclePanel);
                    wait::settle(self.retry_wait);
                }
            }
        }

        self.reporter.log(format!(
            "Could not reach tab '{target}' on panel '{}'.",
            self.spec.name
        ));
        PanelState::Unknown
    }

    /// Ensure the panel is open and showing `tab`.
    pub fn ensure_tab(&mut self, tab: &str) -> PanelState {
        if !self.show() {
            return PanelState::Closed;
        }
        self.show_tab(tab)
    }

    /// Close the panel if it is (or may be) the focused surface.
    pub fn hide(&mut self) {
        if let Some(feed) = self.status {
            if feed.focus() != Some(self.spec.focus) {
                return;
            }
        }
        self.input.tap(UiCommand::Back);
        wait::settle(self.settle);
    }

    /// Select `target` on `tab` and lock it in as the active destination.
    ///
    /// Already-locked destinations (per the status feed) are a no-op.
    pub fn lock_destination(&mut self, tab: &str, target: &str) -> bool {
        if let Some(snap) = self.status.and_then(|f| f.snapshot()) {
            if let Some(dest) = snap.destination {
                if text::similarity(&dest, target) > crate::list::SIM_MATCH {
                    self.reporter.log(format!("'{target}' is already locked in."));
                    return true;
                }
            }
        }

        if !matches!(self.ensure_tab(tab), PanelState::Open(_)) {
            self.hide();
            return false;
        }
        if !self.find_row(target) {
            self.reporter.voice(format!("Could not find '{target}'."));
            self.hide();
            return false;
        }

        // First select opens the entry, second confirms the lock action.
        self.input.tap(UiCommand::Select);
        wait::settle(self.settle);
        self.input.tap(UiCommand::Select);
        wait::settle(self.settle);
        self.hide();
        self.reporter.voice(format!("Locked in '{target}'."));
        true
    }
}
