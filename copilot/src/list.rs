//! Panel list navigation.
//!
//! Panels present scrollable lists with exactly one highlighted row. The game
//! offers no "jump to top", so position is recovered by holding scroll-up
//! until the highlighted row's text stops changing, then rows are walked
//! downward one at a time, matching each label fuzzily against the target.
//! Lists wrap around; a row reappearing markedly higher than its predecessor
//! means the walk has lapped the list without a match.

use vision::detect::{self, Detection};
use vision::text::{self, TextReader};

use crate::capture::FrameGrabber;
use crate::input::{InputSink, UiCommand};
use crate::panel::Panel;
use crate::wait;

/// Similarity above which an OCR'd row label counts as the target.
pub(crate) const SIM_MATCH: f32 = 0.8;

/// Upward jump (fraction of the list) that signals wraparound.
const WRAP_BACKTRACK: f32 = 0.1;

/// Identical consecutive reads that confirm the selection stopped moving.
const TOP_STREAK: u32 = 3;

const MAX_SCROLL_READS: u32 = 200;
const MAX_ROW_STEPS: u32 = 100;

impl<G: FrameGrabber, R: TextReader, I: InputSink> Panel<'_, G, R, I> {
    /// Highlighted row in the panel's list region, if any.
    pub fn detect_row(&mut self) -> Option<Detection> {
        let rows = self.capture_region(self.spec.rows)?;
        detect::highlighted_item(&rows, self.spec.row_size.0, self.spec.row_size.1)
    }

    /// Drive the list selection to its first row.
    ///
    /// Holds scroll-up and keeps reading the highlighted row; once the same
    /// text comes back [`TOP_STREAK`] times in a row the selection has hit
    /// the top. Returns false when the highlight disappears or never
    /// stabilizes.
    pub fn scroll_to_top(&mut self) -> bool {
        // A tap first guarantees the highlight is inside the list.
        self.input.tap(UiCommand::Down);
        wait::settle(self.settle);

        self.input.press(UiCommand::Up);
        let mut streak = 0u32;
        let mut seen = false;
        let mut last: Option<Vec<String>> = None;

        for _ in 0..MAX_SCROLL_READS {
            if wait::stop_requested(self.stop) {
                break;
            }
            let Some(row) = self.detect_row() else {
                // A highlight that vanishes after being seen is a boundary;
                // one that was never seen may just not have rendered yet.
                if seen {
                    break;
                }
                wait::settle(self.retry_wait);
                continue;
            };
            seen = true;
            let tokens = self.reader.read_text(&row.image);
            if last.as_ref() == Some(&tokens) {
                streak += 1;
            } else {
                streak = 1;
                last = Some(tokens);
            }
            if streak >= TOP_STREAK {
                self.input.release(UiCommand::Up);
                wait::settle(self.settle);
                return true;
            }
        }

        self.input.release(UiCommand::Up);
        log::debug!("{}: list top not reached", self.spec.name);
        false
    }

    /// Walk the list top-down looking for a row matching `target`.
    ///
    /// Leaves the matching row highlighted on success. On a full lap without
    /// a match (or a lost highlight) returns false with the selection
    /// wherever it ended up.
    pub fn find_row(&mut self, target: &str) -> bool {
        if !self.scroll_to_top() {
            return false;
        }

        let mut y_last = -1.0f32;
        for _ in 0..MAX_ROW_STEPS {
            if wait::stop_requested(self.stop) {
                return false;
            }
            let Some(row) = self.detect_row() else {
                return false;
            };

            // Selection jumped back up: wrapped past the end of the list.
            if row.quad.top() < y_last - WRAP_BACKTRACK {
                log::debug!("{}: wrapped without finding '{target}'", self.spec.name);
                return false;
            }
            y_last = row.quad.top();

            let tokens = self.reader.read_text(&row.image);
            let label = tokens.join(" ");
            let sim = text::similarity(&label, target);
            if sim > SIM_MATCH {
                log::debug!("{}: matched '{label}' ~ '{target}' ({sim:.2})", self.spec.name);
                return true;
            }

            self.input.tap(UiCommand::Down);
            wait::settle(self.settle);
        }

        false
    }
}
