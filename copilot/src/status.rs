//! External game-state feed.
//!
//! The game maintains an append-only line-oriented status file as a side
//! channel. It is ground truth where available, and consulting it is far
//! cheaper than capture + OCR, so perception work short-circuits on it
//! whenever possible (panel already focused, destination already locked).
//! Feed problems are never fatal: a missing or unparsable file simply means
//! "no snapshot", and the pixel pipeline carries on without the shortcut.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::Deserialize;

use crate::wait;

/// Which UI surface currently owns input focus, as reported by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiFocus {
    NoFocus,
    /// Right-hand (internal status) panel.
    InternalPanel,
    /// Left-hand (navigation) panel.
    ExternalPanel,
    CommsPanel,
    RolePanel,
    StationServices,
    GalaxyMap,
    SystemMap,
    Other(u8),
}

impl GuiFocus {
    fn from_raw(v: u8) -> Self {
        match v {
            0 => Self::NoFocus,
            1 => Self::InternalPanel,
            2 => Self::ExternalPanel,
            3 => Self::CommsPanel,
            4 => Self::RolePanel,
            5 => Self::StationServices,
            6 => Self::GalaxyMap,
            7 => Self::SystemMap,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub focus: GuiFocus,
    pub destination: Option<String>,
}

#[derive(Deserialize)]
struct RawStatus {
    #[serde(rename = "GuiFocus", default)]
    gui_focus: u8,
    #[serde(rename = "Destination", default)]
    destination: Option<RawDestination>,
}

#[derive(Deserialize)]
struct RawDestination {
    #[serde(rename = "Name", default)]
    name: Option<String>,
}

pub struct StatusFeed {
    path: PathBuf,
}

impl StatusFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse the most recent status line. `None` on any read/parse problem.
    pub fn snapshot(&self) -> Option<Snapshot> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                log::debug!("status feed unreadable at {:?}: {err}", self.path);
                return None;
            }
        };

        let line = text.lines().rev().find(|l| !l.trim().is_empty())?;
        let raw: RawStatus = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(err) => {
                log::debug!("status feed line unparsable: {err}");
                return None;
            }
        };

        Some(Snapshot {
            focus: GuiFocus::from_raw(raw.gui_focus),
            destination: raw.destination.and_then(|d| d.name).filter(|n| !n.is_empty()),
        })
    }

    pub fn focus(&self) -> Option<GuiFocus> {
        self.snapshot().map(|s| s.focus)
    }

    /// Poll until the game reports `focus`, up to `timeout`.
    pub fn wait_for_focus(&self, focus: GuiFocus, timeout: Duration, stop: &AtomicBool) -> bool {
        wait::poll_until(timeout, wait::DEFAULT_POLL_INTERVAL, stop, || {
            self.focus() == Some(focus)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn feed_with(lines: &str) -> (tempfile::TempDir, StatusFeed) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{lines}").unwrap();
        (dir, StatusFeed::new(path))
    }

    #[test]
    fn last_line_wins() {
        let (_dir, feed) = feed_with(
            "{\"GuiFocus\": 0}\n{\"GuiFocus\": 2, \"Destination\": {\"Name\": \"Nav Beacon\"}}\n",
        );
        let snap = feed.snapshot().unwrap();
        assert_eq!(snap.focus, GuiFocus::ExternalPanel);
        assert_eq!(snap.destination.as_deref(), Some("Nav Beacon"));
    }

    #[test]
    fn missing_fields_default() {
        let (_dir, feed) = feed_with("{}\n");
        let snap = feed.snapshot().unwrap();
        assert_eq!(snap.focus, GuiFocus::NoFocus);
        assert_eq!(snap.destination, None);
    }

    #[test]
    fn unknown_focus_is_preserved() {
        let (_dir, feed) = feed_with("{\"GuiFocus\": 9}\n");
        assert_eq!(feed.focus(), Some(GuiFocus::Other(9)));
    }

    #[test]
    fn missing_file_is_no_snapshot() {
        let feed = StatusFeed::new("/nonexistent/status.jsonl");
        assert!(feed.snapshot().is_none());
    }

    #[test]
    fn garbage_line_is_no_snapshot() {
        let (_dir, feed) = feed_with("not json at all\n");
        assert!(feed.snapshot().is_none());
    }
}
