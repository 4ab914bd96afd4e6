//! Session layer over the perception kernel.
//!
//! Binds the pure recognizers in `vision` to a live game: screen capture,
//! persisted region calibration, the external status feed, discrete UI input,
//! and the panel/list drivers built on all of them. Everything side-effecting
//! sits behind a trait ([`capture::FrameGrabber`], [`input::InputSink`],
//! `vision::text::TextReader`) so sessions replay against recorded frames.

pub mod calibration;
pub mod capture;
pub mod input;
pub mod list;
pub mod panel;
pub mod paths;
pub mod report;
pub mod status;
pub mod wait;

pub use calibration::{Registry, default_regions};
pub use capture::{FrameGrabber, ScaleTable, Screen, StillScreen};
pub use input::{InputSink, UiCommand};
pub use panel::{NAV_PANEL, Panel, PanelSpec, PanelState, STATUS_PANEL};
pub use report::{Message, Reporter};
pub use status::{GuiFocus, StatusFeed};
