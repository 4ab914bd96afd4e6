//! Perception primitives for reading a 3D game's UI off screen pixels.
//!
//! No OS integration lives here: capture, input and calibration storage are
//! the session layer's business. This crate is pure pixels-in, geometry and
//! text out, which is what makes the whole pipeline testable with synthetic
//! frames.

mod image;
pub use image::*;
mod geometry;
pub use geometry::*;
pub mod detect;
pub mod text;
pub mod warp;
