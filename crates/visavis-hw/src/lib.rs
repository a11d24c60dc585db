//! visavis-hw — Hardware abstraction for the live video feed.
//!
//! Provides V4L2-based camera access and the snapshot path that turns
//! a raw frame into the transportable JPEG data URL the recognition
//! service consumes.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, PixelFormat};
pub use frame::Frame;
