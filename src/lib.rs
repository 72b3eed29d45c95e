//! # Photobox - Photobooth Compositing Library
//!
//! Photobox is a Rust library and server for a webcam photobooth: an
//! operator uploads "frame" template images with a designated photo slot,
//! and a visitor picks a frame, lines themselves up with a live preview,
//! and downloads a composite of their photo inside the frame. It provides:
//!
//! - **Slot geometry**: pixel-space slot rectangles with the editor's
//!   position/scale decomposition
//! - **Cover-fit compositing**: aspect-preserving center crop, mirrored to
//!   match the live preview, layered beneath the template artwork
//! - **Slot editor**: drag/resize gestures over the template image
//! - **Capture flow**: the browsing/previewing/captured state machine with
//!   strict camera-stream lifecycle
//! - **Template registry**: file-backed CRUD storage for frames
//!
//! ## Quick Start
//!
//! ```
//! use image::{DynamicImage, RgbaImage};
//! use photobox::{compositor, geometry::Slot};
//!
//! // A template with a slot, and a camera frame
//! let template = DynamicImage::ImageRgba8(RgbaImage::new(800, 600));
//! let frame = DynamicImage::ImageRgba8(RgbaImage::new(1280, 720));
//! let slot = Slot::new(100.0, 50.0, 200.0, 300.0);
//!
//! // Mirror-composite the frame into the slot, template art on top
//! let photo = compositor::composite_png(&template, &frame, &[slot])?;
//! assert!(photo.starts_with(&[0x89, b'P', b'N', b'G']));
//! # Ok::<(), photobox::error::PhotoboxError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`geometry`] | Slot model and the editor's rect decomposition |
//! | [`compositor`] | Cover-fit crop, mirroring, template layering |
//! | [`preview`] | Percentage positioning for the live preview |
//! | [`editor`] | Interactive slot editing sessions |
//! | [`capture`] | Capture state machine and stream lifecycle |
//! | [`registry`] | Template CRUD storage |
//! | [`server`] | HTTP surface |
//! | [`error`] | Error types |

pub mod capture;
pub mod compositor;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod preview;
pub mod registry;
pub mod server;

// Re-exports for convenience
pub use error::PhotoboxError;
pub use geometry::{Slot, SlotConfig, SlotRect};
pub use registry::{Template, TemplateStore};
