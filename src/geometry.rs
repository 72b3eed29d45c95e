//! # Slot Geometry
//!
//! A *slot* is a rectangle, in the pixel coordinate space of the original
//! full-resolution template image, marking where a captured photo gets
//! composited. Slots never live in on-screen coordinates: display scaling
//! is handled by the preview positioner, and the compositor always works in
//! raw template pixels.
//!
//! Two representations exist:
//!
//! - [`Slot`] is the persisted form: `{x, y, width, height}`.
//! - [`SlotRect`] is the editor's working form: position, *unscaled* size,
//!   and independent scale factors. Resize handles scale rather than resize
//!   the raw rectangle, so the decomposition must be preserved while a
//!   gesture is in flight and only collapsed on save:
//!
//! ```
//! use photobox::geometry::SlotRect;
//!
//! let rect = SlotRect { left: 50.0, top: 50.0, width: 200.0, height: 200.0, scale_x: 1.5, scale_y: 0.5 };
//! let slot = rect.to_slot();
//! assert_eq!(slot.width, 300.0);
//! assert_eq!(slot.height, 100.0);
//! ```
//!
//! Configuration crosses the HTTP boundary as serialized JSON text and is
//! parsed exactly once, at ingestion, via [`SlotConfig::from_json`].
//! Everything past that boundary works with typed values.

use serde::{Deserialize, Serialize};

use crate::error::PhotoboxError;

/// A point in template-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A slot rectangle in template-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Slot {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Clamp this slot to lie fully inside an `img_w` x `img_h` image.
    ///
    /// Slots are drawn by hand; a rectangle dragged a few pixels past the
    /// template edge (or degenerate after a bad gesture) is pulled back in
    /// rather than rejected. Size is floored at one pixel.
    #[must_use]
    pub fn clamped(&self, img_w: u32, img_h: u32) -> Self {
        let img_w = f64::from(img_w);
        let img_h = f64::from(img_h);

        let x = self.x.clamp(0.0, (img_w - 1.0).max(0.0));
        let y = self.y.clamp(0.0, (img_h - 1.0).max(0.0));
        let width = self.width.max(1.0).min(img_w - x);
        let height = self.height.max(1.0).min(img_h - y);

        Self { x, y, width, height }
    }
}

/// The slot configuration stored with each template.
///
/// The schema allows multiple slots (strip/grid layouts), but only the
/// primary slot drives the editor and the live preview. The compositor
/// fills every slot it is given.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotConfig {
    pub slots: Vec<Slot>,
}

impl SlotConfig {
    /// Build a single-slot configuration.
    #[must_use]
    pub fn single(slot: Slot) -> Self {
        Self { slots: vec![slot] }
    }

    /// Parse serialized configuration text.
    ///
    /// This is the one normalization boundary: config JSON arrives as text
    /// from uploads and the stored index, gets parsed here once, and is
    /// typed everywhere else.
    pub fn from_json(text: &str) -> Result<Self, PhotoboxError> {
        serde_json::from_str(text)
            .map_err(|e| PhotoboxError::Validation(format!("Invalid JSON config: {}", e)))
    }

    /// Serialize back to configuration text.
    ///
    /// Stable for a given config: load-then-save with no edits reproduces
    /// the same text.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("slot config serialization cannot fail")
    }

    /// The slot used for capture and preview, if any is defined.
    #[must_use]
    pub fn primary(&self) -> Option<&Slot> {
        self.slots.first()
    }

    /// Clamp every slot against the template's natural dimensions.
    #[must_use]
    pub fn clamped(&self, img_w: u32, img_h: u32) -> Self {
        Self {
            slots: self.slots.iter().map(|s| s.clamped(img_w, img_h)).collect(),
        }
    }
}

/// The editor's working rectangle: position, unscaled size, and the scale
/// factors accumulated by corner-handle drags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl SlotRect {
    /// Lift a persisted slot into the editor representation (scale 1.0).
    #[must_use]
    pub fn from_slot(slot: &Slot) -> Self {
        Self {
            left: slot.x,
            top: slot.y,
            width: slot.width,
            height: slot.height,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Collapse position and scale into a persisted slot:
    /// `(left, top, width * scale_x, height * scale_y)`.
    #[must_use]
    pub fn to_slot(&self) -> Slot {
        Slot {
            x: self.left,
            y: self.top,
            width: self.width * self.scale_x,
            height: self.height * self.scale_y,
        }
    }

    /// Width as displayed (scale applied).
    #[must_use]
    pub fn display_width(&self) -> f64 {
        self.width * self.scale_x
    }

    /// Height as displayed (scale applied).
    #[must_use]
    pub fn display_height(&self) -> f64 {
        self.height * self.scale_y
    }

    /// Right edge of the displayed rectangle.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.display_width()
    }

    /// Bottom edge of the displayed rectangle.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.display_height()
    }
}
