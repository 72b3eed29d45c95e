//! # Live Preview Positioner
//!
//! Before capture, the camera stream is layered beneath the rendered
//! template so the subject can frame themselves inside the slot. The
//! template may be displayed smaller or larger than its natural size, so
//! the stored pixel-space slot is converted to percentages of the natural
//! dimensions; a percentage box sized relative to the *rendered* template
//! lands in the right place at any display scale.
//!
//! This positioning is cosmetic only. The compositor recomputes its crop in
//! raw pixel space from the raw camera frame, so nothing here can affect
//! the exported photo.

use serde::Serialize;

use crate::geometry::{Slot, SlotConfig};

/// A percentage-based box relative to the rendered template image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreviewBox {
    /// Left offset, percent of rendered width.
    pub left: f64,
    /// Top offset, percent of rendered height.
    pub top: f64,
    /// Width, percent of rendered width.
    pub width: f64,
    /// Height, percent of rendered height.
    pub height: f64,
}

impl PreviewBox {
    /// Map a pixel-space slot into percentages of the template's natural
    /// `img_w` x `img_h` dimensions.
    #[must_use]
    pub fn for_slot(slot: &Slot, img_w: u32, img_h: u32) -> Self {
        let img_w = f64::from(img_w);
        let img_h = f64::from(img_h);
        Self {
            left: slot.x / img_w * 100.0,
            top: slot.y / img_h * 100.0,
            width: slot.width / img_w * 100.0,
            height: slot.height / img_h * 100.0,
        }
    }

    /// Full-bleed preview used when a template defines no slot.
    #[must_use]
    pub fn full_bleed() -> Self {
        Self { left: 0.0, top: 0.0, width: 100.0, height: 100.0 }
    }

    /// Position the primary slot of a configuration, or fall back to
    /// full bleed.
    #[must_use]
    pub fn from_config(config: &SlotConfig, img_w: u32, img_h: u32) -> Self {
        match config.primary() {
            Some(slot) => Self::for_slot(slot, img_w, img_h),
            None => Self::full_bleed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slot_maps_to_percentages() {
        let slot = Slot::new(100.0, 50.0, 200.0, 300.0);
        let bx = PreviewBox::for_slot(&slot, 800, 600);
        assert_eq!(bx.left, 12.5);
        assert_eq!(bx.top, 50.0 / 600.0 * 100.0);
        assert_eq!(bx.width, 25.0);
        assert_eq!(bx.height, 50.0);
    }

    #[test]
    fn test_full_image_slot_is_full_bleed() {
        let slot = Slot::new(0.0, 0.0, 800.0, 600.0);
        let bx = PreviewBox::for_slot(&slot, 800, 600);
        assert_eq!(bx, PreviewBox::full_bleed());
    }

    #[test]
    fn test_missing_slot_defaults_to_full_bleed() {
        let bx = PreviewBox::from_config(&SlotConfig::default(), 800, 600);
        assert_eq!(bx, PreviewBox { left: 0.0, top: 0.0, width: 100.0, height: 100.0 });
    }

    #[test]
    fn test_percentages_are_display_scale_independent() {
        // The same slot yields the same percentages regardless of how the
        // template is later rendered; only natural dimensions matter.
        let slot = Slot::new(40.0, 30.0, 120.0, 90.0);
        let bx = PreviewBox::for_slot(&slot, 400, 300);
        assert_eq!(bx.left, 10.0);
        assert_eq!(bx.top, 10.0);
        assert_eq!(bx.width, 30.0);
        assert_eq!(bx.height, 30.0);
    }
}
