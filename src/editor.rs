//! # Slot Editor
//!
//! Interactive definition of a template's photo slot: a draggable,
//! resizable rectangle over the template image, edited at the image's
//! natural pixel dimensions (an oversized image scrolls, it is never
//! resampled) and emitted in image-pixel coordinates regardless of how the
//! editing surface is displayed.
//!
//! ## Gesture model
//!
//! Pointer events drive a small state machine: pointer-down hit-tests the
//! corner handles first and the rectangle body second, starting a
//! [`Gesture`]; pointer-move applies incremental deltas; pointer-up returns
//! to idle. Dragging the body translates the rectangle. Dragging a corner
//! handle *scales* it: the raw `width`/`height` of the [`SlotRect`] never
//! change during a resize, only `scale_x`/`scale_y`, with the opposite
//! corner held fixed. The decomposition is collapsed into a plain [`Slot`]
//! only on save.
//!
//! ## Ownership
//!
//! An [`EditorSession`] owns one in-progress rectangle over one loaded
//! image. Sessions are created on view entry and dropped on save or
//! expiry; there is no shared editing surface and no multi-writer
//! scenario.

use image::{DynamicImage, Rgba, RgbaImage};

use crate::compositor::encode_png;
use crate::error::PhotoboxError;
use crate::geometry::{Point, Slot, SlotConfig, SlotRect};
use crate::registry::PNG_MAGIC;

/// Default rectangle placed when a new template is being created.
pub const DEFAULT_RECT: SlotRect = SlotRect {
    left: 50.0,
    top: 50.0,
    width: 200.0,
    height: 200.0,
    scale_x: 1.0,
    scale_y: 1.0,
};

/// Side length of a corner handle, in image pixels.
const HANDLE_SIZE: f64 = 12.0;

/// Hit tolerance around a handle center.
const HANDLE_HIT_RADIUS: f64 = 10.0;

/// Smallest displayed edge a resize gesture may produce, in pixels.
const MIN_DISPLAY_SIZE: f64 = 2.0;

/// Corner handle anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleAnchor {
    Nw,
    Ne,
    Se,
    Sw,
}

impl HandleAnchor {
    /// All four anchors, in drawing order.
    pub const ALL: [Self; 4] = [Self::Nw, Self::Ne, Self::Se, Self::Sw];

    /// Center of this handle on the displayed rectangle.
    #[must_use]
    pub fn position(self, rect: &SlotRect) -> Point {
        match self {
            Self::Nw => Point::new(rect.left, rect.top),
            Self::Ne => Point::new(rect.right(), rect.top),
            Self::Se => Point::new(rect.right(), rect.bottom()),
            Self::Sw => Point::new(rect.left, rect.bottom()),
        }
    }

    /// The corner held fixed while this handle is dragged.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Nw => Self::Se,
            Self::Ne => Self::Sw,
            Self::Se => Self::Nw,
            Self::Sw => Self::Ne,
        }
    }
}

/// Which part of the rectangle a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    Handle(HandleAnchor),
}

/// Test a pointer position against the rectangle, handles first.
#[must_use]
pub fn hit_test(rect: &SlotRect, pt: Point) -> Option<HitPart> {
    for anchor in HandleAnchor::ALL {
        let center = anchor.position(rect);
        if (pt.x - center.x).abs() <= HANDLE_HIT_RADIUS && (pt.y - center.y).abs() <= HANDLE_HIT_RADIUS {
            return Some(HitPart::Handle(anchor));
        }
    }
    if pt.x >= rect.left && pt.x <= rect.right() && pt.y >= rect.top && pt.y <= rect.bottom() {
        return Some(HitPart::Body);
    }
    None
}

/// The active gesture, tracked between pointer-down and pointer-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// No gesture in progress.
    Idle,
    /// Translating the rectangle by body drag.
    Moving {
        /// Pointer position at the previous event, for incremental deltas.
        last: Point,
    },
    /// Scaling via a corner handle.
    Scaling {
        /// The handle being dragged.
        anchor: HandleAnchor,
        /// The opposite corner, captured at gesture start and held fixed.
        fixed: Point,
    },
}

/// Validated output of a save: everything the registry needs.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub name: String,
    pub config: SlotConfig,
    /// Newly chosen image bytes, if the session uploaded or replaced one.
    pub image_bytes: Option<Vec<u8>>,
}

/// One editing session: one image, one in-progress slot rectangle.
#[derive(Debug)]
pub struct EditorSession {
    image: DynamicImage,
    /// PNG bytes pending storage (new upload or replacement).
    image_bytes: Option<Vec<u8>>,
    /// Set when editing an existing template.
    template_id: Option<u64>,
    rect: Option<SlotRect>,
    gesture: Gesture,
}

impl EditorSession {
    /// Start a session for a brand new template from an uploaded image.
    /// The default rectangle is placed immediately.
    pub fn for_new_upload(png_bytes: Vec<u8>) -> Result<Self, PhotoboxError> {
        let image = decode(&png_bytes)?;
        Ok(Self {
            image,
            image_bytes: Some(png_bytes),
            template_id: None,
            rect: Some(DEFAULT_RECT),
            gesture: Gesture::Idle,
        })
    }

    /// Start a session editing a stored template. The persisted slot, if
    /// any, is pre-populated at scale 1.0.
    #[must_use]
    pub fn for_template(image: DynamicImage, template_id: u64, slot: Option<&Slot>) -> Self {
        Self {
            image,
            image_bytes: None,
            template_id: Some(template_id),
            rect: slot.map(SlotRect::from_slot),
            gesture: Gesture::Idle,
        }
    }

    /// Replace the image mid-session (the "change frame image" flow).
    /// The rectangle is kept so the operator can adjust it to the new art.
    pub fn replace_image(&mut self, png_bytes: Vec<u8>) -> Result<(), PhotoboxError> {
        self.image = decode(&png_bytes)?;
        self.image_bytes = Some(png_bytes);
        Ok(())
    }

    #[must_use]
    pub fn image_size(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    #[must_use]
    pub fn rect(&self) -> Option<&SlotRect> {
        self.rect.as_ref()
    }

    #[must_use]
    pub fn template_id(&self) -> Option<u64> {
        self.template_id
    }

    /// Begin a gesture if the pointer lands on the rectangle.
    pub fn pointer_down(&mut self, pt: Point) {
        let Some(rect) = self.rect else { return };
        self.gesture = match hit_test(&rect, pt) {
            Some(HitPart::Handle(anchor)) => Gesture::Scaling {
                anchor,
                fixed: anchor.opposite().position(&rect),
            },
            Some(HitPart::Body) => Gesture::Moving { last: pt },
            None => Gesture::Idle,
        };
    }

    /// Apply the current gesture to a new pointer position.
    pub fn pointer_move(&mut self, pt: Point) {
        let Some(rect) = self.rect.as_mut() else { return };
        match self.gesture {
            Gesture::Idle => {}
            Gesture::Moving { last } => {
                rect.left += pt.x - last.x;
                rect.top += pt.y - last.y;
                self.gesture = Gesture::Moving { last: pt };
            }
            Gesture::Scaling { anchor, fixed } => {
                // Horizontal: handles on the west edge move `left`; the
                // east edge follows the pointer directly. Raw width is
                // untouched, only the scale factor changes.
                match anchor {
                    HandleAnchor::Nw | HandleAnchor::Sw => {
                        let left = pt.x.min(fixed.x - MIN_DISPLAY_SIZE);
                        rect.scale_x = (fixed.x - left) / rect.width;
                        rect.left = left;
                    }
                    HandleAnchor::Ne | HandleAnchor::Se => {
                        let display_w = (pt.x - fixed.x).max(MIN_DISPLAY_SIZE);
                        rect.scale_x = display_w / rect.width;
                        rect.left = fixed.x;
                    }
                }
                // Vertical, same scheme.
                match anchor {
                    HandleAnchor::Nw | HandleAnchor::Ne => {
                        let top = pt.y.min(fixed.y - MIN_DISPLAY_SIZE);
                        rect.scale_y = (fixed.y - top) / rect.height;
                        rect.top = top;
                    }
                    HandleAnchor::Se | HandleAnchor::Sw => {
                        let display_h = (pt.y - fixed.y).max(MIN_DISPLAY_SIZE);
                        rect.scale_y = display_h / rect.height;
                        rect.top = fixed.y;
                    }
                }
            }
        }
    }

    /// End the active gesture.
    pub fn pointer_up(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// Validate and emit the save payload.
    ///
    /// Rejected with no side effect if the name is empty or no rectangle
    /// exists; creating a new template additionally requires image bytes.
    /// The emitted slot is the recomposed rectangle, clamped to the image.
    pub fn save(&self, name: &str) -> Result<SaveRequest, PhotoboxError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PhotoboxError::Validation("Name is required".to_string()));
        }
        let rect = self
            .rect
            .as_ref()
            .ok_or_else(|| PhotoboxError::Validation("No photo slot defined".to_string()))?;
        if self.template_id.is_none() && self.image_bytes.is_none() {
            return Err(PhotoboxError::Validation("No image file chosen".to_string()));
        }

        let (img_w, img_h) = self.image_size();
        let slot = rect.to_slot().clamped(img_w, img_h);

        Ok(SaveRequest {
            name: name.to_string(),
            config: SlotConfig::single(slot),
            image_bytes: self.image_bytes.clone(),
        })
    }

    /// Render the editing surface: the image at natural size with the slot
    /// interior dimmed, a red border, and blue corner handles.
    #[must_use]
    pub fn render_overlay(&self) -> RgbaImage {
        let mut canvas = self.image.to_rgba8();
        let Some(rect) = &self.rect else { return canvas };

        let (img_w, img_h) = self.image_size();
        let x0 = rect.left;
        let y0 = rect.top;
        let x1 = rect.right();
        let y1 = rect.bottom();

        // Dim the interior so the slot region reads at a glance.
        fill_region(&mut canvas, img_w, img_h, x0, y0, x1, y1, |p| {
            Rgba([
                (f32::from(p[0]) * 0.7) as u8,
                (f32::from(p[1]) * 0.7) as u8,
                (f32::from(p[2]) * 0.7) as u8,
                p[3],
            ])
        });

        // 2px red border.
        const BORDER: Rgba<u8> = Rgba([220, 38, 38, 255]);
        fill_region(&mut canvas, img_w, img_h, x0, y0, x1, y0 + 2.0, |_| BORDER);
        fill_region(&mut canvas, img_w, img_h, x0, y1 - 2.0, x1, y1, |_| BORDER);
        fill_region(&mut canvas, img_w, img_h, x0, y0, x0 + 2.0, y1, |_| BORDER);
        fill_region(&mut canvas, img_w, img_h, x1 - 2.0, y0, x1, y1, |_| BORDER);

        // Blue corner handles.
        const HANDLE: Rgba<u8> = Rgba([37, 99, 235, 255]);
        let half = HANDLE_SIZE / 2.0;
        for anchor in HandleAnchor::ALL {
            let c = anchor.position(rect);
            fill_region(&mut canvas, img_w, img_h, c.x - half, c.y - half, c.x + half, c.y + half, |_| {
                HANDLE
            });
        }

        canvas
    }

    /// The overlay as a PNG stream for the editor UI.
    pub fn overlay_png(&self) -> Result<Vec<u8>, PhotoboxError> {
        encode_png(&self.render_overlay())
    }
}

/// Decode an uploaded template image. The upload boundary is PNG-only, so
/// non-PNG data is rejected here rather than at the later registry save.
fn decode(bytes: &[u8]) -> Result<DynamicImage, PhotoboxError> {
    if !bytes.starts_with(&PNG_MAGIC) {
        return Err(PhotoboxError::Validation(
            "Only PNG files are allowed".to_string(),
        ));
    }
    image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| PhotoboxError::Image(format!("Failed to decode image: {}", e)))
}

/// Apply `f` to every canvas pixel in the half-open region, clipped to the
/// image bounds.
fn fill_region<F>(canvas: &mut RgbaImage, img_w: u32, img_h: u32, x0: f64, y0: f64, x1: f64, y1: f64, f: F)
where
    F: Fn(Rgba<u8>) -> Rgba<u8>,
{
    let x0 = x0.max(0.0) as u32;
    let y0 = y0.max(0.0) as u32;
    let x1 = (x1.max(0.0) as u32).min(img_w);
    let y1 = (y1.max(0.0) as u32).min(img_h);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = *canvas.get_pixel(x, y);
            canvas.put_pixel(x, y, f(p));
        }
    }
}
