//! # Cover-Fit Compositor
//!
//! Produces the final exported photo: a slot rectangle filled with a
//! "cover"-cropped, horizontally mirrored region of the camera frame, with
//! the template artwork layered on top so that only the template's
//! transparent regions reveal the photo beneath.
//!
//! ## Cover fit
//!
//! Cover fit is the aspect-ratio-preserving crop that fills a target
//! rectangle completely without letterboxing, sacrificing the minimum
//! necessary source content. With `videoRatio = vw / vh` and
//! `rectRatio = w / h`:
//!
//! ```text
//! rectRatio > videoRatio          rectRatio <= videoRatio
//! (rect wider than video)         (rect taller than video)
//!
//!   ┌──────────────┐                ┌───┬──────┬───┐
//!   ├──────────────┤  crop rows       │   │ crop │   │  crop columns
//!   │    kept      │  top+bottom      │   │ kept │   │  left+right
//!   ├──────────────┤                │   │      │   │
//!   └──────────────┘                └───┴──────┴───┘
//! ```
//!
//! The crop is centered on the discarded axis. Its aspect ratio equals the
//! rectangle's exactly, so scaling it into the rectangle never distorts.
//!
//! ## Mirroring
//!
//! The live preview shows the subject mirrored, like a real mirror. The
//! composited crop is flipped about the rectangle's vertical center so the
//! exported photo matches what the subject saw while framing.
//!
//! ## Coordinate spaces
//!
//! Everything here is raw pixels: the output raster has the template's
//! natural dimensions, and the crop is computed from the camera frame's
//! natural dimensions. On-screen preview scaling never enters this module,
//! so display size cannot introduce capture inaccuracy.

use image::{DynamicImage, RgbaImage, imageops};

use crate::error::PhotoboxError;
use crate::geometry::Slot;

/// A source crop region inside the camera frame, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub sx: f64,
    pub sy: f64,
    pub sw: f64,
    pub sh: f64,
}

/// Compute the centered cover-fit crop of a `video_w` x `video_h` frame
/// for a destination rectangle of `rect_w` x `rect_h`.
///
/// The returned region has the destination's aspect ratio and lies fully
/// inside the frame.
pub fn cover_crop(
    video_w: u32,
    video_h: u32,
    rect_w: f64,
    rect_h: f64,
) -> Result<CropRegion, PhotoboxError> {
    if video_w == 0 || video_h == 0 {
        return Err(PhotoboxError::Image("Camera frame has zero size".to_string()));
    }
    if rect_w <= 0.0 || rect_h <= 0.0 {
        return Err(PhotoboxError::Validation(format!(
            "Slot has degenerate size {}x{}",
            rect_w, rect_h
        )));
    }

    let video_w = f64::from(video_w);
    let video_h = f64::from(video_h);
    let video_ratio = video_w / video_h;
    let rect_ratio = rect_w / rect_h;

    let region = if rect_ratio > video_ratio {
        // Rect is wider than the video: keep full width, crop rows.
        let sw = video_w;
        let sh = video_w / rect_ratio;
        CropRegion { sx: 0.0, sy: (video_h - sh) / 2.0, sw, sh }
    } else {
        // Rect is taller than the video: keep full height, crop columns.
        let sh = video_h;
        let sw = video_h * rect_ratio;
        CropRegion { sx: (video_w - sw) / 2.0, sy: 0.0, sw, sh }
    };

    Ok(region)
}

/// Composite a camera frame into the slots of a template image.
///
/// The output canvas has the template's natural pixel dimensions and starts
/// fully transparent. Each slot receives the mirrored cover-fit crop of
/// `frame`; the template is then alpha-composited on top at `(0, 0)`, so
/// its opaque artwork occludes everything except the slot windows.
///
/// Fails with no output if `slots` is empty or any image is degenerate:
/// a blank or garbled export is never produced.
pub fn composite(
    template: &DynamicImage,
    frame: &DynamicImage,
    slots: &[Slot],
) -> Result<RgbaImage, PhotoboxError> {
    if slots.is_empty() {
        return Err(PhotoboxError::Validation(
            "Template has no photo slot defined".to_string(),
        ));
    }

    let out_w = template.width();
    let out_h = template.height();
    if out_w == 0 || out_h == 0 {
        return Err(PhotoboxError::Image("Template image has zero size".to_string()));
    }

    let frame_rgba = frame.to_rgba8();
    let mut canvas = RgbaImage::new(out_w, out_h);

    for slot in slots {
        let slot = slot.clamped(out_w, out_h);
        let crop = cover_crop(frame.width(), frame.height(), slot.width, slot.height)?;

        // Integer crop bounds, kept inside the frame.
        let sx = (crop.sx.round().max(0.0) as u32).min(frame.width() - 1);
        let sy = (crop.sy.round().max(0.0) as u32).min(frame.height() - 1);
        let sw = (crop.sw.round() as u32).clamp(1, frame.width() - sx);
        let sh = (crop.sh.round() as u32).clamp(1, frame.height() - sy);

        let dest_w = (slot.width.round() as u32).max(1);
        let dest_h = (slot.height.round() as u32).max(1);

        let cropped = imageops::crop_imm(&frame_rgba, sx, sy, sw, sh).to_image();
        let scaled = imageops::resize(&cropped, dest_w, dest_h, imageops::FilterType::Triangle);
        // Flip about the rectangle's vertical center to match the mirrored
        // live preview.
        let mirrored = imageops::flip_horizontal(&scaled);

        imageops::overlay(&mut canvas, &mirrored, slot.x.round() as i64, slot.y.round() as i64);
    }

    // Template artwork goes on top at natural size; transparent regions
    // reveal the photo drawn beneath.
    imageops::overlay(&mut canvas, &template.to_rgba8(), 0, 0);

    Ok(canvas)
}

/// Composite and encode as a lossless PNG stream.
pub fn composite_png(
    template: &DynamicImage,
    frame: &DynamicImage,
    slots: &[Slot],
) -> Result<Vec<u8>, PhotoboxError> {
    let canvas = composite(template, frame, slots)?;
    encode_png(&canvas)
}

/// Encode an RGBA canvas as PNG bytes.
pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, PhotoboxError> {
    let mut bytes = Vec::new();
    canvas
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| PhotoboxError::Image(format!("Failed to encode PNG: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    /// A template with a transparent window at the given slot and opaque
    /// white everywhere else.
    fn template_with_window(w: u32, h: u32, slot: &Slot) -> DynamicImage {
        let mut img = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));
        for y in slot.y as u32..(slot.y + slot.height) as u32 {
            for x in slot.x as u32..(slot.x + slot.width) as u32 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    fn solid_frame(w: u32, h: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(color)))
    }

    #[test]
    fn test_cover_crop_tall_rect_crops_columns() {
        // Portrait slot 200x300 on a landscape 1280x720 frame.
        // rectRatio 0.667 < videoRatio 1.778, so keep full height.
        let crop = cover_crop(1280, 720, 200.0, 300.0).unwrap();
        assert_eq!(crop.sh, 720.0);
        assert!(approx_eq(crop.sw, 720.0 * (200.0 / 300.0)));
        assert_eq!(crop.sy, 0.0);
        assert!(approx_eq(crop.sx, (1280.0 - 480.0) / 2.0));
    }

    #[test]
    fn test_cover_crop_wide_rect_crops_rows() {
        // Rect wider than the video: keep full width, center vertically.
        let crop = cover_crop(1280, 720, 400.0, 100.0).unwrap();
        assert_eq!(crop.sw, 1280.0);
        assert!(approx_eq(crop.sh, 1280.0 / 4.0));
        assert_eq!(crop.sx, 0.0);
        assert!(approx_eq(crop.sy, (720.0 - 320.0) / 2.0));
    }

    #[test]
    fn test_cover_crop_preserves_rect_ratio() {
        let sizes = [(1280u32, 720u32), (720, 1280), (640, 480), (1920, 1080), (100, 100)];
        let rects = [(200.0, 300.0), (300.0, 200.0), (1.0, 1000.0), (1000.0, 1.0), (50.0, 50.0)];

        for (vw, vh) in sizes {
            for (rw, rh) in rects {
                let crop = cover_crop(vw, vh, rw, rh).unwrap();
                let rect_ratio = rw / rh;
                assert!(
                    approx_eq(crop.sw / crop.sh, rect_ratio),
                    "crop ratio {} != rect ratio {} for video {}x{} rect {}x{}",
                    crop.sw / crop.sh,
                    rect_ratio,
                    vw,
                    vh,
                    rw,
                    rh
                );
                // Crop must lie fully inside the frame
                assert!(crop.sx >= 0.0 && crop.sy >= 0.0);
                assert!(crop.sx + crop.sw <= f64::from(vw) + EPSILON);
                assert!(crop.sy + crop.sh <= f64::from(vh) + EPSILON);
            }
        }
    }

    #[test]
    fn test_cover_crop_matching_ratio_is_full_frame() {
        let crop = cover_crop(1280, 720, 640.0, 360.0).unwrap();
        assert_eq!(crop, CropRegion { sx: 0.0, sy: 0.0, sw: 1280.0, sh: 720.0 });
    }

    #[test]
    fn test_cover_crop_rejects_degenerate_inputs() {
        assert!(cover_crop(0, 720, 100.0, 100.0).is_err());
        assert!(cover_crop(1280, 0, 100.0, 100.0).is_err());
        assert!(cover_crop(1280, 720, 0.0, 100.0).is_err());
        assert!(cover_crop(1280, 720, 100.0, -5.0).is_err());
    }

    #[test]
    fn test_composite_output_matches_template_natural_size() {
        let slot = Slot::new(100.0, 50.0, 200.0, 300.0);
        let template = template_with_window(800, 600, &slot);
        let frame = solid_frame(1280, 720, [10, 200, 30, 255]);

        let out = composite(&template, &frame, &[slot]).unwrap();
        assert_eq!((out.width(), out.height()), (800, 600));
    }

    #[test]
    fn test_composite_fills_window_and_keeps_artwork() {
        let slot = Slot::new(100.0, 50.0, 200.0, 300.0);
        let template = template_with_window(800, 600, &slot);
        let frame = solid_frame(1280, 720, [10, 200, 30, 255]);

        let out = composite(&template, &frame, &[slot]).unwrap();
        // Inside the transparent window the frame shows through
        assert_eq!(*out.get_pixel(200, 200), Rgba([10, 200, 30, 255]));
        // Outside the window the opaque artwork occludes the photo
        assert_eq!(*out.get_pixel(10, 10), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(700, 500), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_composite_mirrors_horizontally() {
        // Frame: left half red, right half blue. Mirrored output should show
        // blue on the left side of the slot.
        let mut frame = RgbaImage::from_pixel(400, 300, Rgba([255, 0, 0, 255]));
        for y in 0..300 {
            for x in 200..400 {
                frame.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let frame = DynamicImage::ImageRgba8(frame);

        // Slot with the frame's exact ratio so no cropping occurs.
        let slot = Slot::new(0.0, 0.0, 400.0, 300.0);
        let template = template_with_window(400, 300, &slot);

        let out = composite(&template, &frame, &[slot]).unwrap();
        assert_eq!(*out.get_pixel(10, 150), Rgba([0, 0, 255, 255]), "left should be mirrored blue");
        assert_eq!(*out.get_pixel(390, 150), Rgba([255, 0, 0, 255]), "right should be mirrored red");
    }

    #[test]
    fn test_composite_clamps_overflowing_slot() {
        // Slot extends past the template edge; compositing must not panic
        // and output still has the template size.
        let slot = Slot::new(700.0, 500.0, 300.0, 300.0);
        let template = solid_frame(800, 600, [255, 255, 255, 0]);
        let frame = solid_frame(640, 480, [1, 2, 3, 255]);

        let out = composite(&template, &frame, &[slot]).unwrap();
        assert_eq!((out.width(), out.height()), (800, 600));
        assert_eq!(*out.get_pixel(750, 550), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_composite_without_slot_produces_no_output() {
        let template = solid_frame(800, 600, [255, 255, 255, 255]);
        let frame = solid_frame(640, 480, [1, 2, 3, 255]);
        let err = composite(&template, &frame, &[]).unwrap_err();
        assert!(matches!(err, PhotoboxError::Validation(_)));
    }

    #[test]
    fn test_composite_png_is_png() {
        let slot = Slot::new(10.0, 10.0, 50.0, 50.0);
        let template = template_with_window(100, 100, &slot);
        let frame = solid_frame(640, 480, [9, 9, 9, 255]);

        let bytes = composite_png(&template, &frame, &[slot]).unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
