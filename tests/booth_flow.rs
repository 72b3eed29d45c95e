//! End-to-end booth flow exercised through the library API: author a
//! template in the editor, store it in the registry, then run the capture
//! state machine through select, preview, shoot, and retake.

use image::{DynamicImage, Rgba, RgbaImage};
use pretty_assertions::assert_eq;

use photobox::capture::{CameraStream, CaptureMachine};
use photobox::compositor;
use photobox::editor::EditorSession;
use photobox::geometry::{Point, Slot};
use photobox::registry::{LayoutType, TemplateStore};

/// Temp data dir removed on drop.
struct TempDir(std::path::PathBuf);

impl TempDir {
    fn new(tag: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "photobox-flow-{}-{}",
            tag,
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&path).unwrap();
        TempDir(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// A 400x600 template PNG: opaque white border artwork with a fully
/// transparent window where the photo shows through.
fn template_png() -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(400, 600, Rgba([255, 255, 255, 255]));
    for y in 100..400 {
        for x in 100..300 {
            img.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        }
    }
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// A solid-color camera frame at webcam resolution.
fn camera_frame(color: Rgba<u8>) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(1280, 720, color))
}

#[test]
fn test_editor_to_registry_to_capture() {
    let dir = TempDir::new("full");

    // Author the template in the editor: drag the default rect over the
    // transparent window, then save. The grab lands mid-body, clear of the
    // corner-handle hit radius.
    let mut session = EditorSession::for_new_upload(template_png()).unwrap();
    session.pointer_down(Point::new(150.0, 150.0));
    session.pointer_move(Point::new(200.0, 200.0));
    session.pointer_up();

    let request = session.save("Birthday Frame").unwrap();
    let slot = request.config.primary().copied().unwrap();
    assert_eq!(slot.x, 100.0);
    assert_eq!(slot.y, 100.0);

    // Persist through the registry.
    let mut store = TemplateStore::open(&dir.0).unwrap();
    let (id, image_path) = {
        let template = store
            .create(
                &request.name,
                LayoutType::Single,
                request.config.clone(),
                &request.image_bytes.unwrap(),
            )
            .unwrap();
        assert_eq!(template.name, "Birthday Frame");
        assert_eq!((template.width, template.height), (400, 600));
        (template.id, template.image_path.clone())
    };

    // Run the capture flow against the stored template.
    let mut machine = CaptureMachine::new();
    let generation = machine.select_template(id);
    machine.attach_stream(CameraStream::new(generation)).unwrap();
    machine.push_frame(camera_frame(Rgba([0, 200, 0, 255]))).unwrap();

    let frame = machine.latest_frame().cloned().unwrap();
    let template_bytes = std::fs::read(dir.0.join(&image_path)).unwrap();
    let template_image = image::load_from_memory(&template_bytes).unwrap();

    let stored = store.get(id).unwrap();
    let png = compositor::composite_png(&template_image, &frame, &stored.config.slots).unwrap();
    machine.captured(generation, png).unwrap();

    let photo = image::load_from_memory(machine.photo().unwrap()).unwrap();
    assert_eq!((photo.width(), photo.height()), (400, 600));

    // Inside the slot the green frame shows through the transparent window.
    let rgba = photo.to_rgba8();
    assert_eq!(*rgba.get_pixel(200, 250), Rgba([0, 200, 0, 255]));
    // Outside the slot the artwork wins.
    assert_eq!(*rgba.get_pixel(10, 10), Rgba([255, 255, 255, 255]));

    // Retake discards the photo and re-arms acquisition with a fresh token.
    let retake_gen = machine.retake().unwrap();
    assert!(retake_gen > generation);
    assert!(machine.photo().is_none());
    assert_eq!(machine.template_id(), Some(id));
}

#[test]
fn test_registry_survives_reopen() {
    let dir = TempDir::new("reopen");

    let session = EditorSession::for_new_upload(template_png()).unwrap();
    let request = session.save("Keeper").unwrap();

    let id = {
        let mut store = TemplateStore::open(&dir.0).unwrap();
        store
            .create(
                &request.name,
                LayoutType::Single,
                request.config,
                &request.image_bytes.unwrap(),
            )
            .unwrap()
            .id
    };

    let store = TemplateStore::open(&dir.0).unwrap();
    let template = store.get(id).unwrap();
    assert_eq!(template.name, "Keeper");
    assert!(store.image_disk_path(template).exists());
}

#[test]
fn test_stale_stream_never_reaches_preview() {
    let mut machine = CaptureMachine::new();
    let first = machine.select_template(1);
    let second = machine.select_template(2);
    assert!(second > first);

    // The first selection's stream arrives late; it must be rejected.
    assert!(machine.attach_stream(CameraStream::new(first)).is_err());
    assert_eq!(machine.state().name(), "acquiring");

    machine.attach_stream(CameraStream::new(second)).unwrap();
    assert_eq!(machine.state().name(), "previewing");
    assert_eq!(machine.template_id(), Some(2));
}

#[test]
fn test_composited_slot_keeps_template_dimensions() {
    let template = image::load_from_memory(&template_png()).unwrap();
    let frame = camera_frame(Rgba([10, 20, 30, 255]));
    let slots = vec![Slot::new(100.0, 100.0, 200.0, 300.0)];

    let canvas = compositor::composite(&template, &frame, &slots).unwrap();
    assert_eq!((canvas.width(), canvas.height()), (400, 600));
}
