//! # Capture State Machine
//!
//! The capture flow walks a user from the template gallery through a live
//! camera preview to a downloadable composite:
//!
//! ```text
//! Browsing ──select──▶ Acquiring ──attach──▶ Previewing ──captured──▶ Captured
//!     ▲                    │                     │                       │
//!     │                 failed                  back                  retake──▶ Acquiring
//!     └────────────────────┴─────────────────────┴───────back───────────┘
//! ```
//!
//! ## Stream lifecycle
//!
//! At most one camera stream is live at a time. Every transition out of
//! `Previewing`/`Captured` stops the active stream before anything new is
//! acquired, so camera hardware locks cannot leak. Acquisition is
//! asynchronous and cancellable by navigation: each attempt gets a
//! generation token, and a stream arriving with a stale token (the user
//! already navigated away) is stopped immediately instead of attached.

use image::DynamicImage;

use crate::error::PhotoboxError;

/// A live camera stream: the latest frame pushed by the camera plus the
/// stop flag that releases the device.
#[derive(Debug)]
pub struct CameraStream {
    generation: u64,
    latest_frame: Option<DynamicImage>,
    stopped: bool,
}

impl CameraStream {
    #[must_use]
    pub fn new(generation: u64) -> Self {
        Self { generation, latest_frame: None, stopped: false }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop all tracks: the frame is dropped and the stream goes dead.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.latest_frame = None;
    }
}

/// The capture flow states.
#[derive(Debug)]
pub enum CaptureState {
    /// Gallery view; no template selected, no camera held.
    Browsing,
    /// A template was selected and camera acquisition is in flight
    /// (the permission prompt may still be pending).
    Acquiring { template_id: u64 },
    /// Camera live; frames arrive and the subject frames themselves.
    Previewing { template_id: u64, stream: CameraStream },
    /// A composite was produced; the camera is released.
    Captured { template_id: u64, photo_png: Vec<u8> },
}

impl CaptureState {
    /// State name for the API surface.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Browsing => "browsing",
            Self::Acquiring { .. } => "acquiring",
            Self::Previewing { .. } => "previewing",
            Self::Captured { .. } => "captured",
        }
    }
}

/// The capture flow, driven by user actions and camera events.
#[derive(Debug)]
pub struct CaptureMachine {
    state: CaptureState,
    /// Current acquisition generation; bumping it invalidates any stream
    /// still in flight.
    generation: u64,
}

impl Default for CaptureMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureMachine {
    #[must_use]
    pub fn new() -> Self {
        Self { state: CaptureState::Browsing, generation: 0 }
    }

    #[must_use]
    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Current acquisition generation token.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The template involved in the current flow, if any.
    #[must_use]
    pub fn template_id(&self) -> Option<u64> {
        match &self.state {
            CaptureState::Browsing => None,
            CaptureState::Acquiring { template_id }
            | CaptureState::Previewing { template_id, .. }
            | CaptureState::Captured { template_id, .. } => Some(*template_id),
        }
    }

    /// Select a template and start camera acquisition. Any previously held
    /// stream is stopped first. Returns the generation token the eventual
    /// stream must carry.
    pub fn select_template(&mut self, template_id: u64) -> u64 {
        self.stop_active_stream();
        self.generation += 1;
        self.state = CaptureState::Acquiring { template_id };
        self.generation
    }

    /// Attach an acquired stream.
    ///
    /// A stream whose generation is stale, or that arrives when no
    /// acquisition is pending, is stopped immediately and never attached:
    /// the user has already navigated on.
    pub fn attach_stream(&mut self, mut stream: CameraStream) -> Result<(), PhotoboxError> {
        let CaptureState::Acquiring { template_id } = self.state else {
            stream.stop();
            return Err(PhotoboxError::Camera(
                "No camera acquisition in progress".to_string(),
            ));
        };
        if stream.generation() != self.generation {
            stream.stop();
            return Err(PhotoboxError::Camera("Stale camera stream".to_string()));
        }
        self.state = CaptureState::Previewing { template_id, stream };
        Ok(())
    }

    /// Camera acquisition failed (permission denied, no device). The flow
    /// returns to browsing and is fully recoverable; failures from stale
    /// attempts are ignored.
    pub fn acquisition_failed(&mut self, generation: u64) {
        if generation == self.generation && matches!(self.state, CaptureState::Acquiring { .. }) {
            self.state = CaptureState::Browsing;
        }
    }

    /// Push the latest camera frame into the live stream.
    pub fn push_frame(&mut self, frame: DynamicImage) -> Result<(), PhotoboxError> {
        match &mut self.state {
            CaptureState::Previewing { stream, .. } => {
                stream.latest_frame = Some(frame);
                Ok(())
            }
            _ => Err(PhotoboxError::Camera("Camera is not previewing".to_string())),
        }
    }

    /// The most recent frame, while previewing.
    #[must_use]
    pub fn latest_frame(&self) -> Option<&DynamicImage> {
        match &self.state {
            CaptureState::Previewing { stream, .. } => stream.latest_frame.as_ref(),
            _ => None,
        }
    }

    /// Record the composited photo. The stream is stopped before the state
    /// moves on.
    ///
    /// Compositing runs outside the machine's lock, so the result carries
    /// the generation it was produced under; a composite finishing after
    /// the user navigated to another flow is rejected like a stale stream.
    pub fn captured(&mut self, generation: u64, photo_png: Vec<u8>) -> Result<(), PhotoboxError> {
        if generation != self.generation {
            return Err(PhotoboxError::Camera("Stale capture result".to_string()));
        }
        match &mut self.state {
            CaptureState::Previewing { template_id, stream } => {
                stream.stop();
                let template_id = *template_id;
                self.state = CaptureState::Captured { template_id, photo_png };
                Ok(())
            }
            _ => Err(PhotoboxError::Camera("Nothing is being previewed".to_string())),
        }
    }

    /// The captured photo, once one exists.
    #[must_use]
    pub fn photo(&self) -> Option<&[u8]> {
        match &self.state {
            CaptureState::Captured { photo_png, .. } => Some(photo_png),
            _ => None,
        }
    }

    /// Discard the captured photo and restart the camera. Returns the new
    /// acquisition generation.
    pub fn retake(&mut self) -> Result<u64, PhotoboxError> {
        let CaptureState::Captured { template_id, .. } = self.state else {
            return Err(PhotoboxError::Camera("Nothing to retake".to_string()));
        };
        self.generation += 1;
        self.state = CaptureState::Acquiring { template_id };
        Ok(self.generation)
    }

    /// Return to browsing from any state: stop the stream, drop any
    /// captured photo, invalidate in-flight acquisitions.
    pub fn back(&mut self) {
        self.stop_active_stream();
        self.generation += 1;
        self.state = CaptureState::Browsing;
    }

    fn stop_active_stream(&mut self) {
        if let CaptureState::Previewing { stream, .. } = &mut self.state {
            stream.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use pretty_assertions::assert_eq;

    fn frame() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(4, 4))
    }

    fn machine_in_previewing() -> (CaptureMachine, u64) {
        let mut m = CaptureMachine::new();
        let generation = m.select_template(1);
        m.attach_stream(CameraStream::new(generation)).unwrap();
        (m, generation)
    }

    #[test]
    fn test_starts_browsing() {
        let m = CaptureMachine::new();
        assert_eq!(m.state().name(), "browsing");
        assert_eq!(m.template_id(), None);
    }

    #[test]
    fn test_select_then_attach_enters_previewing() {
        let mut m = CaptureMachine::new();
        let generation = m.select_template(5);
        assert_eq!(m.state().name(), "acquiring");

        m.attach_stream(CameraStream::new(generation)).unwrap();
        assert_eq!(m.state().name(), "previewing");
        assert_eq!(m.template_id(), Some(5));
    }

    #[test]
    fn test_stale_stream_is_stopped_not_attached() {
        let mut m = CaptureMachine::new();
        let stale = m.select_template(1);
        // User navigates to another template while the prompt is pending
        let fresh = m.select_template(2);
        assert_ne!(stale, fresh);

        let err = m.attach_stream(CameraStream::new(stale)).unwrap_err();
        assert!(matches!(err, PhotoboxError::Camera(_)));
        assert_eq!(m.state().name(), "acquiring");
        assert_eq!(m.template_id(), Some(2));
    }

    #[test]
    fn test_stream_after_back_is_rejected() {
        let mut m = CaptureMachine::new();
        let generation = m.select_template(1);
        m.back();

        let err = m.attach_stream(CameraStream::new(generation)).unwrap_err();
        assert!(matches!(err, PhotoboxError::Camera(_)));
        assert_eq!(m.state().name(), "browsing");
    }

    #[test]
    fn test_permission_denied_returns_to_browsing() {
        let mut m = CaptureMachine::new();
        let generation = m.select_template(1);
        m.acquisition_failed(generation);
        assert_eq!(m.state().name(), "browsing");
        // No stream was ever retained
        assert!(m.latest_frame().is_none());
    }

    #[test]
    fn test_stale_failure_is_ignored() {
        let mut m = CaptureMachine::new();
        let stale = m.select_template(1);
        let fresh = m.select_template(2);
        m.acquisition_failed(stale);
        assert_eq!(m.state().name(), "acquiring");
        m.acquisition_failed(fresh);
        assert_eq!(m.state().name(), "browsing");
    }

    #[test]
    fn test_frames_only_flow_while_previewing() {
        let mut m = CaptureMachine::new();
        assert!(m.push_frame(frame()).is_err());

        let (mut m, _) = machine_in_previewing();
        m.push_frame(frame()).unwrap();
        assert!(m.latest_frame().is_some());
    }

    #[test]
    fn test_capture_stops_camera_and_holds_photo() {
        let (mut m, generation) = machine_in_previewing();
        m.push_frame(frame()).unwrap();
        m.captured(generation, vec![1, 2, 3]).unwrap();

        assert_eq!(m.state().name(), "captured");
        assert_eq!(m.photo(), Some(&[1u8, 2, 3][..]));
        // Stream gone with the state change
        assert!(m.latest_frame().is_none());
    }

    #[test]
    fn test_capture_requires_previewing() {
        let mut m = CaptureMachine::new();
        assert!(m.captured(m.generation(), vec![0]).is_err());
        let generation = m.select_template(1);
        assert!(m.captured(generation, vec![0]).is_err());
    }

    #[test]
    fn test_stale_composite_is_rejected() {
        // A composite finishing after the user backed out and started a new
        // flow must not become the new flow's photo.
        let (mut m, stale) = machine_in_previewing();
        m.push_frame(frame()).unwrap();
        m.back();

        let fresh = m.select_template(2);
        m.attach_stream(CameraStream::new(fresh)).unwrap();

        let err = m.captured(stale, vec![0xAA]).unwrap_err();
        assert!(matches!(err, PhotoboxError::Camera(_)));
        assert_eq!(m.state().name(), "previewing");
        assert_eq!(m.template_id(), Some(2));
        assert!(m.photo().is_none());

        // The current flow's composite is still accepted
        m.captured(fresh, vec![0xBB]).unwrap();
        assert_eq!(m.photo(), Some(&[0xBBu8][..]));
    }

    #[test]
    fn test_retake_restarts_acquisition() {
        let (mut m, generation) = machine_in_previewing();
        m.captured(generation, vec![9]).unwrap();

        let generation = m.retake().unwrap();
        assert_eq!(m.state().name(), "acquiring");
        assert_eq!(m.template_id(), Some(1));
        assert!(m.photo().is_none());

        m.attach_stream(CameraStream::new(generation)).unwrap();
        assert_eq!(m.state().name(), "previewing");
    }

    #[test]
    fn test_retake_only_from_captured() {
        let (mut m, _) = machine_in_previewing();
        assert!(m.retake().is_err());
    }

    #[test]
    fn test_back_clears_everything() {
        let (mut m, _) = machine_in_previewing();
        m.push_frame(frame()).unwrap();
        m.back();
        assert_eq!(m.state().name(), "browsing");
        assert!(m.latest_frame().is_none());
        assert!(m.photo().is_none());

        let (mut m, generation) = machine_in_previewing();
        m.captured(generation, vec![7]).unwrap();
        m.back();
        assert_eq!(m.state().name(), "browsing");
        assert!(m.photo().is_none());
    }
}
