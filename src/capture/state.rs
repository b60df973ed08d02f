//! Capture state machine.

/// States of a capture controller.
///
/// ```text
/// Idle ──start_recording──▶ Recording
///      ──stop_recording───▶ Stopped ──▶ Encoding ──handoff──▶ Idle
/// Recording ──cancel──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    /// No session; the microphone is free as far as this controller is
    /// concerned.
    #[default]
    Idle,

    /// The microphone is held and audio is being buffered.
    Recording,

    /// The microphone has been released; the raw clip is being collected.
    Stopped,

    /// The clip is being normalised to the upload encoding.
    Encoding,
}

impl CaptureState {
    /// Returns `true` while a session is in progress.
    ///
    /// ```
    /// use artwork_audio::capture::CaptureState;
    ///
    /// assert!(!CaptureState::Idle.is_busy());
    /// assert!(CaptureState::Recording.is_busy());
    /// assert!(CaptureState::Encoding.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, CaptureState::Idle)
    }

    /// A short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            CaptureState::Idle => "Idle",
            CaptureState::Recording => "Recording",
            CaptureState::Stopped => "Stopped",
            CaptureState::Encoding => "Encoding",
        }
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
