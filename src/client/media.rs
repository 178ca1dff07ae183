//! Local media tracks and the device seam.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

/// Placeholder video width in pixels
pub const PLACEHOLDER_WIDTH: u32 = 640;
/// Placeholder video height in pixels
pub const PLACEHOLDER_HEIGHT: u32 = 480;
/// Placeholder frame rate
pub const PLACEHOLDER_FPS: u32 = 1;

/// Where an outbound video track comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoSource {
    /// Black frames keeping the pipeline warm
    Placeholder,
    Camera,
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TrackId(Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTrack {
    pub id: TrackId,
    pub source: VideoSource,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl VideoTrack {
    /// A fresh 640x480 black track at 1 frame per second.
    pub fn placeholder() -> Self {
        Self {
            id: TrackId::new(),
            source: VideoSource::Placeholder,
            width: PLACEHOLDER_WIDTH,
            height: PLACEHOLDER_HEIGHT,
            frame_rate: PLACEHOLDER_FPS,
        }
    }

    pub fn new(source: VideoSource, width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            id: TrackId::new(),
            source,
            width,
            height,
            frame_rate,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == VideoSource::Placeholder
    }
}

/// Microphone track. Muting toggles `enabled` and is never signaled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioTrack {
    pub id: TrackId,
    pub enabled: bool,
}

impl AudioTrack {
    pub fn new() -> Self {
        Self {
            id: TrackId::new(),
            enabled: true,
        }
    }
}

impl Default for AudioTrack {
    fn default() -> Self {
        Self::new()
    }
}

/// Device access failures. Only the local caller ever sees these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("Permission denied for {0}")]
    PermissionDenied(&'static str),

    #[error("No {0} device found")]
    NotFound(&'static str),

    #[error("Capture was cancelled")]
    Cancelled,
}

/// Access to local capture devices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open_microphone(&self) -> Result<AudioTrack, MediaError>;

    async fn open_camera(&self) -> Result<VideoTrack, MediaError>;

    async fn open_screen(&self) -> Result<VideoTrack, MediaError>;
}
