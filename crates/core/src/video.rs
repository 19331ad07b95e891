//! Video playback collaborators.
//!
//! Decoding is done by the host. A [`VideoSource`] opens a file and returns
//! a [`VideoPlayer`]; decoded frames are pushed into a [`VideoFrameSink`]
//! from the decoder's own thread, while loop and end-of-presentation
//! notices are routed back to the host thread as [`VideoEvent`]s.

use crate::convert::YuvFrame;
use crate::media::MediaError;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Allocate a process-unique cookie for a new player.
pub fn next_cookie() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Receives decoded frames on the decoder thread.
pub trait VideoFrameSink: Send + Sync {
    fn present_frame(&self, cookie: u64, frame: &YuvFrame<'_>);
}

/// Playback notices, delivered on the host thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    /// The video reached its end and wants to start over
    LoopNeeded(u64),
    /// The video reached its end and will not loop by itself
    EndOfPresentation(u64),
}

/// A loaded video.
pub trait VideoPlayer: Send {
    fn cookie(&self) -> u64;

    fn media_path(&self) -> &Path;

    fn is_playing(&self) -> bool;

    fn play(&mut self) -> Result<(), MediaError>;

    /// Restart from the beginning.
    fn replay(&mut self) -> Result<(), MediaError>;

    fn stop(&mut self);
}

/// Opens videos for playback.
pub trait VideoSource: Send + Sync {
    fn open(
        &self,
        path: &Path,
        looping: bool,
        sink: Arc<dyn VideoFrameSink>,
    ) -> Result<Box<dyn VideoPlayer>, MediaError>;
}

/// Source for hosts without a decoder; every open fails, so media
/// selection falls through to still images.
pub struct NoVideoSource;

impl VideoSource for NoVideoSource {
    fn open(
        &self,
        path: &Path,
        _looping: bool,
        _sink: Arc<dyn VideoFrameSink>,
    ) -> Result<Box<dyn VideoPlayer>, MediaError> {
        Err(MediaError::VideoOpen {
            path: path.to_path_buf(),
            detail: "video playback is not available".to_string(),
        })
    }
}
