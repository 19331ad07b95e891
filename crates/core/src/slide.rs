//! Frames ready for the device.

use crate::types::{ColorSpace, DMD_PIXELS};
use std::sync::Arc;
use std::time::Duration;

/// Where a slide came from. Only used to decide which slides are purged
/// when high score graphics are regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    /// Blank frame used to clear the display
    Empty,
    /// Still image from the game's media, or the built-in placeholder
    Media,
    /// Text synthesized with the font rasterizer
    GeneratedText,
}

/// A native-resolution frame plus its slide-show metadata.
///
/// Slides are immutable once built and shared as `Arc<Slide>` between the
/// slide list and the writer, so the list can be rebuilt while the writer
/// is still sending the previous frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    color_space: ColorSpace,
    pixels: Vec<u8>,
    display_time: Duration,
    kind: SlideKind,
}

impl Slide {
    /// Build a slide from a full native frame.
    ///
    /// # Panics
    /// Panics if `pixels` is not exactly one frame in `color_space`.
    pub fn new(
        color_space: ColorSpace,
        pixels: Vec<u8>,
        display_time: Duration,
        kind: SlideKind,
    ) -> Self {
        assert_eq!(
            pixels.len(),
            color_space.frame_len(),
            "{:?} frame must be {} bytes",
            color_space,
            color_space.frame_len()
        );
        Self {
            color_space,
            pixels,
            display_time,
            kind,
        }
    }

    /// All-dark Mono16 frame shown until something replaces it.
    pub fn empty() -> Self {
        Self::new(
            ColorSpace::Mono16,
            vec![0; DMD_PIXELS],
            Duration::ZERO,
            SlideKind::Empty,
        )
    }

    pub fn into_shared(self) -> Arc<Slide> {
        Arc::new(self)
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn display_time(&self) -> Duration {
        self.display_time
    }

    pub fn kind(&self) -> SlideKind {
        self.kind
    }

    pub fn with_display_time(mut self, display_time: Duration) -> Self {
        self.display_time = display_time;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slide_is_dark_mono16() {
        let slide = Slide::empty();
        assert_eq!(slide.color_space(), ColorSpace::Mono16);
        assert_eq!(slide.kind(), SlideKind::Empty);
        assert_eq!(slide.display_time(), Duration::ZERO);
        assert!(slide.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn rgb_slide_holds_three_bytes_per_dot() {
        let slide = Slide::new(
            ColorSpace::Rgb24,
            vec![7; DMD_PIXELS * 3],
            Duration::from_millis(7000),
            SlideKind::Media,
        );
        assert_eq!(slide.pixels().len(), DMD_PIXELS * 3);
    }

    #[test]
    #[should_panic]
    fn wrong_buffer_size_panics() {
        Slide::new(
            ColorSpace::Rgb24,
            vec![0; DMD_PIXELS],
            Duration::ZERO,
            SlideKind::Media,
        );
    }
}
