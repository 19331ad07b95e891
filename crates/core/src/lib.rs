//! Real dot-matrix display pipeline.
//!
//! Converts still images, generated text and decoded video into the native
//! pixel formats of a 128×32 DMD and hands them to a single writer thread
//! that owns the vendor driver.

pub mod config;
pub mod convert;
pub mod device;
pub mod font;
pub mod high_scores;
pub mod host;
pub mod logging;
pub mod media;
pub mod real_dmd;
pub mod slide;
pub mod slideshow;
pub mod timer;
pub mod video;
pub mod writer;

pub mod types {
    use serde::{Deserialize, Serialize};

    /// Native display width in dots.
    pub const DMD_WIDTH: usize = 128;

    /// Native display height in dots.
    pub const DMD_HEIGHT: usize = 32;

    /// Dots per frame.
    pub const DMD_PIXELS: usize = DMD_WIDTH * DMD_HEIGHT;

    /// Pixel format of a frame, which also selects the driver render call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum ColorSpace {
        /// 4-shade grayscale, one byte per dot (0-3)
        Mono4,
        /// 16-shade grayscale, one byte per dot (0-15)
        Mono16,
        /// 24-bit color, three bytes per dot (R, G, B)
        Rgb24,
    }

    impl ColorSpace {
        pub fn bytes_per_pixel(self) -> usize {
            match self {
                ColorSpace::Mono4 | ColorSpace::Mono16 => 1,
                ColorSpace::Rgb24 => 3,
            }
        }

        /// Size of a full native frame in this color space.
        pub fn frame_len(self) -> usize {
            DMD_PIXELS * self.bytes_per_pixel()
        }

        /// Largest sample value for the monochrome formats.
        pub fn max_level(self) -> u8 {
            match self {
                ColorSpace::Mono4 => 3,
                ColorSpace::Mono16 => 15,
                ColorSpace::Rgb24 => 255,
            }
        }
    }

    /// Mirror/flip state applied when building frames.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Mirror {
        pub horizontal: bool,
        pub vertical: bool,
    }

    impl Mirror {
        pub fn new(horizontal: bool, vertical: bool) -> Self {
            Self {
                horizontal,
                vertical,
            }
        }

        pub fn is_identity(self) -> bool {
            !self.horizontal && !self.vertical
        }
    }
}

pub use config::{ConfigStore, JsonConfigStore, MemoryConfigStore};
pub use device::{BindError, Capability, DeviceBinder, DeviceBinding, DmdDevice, PmOptions};
pub use font::Font;
pub use host::{ErrorReporter, GameId, GameInfo, GameProvider, MediaKind, TitleSettingsSource};
pub use real_dmd::{RealDmd, VideoMode};
pub use slide::{Slide, SlideKind};
pub use types::{ColorSpace, Mirror, DMD_HEIGHT, DMD_PIXELS, DMD_WIDTH};
pub use writer::{OutputQueue, Writer};
