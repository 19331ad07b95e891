//! Media selection and still-image loading.

use crate::convert::{mirror_frame, rgb_to_mono16, RgbImage};
use crate::device::Capability;
use crate::font;
use crate::host::{GameInfo, GameProvider, MediaKind};
use crate::logging::{log, LogCategory, LogLevel};
use crate::slide::{Slide, SlideKind};
use crate::types::{ColorSpace, Mirror, DMD_HEIGHT, DMD_WIDTH};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// How long a still image stays up before the show moves on.
pub const IMAGE_DISPLAY_TIME: Duration = Duration::from_millis(7000);

/// Media kinds in the order they are tried.
pub const PRECEDENCE: [MediaKind; 6] = [
    MediaKind::RealDmdColorVideo,
    MediaKind::RealDmdVideo,
    MediaKind::RealDmdColorImage,
    MediaKind::RealDmdImage,
    MediaKind::DmdVideo,
    MediaKind::DmdImage,
];

/// Media kinds looked up among the provider's defaults. The color kinds
/// are only used on color devices.
pub const DEFAULT_PRECEDENCE: [MediaKind; 4] = [
    MediaKind::RealDmdColorVideo,
    MediaKind::RealDmdVideo,
    MediaKind::RealDmdColorImage,
    MediaKind::RealDmdImage,
];

/// Startup video shown on color devices.
pub const STARTUP_VIDEO_COLOR: &str = "Startup Video (realdmd color)";

/// Startup video shown on monochrome devices, and on color devices that
/// lack a color one.
pub const STARTUP_VIDEO_MONO: &str = "Startup Video (realdmd)";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PNG decode error: {0}")]
    Png(#[from] png::DecodingError),
    #[error("unsupported pixel layout: {0}")]
    UnsupportedLayout(String),
    #[error("unable to open video {}: {}", .path.display(), .detail)]
    VideoOpen { path: PathBuf, detail: String },
}

/// A media file plus the color space it will be shown in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    pub kind: MediaKind,
    pub path: PathBuf,
    pub color_space: ColorSpace,
}

/// Color space a source of `kind` renders in on a device with `capability`.
/// Monochrome sources stay monochrome even on color devices.
pub fn color_space_for(kind: MediaKind, capability: Capability) -> ColorSpace {
    if kind.is_color() && capability.supports_rgb {
        ColorSpace::Rgb24
    } else {
        ColorSpace::Mono16
    }
}

/// Media to try for `game`, best first.
///
/// The game's own media comes first. Only when the game has none (or no
/// game is selected) are the provider's real-DMD defaults consulted, the
/// color ones only on a color device. Videos are left out when
/// `videos_enabled` is false.
pub fn select_candidates(
    provider: &dyn GameProvider,
    game: Option<&GameInfo>,
    capability: Capability,
    videos_enabled: bool,
) -> Vec<MediaCandidate> {
    let wanted = PRECEDENCE
        .iter()
        .copied()
        .filter(|kind| videos_enabled || !kind.is_video());
    let wanted_defaults = DEFAULT_PRECEDENCE
        .iter()
        .copied()
        .filter(|kind| videos_enabled || !kind.is_video())
        .filter(|kind| capability.supports_rgb || !kind.is_color());

    let candidate = |kind: MediaKind, path: PathBuf| MediaCandidate {
        kind,
        path,
        color_space: color_space_for(kind, capability),
    };

    let mut found: Vec<MediaCandidate> = match game {
        Some(game) => wanted
            .filter_map(|kind| provider.media_path(game, kind).map(|p| candidate(kind, p)))
            .collect(),
        None => Vec::new(),
    };

    if found.is_empty() {
        found = wanted_defaults
            .filter_map(|kind| provider.default_media_path(kind).map(|p| candidate(kind, p)))
            .collect();
    }
    found
}

/// Startup videos to try, best first for the device.
pub fn startup_candidates(
    provider: &dyn GameProvider,
    capability: Capability,
) -> Vec<MediaCandidate> {
    let order = if capability.supports_rgb {
        [
            (MediaKind::RealDmdColorVideo, STARTUP_VIDEO_COLOR),
            (MediaKind::RealDmdVideo, STARTUP_VIDEO_MONO),
        ]
    } else {
        [
            (MediaKind::RealDmdVideo, STARTUP_VIDEO_MONO),
            (MediaKind::RealDmdColorVideo, STARTUP_VIDEO_COLOR),
        ]
    };
    order
        .into_iter()
        .filter_map(|(kind, name)| {
            provider.startup_video_path(name).map(|path| MediaCandidate {
                kind,
                path,
                color_space: color_space_for(kind, capability),
            })
        })
        .collect()
}

/// Decode a PNG file into packed 8-bit RGB. Alpha is composited over black.
pub fn load_png(path: &Path) -> Result<RgbImage, MediaError> {
    let mut decoder = png::Decoder::new(BufReader::new(File::open(path)?));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    let data = &buf[..info.buffer_size()];

    if info.bit_depth != png::BitDepth::Eight {
        return Err(MediaError::UnsupportedLayout(format!(
            "{:?} bit depth",
            info.bit_depth
        )));
    }

    let over_black = |c: u8, a: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
    let pixels: Vec<u8> = match info.color_type {
        png::ColorType::Rgb => data.to_vec(),
        png::ColorType::Rgba => data
            .chunks_exact(4)
            .flat_map(|p| {
                [
                    over_black(p[0], p[3]),
                    over_black(p[1], p[3]),
                    over_black(p[2], p[3]),
                ]
            })
            .collect(),
        png::ColorType::Grayscale => data.iter().flat_map(|&g| [g, g, g]).collect(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .flat_map(|p| {
                let g = over_black(p[0], p[1]);
                [g, g, g]
            })
            .collect(),
        other => {
            return Err(MediaError::UnsupportedLayout(format!("{:?}", other)));
        }
    };

    Ok(RgbImage::new(
        info.width as usize,
        info.height as usize,
        pixels,
    ))
}

/// Build a native still slide from a decoded image.
pub fn image_slide(image: &RgbImage, color_space: ColorSpace, mirror: Mirror) -> Slide {
    let rgb = image.to_native_rgb(mirror);
    let (color_space, pixels) = match color_space {
        ColorSpace::Rgb24 => (ColorSpace::Rgb24, rgb),
        _ => (ColorSpace::Mono16, rgb_to_mono16(&rgb)),
    };
    Slide::new(color_space, pixels, IMAGE_DISPLAY_TIME, SlideKind::Media)
}

/// Load a still image file as a slide.
pub fn load_image_slide(
    path: &Path,
    color_space: ColorSpace,
    mirror: Mirror,
) -> Result<Slide, MediaError> {
    let image = load_png(path)?;
    log(LogCategory::Media, LogLevel::Debug, || {
        format!(
            "loaded {} ({}x{}) as {:?}",
            path.display(),
            image.width,
            image.height,
            color_space
        )
    });
    Ok(image_slide(&image, color_space, mirror))
}

/// Built-in 4-shade slide for a game with no usable media: a frame border
/// with the game title inside.
pub fn placeholder_slide(title: &str, mirror: Mirror) -> Slide {
    let mut pixels = font::render_centered(&[title.to_ascii_uppercase()]);
    for level in pixels.iter_mut() {
        *level >>= 2;
    }
    for col in 0..DMD_WIDTH {
        pixels[col] = 3;
        pixels[(DMD_HEIGHT - 1) * DMD_WIDTH + col] = 3;
    }
    for row in 0..DMD_HEIGHT {
        pixels[row * DMD_WIDTH] = 3;
        pixels[row * DMD_WIDTH + DMD_WIDTH - 1] = 3;
    }
    Slide::new(
        ColorSpace::Mono4,
        mirror_frame(&pixels, ColorSpace::Mono4, mirror),
        IMAGE_DISPLAY_TIME,
        SlideKind::Media,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DMD_PIXELS;
    use std::collections::HashMap;
    use std::fs;

    #[derive(Default)]
    struct Provider {
        game: HashMap<MediaKind, PathBuf>,
        defaults: HashMap<MediaKind, PathBuf>,
        startup: HashMap<&'static str, PathBuf>,
    }

    impl GameProvider for Provider {
        fn current_game(&self) -> Option<GameInfo> {
            None
        }
        fn media_path(&self, _game: &GameInfo, kind: MediaKind) -> Option<PathBuf> {
            self.game.get(&kind).cloned()
        }
        fn default_media_path(&self, kind: MediaKind) -> Option<PathBuf> {
            self.defaults.get(&kind).cloned()
        }
        fn startup_video_path(&self, name: &str) -> Option<PathBuf> {
            self.startup.get(name).cloned()
        }
    }

    const COLOR: Capability = Capability { supports_rgb: true };
    const MONO: Capability = Capability {
        supports_rgb: false,
    };

    #[test]
    fn test_color_space_policy() {
        assert_eq!(color_space_for(MediaKind::RealDmdColorVideo, COLOR), ColorSpace::Rgb24);
        assert_eq!(color_space_for(MediaKind::RealDmdColorVideo, MONO), ColorSpace::Mono16);
        assert_eq!(color_space_for(MediaKind::RealDmdVideo, COLOR), ColorSpace::Mono16);
        assert_eq!(color_space_for(MediaKind::RealDmdImage, COLOR), ColorSpace::Mono16);
        assert_eq!(color_space_for(MediaKind::DmdImage, COLOR), ColorSpace::Rgb24);
        assert_eq!(color_space_for(MediaKind::DmdVideo, MONO), ColorSpace::Mono16);
    }

    #[test]
    fn test_candidates_follow_precedence() {
        let mut provider = Provider::default();
        provider.game.insert(MediaKind::DmdImage, PathBuf::from("d.png"));
        provider.game.insert(MediaKind::RealDmdImage, PathBuf::from("r.png"));
        provider.game.insert(MediaKind::RealDmdColorVideo, PathBuf::from("c.mp4"));
        provider.defaults.insert(MediaKind::DmdImage, PathBuf::from("default.png"));

        let game = GameInfo::new("g", "Game");
        let found = select_candidates(&provider, Some(&game), COLOR, true);
        let kinds: Vec<MediaKind> = found.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MediaKind::RealDmdColorVideo,
                MediaKind::RealDmdImage,
                MediaKind::DmdImage
            ]
        );
        assert_eq!(found[0].color_space, ColorSpace::Rgb24);
        assert_eq!(found[1].color_space, ColorSpace::Mono16);

        let no_video = select_candidates(&provider, Some(&game), COLOR, false);
        assert_eq!(no_video[0].kind, MediaKind::RealDmdImage);
    }

    #[test]
    fn test_defaults_only_when_game_has_nothing() {
        let mut provider = Provider::default();
        provider.defaults.insert(MediaKind::RealDmdImage, PathBuf::from("default.png"));
        let game = GameInfo::new("g", "Game");
        let found = select_candidates(&provider, Some(&game), MONO, true);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, PathBuf::from("default.png"));

        let idle = select_candidates(&provider, None, MONO, true);
        assert_eq!(idle, found);
    }

    #[test]
    fn test_defaults_limited_to_real_dmd_kinds() {
        let mut provider = Provider::default();
        for (kind, name) in [
            (MediaKind::DmdVideo, "dmd.mp4"),
            (MediaKind::DmdImage, "dmd.png"),
            (MediaKind::RealDmdColorImage, "color.png"),
            (MediaKind::RealDmdImage, "mono.png"),
        ] {
            provider.defaults.insert(kind, PathBuf::from(name));
        }

        let on_color = select_candidates(&provider, None, COLOR, true);
        let kinds: Vec<MediaKind> = on_color.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![MediaKind::RealDmdColorImage, MediaKind::RealDmdImage]
        );
        assert_eq!(on_color[0].color_space, ColorSpace::Rgb24);

        let on_mono = select_candidates(&provider, None, MONO, true);
        assert_eq!(on_mono.len(), 1);
        assert_eq!(on_mono[0].path, PathBuf::from("mono.png"));
        assert_eq!(on_mono[0].color_space, ColorSpace::Mono16);
    }

    #[test]
    fn test_startup_video_order_follows_device() {
        let mut provider = Provider::default();
        provider.startup.insert(STARTUP_VIDEO_COLOR, PathBuf::from("color.mp4"));
        provider.startup.insert(STARTUP_VIDEO_MONO, PathBuf::from("mono.mp4"));

        let color = startup_candidates(&provider, COLOR);
        assert_eq!(color[0].path, PathBuf::from("color.mp4"));
        assert_eq!(color[0].color_space, ColorSpace::Rgb24);
        assert_eq!(color[1].path, PathBuf::from("mono.mp4"));
        assert_eq!(color[1].color_space, ColorSpace::Mono16);

        let mono = startup_candidates(&provider, MONO);
        assert_eq!(mono[0].path, PathBuf::from("mono.mp4"));
        assert_eq!(mono[1].path, PathBuf::from("color.mp4"));
        assert!(mono.iter().all(|c| c.color_space == ColorSpace::Mono16));

        provider.startup.remove(STARTUP_VIDEO_COLOR);
        let only_mono = startup_candidates(&provider, COLOR);
        assert_eq!(only_mono.len(), 1);
        assert_eq!(only_mono[0].kind, MediaKind::RealDmdVideo);
        assert!(startup_candidates(&Provider::default(), COLOR).is_empty());
    }

    fn write_png(path: &Path, width: u32, height: u32, color: png::ColorType, data: &[u8]) {
        let file = fs::File::create(path).unwrap();
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
    }

    #[test]
    fn test_load_png_layouts() {
        let dir = std::env::temp_dir().join("dmd_core_media_png");
        fs::create_dir_all(&dir).unwrap();

        let rgba = dir.join("rgba.png");
        write_png(&rgba, 2, 1, png::ColorType::Rgba, &[255, 0, 0, 255, 0, 255, 0, 0]);
        let image = load_png(&rgba).unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.pixels, vec![255, 0, 0, 0, 0, 0]);

        let gray = dir.join("gray.png");
        write_png(&gray, 1, 1, png::ColorType::Grayscale, &[200]);
        assert_eq!(load_png(&gray).unwrap().pixels, vec![200, 200, 200]);

        assert!(matches!(load_png(&dir.join("missing.png")), Err(MediaError::Io(_))));

        let junk = dir.join("junk.png");
        fs::write(&junk, b"not a png").unwrap();
        assert!(matches!(load_png(&junk), Err(MediaError::Png(_))));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_image_slide_formats() {
        let white = RgbImage::new(128, 32, vec![255; DMD_PIXELS * 3]);
        let mono = image_slide(&white, ColorSpace::Mono16, Mirror::default());
        assert_eq!(mono.color_space(), ColorSpace::Mono16);
        assert!(mono.pixels().iter().all(|&v| v == 15));
        assert_eq!(mono.display_time(), IMAGE_DISPLAY_TIME);
        assert_eq!(mono.kind(), SlideKind::Media);

        let rgb = image_slide(&white, ColorSpace::Rgb24, Mirror::default());
        assert_eq!(rgb.pixels().len(), DMD_PIXELS * 3);
    }

    #[test]
    fn test_placeholder() {
        let slide = placeholder_slide("Medieval Madness", Mirror::default());
        assert_eq!(slide.color_space(), ColorSpace::Mono4);
        assert_eq!(slide.kind(), SlideKind::Media);
        assert!(slide.pixels().iter().all(|&v| v <= 3));
        assert_eq!(slide.pixels()[0], 3);
        assert_eq!(slide.pixels()[DMD_PIXELS - 1], 3);
        // Title dots inside the border
        let inner = (1..DMD_HEIGHT - 1)
            .flat_map(|r| (1..DMD_WIDTH - 1).map(move |c| r * DMD_WIDTH + c))
            .filter(|&i| slide.pixels()[i] == 3)
            .count();
        assert!(inner > 0);
    }
}
