//! Interfaces to the application hosting the display pipeline.
//!
//! The pipeline does not own the game list, the media folders, the ROM
//! settings registry or the user-facing error UI; it reaches them through
//! these traits.

use crate::device::PmOptions;
use crate::logging::{log, LogCategory, LogLevel};
use std::path::PathBuf;

/// Stable identity of a game in the host's list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameId(pub String);

/// Snapshot of the selected game, as far as the display cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub id: GameId,
    pub title: String,
    /// ROM name used to look up per-title device settings
    pub rom: Option<String>,
    /// High score text, one entry per line; blank lines separate groups
    pub high_scores: Vec<String>,
    /// Free-form high score style; "none" suppresses generated slides
    pub high_score_style: Option<String>,
}

impl GameInfo {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: GameId(id.into()),
            title: title.into(),
            rom: None,
            high_scores: Vec::new(),
            high_score_style: None,
        }
    }
}

/// Media folders the display can draw from, in the order of their
/// relevance to a real DMD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Color video captured for a real DMD
    RealDmdColorVideo,
    /// Monochrome video captured for a real DMD
    RealDmdVideo,
    /// Color still captured for a real DMD
    RealDmdColorImage,
    /// Monochrome still captured for a real DMD
    RealDmdImage,
    /// Video made for the on-screen simulated DMD (full color)
    DmdVideo,
    /// Still made for the on-screen simulated DMD (full color)
    DmdImage,
}

impl MediaKind {
    pub fn is_video(self) -> bool {
        matches!(
            self,
            MediaKind::RealDmdColorVideo | MediaKind::RealDmdVideo | MediaKind::DmdVideo
        )
    }

    /// Full-color source art; the real-DMD monochrome folders hold
    /// grayscale captures
    pub fn is_color(self) -> bool {
        !matches!(self, MediaKind::RealDmdVideo | MediaKind::RealDmdImage)
    }

    /// Folder name used by the conventional media layout
    pub fn folder_name(self) -> &'static str {
        match self {
            MediaKind::RealDmdColorVideo => "Real DMD Color Videos",
            MediaKind::RealDmdVideo => "Real DMD Videos",
            MediaKind::RealDmdColorImage => "Real DMD Color Images",
            MediaKind::RealDmdImage => "Real DMD Images",
            MediaKind::DmdVideo => "DMD Videos",
            MediaKind::DmdImage => "DMD Images",
        }
    }
}

/// Game selection and media lookup.
pub trait GameProvider: Send + Sync {
    /// The game currently selected in the UI, if any
    fn current_game(&self) -> Option<GameInfo>;

    /// Path of a media file of the given kind for the game, if one exists
    fn media_path(&self, game: &GameInfo, kind: MediaKind) -> Option<PathBuf>;

    /// Fallback media used when the game has none of its own
    fn default_media_path(&self, _kind: MediaKind) -> Option<PathBuf> {
        None
    }

    /// Startup video called `name` (no extension), if the host has one
    fn startup_video_path(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// Per-title device settings, keyed by ROM name ("default" for the
/// settings applied to new tables).
pub trait TitleSettingsSource: Send + Sync {
    fn lookup(&self, title_key: &str) -> Option<PmOptions>;
}

/// Source that never has any per-title settings.
pub struct NoTitleSettings;

impl TitleSettingsSource for NoTitleSettings {
    fn lookup(&self, _title_key: &str) -> Option<PmOptions> {
        None
    }
}

/// User-facing error reporting.
pub trait ErrorReporter: Send + Sync {
    fn error(&self, message: &str);
    fn sys_error(&self, message: &str, detail: &str);
}

/// Reports errors through the pipeline log.
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn error(&self, message: &str) {
        log(LogCategory::Device, LogLevel::Error, || message.to_string());
    }

    fn sys_error(&self, message: &str, detail: &str) {
        log(LogCategory::Device, LogLevel::Error, || {
            format!("{} ({})", message, detail)
        });
    }
}

/// Discards everything; used where failures are expected and harmless.
pub struct SilentErrorReporter;

impl ErrorReporter for SilentErrorReporter {
    fn error(&self, _message: &str) {}
    fn sys_error(&self, _message: &str, _detail: &str) {}
}
