//! Folder-based game list.
//!
//! Layout under the games root:
//!
//! ```text
//! <root>/<Game Title>/Real DMD Color Videos/*.i420
//! <root>/<Game Title>/Real DMD Images/*.png
//! <root>/<Game Title>/scores.txt     high score text, blank lines between groups
//! <root>/<Game Title>/style.txt      high score style ("none" hides score slides)
//! <root>/<Game Title>/rom.txt        ROM name for per-title driver settings
//! <root>/Defaults/<media folder>/    used when a game has no media of a kind
//! <root>/Startup Videos/<name>.i420   played once before the first game
//! ```

use anyhow::{bail, Context, Result};
use dmd_core::host::{GameInfo, GameProvider, MediaKind};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

pub const DEFAULTS_FOLDER: &str = "Defaults";
pub const STARTUP_FOLDER: &str = "Startup Videos";
pub const SCORES_FILE: &str = "scores.txt";
const STYLE_FILE: &str = "style.txt";
const ROM_FILE: &str = "rom.txt";

/// File extensions accepted for each kind of media.
fn extensions(kind: MediaKind) -> &'static [&'static str] {
    if kind.is_video() {
        &["i420", "yuv"]
    } else {
        &["png"]
    }
}

pub struct FolderGames {
    root: PathBuf,
    selected: Mutex<Option<GameInfo>>,
}

impl FolderGames {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("games folder not found: {}", root.display());
        }
        Ok(Self {
            root,
            selected: Mutex::new(None),
        })
    }

    /// Game titles (folder names), sorted.
    pub fn titles(&self) -> Result<Vec<String>> {
        let mut titles = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("reading {}", self.root.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.eq_ignore_ascii_case(DEFAULTS_FOLDER)
                && !name.eq_ignore_ascii_case(STARTUP_FOLDER)
            {
                titles.push(name);
            }
        }
        titles.sort_by_key(|t| t.to_lowercase());
        Ok(titles)
    }

    /// Select `title`, or the first game when `None`.
    pub fn select(&self, title: Option<&str>) -> Result<GameInfo> {
        let titles = self.titles()?;
        let title = match title {
            Some(wanted) => titles
                .iter()
                .find(|t| t.eq_ignore_ascii_case(wanted))
                .with_context(|| format!("no game folder named \"{}\"", wanted))?,
            None => titles
                .first()
                .with_context(|| format!("no game folders in {}", self.root.display()))?,
        };
        let game = self.load(title)?;
        *self.lock() = Some(game.clone());
        Ok(game)
    }

    /// Re-read the selected game's files.
    pub fn refresh(&self) -> Result<Option<GameInfo>> {
        let Some(title) = self.lock().as_ref().map(|g| g.title.clone()) else {
            return Ok(None);
        };
        let game = self.load(&title)?;
        *self.lock() = Some(game.clone());
        Ok(Some(game))
    }

    /// Modification time of the selected game's score file, if any.
    pub fn scores_modified(&self) -> Option<SystemTime> {
        let title = self.lock().as_ref().map(|g| g.title.clone())?;
        fs::metadata(self.root.join(title).join(SCORES_FILE))
            .and_then(|m| m.modified())
            .ok()
    }

    fn load(&self, title: &str) -> Result<GameInfo> {
        let dir = self.root.join(title);
        let mut game = GameInfo::new(title, title);
        if let Some(text) = read_optional(&dir.join(SCORES_FILE))? {
            game.high_scores = text.lines().map(|l| l.trim_end().to_string()).collect();
        }
        game.high_score_style = read_optional(&dir.join(STYLE_FILE))?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        game.rom = read_optional(&dir.join(ROM_FILE))?
            .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
            .filter(|s| !s.is_empty());
        log::debug!(
            "loaded game \"{}\" ({} score lines, rom {:?})",
            title,
            game.high_scores.len(),
            game.rom
        );
        Ok(game)
    }

    fn lock(&self) -> MutexGuard<'_, Option<GameInfo>> {
        self.selected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GameProvider for FolderGames {
    fn current_game(&self) -> Option<GameInfo> {
        self.lock().clone()
    }

    fn media_path(&self, game: &GameInfo, kind: MediaKind) -> Option<PathBuf> {
        first_media_file(&self.root.join(&game.title).join(kind.folder_name()), kind)
    }

    fn default_media_path(&self, kind: MediaKind) -> Option<PathBuf> {
        first_media_file(
            &self.root.join(DEFAULTS_FOLDER).join(kind.folder_name()),
            kind,
        )
    }

    fn startup_video_path(&self, name: &str) -> Option<PathBuf> {
        let dir = self.root.join(STARTUP_FOLDER);
        extensions(MediaKind::RealDmdVideo)
            .iter()
            .map(|ext| dir.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// First file in `dir` (by name) with an extension accepted for `kind`.
fn first_media_file(dir: &Path, kind: MediaKind) -> Option<PathBuf> {
    let accepted = extensions(kind);
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| accepted.iter().any(|a| a.eq_ignore_ascii_case(e)))
        })
        .collect();
    files.sort();
    files.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn games_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("dmdplay_games_{}", name));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        root
    }

    #[test]
    fn test_titles_skip_defaults_and_sort() {
        let root = games_root("titles");
        for dir in ["b game", "Defaults", "A Game", "Startup Videos"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("notes.txt"), "x").unwrap();
        let games = FolderGames::open(&root).unwrap();
        assert_eq!(games.titles().unwrap(), vec!["A Game", "b game"]);
    }

    #[test]
    fn test_select_reads_game_files() {
        let root = games_root("select");
        let dir = root.join("Fish Tales");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SCORES_FILE), "GRAND CHAMPION\nAAA 1\n\nBBB 2\n").unwrap();
        fs::write(dir.join(STYLE_FILE), " None \n").unwrap();
        fs::write(dir.join(ROM_FILE), "ft_p4\n").unwrap();

        let games = FolderGames::open(&root).unwrap();
        let game = games.select(Some("fish tales")).unwrap();
        assert_eq!(game.title, "Fish Tales");
        assert_eq!(game.high_scores, vec!["GRAND CHAMPION", "AAA 1", "", "BBB 2"]);
        assert_eq!(game.high_score_style.as_deref(), Some("None"));
        assert_eq!(game.rom.as_deref(), Some("ft_p4"));
        assert_eq!(games.current_game(), Some(game));
        assert!(games.select(Some("missing")).is_err());
    }

    #[test]
    fn test_media_lookup_and_defaults() {
        let root = games_root("media");
        let images = root.join("Taxi").join(MediaKind::RealDmdImage.folder_name());
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("b.png"), "").unwrap();
        fs::write(images.join("a.png"), "").unwrap();
        fs::write(images.join("readme.txt"), "").unwrap();
        let defaults = root
            .join(DEFAULTS_FOLDER)
            .join(MediaKind::RealDmdVideo.folder_name());
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("attract.I420"), "").unwrap();

        let games = FolderGames::open(&root).unwrap();
        let game = games.select(None).unwrap();
        assert_eq!(
            games.media_path(&game, MediaKind::RealDmdImage),
            Some(images.join("a.png"))
        );
        assert_eq!(games.media_path(&game, MediaKind::RealDmdVideo), None);
        assert_eq!(
            games.default_media_path(MediaKind::RealDmdVideo),
            Some(defaults.join("attract.I420"))
        );
    }

    #[test]
    fn test_startup_video_by_name() {
        let root = games_root("startup");
        let dir = root.join(STARTUP_FOLDER);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Startup Video (realdmd).yuv"), b"").unwrap();
        let games = FolderGames::open(&root).unwrap();
        assert_eq!(
            games.startup_video_path("Startup Video (realdmd)"),
            Some(dir.join("Startup Video (realdmd).yuv"))
        );
        assert_eq!(games.startup_video_path("Startup Video (realdmd color)"), None);
    }
}
