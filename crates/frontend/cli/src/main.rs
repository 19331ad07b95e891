mod games;
mod preview;
mod raw_video;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dmd_core::config::{keys, JsonConfigStore};
use dmd_core::device::dll::{VPINMAME_SERVER_KEY, VPINMAME_SERVER_KEY_WOW64};
use dmd_core::device::{BindError, DeviceBinder, DllBinder, InstallRegistry};
use dmd_core::host::LogErrorReporter;
use dmd_core::logging::{LogConfig, LogLevel};
use dmd_core::{ConfigStore, RealDmd};
use games::FolderGames;
use raw_video::RawVideoSource;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "dmdplay", about = "Show game media on a real pinball dot-matrix display")]
struct Cli {
    /// Core log level: off, error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Write core log output to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the display for one game from a games folder
    Play(PlayArgs),
    /// Render text with the built-in DMD fonts to a PNG preview
    Text(TextArgs),
    /// Locate and load the display driver and report what it supports
    Probe(ProbeArgs),
}

#[derive(Args)]
struct PlayArgs {
    /// Games folder (one sub-folder per game)
    root: PathBuf,

    /// Game folder name; defaults to the first game
    #[arg(long)]
    game: Option<String>,

    /// How long to run before shutting down
    #[arg(long, default_value_t = 30)]
    seconds: u64,

    /// Use this driver library instead of searching for one
    #[arg(long)]
    driver: Option<PathBuf>,

    /// VPinMAME install folder, searched for the driver before the app folder
    #[arg(long)]
    vpm_dir: Option<PathBuf>,

    /// Mirror the display left to right (saved to the settings file)
    #[arg(long, default_value_t = false)]
    mirror_h: bool,

    /// Mirror the display top to bottom (saved to the settings file)
    #[arg(long, default_value_t = false)]
    mirror_v: bool,

    /// Settings file (JSON); defaults to dmd_config.json next to the executable
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame size of raw I420 video files
    #[arg(long, default_value = "128x32")]
    video_size: String,

    /// Playback rate of raw video files
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Play the startup video from the games folder before the game's media
    #[arg(long, default_value_t = false)]
    startup: bool,
}

#[derive(Args)]
struct TextArgs {
    /// Lines of text, top to bottom
    #[arg(required = true)]
    lines: Vec<String>,

    /// Font name (dmd-14px, dmd-7px, dmd-5px); picked to fit when omitted
    #[arg(long)]
    font: Option<String>,

    /// Dot color as RRGGBB
    #[arg(long, default_value = "ff5820")]
    color: String,

    /// Output pixels per dot
    #[arg(long, default_value_t = 4)]
    scale: usize,

    #[arg(long, short, default_value = "text.png")]
    output: PathBuf,
}

#[derive(Args)]
struct ProbeArgs {
    /// Use this driver library instead of searching for one
    #[arg(long)]
    driver: Option<PathBuf>,

    /// VPinMAME install folder, searched for the driver before the app folder
    #[arg(long)]
    vpm_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    configure_core_logging(&cli)?;

    match cli.command {
        Command::Play(args) => play(args),
        Command::Text(args) => text(args),
        Command::Probe(args) => probe(args),
    }
}

fn configure_core_logging(cli: &Cli) -> Result<()> {
    let level = LogLevel::from_str(&cli.log_level)
        .with_context(|| format!("unknown log level \"{}\"", cli.log_level))?;
    let config = LogConfig::global();
    config.set_global_level(level);
    if let Some(path) = &cli.log_file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    Ok(())
}

fn parse_size(text: &str) -> Result<(usize, usize)> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WxH, got \"{}\"", text))?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

/// Stands in for the COM server registration when VPinMAME's folder is
/// given on the command line.
struct VpmFolder(PathBuf);

impl InstallRegistry for VpmFolder {
    fn lookup_path(&self, key: &str) -> Option<PathBuf> {
        (key == VPINMAME_SERVER_KEY || key == VPINMAME_SERVER_KEY_WOW64)
            .then(|| self.0.join("VPinMAME.dll"))
    }
}

fn binder(driver: Option<PathBuf>, vpm_dir: Option<&Path>) -> DllBinder {
    let mut binder = match driver {
        Some(path) => DllBinder::new().with_driver_path(path),
        None => DllBinder::new(),
    };
    if let Some(dir) = vpm_dir {
        binder = binder.with_registry(Box::new(VpmFolder(dir.to_path_buf())));
    }
    binder
}

fn play(args: PlayArgs) -> Result<()> {
    let (width, height) = parse_size(&args.video_size)?;
    let games = Arc::new(FolderGames::open(&args.root)?);
    let game = games.select(args.game.as_deref())?;
    log::info!("selected \"{}\"", game.title);

    let config_path = args.config.unwrap_or_else(JsonConfigStore::default_path);
    let config = Arc::new(JsonConfigStore::load(&config_path));
    log::debug!("settings from {}", config.path().display());

    let (events_tx, events_rx) = mpsc::channel();
    let dmd = RealDmd::builder(games.clone())
        .config(config.clone())
        .binder(Box::new(binder(args.driver, args.vpm_dir.as_deref())))
        .reporter(Arc::new(LogErrorReporter))
        .video_source(Arc::new(RawVideoSource::new(
            width, height, args.fps, events_tx,
        )))
        .build();

    if !dmd.init() {
        println!("Real DMD is turned off in {}", config_path.display());
        return Ok(());
    }
    if args.mirror_h && !config.get_bool(keys::MIRROR_HORZ, false) {
        dmd.set_mirror_horizontal(args.mirror_h);
    }
    if args.mirror_v && !config.get_bool(keys::MIRROR_VERT, false) {
        dmd.set_mirror_vertical(args.mirror_v);
    }
    if args.startup && dmd.load_startup_video() {
        if let Err(e) = dmd.play_startup_video() {
            log::warn!("startup video failed: {}", e);
            dmd.end_startup_video();
        }
    }
    dmd.update_game();
    println!(
        "Showing \"{}\" for {}s (color output: {})",
        game.title,
        args.seconds,
        dmd.supports_color_output()
    );

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let mut scores_stamp = games.scores_modified();
    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let wait = (deadline - now).min(Duration::from_millis(500));
        match events_rx.recv_timeout(wait) {
            Ok(event) => dmd.handle_video_event(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let stamp = games.scores_modified();
        if stamp != scores_stamp {
            scores_stamp = stamp;
            match games.refresh() {
                Ok(Some(game)) => dmd.on_high_score_data_changed(&game),
                Ok(None) => {}
                Err(e) => log::warn!("could not reload scores: {:#}", e),
            }
        }
    }

    dmd.shutdown();
    Ok(())
}

fn text(args: TextArgs) -> Result<()> {
    let color = preview::parse_color(&args.color)?;
    let font = preview::save_text_png(
        &args.lines,
        args.font.as_deref(),
        color,
        args.scale,
        &args.output,
    )?;
    println!("Wrote {} using {}", args.output.display(), font);
    Ok(())
}

fn probe(args: ProbeArgs) -> Result<()> {
    let binder = binder(args.driver, args.vpm_dir.as_deref());
    let located = binder.locate();
    let report = match binder.bind() {
        Ok(device) => serde_json::json!({
            "driver": located.map(|p| p.display().to_string()),
            "bound": true,
            "supports_rgb": device.capability().supports_rgb,
        }),
        Err(BindError::NotFound) => serde_json::json!({
            "driver": null,
            "bound": false,
            "supports_rgb": false,
        }),
        Err(e) => serde_json::json!({
            "driver": located.map(|p| p.display().to_string()),
            "bound": false,
            "supports_rgb": false,
            "error": e.to_string(),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report["bound"] != true {
        bail!("no usable display driver");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("128x32").unwrap(), (128, 32));
        assert_eq!(parse_size("256X64").unwrap(), (256, 64));
        assert!(parse_size("128").is_err());
        assert!(parse_size("ax32").is_err());
    }

    #[test]
    fn test_cli_parses_play() {
        let cli = Cli::try_parse_from([
            "dmdplay",
            "--log-level",
            "debug",
            "play",
            "games",
            "--game",
            "Funhouse",
            "--mirror-h",
            "--seconds",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Play(args) => {
                assert_eq!(args.root, PathBuf::from("games"));
                assert_eq!(args.game.as_deref(), Some("Funhouse"));
                assert!(args.mirror_h);
                assert!(!args.mirror_v);
                assert_eq!(args.seconds, 5);
                assert_eq!(args.fps, 30);
                assert!(!args.startup);
            }
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn test_vpm_dir_searched_before_app_dir() {
        let root = std::env::temp_dir().join(format!("dmdplay_vpm_{}", std::process::id()));
        let vpm = root.join("VPinMAME");
        let app = root.join("app");
        std::fs::create_dir_all(&vpm).unwrap();
        std::fs::create_dir_all(&app).unwrap();
        let name = dmd_core::device::dll::driver_file_names().remove(0);
        std::fs::write(vpm.join(&name), b"").unwrap();
        std::fs::write(app.join(&name), b"").unwrap();

        let found = binder(None, Some(vpm.as_path())).with_app_dir(&app).locate();
        assert_eq!(found, Some(vpm.join(&name)));

        let found = binder(None, None).with_app_dir(&app).locate();
        assert_eq!(found, Some(app.join(&name)));

        let explicit = app.join(&name);
        let found = binder(Some(explicit.clone()), Some(vpm.as_path())).locate();
        assert_eq!(found, Some(explicit));
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_cli_parses_vpm_dir() {
        let cli = Cli::try_parse_from([
            "dmdplay",
            "play",
            "games",
            "--vpm-dir",
            "C:/VPinMAME",
            "--startup",
        ])
        .unwrap();
        match cli.command {
            Command::Play(args) => {
                assert_eq!(args.vpm_dir, Some(PathBuf::from("C:/VPinMAME")));
                assert_eq!(args.driver, None);
                assert!(args.startup);
            }
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn test_text_requires_lines() {
        assert!(Cli::try_parse_from(["dmdplay", "text"]).is_err());
    }
}
