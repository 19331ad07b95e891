//! Runs the display pipeline against a console device that prints each
//! frame as text. Usage: `headless [TITLE] [SCORE LINES...]`
use dmd_core::device::{BindError, Capability, DeviceBinder, DmdDevice, PmOptions};
use dmd_core::host::{GameInfo, GameProvider, MediaKind};
use dmd_core::timer::ManualTimer;
use dmd_core::{RealDmd, DMD_WIDTH};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// The show wraps around when there is no video, so stop after this many
const MAX_SLIDES: usize = 8;

struct ConsoleDevice;

impl ConsoleDevice {
    fn print(&self, pixels: &[u8], max: u8) {
        const RAMP: &[u8] = b" .:-=+*#%@";
        for row in pixels.chunks(DMD_WIDTH) {
            let line: String = row
                .iter()
                .map(|&v| RAMP[v as usize * (RAMP.len() - 1) / max as usize] as char)
                .collect();
            println!("|{}|", line);
        }
        println!();
    }
}

impl DmdDevice for ConsoleDevice {
    fn capability(&self) -> Capability {
        Capability { supports_rgb: false }
    }
    fn open(&mut self) -> bool {
        true
    }
    fn close(&mut self) {}
    fn configure(&mut self, title: &str, _generation: u64, _options: &PmOptions) {
        println!("configure: {}", title);
    }
    fn render_mono4(&mut self, pixels: &[u8]) {
        self.print(pixels, 3);
    }
    fn render_mono16(&mut self, pixels: &[u8]) {
        if pixels.iter().any(|&v| v != 0) {
            self.print(pixels, 15);
        }
    }
    fn render_rgb24(&mut self, _pixels: &[u8]) {}
}

struct ConsoleBinder;

impl DeviceBinder for ConsoleBinder {
    fn bind(&self) -> Result<Box<dyn DmdDevice>, BindError> {
        Ok(Box::new(ConsoleDevice))
    }
}

struct OneGame(GameInfo);

impl GameProvider for OneGame {
    fn current_game(&self) -> Option<GameInfo> {
        Some(self.0.clone())
    }
    fn media_path(&self, _game: &GameInfo, _kind: MediaKind) -> Option<PathBuf> {
        None
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let title = args.first().map(|s| s.as_str()).unwrap_or("Headless");
    let mut game = GameInfo::new(title, title);
    game.high_scores = args.iter().skip(1).cloned().collect();

    let timer = Arc::new(ManualTimer::new());
    let dmd = RealDmd::builder(Arc::new(OneGame(game)))
        .binder(Box::new(ConsoleBinder))
        .timer(timer.clone())
        .build();
    dmd.init();
    dmd.update_game();

    let mut shown = 1;
    while let Some(token) = timer.take() {
        std::thread::sleep(Duration::from_millis(50));
        if shown >= MAX_SLIDES {
            break;
        }
        dmd.on_slide_timer(token);
        shown += 1;
    }
    std::thread::sleep(Duration::from_millis(50));
    dmd.shutdown();
}
