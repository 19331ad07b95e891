//! Raw I420 video files.
//!
//! A file is a plain sequence of frames, each a full-size Y plane followed
//! by quarter-size U and V planes. Frame size and rate are fixed per
//! source, since the format carries no header.

use dmd_core::convert::YuvFrame;
use dmd_core::media::MediaError;
use dmd_core::video::{next_cookie, VideoEvent, VideoFrameSink, VideoPlayer, VideoSource};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
struct PlayState {
    playing: bool,
    position: usize,
    quit: bool,
}

#[derive(Debug, Default)]
struct Control {
    state: Mutex<PlayState>,
    changed: Condvar,
}

impl Control {
    fn lock(&self) -> MutexGuard<'_, PlayState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Opens raw I420 files of one fixed geometry.
pub struct RawVideoSource {
    width: usize,
    height: usize,
    fps: u32,
    events: Mutex<Sender<VideoEvent>>,
}

impl RawVideoSource {
    /// Loop and end notices are sent on `events` for the host loop.
    pub fn new(width: usize, height: usize, fps: u32, events: Sender<VideoEvent>) -> Self {
        Self {
            width,
            height,
            fps: fps.max(1),
            events: Mutex::new(events),
        }
    }

    fn frame_len(&self) -> usize {
        self.width * self.height * 3 / 2
    }
}

impl VideoSource for RawVideoSource {
    fn open(
        &self,
        path: &Path,
        looping: bool,
        sink: Arc<dyn VideoFrameSink>,
    ) -> Result<Box<dyn VideoPlayer>, MediaError> {
        let data = std::fs::read(path)?;
        let frame_len = self.frame_len();
        if frame_len == 0 || data.len() < frame_len {
            return Err(MediaError::VideoOpen {
                path: path.to_path_buf(),
                detail: format!(
                    "{} bytes is less than one {}x{} frame",
                    data.len(),
                    self.width,
                    self.height
                ),
            });
        }

        let events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        let cookie = next_cookie();
        let control = Arc::new(Control::default());
        let clip = Clip {
            data,
            width: self.width,
            height: self.height,
            interval: Duration::from_secs(1) / self.fps,
        };
        let thread_control = Arc::clone(&control);
        thread::Builder::new()
            .name("dmdplay-video".to_string())
            .spawn(move || run(&thread_control, &clip, cookie, looping, sink.as_ref(), &events))?;

        log::debug!("opened {} (cookie {})", path.display(), cookie);
        Ok(Box::new(RawPlayer {
            cookie,
            path: path.to_path_buf(),
            control,
        }))
    }
}

struct Clip {
    data: Vec<u8>,
    width: usize,
    height: usize,
    interval: Duration,
}

impl Clip {
    fn frame_count(&self) -> usize {
        self.data.len() / (self.width * self.height * 3 / 2)
    }

    fn frame(&self, index: usize) -> YuvFrame<'_> {
        let luma = self.width * self.height;
        let chroma = luma / 4;
        let start = index * (luma + 2 * chroma);
        let planes = &self.data[start..start + luma + 2 * chroma];
        YuvFrame {
            width: self.width,
            height: self.height,
            y: &planes[..luma],
            u: &planes[luma..luma + chroma],
            v: &planes[luma + chroma..],
        }
    }
}

fn run(
    control: &Control,
    clip: &Clip,
    cookie: u64,
    looping: bool,
    sink: &dyn VideoFrameSink,
    events: &Sender<VideoEvent>,
) {
    let count = clip.frame_count();
    let mut state = control.lock();
    loop {
        if state.quit {
            break;
        }
        if !state.playing {
            state = control
                .changed
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            continue;
        }

        let index = state.position;
        if index >= count {
            state.playing = false;
            state.position = 0;
            drop(state);
            let event = if looping {
                VideoEvent::LoopNeeded(cookie)
            } else {
                VideoEvent::EndOfPresentation(cookie)
            };
            if events.send(event).is_err() {
                return;
            }
            state = control.lock();
            continue;
        }

        state.position += 1;
        drop(state);
        sink.present_frame(cookie, &clip.frame(index));
        state = control.lock();
        state = control
            .changed
            .wait_timeout(state, clip.interval)
            .map(|(guard, _)| guard)
            .unwrap_or_else(|poisoned| poisoned.into_inner().0);
    }
    log::debug!("video thread for cookie {} exiting", cookie);
}

/// Handle to a playing raw file.
pub struct RawPlayer {
    cookie: u64,
    path: PathBuf,
    control: Arc<Control>,
}

impl RawPlayer {
    fn update(&self, f: impl FnOnce(&mut PlayState)) {
        let mut state = self.control.lock();
        f(&mut state);
        self.control.changed.notify_all();
    }
}

impl VideoPlayer for RawPlayer {
    fn cookie(&self) -> u64 {
        self.cookie
    }

    fn media_path(&self) -> &Path {
        &self.path
    }

    fn is_playing(&self) -> bool {
        self.control.lock().playing
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.update(|s| s.playing = true);
        Ok(())
    }

    fn replay(&mut self) -> Result<(), MediaError> {
        self.update(|s| {
            s.position = 0;
            s.playing = true;
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.update(|s| s.playing = false);
    }
}

impl Drop for RawPlayer {
    fn drop(&mut self) {
        // Not joined: the thread may be inside the sink, which can end up
        // dropping this player
        self.update(|s| s.quit = true);
    }
}
