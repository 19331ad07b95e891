//! Output queue and the device writer thread.
//!
//! Producers (the UI thread, the video decoder, the slide timer) never
//! touch the device. They drop frames into a single pending slot; the
//! writer thread owns the device and renders whatever is in the slot when
//! it gets there. A newer frame replaces an unrendered older one, so the
//! display is never more than one frame behind and nothing piles up.
//!
//! Per-title driver settings travel through the same slot so that
//! `configure` is never called concurrently with a render.

use crate::device::{DmdDevice, PmOptions, GEN_WPC95};
use crate::logging::{log, LogCategory, LogLevel};
use crate::slide::Slide;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long shutdown waits for the writer to finish its current render.
pub const STOP_TIMEOUT: Duration = Duration::from_millis(2500);

/// Driver settings for the title being shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    pub title: String,
    pub options: PmOptions,
}

#[derive(Debug, Default)]
struct Pending {
    frame: Option<Arc<Slide>>,
    settings: Option<GameSettings>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.frame.is_none() && self.settings.is_none()
    }
}

/// Work taken from the queue in one go.
#[derive(Debug, Default)]
pub struct Work {
    pub settings: Option<GameSettings>,
    pub frame: Option<Arc<Slide>>,
}

/// The writer's wait failed; the queue is unusable from here on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFailed;

/// Latest-wins single-slot mailbox between producers and the writer.
#[derive(Debug, Default)]
pub struct OutputQueue {
    pending: Mutex<Pending>,
    wake: Condvar,
    quit: AtomicBool,
}

impl OutputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending frame with `slide` and wake the writer.
    pub fn submit(&self, slide: Arc<Slide>) {
        match self.pending.lock() {
            Ok(mut pending) => {
                if pending.frame.replace(slide).is_some() {
                    log(LogCategory::Writer, LogLevel::Trace, || {
                        "replaced an unrendered frame".to_string()
                    });
                }
                self.wake.notify_one();
            }
            Err(_) => log(LogCategory::Writer, LogLevel::Warn, || {
                "output queue failed; frame dropped".to_string()
            }),
        }
    }

    /// Replace the pending title settings and wake the writer.
    pub fn post_settings(&self, settings: GameSettings) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.settings = Some(settings);
            self.wake.notify_one();
        }
    }

    /// Take and clear whatever is pending without waiting.
    pub fn take(&self) -> Result<Work, QueueFailed> {
        let mut pending = self.pending.lock().map_err(|_| QueueFailed)?;
        Ok(Work {
            settings: pending.settings.take(),
            frame: pending.frame.take(),
        })
    }

    /// Block until there is work or a quit request. `Ok(None)` means quit.
    pub fn wait_for_work(&self) -> Result<Option<Work>, QueueFailed> {
        let mut pending = self.pending.lock().map_err(|_| QueueFailed)?;
        loop {
            if self.quit.load(Ordering::Acquire) {
                return Ok(None);
            }
            if !pending.is_empty() {
                return Ok(Some(Work {
                    settings: pending.settings.take(),
                    frame: pending.frame.take(),
                }));
            }
            pending = self.wake.wait(pending).map_err(|_| QueueFailed)?;
        }
    }

    /// Ask the writer to exit and wake it.
    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
        // Taking the lock orders the store before the writer's next check
        let _guard = self.pending.lock();
        self.wake.notify_all();
    }

    /// Clear a previous quit request so the queue can serve a new writer.
    pub fn reset(&self) {
        self.quit.store(false, Ordering::Release);
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Pending::default();
        }
    }
}

/// What the writer thread hands back when it exits.
pub struct WriterExit {
    pub device: Box<dyn DmdDevice>,
    /// The thread stopped because the queue failed, not on request
    pub failed: bool,
}

/// Handle to the running writer thread.
pub struct Writer {
    queue: Arc<OutputQueue>,
    handle: Option<JoinHandle<()>>,
    exit_rx: Receiver<WriterExit>,
}

impl Writer {
    /// Start the writer thread. It takes ownership of `device` until
    /// [`Writer::stop`] returns it.
    pub fn spawn(device: Box<dyn DmdDevice>, queue: Arc<OutputQueue>) -> std::io::Result<Self> {
        let (exit_tx, exit_rx) = mpsc::channel();
        let thread_queue = Arc::clone(&queue);
        let handle = thread::Builder::new()
            .name("dmd-writer".to_string())
            .spawn(move || {
                let exit = run(device, &thread_queue);
                let _ = exit_tx.send(exit);
            })?;
        Ok(Self {
            queue,
            handle: Some(handle),
            exit_rx,
        })
    }

    pub fn queue(&self) -> &Arc<OutputQueue> {
        &self.queue
    }

    /// Signal the thread to quit and wait up to `timeout` for it.
    ///
    /// Returns the device if the thread exited in time. If it is stuck in a
    /// driver call the thread is left detached, still owning the device.
    pub fn stop(mut self, timeout: Duration) -> Option<WriterExit> {
        self.queue.request_quit();
        match self.exit_rx.recv_timeout(timeout) {
            Ok(exit) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                Some(exit)
            }
            Err(RecvTimeoutError::Timeout) => {
                log(LogCategory::Writer, LogLevel::Warn, || {
                    format!("writer did not stop within {:?}; detaching", timeout)
                });
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                log(LogCategory::Writer, LogLevel::Error, || {
                    "writer thread exited without returning the device".to_string()
                });
                None
            }
        }
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.queue.request_quit();
        }
    }
}

fn run(mut device: Box<dyn DmdDevice>, queue: &OutputQueue) -> WriterExit {
    log(LogCategory::Writer, LogLevel::Debug, || {
        "writer thread started".to_string()
    });
    let failed = loop {
        let work = match queue.wait_for_work() {
            Ok(Some(work)) => work,
            Ok(None) => break false,
            Err(QueueFailed) => {
                log(LogCategory::Writer, LogLevel::Error, || {
                    "output queue wait failed; no further frames will be written".to_string()
                });
                break true;
            }
        };

        if let Some(settings) = work.settings {
            log(LogCategory::Writer, LogLevel::Debug, || {
                format!("configuring driver for {}", settings.title)
            });
            device.configure(&settings.title, GEN_WPC95, &settings.options);
        }
        if let Some(frame) = work.frame {
            log(LogCategory::Writer, LogLevel::Trace, || {
                format!("rendering {:?} frame", frame.color_space())
            });
            device.render(frame.color_space(), frame.pixels());
        }
    };
    log(LogCategory::Writer, LogLevel::Debug, || {
        "writer thread exiting".to_string()
    });
    WriterExit { device, failed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{Call, MockDevice};
    use crate::device::Capability;
    use crate::slide::SlideKind;
    use crate::types::{ColorSpace, DMD_PIXELS};
    use std::sync::mpsc::{Receiver, Sender};

    fn frame(level: u8) -> Arc<Slide> {
        Slide::new(
            ColorSpace::Mono16,
            vec![level; DMD_PIXELS],
            Duration::ZERO,
            SlideKind::Media,
        )
        .into_shared()
    }

    fn rendered_levels(calls: &[Call]) -> Vec<u8> {
        calls
            .iter()
            .filter_map(|c| match c {
                Call::Render(_, pixels) => Some(pixels[0]),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_latest_submission_wins() {
        let queue = OutputQueue::new();
        queue.submit(frame(1));
        queue.submit(frame(2));
        let work = queue.take().unwrap();
        assert_eq!(work.frame.unwrap().pixels()[0], 2);
        assert!(queue.take().unwrap().frame.is_none());
    }

    #[test]
    fn test_settings_and_frame_share_the_slot() {
        let queue = OutputQueue::new();
        queue.post_settings(GameSettings {
            title: "afm_113b".to_string(),
            options: PmOptions::default(),
        });
        queue.submit(frame(3));
        let work = queue.take().unwrap();
        assert_eq!(work.settings.unwrap().title, "afm_113b");
        assert!(work.frame.is_some());
    }

    #[test]
    fn test_writer_renders_and_returns_device() {
        let device = MockDevice::new(false);
        let queue = Arc::new(OutputQueue::new());
        let writer = Writer::spawn(Box::new(device.clone()), Arc::clone(&queue)).unwrap();

        queue.post_settings(GameSettings {
            title: "tz_94h".to_string(),
            options: PmOptions::default(),
        });
        queue.submit(frame(5));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while rendered_levels(&device.calls()).is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let exit = writer.stop(STOP_TIMEOUT).unwrap();
        assert!(!exit.failed);
        assert_eq!(
            device.calls(),
            vec![
                Call::Configure("tz_94h".to_string()),
                Call::Render(ColorSpace::Mono16, vec![5; DMD_PIXELS]),
            ]
        );
    }

    /// Blocks inside its first render until released.
    struct GateDevice {
        inner: MockDevice,
        entered: Sender<()>,
        release: Receiver<()>,
        blocked_once: bool,
    }

    impl DmdDevice for GateDevice {
        fn capability(&self) -> Capability {
            self.inner.capability
        }
        fn open(&mut self) -> bool {
            self.inner.open()
        }
        fn close(&mut self) {
            self.inner.close()
        }
        fn configure(&mut self, title: &str, generation: u64, options: &PmOptions) {
            self.inner.configure(title, generation, options)
        }
        fn render_mono4(&mut self, pixels: &[u8]) {
            self.inner.render_mono4(pixels)
        }
        fn render_mono16(&mut self, pixels: &[u8]) {
            self.inner.render_mono16(pixels);
            if !self.blocked_once {
                self.blocked_once = true;
                let _ = self.entered.send(());
                let _ = self.release.recv();
            }
        }
        fn render_rgb24(&mut self, pixels: &[u8]) {
            self.inner.render_rgb24(pixels)
        }
    }

    fn gate() -> (GateDevice, MockDevice, Receiver<()>, Sender<()>) {
        let inner = MockDevice::new(false);
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let device = GateDevice {
            inner: inner.clone(),
            entered: entered_tx,
            release: release_rx,
            blocked_once: false,
        };
        (device, inner, entered_rx, release_tx)
    }

    #[test]
    fn test_frames_queued_during_a_render_collapse_to_the_newest() {
        let (device, recorder, entered, release) = gate();
        let queue = Arc::new(OutputQueue::new());
        let writer = Writer::spawn(Box::new(device), Arc::clone(&queue)).unwrap();

        queue.submit(frame(1));
        entered.recv_timeout(Duration::from_secs(5)).unwrap();

        // The writer is busy with frame 1; these race ahead of it
        queue.submit(frame(2));
        queue.submit(frame(3));
        release.send(()).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while rendered_levels(&recorder.calls()).len() < 2 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        writer.stop(STOP_TIMEOUT).unwrap();
        assert_eq!(rendered_levels(&recorder.calls()), vec![1, 3]);
    }

    #[test]
    fn test_stop_is_bounded_when_the_driver_hangs() {
        let (device, _recorder, entered, release) = gate();
        let queue = Arc::new(OutputQueue::new());
        let writer = Writer::spawn(Box::new(device), Arc::clone(&queue)).unwrap();

        queue.submit(frame(1));
        entered.recv_timeout(Duration::from_secs(5)).unwrap();

        let started = std::time::Instant::now();
        assert!(writer.stop(Duration::from_millis(50)).is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
        release.send(()).unwrap();
    }

    #[test]
    fn test_poisoned_queue_ends_the_writer() {
        let device = MockDevice::new(false);
        let queue = Arc::new(OutputQueue::new());

        let poisoner = Arc::clone(&queue);
        let _ = thread::spawn(move || {
            let _guard = poisoner.pending.lock().unwrap();
            panic!("poison the output queue");
        })
        .join();

        let writer = Writer::spawn(Box::new(device.clone()), Arc::clone(&queue)).unwrap();
        queue.submit(frame(1));
        let exit = writer.stop(STOP_TIMEOUT).unwrap();
        assert!(exit.failed);
        assert!(rendered_levels(&device.calls()).is_empty());
    }

    #[test]
    fn test_quit_then_reset() {
        let queue = OutputQueue::new();
        queue.request_quit();
        assert!(queue.wait_for_work().unwrap().is_none());
        queue.reset();
        queue.submit(frame(4));
        assert!(queue.wait_for_work().unwrap().is_some());
    }
}
