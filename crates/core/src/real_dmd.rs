//! The display controller.
//!
//! `RealDmd` is what the host talks to. It binds the driver once, owns the
//! writer thread for each device session, chooses media for the selected
//! game and runs the slide show, alternating still slides with the game's
//! video.
//!
//! Locking: the slide show state and the video frame parameters sit behind
//! separate locks. Decoded frames only ever take the frame parameter lock
//! and the output queue, so the decoder thread can't stall behind a slide
//! show transition that is busy stopping the decoder.

use crate::config::{keys, ConfigStore, EnableMode, MemoryConfigStore};
use crate::convert::{convert_video_frame, GammaMap, YuvFrame};
use crate::device::{
    Capability, DeviceBinder, DeviceBinding, DllBinder, DmdDevice, PmOptions, GEN_WPC95,
    HOST_TITLE,
};
use crate::high_scores;
use crate::host::{
    ErrorReporter, GameInfo, GameProvider, LogErrorReporter, NoTitleSettings, TitleSettingsSource,
};
use crate::logging::{log, LogCategory, LogLevel};
use crate::media::{self, MediaCandidate, MediaError};
use crate::slide::{Slide, SlideKind};
use crate::slideshow::{SlideShow, Step, VideoStatus};
use crate::timer::{ManualTimer, SlideTimer, ThreadTimer, TimerTarget, TimerToken};
use crate::types::{ColorSpace, Mirror};
use crate::video::{NoVideoSource, VideoEvent, VideoFrameSink, VideoPlayer, VideoSource};
use crate::writer::{GameSettings, OutputQueue, Writer, WriterExit, STOP_TIMEOUT};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

/// Title key consulted when a game has no settings of its own.
const DEFAULT_TITLE_KEY: &str = "default";

enum DeviceState {
    /// Binding not attempted yet
    Unbound,
    /// No usable driver
    Absent,
    /// Bound, no session running
    Idle(Box<dyn DmdDevice>),
    Running(Writer),
    /// The writer could not be started or never came back; output is off
    Lost,
}

#[derive(Debug, Clone, Copy)]
struct ActiveVideo {
    cookie: u64,
    color_space: ColorSpace,
}

struct FrameParams {
    mirror: Mirror,
    gamma: GammaMap,
    video: Option<ActiveVideo>,
}

/// What the loaded video is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VideoMode {
    /// Media for the selected game
    #[default]
    Game,
    /// The one-shot video played while the host starts up
    Startup,
}

#[derive(Default)]
struct ShowState {
    slides: SlideShow,
    video: Option<Box<dyn VideoPlayer>>,
    video_mode: VideoMode,
    game: Option<GameInfo>,
    /// Media for `game` has been loaded; cleared to force a reload
    loaded: bool,
    running_game: bool,
}

impl ShowState {
    fn video_status(&self) -> VideoStatus {
        match &self.video {
            Some(player) => VideoStatus::new(true, player.is_playing()),
            None => VideoStatus::NONE,
        }
    }
}

/// Routes decoded frames back to the controller without keeping it alive.
struct FrameSink(Weak<RealDmd>);

impl VideoFrameSink for FrameSink {
    fn present_frame(&self, cookie: u64, frame: &YuvFrame<'_>) {
        if let Some(dmd) = self.0.upgrade() {
            dmd.present_frame(cookie, frame);
        }
    }
}

/// Builder for [`RealDmd`].
pub struct RealDmdBuilder {
    provider: Arc<dyn GameProvider>,
    config: Arc<dyn ConfigStore>,
    title_settings: Arc<dyn TitleSettingsSource>,
    reporter: Arc<dyn ErrorReporter>,
    binder: Box<dyn DeviceBinder>,
    video_source: Arc<dyn VideoSource>,
    timer: Option<Arc<dyn SlideTimer>>,
}

impl RealDmdBuilder {
    pub fn config(mut self, config: Arc<dyn ConfigStore>) -> Self {
        self.config = config;
        self
    }

    pub fn title_settings(mut self, source: Arc<dyn TitleSettingsSource>) -> Self {
        self.title_settings = source;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn binder(mut self, binder: Box<dyn DeviceBinder>) -> Self {
        self.binder = binder;
        self
    }

    pub fn video_source(mut self, source: Arc<dyn VideoSource>) -> Self {
        self.video_source = source;
        self
    }

    /// Use `timer` instead of a [`ThreadTimer`]. The caller is then
    /// responsible for delivering firings to [`RealDmd::on_slide_timer`].
    pub fn timer(mut self, timer: Arc<dyn SlideTimer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn build(self) -> Arc<RealDmd> {
        Arc::new_cyclic(|weak: &Weak<RealDmd>| {
            let timer = match self.timer {
                Some(timer) => timer,
                None => {
                    let target: Weak<dyn TimerTarget> = weak.clone();
                    match ThreadTimer::spawn(target) {
                        Ok(timer) => Arc::new(timer) as Arc<dyn SlideTimer>,
                        Err(e) => {
                            log(LogCategory::SlideShow, LogLevel::Error, || {
                                format!("failed to start the slide timer: {}", e)
                            });
                            Arc::new(ManualTimer::new())
                        }
                    }
                }
            };

            RealDmd {
                provider: self.provider,
                config: self.config,
                title_settings: self.title_settings,
                reporter: self.reporter,
                binder: self.binder,
                video_source: self.video_source,
                timer,
                queue: Arc::new(OutputQueue::new()),
                empty: Slide::empty().into_shared(),
                device: Mutex::new(DeviceState::Unbound),
                supports_rgb: AtomicBool::new(false),
                enabled: AtomicBool::new(false),
                frame: RwLock::new(FrameParams {
                    mirror: Mirror::default(),
                    gamma: GammaMap::identity(),
                    video: None,
                }),
                state: Mutex::new(ShowState::default()),
                self_ref: weak.clone(),
            }
        })
    }
}

/// Controller for a real dot-matrix display.
pub struct RealDmd {
    provider: Arc<dyn GameProvider>,
    config: Arc<dyn ConfigStore>,
    title_settings: Arc<dyn TitleSettingsSource>,
    reporter: Arc<dyn ErrorReporter>,
    binder: Box<dyn DeviceBinder>,
    video_source: Arc<dyn VideoSource>,
    timer: Arc<dyn SlideTimer>,
    queue: Arc<OutputQueue>,
    empty: Arc<Slide>,
    device: Mutex<DeviceState>,
    supports_rgb: AtomicBool,
    enabled: AtomicBool,
    frame: RwLock<FrameParams>,
    state: Mutex<ShowState>,
    self_ref: Weak<RealDmd>,
}

impl RealDmd {
    /// Start building a controller for games supplied by `provider`.
    ///
    /// Defaults: in-memory config, no per-title settings, errors to the
    /// log, the dynamic-library driver binder, no video decoder and a
    /// thread-serviced slide timer.
    pub fn builder(provider: Arc<dyn GameProvider>) -> RealDmdBuilder {
        RealDmdBuilder {
            provider,
            config: Arc::new(MemoryConfigStore::new()),
            title_settings: Arc::new(NoTitleSettings),
            reporter: Arc::new(LogErrorReporter),
            binder: Box::new(DllBinder::new()),
            video_source: Arc::new(NoVideoSource),
            timer: None,
        }
    }

    /// Bind the driver (first call only), open a device session and start
    /// the writer.
    ///
    /// Returns false when the subsystem is switched off in the config, or
    /// in auto mode when the driver would only put up an on-screen virtual
    /// display. A missing driver still initializes; frames are then
    /// discarded.
    ///
    /// The binding outcome, including a failure, is kept for the life of
    /// this controller and never retried. Hosts create one controller per
    /// process, which makes that once per process.
    pub fn init(&self) -> bool {
        let mode = EnableMode::from_config(self.config.as_ref());
        if mode == EnableMode::Off {
            log(LogCategory::Device, LogLevel::Info, || {
                "real DMD disabled in settings".to_string()
            });
            return false;
        }
        if self.enabled.load(Ordering::Acquire) {
            return true;
        }

        let mut device = self.lock_device();
        if matches!(*device, DeviceState::Unbound)
            && mode == EnableMode::Auto
            && self.binder.virtual_display_active()
        {
            log(LogCategory::Device, LogLevel::Info, || {
                "driver is set up as an on-screen virtual DMD; not using it in auto mode".to_string()
            });
            return false;
        }

        self.load_frame_settings();

        if matches!(*device, DeviceState::Unbound) {
            *device = match DeviceBinding::bind(self.binder.as_ref(), self.reporter.as_ref()) {
                DeviceBinding::Bound(dev) => {
                    self.supports_rgb
                        .store(dev.capability().supports_rgb, Ordering::Release);
                    DeviceState::Idle(dev)
                }
                DeviceBinding::Absent => {
                    if mode == EnableMode::On {
                        self.reporter
                            .error("Real DMD is enabled but no display driver was found");
                    }
                    DeviceState::Absent
                }
            };
        }
        self.open_session(&mut device);
        drop(device);

        self.enabled.store(true, Ordering::Release);
        true
    }

    /// Stop media, stop the writer (bounded wait), blank the display and
    /// close the device session.
    pub fn shutdown(&self) {
        if !self.enabled.swap(false, Ordering::AcqRel) {
            return;
        }
        {
            let mut state = self.lock_state();
            self.forget_game_locked(&mut state);
            state.running_game = false;
        }
        let mut device = self.lock_device();
        self.close_session(&mut device);
        log(LogCategory::Device, LogLevel::Info, || {
            "real DMD shut down".to_string()
        });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Whether the bound driver accepts 24-bit color frames.
    pub fn supports_color_output(&self) -> bool {
        self.supports_rgb.load(Ordering::Acquire)
    }

    pub fn capability(&self) -> Capability {
        Capability {
            supports_rgb: self.supports_color_output(),
        }
    }

    pub fn mirror(&self) -> Mirror {
        self.read_frame().mirror
    }

    /// Persist the horizontal mirror setting and rebuild the display.
    pub fn set_mirror_horizontal(&self, on: bool) {
        self.config.set_bool(keys::MIRROR_HORZ, on);
        self.write_frame().mirror.horizontal = on;
        self.reload_game();
    }

    /// Persist the vertical mirror setting and rebuild the display.
    pub fn set_mirror_vertical(&self, on: bool) {
        self.config.set_bool(keys::MIRROR_VERT, on);
        self.write_frame().mirror.vertical = on;
        self.reload_game();
    }

    /// Pick up a change in the host's game selection.
    ///
    /// Does nothing if the selection is unchanged since the last load.
    pub fn update_game(&self) {
        if !self.is_enabled() {
            return;
        }
        let game = self.provider.current_game();
        let mut state = self.lock_state();
        if state.running_game {
            return;
        }
        if Self::startup_loaded(&state) {
            log(LogCategory::Media, LogLevel::Debug, || {
                "startup video still showing; game media waits".to_string()
            });
            return;
        }
        let same = state.game.as_ref().map(|g| &g.id) == game.as_ref().map(|g| &g.id);
        if state.loaded && same {
            return;
        }

        log(LogCategory::Media, LogLevel::Info, || match &game {
            Some(g) => format!("loading media for \"{}\"", g.title),
            None => "no game selected".to_string(),
        });

        self.post_title_settings(game.as_ref());

        let mirror = self.mirror();
        let videos_enabled = self.config.get_bool(keys::ENABLE_VIDEOS, true);
        let candidates = media::select_candidates(
            self.provider.as_ref(),
            game.as_ref(),
            self.capability(),
            videos_enabled,
        );

        let kept = Self::keep_current_video(&state, &candidates);
        if kept {
            log(LogCategory::Video, LogLevel::Debug, || {
                "selected video is already playing; keeping it".to_string()
            });
            state.slides.clear();
            self.timer.cancel();
        } else {
            self.clear_media_locked(&mut state);
        }

        let loaded = kept || self.load_media(&mut state, &candidates, mirror);
        if !loaded {
            if let Some(game) = &game {
                log(LogCategory::Media, LogLevel::Info, || {
                    format!("no usable media for \"{}\"; showing placeholder", game.title)
                });
                state
                    .slides
                    .push(media::placeholder_slide(&game.title, mirror).into_shared());
            }
        }

        if let Some(game) = &game {
            let style = game.high_score_style.as_deref();
            for slide in high_scores::generate_slides(&game.high_scores, style, mirror) {
                state.slides.push(slide.into_shared());
            }
        }

        state.game = game;
        state.loaded = true;

        let status = state.video_status();
        let step = state.slides.start(status);
        self.apply_step(&mut state, step);
    }

    /// Forget the loaded game and load the current selection again.
    pub fn reload_game(&self) {
        self.lock_state().loaded = false;
        self.update_game();
    }

    /// Stop the video, drop every slide, cancel the timer and blank the
    /// display.
    pub fn clear_media(&self) {
        let mut state = self.lock_state();
        self.clear_media_locked(&mut state);
    }

    /// Rebuild the generated score slides if `game` is the one on display.
    pub fn on_high_score_data_changed(&self, game: &GameInfo) {
        if !self.is_enabled() {
            return;
        }
        let mut state = self.lock_state();
        if state.game.as_ref().map(|g| &g.id) != Some(&game.id) {
            return;
        }

        let slides = high_scores::generate_slides(
            &game.high_scores,
            game.high_score_style.as_deref(),
            self.mirror(),
        );
        log(LogCategory::SlideShow, LogLevel::Debug, || {
            format!("high scores changed; {} score slide(s)", slides.len())
        });
        state.game = Some(game.clone());
        let status = state.video_status();
        let step = state.slides.replace_generated(slides, status);
        self.apply_step(&mut state, step);
    }

    /// Advance the slide show after the timer armed with `token` fired.
    pub fn on_slide_timer(&self, token: TimerToken) {
        if !self.is_enabled() {
            return;
        }
        let mut state = self.lock_state();
        let status = state.video_status();
        let step = state.slides.next(token, status);
        self.apply_step(&mut state, step);
    }

    /// The video identified by `cookie` finished a pass and wants to loop.
    ///
    /// With slides to show, the video stops and the slide show runs;
    /// the show hands back to the video after its last slide.
    pub fn video_loop_needed(&self, cookie: u64) {
        let mut state = self.lock_state();
        if !Self::is_current_video(&state, cookie) {
            return;
        }
        if state.slides.is_empty() {
            if let Some(player) = state.video.as_mut() {
                if let Err(e) = player.replay() {
                    log(LogCategory::Video, LogLevel::Warn, || {
                        format!("video replay failed: {}", e)
                    });
                }
            }
            return;
        }
        self.switch_to_slides(&mut state);
    }

    /// The video identified by `cookie` played to its end without looping.
    ///
    /// Only the startup video plays that way; when it ends the display
    /// moves on to the selected game's media.
    pub fn video_end_of_presentation(&self, cookie: u64) {
        {
            let mut state = self.lock_state();
            if !Self::is_current_video(&state, cookie) || state.video_mode != VideoMode::Startup {
                return;
            }
            log(LogCategory::Video, LogLevel::Info, || {
                "startup video finished".to_string()
            });
            self.forget_game_locked(&mut state);
        }
        self.update_game();
    }

    /// Load the startup video, replacing whatever is on display. It is not
    /// started until [`RealDmd::play_startup_video`].
    ///
    /// A color device tries the color video first, a monochrome device the
    /// monochrome one. Returns false when neither exists or loads.
    pub fn load_startup_video(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let capability = self.capability();
        let candidates = media::startup_candidates(self.provider.as_ref(), capability);
        let mut state = self.lock_state();
        if state.running_game {
            return false;
        }
        for candidate in &candidates {
            self.forget_game_locked(&mut state);
            self.post_title_settings(None);
            match self.open_video(candidate, false) {
                Ok(player) => {
                    state.video = Some(player);
                    state.video_mode = VideoMode::Startup;
                    return true;
                }
                Err(e) => log(LogCategory::Media, LogLevel::Warn, || {
                    format!("skipping startup video {}: {}", candidate.path.display(), e)
                }),
            }
        }
        false
    }

    /// Start the loaded startup video. Without one this does nothing.
    pub fn play_startup_video(&self) -> Result<(), MediaError> {
        let mut state = self.lock_state();
        if state.video_mode != VideoMode::Startup {
            return Ok(());
        }
        match state.video.as_mut() {
            Some(player) => player.play(),
            None => Ok(()),
        }
    }

    /// Cut the startup video short and show the selected game's media.
    pub fn end_startup_video(&self) {
        {
            let mut state = self.lock_state();
            if !Self::startup_loaded(&state) {
                return;
            }
            self.forget_game_locked(&mut state);
        }
        self.update_game();
    }

    pub fn is_startup_video_playing(&self) -> bool {
        let state = self.lock_state();
        Self::startup_loaded(&state) && state.video_status().playing
    }

    pub fn video_mode(&self) -> VideoMode {
        self.lock_state().video_mode
    }

    pub fn handle_video_event(&self, event: VideoEvent) {
        match event {
            VideoEvent::LoopNeeded(cookie) => self.video_loop_needed(cookie),
            VideoEvent::EndOfPresentation(cookie) => self.video_end_of_presentation(cookie),
        }
    }

    /// Convert a decoded frame of the current video and queue it.
    pub fn present_frame(&self, cookie: u64, frame: &YuvFrame<'_>) {
        if !self.is_enabled() {
            return;
        }
        let converted = {
            let params = self.read_frame();
            let Some(video) = params.video.filter(|v| v.cookie == cookie) else {
                return;
            };
            convert_video_frame(frame, video.color_space, params.mirror, &params.gamma)
                .map(|pixels| (video.color_space, pixels))
        };
        match converted {
            Some((color_space, pixels)) => {
                let slide = Slide::new(color_space, pixels, Duration::ZERO, SlideKind::Media);
                self.queue.submit(slide.into_shared());
            }
            None => log(LogCategory::Video, LogLevel::Trace, || {
                format!(
                    "dropping {}x{} video frame: unsupported size",
                    frame.width, frame.height
                )
            }),
        }
    }

    /// A game is about to take over the display: release the device.
    pub fn begin_running_game(&self) {
        if !self.is_enabled() {
            return;
        }
        {
            let mut state = self.lock_state();
            self.forget_game_locked(&mut state);
            state.running_game = true;
        }
        let mut device = self.lock_device();
        self.close_session(&mut device);
    }

    /// The game has exited: take the device back and reload.
    pub fn end_running_game(&self) {
        if !self.is_enabled() {
            return;
        }
        {
            let mut device = self.lock_device();
            self.open_session(&mut device);
        }
        self.lock_state().running_game = false;
        self.reload_game();
    }

    /// The shared output queue; frames submitted here reach the writer.
    pub fn queue(&self) -> &Arc<OutputQueue> {
        &self.queue
    }

    fn open_session(&self, device: &mut DeviceState) {
        let mut dev = match std::mem::replace(device, DeviceState::Absent) {
            DeviceState::Idle(dev) => dev,
            other => {
                *device = other;
                return;
            }
        };
        if !dev.open() {
            self.reporter.error("The display device could not be opened");
            *device = DeviceState::Idle(dev);
            return;
        }

        dev.configure(HOST_TITLE, GEN_WPC95, &PmOptions::default());
        dev.render_mono16(self.empty.pixels());
        self.queue.reset();
        *device = match Writer::spawn(dev, Arc::clone(&self.queue)) {
            Ok(writer) => {
                log(LogCategory::Device, LogLevel::Info, || {
                    "device session opened".to_string()
                });
                DeviceState::Running(writer)
            }
            Err(e) => {
                self.reporter
                    .sys_error("The display writer could not be started", &e.to_string());
                DeviceState::Lost
            }
        };
    }

    fn close_session(&self, device: &mut DeviceState) {
        *device = match std::mem::replace(device, DeviceState::Absent) {
            DeviceState::Running(writer) => match writer.stop(STOP_TIMEOUT) {
                Some(WriterExit {
                    device: mut dev,
                    failed,
                }) => {
                    if !failed {
                        dev.render_mono16(self.empty.pixels());
                    }
                    dev.close();
                    log(LogCategory::Device, LogLevel::Info, || {
                        "device session closed".to_string()
                    });
                    DeviceState::Idle(dev)
                }
                None => DeviceState::Lost,
            },
            other => other,
        };
    }

    fn load_frame_settings(&self) {
        let mirror = Mirror::new(
            self.config.get_bool(keys::MIRROR_HORZ, false),
            self.config.get_bool(keys::MIRROR_VERT, false),
        );
        let gamma = self.config.get_f32(keys::GRAYSCALE_GAMMA, 1.0);
        let mut params = self.write_frame();
        params.mirror = mirror;
        params.gamma = GammaMap::new(gamma);
    }

    fn post_title_settings(&self, game: Option<&GameInfo>) {
        let rom = game.and_then(|g| g.rom.as_deref());
        let options = rom
            .and_then(|key| self.title_settings.lookup(key))
            .or_else(|| self.title_settings.lookup(DEFAULT_TITLE_KEY))
            .unwrap_or_default();
        self.queue.post_settings(GameSettings {
            title: rom.unwrap_or(HOST_TITLE).to_string(),
            options,
        });
    }

    fn keep_current_video(state: &ShowState, candidates: &[MediaCandidate]) -> bool {
        let (Some(player), Some(wanted)) = (
            state.video.as_ref(),
            candidates.iter().find(|c| c.kind.is_video()),
        ) else {
            return false;
        };
        same_path(player.media_path(), &wanted.path)
    }

    /// Try `candidates` in order; stops at the first one that loads.
    fn load_media(
        &self,
        state: &mut ShowState,
        candidates: &[MediaCandidate],
        mirror: Mirror,
    ) -> bool {
        for candidate in candidates {
            if candidate.kind.is_video() {
                match self.open_video(candidate, true).and_then(|player| self.start_video(player)) {
                    Ok(player) => {
                        state.video = Some(player);
                        return true;
                    }
                    Err(e) => log(LogCategory::Media, LogLevel::Warn, || {
                        format!("skipping video {}: {}", candidate.path.display(), e)
                    }),
                }
            } else {
                match media::load_image_slide(&candidate.path, candidate.color_space, mirror) {
                    Ok(slide) => {
                        state.slides.push(slide.into_shared());
                        return true;
                    }
                    Err(e) => log(LogCategory::Media, LogLevel::Warn, || {
                        format!("skipping image {}: {}", candidate.path.display(), e)
                    }),
                }
            }
        }
        false
    }

    /// Open `candidate` and route its frames to the display. Playback is
    /// left to the caller.
    fn open_video(
        &self,
        candidate: &MediaCandidate,
        looping: bool,
    ) -> Result<Box<dyn VideoPlayer>, MediaError> {
        let sink = Arc::new(FrameSink(self.self_ref.clone()));
        let player = self.video_source.open(&candidate.path, looping, sink)?;
        self.write_frame().video = Some(ActiveVideo {
            cookie: player.cookie(),
            color_space: candidate.color_space,
        });
        log(LogCategory::Video, LogLevel::Info, || {
            format!(
                "loaded {} as {:?}",
                candidate.path.display(),
                candidate.color_space
            )
        });
        Ok(player)
    }

    /// Start a freshly opened player; on failure its frames are no longer
    /// routed to the display.
    fn start_video(
        &self,
        mut player: Box<dyn VideoPlayer>,
    ) -> Result<Box<dyn VideoPlayer>, MediaError> {
        if let Err(e) = player.play() {
            self.write_frame().video = None;
            player.stop();
            return Err(e);
        }
        Ok(player)
    }

    fn clear_media_locked(&self, state: &mut ShowState) {
        if let Some(mut player) = state.video.take() {
            player.stop();
        }
        state.video_mode = VideoMode::Game;
        self.write_frame().video = None;
        state.slides.clear();
        self.timer.cancel();
        self.queue.submit(Arc::clone(&self.empty));
    }

    /// Clear the display and drop the loaded game so the next
    /// [`RealDmd::update_game`] loads from scratch.
    fn forget_game_locked(&self, state: &mut ShowState) {
        self.clear_media_locked(state);
        state.game = None;
        state.loaded = false;
    }

    fn startup_loaded(state: &ShowState) -> bool {
        state.video_mode == VideoMode::Startup && state.video.is_some()
    }

    fn switch_to_slides(&self, state: &mut ShowState) {
        if let Some(player) = state.video.as_mut() {
            player.stop();
        }
        let status = state.video_status();
        let step = state.slides.start(status);
        self.apply_step(state, step);
    }

    fn apply_step(&self, state: &mut ShowState, step: Step) {
        match step {
            Step::Show { slide, token } => {
                let display_time = slide.display_time();
                self.queue.submit(slide);
                if !display_time.is_zero() {
                    self.timer.arm(display_time, token);
                }
            }
            Step::ReplayVideo => {
                if let Some(player) = state.video.as_mut() {
                    if let Err(e) = player.replay() {
                        log(LogCategory::Video, LogLevel::Warn, || {
                            format!("video replay failed: {}", e)
                        });
                    }
                }
            }
            Step::Wait => {}
        }
    }

    fn is_current_video(state: &ShowState, cookie: u64) -> bool {
        state.video.as_ref().is_some_and(|p| p.cookie() == cookie)
    }

    fn lock_state(&self) -> MutexGuard<'_, ShowState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_device(&self) -> MutexGuard<'_, DeviceState> {
        self.device.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_frame(&self) -> std::sync::RwLockReadGuard<'_, FrameParams> {
        self.frame.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_frame(&self) -> std::sync::RwLockWriteGuard<'_, FrameParams> {
        self.frame.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TimerTarget for RealDmd {
    fn on_timer(&self, token: TimerToken) {
        self.on_slide_timer(token);
    }
}

impl Drop for RealDmd {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}
