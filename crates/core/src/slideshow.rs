//! Slide show state machine.
//!
//! Owns the ordered slide list and the cursor into it. Transitions return
//! a [`Step`] describing what the controller has to do next; the state
//! machine itself never touches the device, the timer or the video player.

use crate::logging::{log, LogCategory, LogLevel};
use crate::slide::{Slide, SlideKind};
use crate::timer::TimerToken;
use std::sync::Arc;

/// Video state as seen by the slide show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoStatus {
    pub loaded: bool,
    pub playing: bool,
}

impl VideoStatus {
    pub const NONE: VideoStatus = VideoStatus {
        loaded: false,
        playing: false,
    };

    pub fn new(loaded: bool, playing: bool) -> Self {
        Self { loaded, playing }
    }
}

/// Action requested by a transition.
#[derive(Debug, Clone)]
pub enum Step {
    /// Render `slide` and, if it has a display time, arm the timer with `token`
    Show { slide: Arc<Slide>, token: TimerToken },
    /// Restart the loaded video
    ReplayVideo,
    /// Nothing to do
    Wait,
}

/// Slide list with a cursor.
///
/// A cursor of `None` with a non-empty list means the last slide has been
/// shown and the video has the display.
#[derive(Debug, Default)]
pub struct SlideShow {
    slides: Vec<Arc<Slide>>,
    position: Option<usize>,
    token: TimerToken,
}

impl SlideShow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slides(&self) -> &[Arc<Slide>] {
        &self.slides
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn current(&self) -> Option<&Arc<Slide>> {
        self.position.and_then(|i| self.slides.get(i))
    }

    /// Token of the most recent arming. Firings carrying anything else
    /// are stale.
    pub fn token(&self) -> TimerToken {
        self.token
    }

    pub fn push(&mut self, slide: Arc<Slide>) {
        self.slides.push(slide);
    }

    /// Drop all slides and invalidate any pending timer firing.
    pub fn clear(&mut self) {
        self.slides.clear();
        self.position = None;
        self.token = self.token.next();
    }

    /// Begin at the first slide.
    ///
    /// While a video is playing the cursor is parked on the first slide and
    /// nothing is shown; the video's next loop starts the show.
    pub fn start(&mut self, video: VideoStatus) -> Step {
        if self.slides.is_empty() {
            self.position = None;
            return Self::idle_step(video);
        }
        self.position = Some(0);
        if video.playing {
            return Step::Wait;
        }
        self.show(0)
    }

    /// Advance after the timer fired with `token`.
    ///
    /// Past the last slide the show hands over to the video if one is
    /// loaded, otherwise it wraps to the first slide.
    pub fn next(&mut self, token: TimerToken, video: VideoStatus) -> Step {
        if token != self.token {
            log(LogCategory::SlideShow, LogLevel::Debug, || {
                format!(
                    "ignoring stale slide timer (generation {}, current {})",
                    token.generation(),
                    self.token.generation()
                )
            });
            return Step::Wait;
        }
        if self.slides.is_empty() {
            return Self::idle_step(video);
        }

        let next = self.position.map(|i| i + 1).filter(|&i| i < self.slides.len());
        match next {
            Some(i) => self.show(i),
            None if video.loaded => {
                self.position = None;
                if video.playing {
                    Step::Wait
                } else {
                    Step::ReplayVideo
                }
            }
            None => self.show(0),
        }
    }

    /// Swap the generated text slides for `generated`.
    ///
    /// If the slide on display survives, the cursor follows it and the
    /// running timer stays valid. If it was removed the show restarts. If
    /// the video had the display it keeps it.
    pub fn replace_generated(&mut self, generated: Vec<Slide>, video: VideoStatus) -> Step {
        let was_empty = self.slides.is_empty();
        let current = self.current().cloned();

        self.slides.retain(|s| s.kind() != SlideKind::GeneratedText);
        self.slides
            .extend(generated.into_iter().map(Slide::into_shared));

        match current {
            Some(current) => {
                match self.slides.iter().position(|s| Arc::ptr_eq(s, &current)) {
                    Some(i) => {
                        self.position = Some(i);
                        Step::Wait
                    }
                    None => {
                        self.token = self.token.next();
                        self.start(video)
                    }
                }
            }
            None if was_empty => self.start(video),
            None => Step::Wait,
        }
    }

    fn show(&mut self, index: usize) -> Step {
        self.position = Some(index);
        self.token = self.token.next();
        Step::Show {
            slide: Arc::clone(&self.slides[index]),
            token: self.token,
        }
    }

    fn idle_step(video: VideoStatus) -> Step {
        if video.loaded && !video.playing {
            Step::ReplayVideo
        } else {
            Step::Wait
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorSpace, DMD_PIXELS};
    use std::time::Duration;

    fn slide(level: u8, kind: SlideKind) -> Slide {
        Slide::new(
            ColorSpace::Mono16,
            vec![level; DMD_PIXELS],
            Duration::from_millis(3500),
            kind,
        )
    }

    fn shown(step: &Step) -> (u8, TimerToken) {
        match step {
            Step::Show { slide, token } => (slide.pixels()[0], *token),
            other => panic!("expected a slide, got {:?}", other),
        }
    }

    fn text_show(levels: &[u8]) -> SlideShow {
        let mut show = SlideShow::new();
        for &level in levels {
            show.push(slide(level, SlideKind::GeneratedText).into_shared());
        }
        show
    }

    #[test]
    fn test_cycles_without_video() {
        let mut show = text_show(&[1, 2, 3]);
        let (level, mut token) = shown(&show.start(VideoStatus::NONE));
        assert_eq!(level, 1);

        let mut seen = Vec::new();
        for _ in 0..4 {
            let (level, next) = shown(&show.next(token, VideoStatus::NONE));
            seen.push(level);
            token = next;
        }
        assert_eq!(seen, vec![2, 3, 1, 2]);
    }

    #[test]
    fn test_hands_over_to_video_after_last_slide() {
        let mut show = text_show(&[1, 2]);
        let stopped = VideoStatus::new(true, false);
        let (_, token) = shown(&show.start(stopped));
        let (level, token) = shown(&show.next(token, stopped));
        assert_eq!(level, 2);
        assert!(matches!(show.next(token, stopped), Step::ReplayVideo));
        assert_eq!(show.position(), None);

        // The video's next loop restarts the show from the top
        let (level, _) = shown(&show.start(stopped));
        assert_eq!(level, 1);
    }

    #[test]
    fn test_start_while_video_plays_waits() {
        let mut show = text_show(&[1]);
        assert!(matches!(
            show.start(VideoStatus::new(true, true)),
            Step::Wait
        ));
        assert_eq!(show.position(), Some(0));
    }

    #[test]
    fn test_empty_show_replays_stopped_video() {
        let mut show = SlideShow::new();
        assert!(matches!(
            show.start(VideoStatus::new(true, false)),
            Step::ReplayVideo
        ));
        assert!(matches!(show.start(VideoStatus::new(true, true)), Step::Wait));
        assert!(matches!(show.start(VideoStatus::NONE), Step::Wait));
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let mut show = text_show(&[1, 2]);
        let (_, first) = shown(&show.start(VideoStatus::NONE));
        let (_, _second) = shown(&show.next(first, VideoStatus::NONE));
        assert!(matches!(show.next(first, VideoStatus::NONE), Step::Wait));
        assert_eq!(show.position(), Some(1));

        let before = show.token();
        show.clear();
        assert!(matches!(show.next(before, VideoStatus::NONE), Step::Wait));
    }

    #[test]
    fn test_replace_keeps_surviving_slide() {
        let mut show = SlideShow::new();
        show.push(slide(9, SlideKind::Media).into_shared());
        show.push(slide(1, SlideKind::GeneratedText).into_shared());
        let (_, token) = shown(&show.start(VideoStatus::NONE));
        assert_eq!(show.position(), Some(0));

        let step = show.replace_generated(
            vec![
                slide(5, SlideKind::GeneratedText),
                slide(6, SlideKind::GeneratedText),
            ],
            VideoStatus::NONE,
        );
        assert!(matches!(step, Step::Wait));
        assert_eq!(show.len(), 3);
        assert_eq!(show.position(), Some(0));

        // The timer armed before the swap still advances the show
        let (level, _) = shown(&show.next(token, VideoStatus::NONE));
        assert_eq!(level, 5);
    }

    #[test]
    fn test_replace_restarts_when_current_removed() {
        let mut show = SlideShow::new();
        show.push(slide(9, SlideKind::Media).into_shared());
        show.push(slide(1, SlideKind::GeneratedText).into_shared());
        let (_, token) = shown(&show.start(VideoStatus::NONE));
        let (level, token) = shown(&show.next(token, VideoStatus::NONE));
        assert_eq!(level, 1);

        let step = show.replace_generated(
            vec![slide(7, SlideKind::GeneratedText)],
            VideoStatus::NONE,
        );
        let (level, restarted) = shown(&step);
        assert_eq!(level, 9);
        assert_ne!(restarted, token);
        assert!(matches!(show.next(token, VideoStatus::NONE), Step::Wait));
    }

    #[test]
    fn test_replace_starts_idle_show() {
        let mut show = SlideShow::new();
        let step = show.replace_generated(
            vec![slide(4, SlideKind::GeneratedText)],
            VideoStatus::NONE,
        );
        assert_eq!(shown(&step).0, 4);
    }

    #[test]
    fn test_replace_leaves_video_turn_alone() {
        let mut show = text_show(&[1]);
        let stopped = VideoStatus::new(true, false);
        let (_, token) = shown(&show.start(stopped));
        assert!(matches!(show.next(token, stopped), Step::ReplayVideo));

        let playing = VideoStatus::new(true, true);
        let step = show.replace_generated(vec![slide(2, SlideKind::GeneratedText)], playing);
        assert!(matches!(step, Step::Wait));
        assert_eq!(show.position(), None);
        assert_eq!(show.len(), 1);
    }
}
