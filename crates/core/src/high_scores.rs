//! High score text slides.

use crate::convert::mirror_frame;
use crate::font;
use crate::slide::{Slide, SlideKind};
use crate::types::{ColorSpace, Mirror};
use std::time::Duration;

/// Display time of each generated score slide.
pub const SCORE_DISPLAY_TIME: Duration = Duration::from_millis(3500);

/// Added when a game produces only one score slide.
pub const SINGLE_SLIDE_BONUS: Duration = Duration::from_millis(2000);

/// Style value that turns generated score slides off.
pub const STYLE_NONE: &str = "none";

/// Whether the game's high score style suppresses generated slides.
pub fn style_suppresses(style: Option<&str>) -> bool {
    style.is_some_and(|s| s.trim().eq_ignore_ascii_case(STYLE_NONE))
}

/// Split score text into screens.
///
/// Blank lines separate groups. A group of up to three lines is one
/// screen; a longer group is shown two lines at a time, with the first
/// line on its own when the count is odd (it is usually a heading).
pub fn group_lines<S: AsRef<str>>(lines: &[S]) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let mut screens = Vec::new();
    for group in groups {
        if group.len() <= 3 {
            screens.push(group);
            continue;
        }
        let mut rest = group.as_slice();
        if rest.len() % 2 == 1 {
            screens.push(vec![rest[0].clone()]);
            rest = &rest[1..];
        }
        screens.extend(rest.chunks(2).map(|pair| pair.to_vec()));
    }
    screens
}

/// Render one screen of score text as a 16-shade slide.
pub fn score_slide<S: AsRef<str>>(lines: &[S], mirror: Mirror) -> Slide {
    let pixels = font::render_centered(lines);
    Slide::new(
        ColorSpace::Mono16,
        mirror_frame(&pixels, ColorSpace::Mono16, mirror),
        SCORE_DISPLAY_TIME,
        SlideKind::GeneratedText,
    )
}

/// Generated slides for a game's high score text, honoring its style.
pub fn generate_slides<S: AsRef<str>>(
    lines: &[S],
    style: Option<&str>,
    mirror: Mirror,
) -> Vec<Slide> {
    if lines.is_empty() || style_suppresses(style) {
        return Vec::new();
    }
    let mut slides: Vec<Slide> = group_lines(lines)
        .iter()
        .map(|screen| score_slide(screen, mirror))
        .collect();
    if slides.len() == 1 {
        let slide = slides.remove(0);
        let extended = slide.display_time() + SINGLE_SLIDE_BONUS;
        slides.push(slide.with_display_time(extended));
    }
    slides
}
