//! Bitmap font rasterizer for native-resolution text.
//!
//! Fonts are fixed-height, proportional, and pre-rasterized for the DMD dot
//! pitch: every glyph dot is a 4-bit intensity (0-15) and text is drawn
//! dot-for-dot with no scaling or filtering.
//!
//! # Atlas layout
//!
//! All glyphs of a font live side by side in one atlas that is
//! `cell_height` rows tall. Each printable ASCII character (32-126) has an
//! advance width and a column offset into the atlas; a width of 0 means the
//! glyph is absent. Absent lower-case letters are drawn with their
//! upper-case glyph.

mod glyphs;

use crate::types::{DMD_HEIGHT, DMD_PIXELS, DMD_WIDTH};
use std::sync::OnceLock;

const FIRST_CHAR: u32 = 32;
const LAST_CHAR: u32 = 126;
const CHAR_COUNT: usize = (LAST_CHAR - FIRST_CHAR + 1) as usize;

/// Maps a 4-bit glyph intensity to a 4-byte target pixel.
pub type ColorTable = [[u8; 4]; 16];

/// Text extent in dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSize {
    pub width: usize,
    pub height: usize,
}

/// An immutable pre-rasterized font.
#[derive(Debug)]
pub struct Font {
    name: &'static str,
    cell_height: usize,
    atlas: Vec<u8>,
    atlas_width: usize,
    widths: [u8; CHAR_COUNT],
    offsets: [usize; CHAR_COUNT],
}

impl Font {
    /// Build a font from glyph art. Rows shorter than the widest row of a
    /// glyph are padded with unlit dots; every glyph gets one column of
    /// trailing spacing. `scale` repeats each dot `scale` times in both
    /// directions.
    fn from_art(
        name: &'static str,
        art_height: usize,
        glyphs: &[glyphs::Glyph],
        scale: usize,
    ) -> Self {
        let scale = scale.max(1);
        let cell_height = art_height * scale;
        let mut widths = [0u8; CHAR_COUNT];
        let mut offsets = [0usize; CHAR_COUNT];

        let mut atlas_width = 0;
        for (c, rows) in glyphs {
            let Some(index) = char_index(*c) else {
                continue;
            };
            let art_width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
            let width = (art_width + 1) * scale;
            offsets[index] = atlas_width;
            widths[index] = width.min(u8::MAX as usize) as u8;
            atlas_width += width;
        }

        let mut atlas = vec![0u8; atlas_width * cell_height];
        for (c, rows) in glyphs {
            let Some(index) = char_index(*c) else {
                continue;
            };
            let base = offsets[index];
            for (art_y, row) in rows.iter().take(art_height).enumerate() {
                for (art_x, dot) in row.bytes().enumerate() {
                    let level = match dot {
                        b'#' => 15,
                        b'+' => 8,
                        _ => 0,
                    };
                    for sy in 0..scale {
                        let y = art_y * scale + sy;
                        for sx in 0..scale {
                            let x = base + art_x * scale + sx;
                            atlas[y * atlas_width + x] = level;
                        }
                    }
                }
            }
        }

        Self {
            name,
            cell_height,
            atlas,
            atlas_width,
            widths,
            offsets,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cell_height(&self) -> usize {
        self.cell_height
    }

    /// Atlas index of the glyph drawn for `c`, applying the lower-case
    /// fallback. `None` for characters that draw nothing.
    fn glyph_index(&self, c: char) -> Option<usize> {
        let index = char_index(c)?;
        if self.widths[index] == 0 && c.is_ascii_lowercase() {
            let upper = char_index(c.to_ascii_uppercase())?;
            return (self.widths[upper] != 0).then_some(upper);
        }
        (self.widths[index] != 0).then_some(index)
    }

    /// Advance width of a single character, 0 if it draws nothing.
    pub fn char_width(&self, c: char) -> usize {
        self.glyph_index(c)
            .map(|i| self.widths[i] as usize)
            .unwrap_or(0)
    }

    pub fn measure_string(&self, text: &str) -> TextSize {
        TextSize {
            width: text.chars().map(|c| self.char_width(c)).sum(),
            height: self.cell_height,
        }
    }

    /// Walk every glyph dot of `text` placed at (`x`, `y`), calling `put`
    /// with the target dot index and the glyph intensity for each dot that
    /// lands inside the display.
    fn blit(&self, text: &str, x: i32, y: i32, mut put: impl FnMut(usize, u8)) {
        let mut cursor = x;
        for c in text.chars() {
            let Some(index) = self.glyph_index(c) else {
                continue;
            };
            let width = self.widths[index] as usize;
            let offset = self.offsets[index];
            for row in 0..self.cell_height {
                let ty = y + row as i32;
                if ty < 0 || ty >= DMD_HEIGHT as i32 {
                    continue;
                }
                let src = &self.atlas[row * self.atlas_width + offset..][..width];
                for (col, &level) in src.iter().enumerate() {
                    let tx = cursor + col as i32;
                    if tx < 0 || tx >= DMD_WIDTH as i32 {
                        continue;
                    }
                    put(ty as usize * DMD_WIDTH + tx as usize, level);
                }
            }
            cursor += width as i32;
        }
    }

    /// Draw into a 4-bytes-per-dot 128×32 buffer, mapping glyph intensity
    /// through `colors`. Unlit glyph dots are written too (with
    /// `colors[0]`), so text overwrites its cell background.
    pub fn draw_32bpp(&self, text: &str, target: &mut [u8], x: i32, y: i32, colors: &ColorTable) {
        self.blit(text, x, y, |dot, level| {
            if let Some(px) = target.get_mut(dot * 4..dot * 4 + 4) {
                px.copy_from_slice(&colors[(level & 0x0F) as usize]);
            }
        });
    }

    /// Draw into a one-byte-per-dot 128×32 buffer of raw intensities.
    pub fn draw_4bpp(&self, text: &str, target: &mut [u8], x: i32, y: i32) {
        self.blit(text, x, y, |dot, level| {
            if let Some(px) = target.get_mut(dot) {
                *px = level;
            }
        });
    }
}

fn char_index(c: char) -> Option<usize> {
    let code = c as u32;
    (FIRST_CHAR..=LAST_CHAR)
        .contains(&code)
        .then(|| (code - FIRST_CHAR) as usize)
}

/// Linear 16-step ramp from black to `base`, RGBA byte order.
pub fn color_ramp(base: [u8; 3]) -> ColorTable {
    let mut table = [[0u8; 4]; 16];
    for (level, entry) in table.iter_mut().enumerate() {
        for ch in 0..3 {
            entry[ch] = (base[ch] as usize * level / 15) as u8;
        }
        entry[3] = 0xFF;
    }
    table
}

/// Built-in fonts, largest first.
pub fn fonts() -> &'static [Font] {
    static FONTS: OnceLock<Vec<Font>> = OnceLock::new();
    FONTS.get_or_init(|| {
        vec![
            Font::from_art("dmd-14px", 7, glyphs::FONT_7PX, 2),
            Font::from_art("dmd-7px", 7, glyphs::FONT_7PX, 1),
            Font::from_art("dmd-5px", 5, glyphs::FONT_5PX, 1),
        ]
    })
}

/// Look up a built-in font by name.
pub fn by_name(name: &str) -> Option<&'static Font> {
    fonts().iter().find(|f| f.name.eq_ignore_ascii_case(name))
}

/// Pick the largest font that fits `lines` on the display.
///
/// Starts from the largest font whose stacked cell heights fit the display
/// height, then steps down until the widest line fits the display width.
/// Returns the smallest font when nothing fits.
pub fn pick_font<S: AsRef<str>>(lines: &[S]) -> &'static Font {
    let all = fonts();
    let count = lines.len().max(1);
    let first = all
        .iter()
        .position(|f| count * f.cell_height <= DMD_HEIGHT)
        .unwrap_or(all.len() - 1);

    for font in &all[first..] {
        let widest = lines
            .iter()
            .map(|l| font.measure_string(l.as_ref()).width)
            .max()
            .unwrap_or(0);
        if widest <= DMD_WIDTH {
            return font;
        }
    }
    &all[all.len() - 1]
}

/// Draw `lines` on a blank 16-shade frame with the largest font that fits,
/// each line centred horizontally and the block centred vertically.
pub fn render_centered<S: AsRef<str>>(lines: &[S]) -> Vec<u8> {
    let font = pick_font(lines);
    let mut frame = vec![0u8; DMD_PIXELS];
    let line_height = font.cell_height() as i32;
    let mut y = (DMD_HEIGHT as i32 - line_height * lines.len() as i32) / 2;
    for line in lines {
        let line = line.as_ref();
        let width = font.measure_string(line).width as i32;
        font.draw_4bpp(line, &mut frame, (DMD_WIDTH as i32 - width) / 2, y);
        y += line_height;
    }
    frame
}
