//! PNG previews of rasterized text.

use anyhow::{Context, Result};
use dmd_core::font::{self, ColorTable, Font};
use dmd_core::{DMD_HEIGHT, DMD_PIXELS, DMD_WIDTH};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Parse an `RRGGBB` hex color.
pub fn parse_color(text: &str) -> Result<[u8; 3]> {
    let hex = text.trim().trim_start_matches('#');
    anyhow::ensure!(
        hex.len() == 6 && hex.is_ascii(),
        "expected RRGGBB, got \"{}\"",
        text
    );
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).with_context(|| format!("bad color \"{}\"", text))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Draw `lines` centred on a 128×32 RGBA frame.
pub fn render_rgba<S: AsRef<str>>(lines: &[S], font: &Font, colors: &ColorTable) -> Vec<u8> {
    let mut frame = Vec::with_capacity(DMD_PIXELS * 4);
    for _ in 0..DMD_PIXELS {
        frame.extend_from_slice(&colors[0]);
    }
    let line_height = font.cell_height() as i32;
    let mut y = (DMD_HEIGHT as i32 - line_height * lines.len() as i32) / 2;
    for line in lines {
        let line = line.as_ref();
        let width = font.measure_string(line).width as i32;
        font.draw_32bpp(line, &mut frame, (DMD_WIDTH as i32 - width) / 2, y, colors);
        y += line_height;
    }
    frame
}

/// Scale an RGBA frame up by `scale` with square dots.
pub fn upscale(frame: &[u8], scale: usize) -> Vec<u8> {
    let scale = scale.max(1);
    let out_width = DMD_WIDTH * scale;
    let mut out = vec![0u8; out_width * DMD_HEIGHT * scale * 4];
    for row in 0..DMD_HEIGHT * scale {
        for col in 0..out_width {
            let src = ((row / scale) * DMD_WIDTH + col / scale) * 4;
            let dst = (row * out_width + col) * 4;
            out[dst..dst + 4].copy_from_slice(&frame[src..src + 4]);
        }
    }
    out
}

/// Render `lines` and write the preview PNG. Returns the font used.
pub fn save_text_png<S: AsRef<str>>(
    lines: &[S],
    font_name: Option<&str>,
    color: [u8; 3],
    scale: usize,
    path: &Path,
) -> Result<&'static str> {
    let font = match font_name {
        Some(name) => font::by_name(name).with_context(|| {
            let names: Vec<&str> = font::fonts().iter().map(|f| f.name()).collect();
            format!("unknown font \"{}\" (available: {})", name, names.join(", "))
        })?,
        None => font::pick_font(lines),
    };
    let frame = render_rgba(lines, font, &font::color_ramp(color));
    let scale = scale.max(1);
    let pixels = upscale(&frame, scale);

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        (DMD_WIDTH * scale) as u32,
        (DMD_HEIGHT * scale) as u32,
    );
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&pixels)?;
    Ok(font.name())
}
