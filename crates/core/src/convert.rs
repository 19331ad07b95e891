//! Frame conversion into the device's native formats.
//!
//! Video arrives as planar YUV 4:2:0 at either the native 128×32 size or
//! exactly double that (256×64), where every dot is a 2×2 block with the
//! dot's brightness in one sample and dark gap pixels in the others. Still
//! images arrive as packed RGB of any size and are resized first.
//!
//! Mirroring is done by choosing where the destination cursor starts and
//! which way it steps, so it costs nothing on top of the conversion.
//!
//! All color math is integer fixed point with 16 fractional bits.

use crate::types::{ColorSpace, Mirror, DMD_HEIGHT, DMD_PIXELS, DMD_WIDTH};

/// One decoded video frame, borrowed from the decoder.
///
/// The chroma planes are subsampled 2×2, so each is
/// `(width / 2) × (height / 2)`.
#[derive(Debug, Clone, Copy)]
pub struct YuvFrame<'a> {
    pub width: usize,
    pub height: usize,
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
}

/// Source frame geometries the converter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// 128×32, one sample per dot
    Native,
    /// 256×64, one 2×2 block per dot
    Double,
}

impl Geometry {
    pub fn of(width: usize, height: usize) -> Option<Self> {
        match (width, height) {
            (DMD_WIDTH, DMD_HEIGHT) => Some(Geometry::Native),
            (w, h) if w == DMD_WIDTH * 2 && h == DMD_HEIGHT * 2 => Some(Geometry::Double),
            _ => None,
        }
    }

    fn scale(self) -> usize {
        match self {
            Geometry::Native => 1,
            Geometry::Double => 2,
        }
    }
}

/// 256-entry luma remapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GammaMap([u8; 256]);

impl GammaMap {
    pub fn identity() -> Self {
        let mut table = [0u8; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = i as u8;
        }
        Self(table)
    }

    /// `out = round(255 * (in / 255) ^ gamma)`. Non-positive or non-finite
    /// gamma values give the identity map.
    pub fn new(gamma: f32) -> Self {
        if !gamma.is_finite() || gamma <= 0.0 || gamma == 1.0 {
            return Self::identity();
        }
        let mut table = [0u8; 256];
        for (i, v) in table.iter_mut().enumerate() {
            let level = 255.0 * (i as f64 / 255.0).powf(gamma as f64);
            *v = level.round().clamp(0.0, 255.0) as u8;
        }
        Self(table)
    }

    #[inline]
    pub fn apply(&self, luma: u8) -> u8 {
        self.0[luma as usize]
    }
}

impl Default for GammaMap {
    fn default() -> Self {
        Self::identity()
    }
}

#[inline]
fn clamp8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// BT.601 studio-swing YUV to RGB.
#[inline]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let yp = (y as i32 - 16) * 76284;
    let cb = u as i32 - 128;
    let cr = v as i32 - 128;
    [
        clamp8((yp + 104595 * cr) >> 16),
        clamp8((yp - 53281 * cr - 25625 * cb) >> 16),
        clamp8((yp + 132252 * cb) >> 16),
    ]
}

/// 4-bit luma of an RGB dot: `0.30R + 0.59G + 0.11B`, top four bits.
#[inline]
pub fn rgb_to_mono16_dot(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19660 + g as u32 * 38666 + b as u32 * 7209) >> 20) as u8
}

/// Visit every destination dot in source order.
///
/// `visit(row, col, dst)` gets the native source coordinates and the index
/// of the destination dot they land on after mirroring.
fn traverse(mirror: Mirror, mut visit: impl FnMut(usize, usize, usize)) {
    let (row_start, row_step) = if mirror.vertical {
        (DMD_HEIGHT as isize - 1, -1)
    } else {
        (0, 1)
    };
    let (col_start, col_step) = if mirror.horizontal {
        (DMD_WIDTH as isize - 1, -1)
    } else {
        (0, 1)
    };

    let mut dst_row = row_start;
    for row in 0..DMD_HEIGHT {
        let mut dst = dst_row * DMD_WIDTH as isize + col_start;
        for col in 0..DMD_WIDTH {
            visit(row, col, dst as usize);
            dst += col_step;
        }
        dst_row += row_step;
    }
}

/// Brightest luma sample for the native dot at (`row`, `col`).
#[inline]
fn luma_at(y: &[u8], geometry: Geometry, row: usize, col: usize) -> u8 {
    match geometry {
        Geometry::Native => y[row * DMD_WIDTH + col],
        Geometry::Double => {
            let stride = DMD_WIDTH * 2;
            let i = row * 2 * stride + col * 2;
            y[i].max(y[i + 1]).max(y[i + stride]).max(y[i + stride + 1])
        }
    }
}

/// Index into the chroma planes for the native dot at (`row`, `col`).
#[inline]
fn chroma_index(geometry: Geometry, row: usize, col: usize) -> usize {
    match geometry {
        Geometry::Native => (row / 2) * (DMD_WIDTH / 2) + col / 2,
        Geometry::Double => row * DMD_WIDTH + col,
    }
}

/// Convert one video frame to `target`.
///
/// Returns `None` for geometries other than native or double size, and for
/// frames whose planes are too short for their stated size.
pub fn convert_video_frame(
    frame: &YuvFrame<'_>,
    target: ColorSpace,
    mirror: Mirror,
    gamma: &GammaMap,
) -> Option<Vec<u8>> {
    let geometry = Geometry::of(frame.width, frame.height)?;
    let scale = geometry.scale();
    let luma_len = DMD_PIXELS * scale * scale;
    let chroma_len = luma_len / 4;
    if frame.y.len() < luma_len {
        return None;
    }

    match target {
        ColorSpace::Mono16 | ColorSpace::Mono4 => {
            let shift = if target == ColorSpace::Mono16 { 4 } else { 6 };
            let mask = target.max_level();
            let mut out = vec![0u8; DMD_PIXELS];
            traverse(mirror, |row, col, dst| {
                let luma = gamma.apply(luma_at(frame.y, geometry, row, col));
                out[dst] = (luma >> shift) & mask;
            });
            Some(out)
        }
        ColorSpace::Rgb24 => {
            if frame.u.len() < chroma_len || frame.v.len() < chroma_len {
                return None;
            }
            let mut out = vec![0u8; DMD_PIXELS * 3];
            traverse(mirror, |row, col, dst| {
                let luma = luma_at(frame.y, geometry, row, col);
                let c = chroma_index(geometry, row, col);
                let rgb = yuv_to_rgb(luma, frame.u[c], frame.v[c]);
                out[dst * 3..dst * 3 + 3].copy_from_slice(&rgb);
            });
            Some(out)
        }
    }
}

/// Packed 8-bit RGB image of arbitrary size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Resample to 128×32 packed RGB by nearest sample, applying `mirror`.
    pub fn to_native_rgb(&self, mirror: Mirror) -> Vec<u8> {
        let mut out = vec![0u8; DMD_PIXELS * 3];
        if self.width == 0 || self.height == 0 || self.pixels.len() < self.width * self.height * 3
        {
            return out;
        }
        traverse(mirror, |row, col, dst| {
            let sx = col * self.width / DMD_WIDTH;
            let sy = row * self.height / DMD_HEIGHT;
            let src = (sy * self.width + sx) * 3;
            out[dst * 3..dst * 3 + 3].copy_from_slice(&self.pixels[src..src + 3]);
        });
        out
    }
}

/// Convert a native packed RGB frame to 16-shade gray.
pub fn rgb_to_mono16(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .map(|p| rgb_to_mono16_dot(p[0], p[1], p[2]))
        .collect()
}

/// Copy a native frame with mirroring applied.
pub fn mirror_frame(pixels: &[u8], color_space: ColorSpace, mirror: Mirror) -> Vec<u8> {
    if mirror.is_identity() {
        return pixels.to_vec();
    }
    let bpp = color_space.bytes_per_pixel();
    let mut out = vec![0u8; DMD_PIXELS * bpp];
    if pixels.len() < out.len() {
        return out;
    }
    traverse(mirror, |row, col, dst| {
        let src = (row * DMD_WIDTH + col) * bpp;
        out[dst * bpp..dst * bpp + bpp].copy_from_slice(&pixels[src..src + bpp]);
    });
    out
}
