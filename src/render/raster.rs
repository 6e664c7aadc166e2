//! Premultiplied RGBA8 frame buffers and the pixel operations the compositor needs.

use crate::foundation::core::{FrameIndex, Rgba8, Vec2};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{
    add_sat_u8, mul_div255_u16, mul_div255_u8, premultiply_rgba8_in_place,
    unpremultiply_rgba8_in_place,
};

/// Premultiplied RGBA8 image, tightly packed, row-major.
///
/// Every resampling operation on a raster is nearest-neighbour; nothing here blends neighbouring
/// pixels, so hard pixel-art edges survive scaling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes.
    pub data: Vec<u8>,
}

/// One composited output frame, tagged with its presentation time.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Index in the output sequence.
    pub index: FrameIndex,
    /// Presentation time in seconds.
    pub time_secs: f64,
    /// Pixels at the render format's resolution.
    pub raster: Raster,
}

impl Raster {
    /// Fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    /// Raster filled with one color.
    pub fn filled(width: u32, height: u32, color: Rgba8) -> Self {
        let mut r = Self::new(width, height);
        r.fill(color);
        r
    }

    /// Wrap premultiplied bytes.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> ReelResult<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return Err(ReelError::asset(format!(
                "raster byte length {} does not match {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert a straight-alpha image.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let mut data = img.into_raw();
        premultiply_rgba8_in_place(&mut data);
        Self {
            width,
            height,
            data,
        }
    }

    /// Convert to a straight-alpha image (for PNG export).
    pub fn to_rgba_image(&self) -> ReelResult<image::RgbaImage> {
        let mut data = self.data.clone();
        unpremultiply_rgba8_in_place(&mut data);
        image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| ReelError::asset("raster buffer does not match its dimensions"))
    }

    /// Whether the raster has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: Rgba8) {
        let px = color.to_premul();
        for d in self.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    /// Blend a solid rectangle over the raster, clipped to its bounds.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgba8) {
        let src = color.to_premul();
        let Some((x0, y0, x1, y1)) = clip(x, y, w, h, self.width, self.height) else {
            return;
        };
        for yy in y0..y1 {
            for xx in x0..x1 {
                let i = ((yy as usize) * (self.width as usize) + (xx as usize)) * 4;
                over_px(&mut self.data[i..i + 4], &src);
            }
        }
    }

    /// Draw a `width` pixel outline inside the rectangle.
    pub fn stroke_rect(&mut self, x: i32, y: i32, w: u32, h: u32, width: u32, color: Rgba8) {
        if width == 0 || w == 0 || h == 0 {
            return;
        }
        let bw = width.min(w).min(h);
        self.fill_rect(x, y, w, bw, color);
        self.fill_rect(x, y + (h - bw) as i32, w, bw, color);
        self.fill_rect(x, y + bw as i32, bw, h.saturating_sub(2 * bw), color);
        self.fill_rect(
            x + (w - bw) as i32,
            y + bw as i32,
            bw,
            h.saturating_sub(2 * bw),
            color,
        );
    }

    /// Composite `src` over this raster with its top-left corner at `(x, y)`, clipped.
    pub fn draw_over(&mut self, src: &Raster, x: i32, y: i32) {
        let Some((x0, y0, x1, y1)) = clip(x, y, src.width, src.height, self.width, self.height)
        else {
            return;
        };
        for yy in y0..y1 {
            let sy = (yy as i64 - i64::from(y)) as usize;
            for xx in x0..x1 {
                let sx = (xx as i64 - i64::from(x)) as usize;
                let si = (sy * (src.width as usize) + sx) * 4;
                let di = ((yy as usize) * (self.width as usize) + (xx as usize)) * 4;
                let s = [
                    src.data[si],
                    src.data[si + 1],
                    src.data[si + 2],
                    src.data[si + 3],
                ];
                over_px(&mut self.data[di..di + 4], &s);
            }
        }
    }

    /// Composite a full-size raster over this one.
    pub fn composite_over(&mut self, src: &Raster) -> ReelResult<()> {
        if src.width != self.width || src.height != self.height {
            return Err(ReelError::asset(format!(
                "composite size mismatch: {}x{} over {}x{}",
                src.width, src.height, self.width, self.height
            )));
        }
        for (d, s) in self.data.chunks_exact_mut(4).zip(src.data.chunks_exact(4)) {
            let s = [s[0], s[1], s[2], s[3]];
            over_px(d, &s);
        }
        Ok(())
    }

    /// Nearest-neighbour resample to `width` x `height`.
    pub fn scale_nearest(&self, width: u32, height: u32) -> Raster {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = Raster::new(width, height);
        if self.is_empty() {
            return out;
        }
        let xs: Vec<usize> = (0..width)
            .map(|x| nearest_index(x, width, self.width))
            .collect();
        for y in 0..height {
            let sy = nearest_index(y, height, self.height);
            let src_row = sy * (self.width as usize) * 4;
            let dst_row = (y as usize) * (width as usize) * 4;
            for (x, &sx) in xs.iter().enumerate() {
                let si = src_row + sx * 4;
                let di = dst_row + x * 4;
                out.data[di..di + 4].copy_from_slice(&self.data[si..si + 4]);
            }
        }
        out
    }

    /// Nearest-neighbour integer upscale.
    pub fn scale_integer(&self, factor: u32) -> Raster {
        let f = factor.max(1);
        self.scale_nearest(self.width * f, self.height * f)
    }

    /// Mirror left to right.
    pub fn mirrored(&self) -> Raster {
        let mut out = Raster::new(self.width, self.height);
        let w = self.width as usize;
        for y in 0..self.height as usize {
            for x in 0..w {
                let si = (y * w + x) * 4;
                let di = (y * w + (w - 1 - x)) * 4;
                out.data[di..di + 4].copy_from_slice(&self.data[si..si + 4]);
            }
        }
        out
    }

    /// Sample this layer into a `width` x `height` viewport.
    ///
    /// Output pixel `p` shows layer point `(p - c) / zoom + c + offset`, where `c` is the viewport
    /// centre, mapped onto the layer by nearest-neighbour. Coordinates outside the layer clamp to
    /// its edge.
    pub fn sample_viewport(&self, width: u32, height: u32, offset: Vec2, zoom: f64) -> Raster {
        let identity = offset.x == 0.0 && offset.y == 0.0 && zoom == 1.0;
        if identity {
            return self.scale_nearest(width, height);
        }
        let mut out = Raster::new(width, height);
        if self.is_empty() || width == 0 || height == 0 || !(zoom.is_finite() && zoom > 0.0) {
            return out;
        }
        let cx = f64::from(width) / 2.0;
        let cy = f64::from(height) / 2.0;
        let kx = f64::from(self.width) / f64::from(width);
        let ky = f64::from(self.height) / f64::from(height);
        let max_x = i64::from(self.width) - 1;
        let max_y = i64::from(self.height) - 1;

        let xs: Vec<usize> = (0..width)
            .map(|x| {
                let vx = (f64::from(x) + 0.5 - cx) / zoom + cx + offset.x;
                ((vx * kx).floor() as i64).clamp(0, max_x) as usize
            })
            .collect();
        for y in 0..height {
            let vy = (f64::from(y) + 0.5 - cy) / zoom + cy + offset.y;
            let sy = ((vy * ky).floor() as i64).clamp(0, max_y) as usize;
            let src_row = sy * (self.width as usize) * 4;
            let dst_row = (y as usize) * (width as usize) * 4;
            for (x, &sx) in xs.iter().enumerate() {
                let si = src_row + sx * 4;
                let di = dst_row + x * 4;
                out.data[di..di + 4].copy_from_slice(&self.data[si..si + 4]);
            }
        }
        out
    }

    /// Flatten over an opaque background into straight RGBA8 with alpha 255.
    pub fn flatten_to_opaque(&self, dst: &mut [u8], bg: Rgba8) -> ReelResult<()> {
        if dst.len() != self.data.len() {
            return Err(ReelError::encoder(
                "flatten expects equal-length rgba8 buffers",
            ));
        }
        let bg = [u16::from(bg.r), u16::from(bg.g), u16::from(bg.b)];
        for (d, s) in dst.chunks_exact_mut(4).zip(self.data.chunks_exact(4)) {
            let a = u16::from(s[3]);
            if a == 255 {
                d.copy_from_slice(s);
                continue;
            }
            let inv = 255 - a;
            for c in 0..3 {
                d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
            }
            d[3] = 255;
        }
        Ok(())
    }
}

fn nearest_index(dst: u32, dst_len: u32, src_len: u32) -> usize {
    let i = (u64::from(dst) * u64::from(src_len)) / u64::from(dst_len.max(1));
    (i as usize).min(src_len.saturating_sub(1) as usize)
}

fn clip(x: i32, y: i32, w: u32, h: u32, bw: u32, bh: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = i64::from(x).max(0);
    let y0 = i64::from(y).max(0);
    let x1 = (i64::from(x) + i64::from(w)).min(i64::from(bw));
    let y1 = (i64::from(y) + i64::from(h)).min(i64::from(bh));
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

fn over_px(d: &mut [u8], s: &[u8; 4]) {
    let sa = s[3];
    if sa == 0 {
        return;
    }
    if sa == 255 {
        d.copy_from_slice(s);
        return;
    }
    let inv = 255u16 - u16::from(sa);
    d[3] = add_sat_u8(sa, mul_div255_u8(u16::from(d[3]), inv));
    for c in 0..3 {
        d[c] = add_sat_u8(s[c], mul_div255_u8(u16::from(d[c]), inv));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
