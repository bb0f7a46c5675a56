// pico-retro/src/core/video.rs

//! Video output bookkeeping.
//!
//! The host always receives RGB565. 16-bit renderers draw RGB directly and
//! their frame is forwarded as is; 8-bit renderers produce a CLUT image that
//! is expanded here through the engine palette.

use crate::core::engine::{DrawTarget, Hardware, RenderFormat, VideoMode};
use crate::core::host::{AvInfo, Geometry, Timing};

pub const VOUT_MAX_WIDTH: usize = 320;
pub const VOUT_32COL_WIDTH: usize = 256;
pub const VOUT_MAX_HEIGHT: usize = 240;

/// 8-bit renderers keep an 8 pixel overlap area left of every line.
pub const CLUT_LEFT_BORDER: usize = 8;
pub const CLUT_LINE_STRIDE: usize = CLUT_LEFT_BORDER + VOUT_MAX_WIDTH;

#[derive(Debug, Clone)]
pub struct VideoOutput {
    buf: Vec<u16>,
    width: usize,
    height: usize,
    /// First visible pixel in `buf`.
    offset: usize,
    is_16bit: bool,
    pub format: RenderFormat,
    pub show_overscan: bool,
    /// Width used for the aspect ratio; 0 keeps pixel aspect.
    pub user_aspect_width: f32,
    mode: Option<VideoMode>,
}

impl Default for VideoOutput {
    fn default() -> Self {
        Self {
            buf: Vec::new(),
            width: VOUT_MAX_WIDTH,
            height: VOUT_MAX_HEIGHT,
            offset: 0,
            is_16bit: true,
            format: RenderFormat::Accurate,
            show_overscan: false,
            user_aspect_width: 0.0,
            mode: None,
        }
    }
}

impl VideoOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the output buffer and restore the full-size geometry.
    pub fn allocate(&mut self) {
        self.buf = vec![0; VOUT_MAX_WIDTH * VOUT_MAX_HEIGHT];
        self.width = VOUT_MAX_WIDTH;
        self.height = VOUT_MAX_HEIGHT;
        self.offset = 0;
    }

    pub fn release(&mut self) {
        self.buf = Vec::new();
        self.mode = None;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_16bit(&self) -> bool {
        self.is_16bit
    }

    pub fn mode(&self) -> Option<VideoMode> {
        self.mode
    }

    /// Pitch in bytes of the frame handed to the host.
    pub fn pitch(&self) -> usize {
        self.width * 2
    }

    pub fn draw_target(&self) -> DrawTarget {
        DrawTarget {
            format: self.format,
            line_pixels: self.is_16bit.then_some(self.width),
        }
    }

    /// Switch renderer output. The 32X always renders RGB.
    pub fn set_format(&mut self, format: RenderFormat, hardware: Hardware) -> DrawTarget {
        self.format = format;
        self.is_16bit = format.is_16bit() || hardware.contains(Hardware::S32X);
        self.draw_target()
    }

    /// Apply a new display mode and return where the engine must draw.
    pub fn mode_change(&mut self, mode: VideoMode, hardware: Hardware) -> DrawTarget {
        self.mode = Some(mode);

        // 8-bit renderers produce a CLUT image
        self.set_format(self.format, hardware);

        self.width = if mode.is_32cols { VOUT_32COL_WIDTH } else { VOUT_MAX_WIDTH };
        self.buf.iter_mut().for_each(|px| *px = 0);

        let start = mode.start_line as usize;
        let lines = mode.line_count as usize;
        if self.show_overscan {
            self.height = lines + start * 2;
            self.offset = 0;
        } else {
            self.height = lines;
            self.offset = self.width * start;
        }

        // visible lines must end inside the buffer
        self.offset = self.offset.min(self.width * (VOUT_MAX_HEIGHT - 1));
        self.height = self.height.min(VOUT_MAX_HEIGHT - self.offset / self.width);

        self.draw_target()
    }

    /// Expand a CLUT image into the RGB buffer.
    ///
    /// Copies every line up to the maximum height so the overscan area is
    /// available too. Returns false when the source is too short.
    pub fn convert_indexed(&mut self, pixels: &[u8], palette: &[u16]) -> bool {
        let width = self.width;
        let needed = CLUT_LEFT_BORDER + (VOUT_MAX_HEIGHT - 1) * CLUT_LINE_STRIDE + width;
        if pixels.len() < needed || self.buf.len() < width * VOUT_MAX_HEIGHT {
            return false;
        }

        for (row, out) in self.buf.chunks_exact_mut(width).take(VOUT_MAX_HEIGHT).enumerate() {
            let start = CLUT_LEFT_BORDER + row * CLUT_LINE_STRIDE;
            let line = &pixels[start..start + width];
            for (dst, &idx) in out.iter_mut().zip(line) {
                *dst = palette.get(idx as usize).copied().unwrap_or(0);
            }
        }
        true
    }

    /// Visible part of the converted buffer.
    pub fn frame(&self) -> &[u16] {
        visible(&self.buf, self.offset, self.width, self.height)
    }

    /// Visible part of an RGB frame drawn by the engine at our line width.
    pub fn crop<'a>(&self, pixels: &'a [u16]) -> &'a [u16] {
        visible(pixels, self.offset, self.width, self.height)
    }

    pub fn av_info(&self, pal: bool, sample_rate: u32) -> AvInfo {
        let common_width = if self.user_aspect_width != 0.0 {
            self.user_aspect_width
        } else {
            self.width as f32
        };

        AvInfo {
            geometry: Geometry {
                base_width: self.width as u32,
                base_height: self.height as u32,
                max_width: self.width as u32,
                max_height: self.height as u32,
                aspect_ratio: common_width / self.height as f32,
            },
            timing: Timing {
                fps: if pal { 50.0 } else { 60.0 },
                sample_rate: f64::from(sample_rate),
            },
        }
    }
}

fn visible(pixels: &[u16], offset: usize, width: usize, height: usize) -> &[u16] {
    let start = offset.min(pixels.len());
    let end = (offset + width * height).min(pixels.len());
    &pixels[start..end]
}
