// pico-retro/src/core/host.rs

//! Frontend side of the adapter.
//!
//! [`Host`] is the safe face of the libretro callbacks. The C ABI binding lives
//! in `crate::libretro::host`; tests drive the core through a mock.

use std::path::PathBuf;

use crate::core::options::OptionDefinition;

pub const DEVICE_JOYPAD: u32 = 1;
/// Joypad id asking for all buttons at once as a bitmask.
pub const JOYPAD_MASK: u32 = 256;

pub const REGION_NTSC: u32 = 0;
pub const REGION_PAL: u32 = 1;

/// Memory descriptor flag: block is main system RAM.
pub const MEMDESC_SYSTEM_RAM: u64 = 1 << 2;

/// Host pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb1555,
    Xrgb8888,
    Rgb565,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub aspect_ratio: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub fps: f64,
    pub sample_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvInfo {
    pub geometry: Geometry,
    pub timing: Timing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptor {
    pub port: u32,
    pub device: u32,
    pub index: u32,
    pub id: u32,
    pub description: &'static str,
}

/// One block of emulated memory published to the host (cheat search, achievements).
#[derive(Debug, Clone, Copy)]
pub struct MemoryDescriptor {
    pub flags: u64,
    pub ptr: *mut u8,
    pub offset: usize,
    pub start: usize,
    pub select: usize,
    pub disconnect: usize,
    pub len: usize,
    pub addrspace: &'static str,
}

/// Content handed to `retro_load_game`.
#[derive(Debug, Clone, Default)]
pub struct GameInfo {
    pub path: Option<PathBuf>,
    pub data: Option<Vec<u8>>,
}

/// Extended content description (`GET_GAME_INFO_EXT`).
#[derive(Debug, Clone, Default)]
pub struct GameInfoExt {
    pub full_path: Option<PathBuf>,
    pub dir: PathBuf,
    pub name: String,
    pub ext: String,
    pub file_in_archive: bool,
    pub data: Option<Vec<u8>>,
}

/// Frontend services used by the core.
pub trait Host {
    // -- environment --
    fn variable(&mut self, key: &str) -> Option<String>;
    fn variables_updated(&mut self) -> bool;
    fn set_variables(&mut self, definitions: &[OptionDefinition]) -> bool;
    fn set_content_info_override(&mut self, extensions: &str, need_fullpath: bool) -> bool;
    fn set_performance_level(&mut self, level: u32) -> bool;
    fn supports_input_bitmasks(&mut self) -> bool;
    fn disk_control_interface_version(&mut self) -> Option<u32>;
    /// Register the disk control callbacks; `extended` selects the v1 interface.
    fn set_disk_control_interface(&mut self, extended: bool) -> bool;
    fn system_directory(&mut self) -> Option<PathBuf>;
    fn game_info_ext(&mut self) -> Option<GameInfoExt>;
    fn set_pixel_format(&mut self, format: PixelFormat) -> bool;
    fn set_input_descriptors(&mut self, descriptors: &[InputDescriptor]) -> bool;
    fn set_memory_maps(&mut self, descriptors: &[MemoryDescriptor]) -> bool;
    fn set_geometry(&mut self, info: &AvInfo) -> bool;
    fn set_system_av_info(&mut self, info: &AvInfo) -> bool;
    fn set_audio_buffer_status_callback(&mut self, enable: bool) -> bool;
    fn set_minimum_audio_latency(&mut self, latency_ms: u32) -> bool;

    // -- per frame --
    /// `None` repeats the previous frame (skipped frame).
    fn video_refresh(&mut self, frame: Option<&[u16]>, width: u32, height: u32, pitch: usize);
    /// Interleaved stereo samples; returns the number of frames consumed.
    fn audio_sample_batch(&mut self, samples: &[i16]) -> usize;
    fn input_poll(&mut self);
    fn input_state(&mut self, port: u32, device: u32, index: u32, id: u32) -> i16;
}
