// pico-retro/src/core/engine.rs

//! Narrow API to the external emulation engine.
//!
//! The adapter never touches CPU cores, VDP or sound chips directly. Everything
//! it needs from the engine goes through [`Engine`], and everything the engine
//! needs to report back mid-call goes through [`EngineSink`].

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use thiserror::Error;

use crate::core::input::PadButtons;
use crate::core::state::SaveStateStream;

bitflags! {
    /// Engine option switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EngineOptions: u32 {
        const EN_FM          = 1 << 0;
        const EN_PSG         = 1 << 1;
        const EN_Z80         = 1 << 2;
        const EN_STEREO      = 1 << 3;
        const ALT_RENDERER   = 1 << 4;
        const EN_YM2413      = 1 << 5;
        const EN_SNDFILTER   = 1 << 6;
        const ACC_SPRITES    = 1 << 7;
        const DIS_32C_BORDER = 1 << 8;
        const DIS_SPRITE_LIM = 1 << 9;
        const EN_MCD_PCM     = 1 << 10;
        const EN_MCD_CDDA    = 1 << 11;
        const EN_MCD_GFX     = 1 << 12;
        const EN_MCD_RAMCART = 1 << 13;
        const EN_32X         = 1 << 14;
        const EN_PWM         = 1 << 15;
        const EN_DRC         = 1 << 16;
    }
}

impl EngineOptions {
    /// Option set applied at init, before any variable is parsed.
    pub fn startup() -> Self {
        let mut opts = Self::EN_STEREO
            | Self::EN_FM
            | Self::EN_PSG
            | Self::EN_Z80
            | Self::EN_YM2413
            | Self::EN_MCD_PCM
            | Self::EN_MCD_CDDA
            | Self::EN_MCD_GFX
            | Self::EN_32X
            | Self::EN_PWM
            | Self::ACC_SPRITES
            | Self::DIS_32C_BORDER;
        if cfg!(target_arch = "arm") {
            opts |= Self::EN_DRC;
        }
        opts
    }
}

bitflags! {
    /// Add-on hardware active for the loaded media.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Hardware: u8 {
        const MCD  = 1 << 0;
        const S32X = 1 << 1;
        const SMS  = 1 << 2;
        const PICO = 1 << 3;
    }
}

/// Console region, using the engine's bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    #[default]
    Auto,
    JapanNtsc,
    JapanPal,
    Usa,
    Europe,
}

impl Region {
    pub fn code(self) -> u8 {
        match self {
            Region::Auto => 0,
            Region::JapanNtsc => 1,
            Region::JapanPal => 2,
            Region::Usa => 4,
            Region::Europe => 8,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Region::Auto),
            1 => Some(Region::JapanNtsc),
            2 => Some(Region::JapanPal),
            4 => Some(Region::Usa),
            8 => Some(Region::Europe),
            _ => None,
        }
    }
}

/// Controller type plugged into a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputDevice {
    #[default]
    Pad3Button,
    Pad6Button,
    Nothing,
}

/// Renderer selection. `Accurate` draws RGB directly, the others emit a CLUT image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    Fast,
    Good,
    #[default]
    Accurate,
}

impl RenderFormat {
    pub fn is_16bit(self) -> bool {
        self == RenderFormat::Accurate
    }
}

/// Media detected by the engine on a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    MegaDrive,
    MegaCd,
    Sega32x,
    /// Master System / SG-1000 (Mark III input layout).
    Mark3,
    Pico,
}

/// Why the engine refused a piece of media.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("failed to detect ROM/CD image type")]
    BadDetect,
    #[error("invalid CD image")]
    BadCd,
    #[error("missing BIOS")]
    MissingBios,
    #[error("load error")]
    Failed,
}

/// Errors reported by engine calls that can fail.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("savestate error: {0}")]
    State(String),
    #[error("invalid CD image: {}", .0.display())]
    BadDisc(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Memory blocks the adapter may expose to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryId {
    /// Cartridge battery RAM (also the Mega CD RAM cart).
    CartSave,
    /// Mega CD internal backup RAM.
    CdBackup,
    /// 68000 work RAM.
    WorkRam,
    /// Z80 RAM (Master System main RAM).
    Z80Ram,
    /// Mega CD program RAM.
    CdPrgRam,
}

/// Visible video layout announced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    pub start_line: u32,
    pub line_count: u32,
    pub is_32cols: bool,
}

/// What the engine must render into after a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawTarget {
    pub format: RenderFormat,
    /// Line width in pixels for direct RGB output; `None` for CLUT output.
    pub line_pixels: Option<usize>,
}

/// Engine-side frame, borrowed until the next engine call.
#[derive(Debug)]
pub enum FrameBuffer<'a> {
    /// RGB565 pixels laid out with the line width of the last [`DrawTarget`].
    Rgb565(&'a [u16]),
    /// 8-bit CLUT image (8 pixel left overlap, 328 byte lines) plus its palette.
    Indexed { pixels: &'a [u8], palette: &'a [u16] },
}

/// Everything the engine needs to load a piece of media.
pub struct MediaRequest<'a> {
    pub path: &'a Path,
    /// Content already in memory, when the frontend provided it.
    pub data: Option<&'a [u8]>,
    /// Cartridge hardware database (`carthw.cfg`).
    pub carthw_config: &'a Path,
    /// BIOS lookup for CD media, by console region.
    pub bios: &'a dyn Fn(Region) -> Option<PathBuf>,
}

/// Callbacks the engine fires while it runs.
pub trait EngineSink {
    /// The active display changed size; returns where to render from now on.
    fn video_mode_changed(&mut self, mode: VideoMode, hardware: Hardware) -> DrawTarget;

    /// The 32X add-on powered up; returns the draw target to switch to.
    fn startup_32x(&mut self, hardware: Hardware) -> DrawTarget;

    /// Interleaved stereo samples produced so far.
    fn audio(&mut self, samples: &[i16]);

    /// The emulated CD tray opened or closed.
    fn cd_tray(&mut self, open: bool);
}

/// The external emulation engine.
pub trait Engine {
    fn init(&mut self, options: EngineOptions);
    fn shutdown(&mut self);
    fn reset(&mut self);

    fn options(&self) -> EngineOptions;
    fn set_options(&mut self, options: EngineOptions);

    fn sound_rate(&self) -> u32;
    fn set_sound_rate(&mut self, rate: u32);
    /// Recompute mixer tables after a rate or region change.
    fn rerate(&mut self, preserve_state: bool);
    /// Reset the mixer low-pass filter (`None` disables it).
    fn reset_sound_filter(&mut self, alpha: Option<u32>);
    fn set_overclock_68k(&mut self, percent: u32);

    fn region_override(&self) -> Region;
    fn set_region_override(&mut self, region: Region);
    fn detect_region(&mut self);
    fn is_pal(&self) -> bool;

    fn hardware(&self) -> Hardware;
    /// True once a ROM or CD is in.
    fn has_media(&self) -> bool;
    fn frame_count(&self) -> u32;

    fn load_media(
        &mut self,
        request: &MediaRequest<'_>,
        sink: &mut dyn EngineSink,
    ) -> Result<MediaKind, MediaError>;
    /// Check a CD image and insert it into the drive.
    fn insert_disc(&mut self, path: &Path) -> EngineResult<()>;
    fn loop_prepare(&mut self);

    fn set_input_device(&mut self, port: usize, device: InputDevice);
    fn set_draw_target(&mut self, target: DrawTarget);

    fn run_frame(&mut self, pads: [PadButtons; 2], skip: bool, sink: &mut dyn EngineSink);
    /// Frame produced by the last `run_frame`; refreshes the palette if dirty.
    fn framebuffer(&mut self) -> FrameBuffer<'_>;

    fn save_state(&mut self, stream: &mut SaveStateStream<'_>) -> EngineResult<()>;
    fn load_state(&mut self, stream: &mut SaveStateStream<'_>) -> EngineResult<()>;

    fn memory(&mut self, id: MemoryId) -> Option<&mut [u8]>;

    fn rom_size(&self) -> usize;
    fn read_rom_word(&self, addr: u32) -> u16;
    fn write_rom_word(&mut self, addr: u32, value: u16);
    fn read_bus_word(&mut self, addr: u32) -> u16;
    fn write_bus_word(&mut self, addr: u32, value: u16);
}
