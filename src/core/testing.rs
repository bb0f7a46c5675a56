// pico-retro/src/core/testing.rs

//! Scripted engine and host used by the unit tests.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::core::engine::{
    DrawTarget, Engine, EngineError, EngineOptions, EngineResult, EngineSink, FrameBuffer, Hardware,
    InputDevice, MediaError, MediaKind, MediaRequest, MemoryId, Region, VideoMode,
};
use crate::core::host::{
    AvInfo, GameInfoExt, Host, InputDescriptor, MemoryDescriptor, PixelFormat, DEVICE_JOYPAD,
    JOYPAD_MASK,
};
use crate::core::input::PadButtons;
use crate::core::options::OptionDefinition;
use crate::core::state::SaveStateStream;
use crate::core::video::{CLUT_LEFT_BORDER, CLUT_LINE_STRIDE, VOUT_MAX_HEIGHT};

pub struct MockEngine {
    pub initialized: bool,
    pub opts: EngineOptions,
    pub hw: Hardware,
    pub rate: u32,
    pub region: Region,
    pub pal: bool,
    pub frames: u32,
    pub media: bool,
    pub media_result: Result<MediaKind, MediaError>,
    pub loaded_path: Option<PathBuf>,
    pub loaded_data: Option<Vec<u8>>,
    pub carthw: Option<PathBuf>,
    pub loop_prepared: bool,
    pub rerates: u32,
    pub sound_filter: Option<Option<u32>>,
    pub overclock: u32,
    pub devices: [InputDevice; 2],
    pub target: Option<DrawTarget>,
    /// Mode announced through the sink on the next frame.
    pub pending_mode: Option<VideoMode>,
    pub last_pads: [PadButtons; 2],
    pub last_skip: bool,
    pub inserted: Vec<PathBuf>,
    pub reject_discs: bool,
    pub state: Vec<u8>,
    pub rom: Vec<u16>,
    pub bus: HashMap<u32, u16>,
    pub sram: Vec<u8>,
    pub bram: Vec<u8>,
    pub ram: Vec<u8>,
    pub zram: Vec<u8>,
    pub prg_ram: Vec<u8>,
    rgb: Vec<u16>,
    clut: Vec<u8>,
    palette: Vec<u16>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self {
            initialized: false,
            opts: EngineOptions::empty(),
            hw: Hardware::empty(),
            rate: 0,
            region: Region::Auto,
            pal: false,
            frames: 0,
            media: false,
            media_result: Ok(MediaKind::MegaDrive),
            loaded_path: None,
            loaded_data: None,
            carthw: None,
            loop_prepared: false,
            rerates: 0,
            sound_filter: None,
            overclock: 0,
            devices: [InputDevice::Pad3Button; 2],
            target: None,
            pending_mode: None,
            last_pads: [PadButtons::empty(); 2],
            last_skip: false,
            inserted: Vec::new(),
            reject_discs: false,
            state: Vec::new(),
            rom: Vec::new(),
            bus: HashMap::new(),
            sram: Vec::new(),
            bram: vec![0; 0x2000],
            ram: vec![0; 0x10000],
            zram: vec![0; 0x2000],
            prg_ram: vec![0; 0x80000],
            rgb: Vec::new(),
            clut: Vec::new(),
            palette: (0..256u16).map(|i| !i).collect(),
        }
    }
}

impl Engine for MockEngine {
    fn init(&mut self, options: EngineOptions) {
        self.initialized = true;
        self.opts = options;
    }

    fn shutdown(&mut self) {
        self.initialized = false;
        self.media = false;
    }

    fn reset(&mut self) {
        self.frames = 0;
    }

    fn options(&self) -> EngineOptions {
        self.opts
    }

    fn set_options(&mut self, options: EngineOptions) {
        self.opts = options;
    }

    fn sound_rate(&self) -> u32 {
        self.rate
    }

    fn set_sound_rate(&mut self, rate: u32) {
        self.rate = rate;
    }

    fn rerate(&mut self, _preserve_state: bool) {
        self.rerates += 1;
    }

    fn reset_sound_filter(&mut self, alpha: Option<u32>) {
        self.sound_filter = Some(alpha);
    }

    fn set_overclock_68k(&mut self, percent: u32) {
        self.overclock = percent;
    }

    fn region_override(&self) -> Region {
        self.region
    }

    fn set_region_override(&mut self, region: Region) {
        self.region = region;
    }

    fn detect_region(&mut self) {
        self.pal = matches!(self.region, Region::JapanPal | Region::Europe);
    }

    fn is_pal(&self) -> bool {
        self.pal
    }

    fn hardware(&self) -> Hardware {
        self.hw
    }

    fn has_media(&self) -> bool {
        self.media
    }

    fn frame_count(&self) -> u32 {
        self.frames
    }

    fn load_media(
        &mut self,
        request: &MediaRequest<'_>,
        _sink: &mut dyn EngineSink,
    ) -> Result<MediaKind, MediaError> {
        self.loaded_path = Some(request.path.to_path_buf());
        self.loaded_data = request.data.map(<[u8]>::to_vec);
        self.carthw = Some(request.carthw_config.to_path_buf());
        let kind = self.media_result.clone()?;
        self.media = true;
        Ok(kind)
    }

    fn insert_disc(&mut self, path: &Path) -> EngineResult<()> {
        if self.reject_discs {
            return Err(EngineError::BadDisc(path.to_path_buf()));
        }
        self.inserted.push(path.to_path_buf());
        Ok(())
    }

    fn loop_prepare(&mut self) {
        self.loop_prepared = true;
    }

    fn set_input_device(&mut self, port: usize, device: InputDevice) {
        self.devices[port] = device;
    }

    fn set_draw_target(&mut self, target: DrawTarget) {
        self.target = Some(target);
    }

    fn run_frame(&mut self, pads: [PadButtons; 2], skip: bool, sink: &mut dyn EngineSink) {
        if let Some(mode) = self.pending_mode.take() {
            self.target = Some(sink.video_mode_changed(mode, self.hw));
        }

        self.last_pads = pads;
        self.last_skip = skip;
        self.frames += 1;

        let per_frame = self.rate / if self.pal { 50 } else { 60 };
        sink.audio(&vec![0i16; per_frame as usize * 2]);
    }

    fn framebuffer(&mut self) -> FrameBuffer<'_> {
        match self.target.and_then(|t| t.line_pixels) {
            Some(width) => {
                // every pixel holds its line number
                self.rgb = (0..VOUT_MAX_HEIGHT as u16)
                    .flat_map(|line| std::iter::repeat(line).take(width))
                    .collect();
                FrameBuffer::Rgb565(&self.rgb)
            }
            None => {
                self.clut = vec![0; CLUT_LEFT_BORDER + CLUT_LINE_STRIDE * VOUT_MAX_HEIGHT];
                for (line, row) in self.clut.chunks_exact_mut(CLUT_LINE_STRIDE).enumerate() {
                    row.iter_mut().for_each(|px| *px = line as u8);
                }
                FrameBuffer::Indexed { pixels: &self.clut, palette: &self.palette }
            }
        }
    }

    fn save_state(&mut self, stream: &mut SaveStateStream<'_>) -> EngineResult<()> {
        stream.write_all(&self.state)?;
        Ok(())
    }

    fn load_state(&mut self, stream: &mut SaveStateStream<'_>) -> EngineResult<()> {
        let mut data = vec![0; stream.size()];
        stream.read_exact(&mut data)?;
        self.state = data;
        Ok(())
    }

    fn memory(&mut self, id: MemoryId) -> Option<&mut [u8]> {
        let mem = match id {
            MemoryId::CartSave => &mut self.sram,
            MemoryId::CdBackup => &mut self.bram,
            MemoryId::WorkRam => &mut self.ram,
            MemoryId::Z80Ram => &mut self.zram,
            MemoryId::CdPrgRam => &mut self.prg_ram,
        };
        Some(mem.as_mut_slice())
    }

    fn rom_size(&self) -> usize {
        self.rom.len() * 2
    }

    fn read_rom_word(&self, addr: u32) -> u16 {
        self.rom[addr as usize / 2]
    }

    fn write_rom_word(&mut self, addr: u32, value: u16) {
        self.rom[addr as usize / 2] = value;
    }

    fn read_bus_word(&mut self, addr: u32) -> u16 {
        self.bus.get(&addr).copied().unwrap_or(0)
    }

    fn write_bus_word(&mut self, addr: u32, value: u16) {
        self.bus.insert(addr, value);
    }
}

pub struct MockHost {
    pub vars: HashMap<String, String>,
    pub updated: bool,
    pub definitions: Vec<OptionDefinition>,
    pub content_override: Option<String>,
    pub performance_level: Option<u32>,
    pub bitmasks: bool,
    pub disk_version: Option<u32>,
    pub disk_interface_extended: Option<bool>,
    pub system_dir: Option<PathBuf>,
    pub game_info_ext: Option<GameInfoExt>,
    pub accept_rgb565: bool,
    pub descriptors: Vec<InputDescriptor>,
    pub memory_maps: Vec<MemoryDescriptor>,
    pub geometry: Option<AvInfo>,
    pub system_av_info: Option<AvInfo>,
    pub buffer_status_supported: bool,
    pub buffer_status_enabled: Option<bool>,
    pub min_latency: Option<u32>,
    /// Last refresh: pixels (None for a dupe), width, height, pitch.
    pub last_frame: Option<(Option<Vec<u16>>, u32, u32, usize)>,
    pub audio: Vec<i16>,
    pub audio_calls: usize,
    /// Frames accepted per batch call, unlimited when unset.
    pub audio_batch_limit: Option<usize>,
    /// RetroPad bitmask per port.
    pub buttons: [u16; 2],
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            vars: HashMap::new(),
            updated: false,
            definitions: Vec::new(),
            content_override: None,
            performance_level: None,
            bitmasks: true,
            disk_version: Some(1),
            disk_interface_extended: None,
            system_dir: Some(PathBuf::from("/system")),
            game_info_ext: None,
            accept_rgb565: true,
            descriptors: Vec::new(),
            memory_maps: Vec::new(),
            geometry: None,
            system_av_info: None,
            buffer_status_supported: true,
            buffer_status_enabled: None,
            min_latency: None,
            last_frame: None,
            audio: Vec::new(),
            audio_calls: 0,
            audio_batch_limit: None,
            buttons: [0; 2],
        }
    }
}

impl MockHost {
    pub fn set_var(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }
}

impl Host for MockHost {
    fn variable(&mut self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn variables_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }

    fn set_variables(&mut self, definitions: &[OptionDefinition]) -> bool {
        self.definitions = definitions.to_vec();
        true
    }

    fn set_content_info_override(&mut self, extensions: &str, _need_fullpath: bool) -> bool {
        self.content_override = Some(extensions.to_string());
        true
    }

    fn set_performance_level(&mut self, level: u32) -> bool {
        self.performance_level = Some(level);
        true
    }

    fn supports_input_bitmasks(&mut self) -> bool {
        self.bitmasks
    }

    fn disk_control_interface_version(&mut self) -> Option<u32> {
        self.disk_version
    }

    fn set_disk_control_interface(&mut self, extended: bool) -> bool {
        self.disk_interface_extended = Some(extended);
        true
    }

    fn system_directory(&mut self) -> Option<PathBuf> {
        self.system_dir.clone()
    }

    fn game_info_ext(&mut self) -> Option<GameInfoExt> {
        self.game_info_ext.clone()
    }

    fn set_pixel_format(&mut self, format: PixelFormat) -> bool {
        format == PixelFormat::Rgb565 && self.accept_rgb565
    }

    fn set_input_descriptors(&mut self, descriptors: &[InputDescriptor]) -> bool {
        self.descriptors = descriptors.to_vec();
        true
    }

    fn set_memory_maps(&mut self, descriptors: &[MemoryDescriptor]) -> bool {
        self.memory_maps = descriptors.to_vec();
        true
    }

    fn set_geometry(&mut self, info: &AvInfo) -> bool {
        self.geometry = Some(*info);
        true
    }

    fn set_system_av_info(&mut self, info: &AvInfo) -> bool {
        self.system_av_info = Some(*info);
        true
    }

    fn set_audio_buffer_status_callback(&mut self, enable: bool) -> bool {
        self.buffer_status_enabled = Some(enable);
        self.buffer_status_supported
    }

    fn set_minimum_audio_latency(&mut self, latency_ms: u32) -> bool {
        self.min_latency = Some(latency_ms);
        true
    }

    fn video_refresh(&mut self, frame: Option<&[u16]>, width: u32, height: u32, pitch: usize) {
        self.last_frame = Some((frame.map(<[u16]>::to_vec), width, height, pitch));
    }

    fn audio_sample_batch(&mut self, samples: &[i16]) -> usize {
        self.audio_calls += 1;
        let frames = samples.len() / 2;
        let taken = self.audio_batch_limit.map_or(frames, |limit| limit.min(frames));
        self.audio.extend_from_slice(&samples[..taken * 2]);
        taken
    }

    fn input_poll(&mut self) {}

    fn input_state(&mut self, port: u32, device: u32, _index: u32, id: u32) -> i16 {
        let Some(&mask) = self.buttons.get(port as usize) else {
            return 0;
        };
        if device != DEVICE_JOYPAD {
            return 0;
        }
        if id == JOYPAD_MASK {
            mask as i16
        } else {
            i16::from(mask & (1 << id) != 0)
        }
    }
}
