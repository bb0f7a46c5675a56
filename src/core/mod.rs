// pico-retro/src/core/mod.rs

//! Adapter core: the libretro lifecycle over an external engine.
//!
//! [`Core`] owns every piece of state the adapter keeps between host calls.
//! The C ABI layer holds one instance and forwards each `retro_*` entry point
//! to the matching method here.

pub mod audio;
pub mod cheat;
pub mod disk;
pub mod engine;
pub mod frameskip;
pub mod host;
pub mod input;
pub mod memory;
pub mod options;
pub mod state;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::core::cheat::CheatList;
use crate::core::disk::DiskControl;
use crate::core::engine::{
    DrawTarget, Engine, EngineOptions, EngineSink, FrameBuffer, Hardware, MediaKind, MediaRequest,
    Region, VideoMode,
};
use crate::core::frameskip::{AudioBufferStatus, Frameskip, FrameskipMode};
use crate::core::host::{AvInfo, GameInfo, Host, PixelFormat, REGION_NTSC, REGION_PAL};
use crate::core::memory::RetroMemory;
use crate::core::options::{CoreOptions, DEFAULT_SOUND_RATE, DEFINITIONS};
use crate::core::state::SaveStateStream;
use crate::core::video::VideoOutput;

/// Extensions the core can load straight from memory.
pub const IN_MEMORY_EXTENSIONS: &str = "gen|smd|md|32x|sms|68k|sgd";

const BIOS_US: [&str; 4] = ["us_scd2_9306", "SegaCDBIOS9303", "us_scd1_9210", "bios_CD_U"];
const BIOS_EU: [&str; 4] = ["eu_mcd2_9306", "eu_mcd2_9303", "eu_mcd1_9210", "bios_CD_E"];
const BIOS_JP: [&str; 4] = ["jp_mcd2_921222", "jp_mcd1_9112", "jp_mcd1_9111", "bios_CD_J"];

/// Static description reported by `retro_get_system_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemInfo {
    pub library_name: &'static str,
    pub library_version: &'static str,
    pub valid_extensions: &'static str,
    pub need_fullpath: bool,
    pub block_extract: bool,
}

pub struct Core<E: Engine, H: Host> {
    engine: E,
    host: H,
    options: CoreOptions,
    video: VideoOutput,
    disks: DiskControl,
    cheats: CheatList,
    frameskip: Frameskip,
    bitmasks: bool,
    loaded: Option<MediaKind>,
    base_dir: PathBuf,
}

/// Routes engine callbacks to the adapter state they touch.
struct FrameSink<'a, H: Host> {
    video: &'a mut VideoOutput,
    host: &'a mut H,
    disks: &'a mut DiskControl,
    pal: bool,
    sample_rate: u32,
}

impl<H: Host> EngineSink for FrameSink<'_, H> {
    fn video_mode_changed(&mut self, mode: VideoMode, hardware: Hardware) -> DrawTarget {
        let target = self.video.mode_change(mode, hardware);
        let info = self.video.av_info(self.pal, self.sample_rate);
        self.host.set_geometry(&info);
        target
    }

    fn startup_32x(&mut self, hardware: Hardware) -> DrawTarget {
        let target = self.video.set_format(self.video.format, hardware);
        match self.video.mode() {
            Some(mode) => self.video_mode_changed(mode, hardware),
            None => target,
        }
    }

    fn audio(&mut self, samples: &[i16]) {
        audio::forward(self.host, samples);
    }

    fn cd_tray(&mut self, open: bool) {
        if open {
            self.disks.tray_open();
        } else {
            self.disks.tray_close();
        }
    }
}

impl<E: Engine, H: Host> Core<E, H> {
    pub fn new(engine: E, host: H) -> Self {
        Self {
            engine,
            host,
            options: CoreOptions::default(),
            video: VideoOutput::new(),
            disks: DiskControl::new(),
            cheats: CheatList::new(),
            frameskip: Frameskip::new(),
            bitmasks: false,
            loaded: None,
            base_dir: PathBuf::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn video(&self) -> &VideoOutput {
        &self.video
    }

    pub fn options(&self) -> &CoreOptions {
        &self.options
    }

    pub fn frameskip(&self) -> &Frameskip {
        &self.frameskip
    }

    pub fn cheats(&self) -> &CheatList {
        &self.cheats
    }

    pub fn disks(&self) -> &DiskControl {
        &self.disks
    }

    pub fn disks_mut(&mut self) -> &mut DiskControl {
        &mut self.disks
    }

    pub fn loaded(&self) -> Option<MediaKind> {
        self.loaded
    }

    fn sink(&mut self) -> (&mut E, FrameSink<'_, H>) {
        let pal = self.engine.is_pal();
        let sample_rate = self.engine.sound_rate();
        (
            &mut self.engine,
            FrameSink {
                video: &mut self.video,
                host: &mut self.host,
                disks: &mut self.disks,
                pal,
                sample_rate,
            },
        )
    }

    // -- lifecycle --

    pub fn set_environment(&mut self) {
        self.host.set_variables(DEFINITIONS);
        self.host.set_content_info_override(IN_MEMORY_EXTENSIONS, false);
    }

    pub fn system_info() -> SystemInfo {
        SystemInfo {
            library_name: crate::LIBRARY_NAME,
            library_version: crate::LIBRARY_VERSION,
            valid_extensions: crate::VALID_EXTENSIONS,
            need_fullpath: true,
            block_extract: false,
        }
    }

    pub fn init(&mut self) {
        self.host.set_performance_level(0);
        self.bitmasks = self.host.supports_input_bitmasks();

        let extended = self.host.disk_control_interface_version().map_or(false, |v| v >= 1);
        self.host.set_disk_control_interface(extended);
        self.disks = DiskControl::new();

        self.engine.init(EngineOptions::startup());

        let rate = self
            .host
            .variable(options::SOUND_RATE)
            .map(|v| options::leading_number(&v))
            .filter(|&rate| rate != 0)
            .unwrap_or(DEFAULT_SOUND_RATE);
        self.engine.set_sound_rate(rate);

        self.video.allocate();
        self.frameskip.reset();

        self.update_variables(true);
    }

    pub fn deinit(&mut self) {
        self.video.release();
        self.engine.shutdown();
        self.disks.clear();
        self.bitmasks = false;
        self.loaded = None;
    }

    pub fn av_info(&self) -> AvInfo {
        self.video.av_info(self.engine.is_pal(), self.engine.sound_rate())
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    pub fn region(&self) -> u32 {
        if self.engine.is_pal() {
            REGION_PAL
        } else {
            REGION_NTSC
        }
    }

    pub fn set_controller_port_device(&mut self, _port: u32, _device: u32) {}

    pub fn load_game_special(&mut self, _game_type: u32, _info: &[GameInfo]) -> bool {
        false
    }

    pub fn load_game(&mut self, info: Option<&GameInfo>) -> bool {
        let (mut content_path, content_ext, data) = match self.host.game_info_ext() {
            Some(ext) => {
                self.base_dir = ext.dir.clone();
                // archives have no physical file, fake a name for media detection
                let path = match ext.full_path {
                    Some(path) if !ext.file_in_archive => path,
                    _ => ext.dir.join(format!("{}.{}", ext.name, ext.ext)),
                };
                (path, ext.ext, ext.data)
            }
            None => {
                let Some(path) = info.and_then(|info| info.path.clone()) else {
                    error!("info->path required");
                    return false;
                };
                self.base_dir = content_dir(&path);
                let ext = path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (path, ext, None)
            }
        };

        if !self.host.set_pixel_format(PixelFormat::Rgb565) {
            error!("RGB565 support required, sorry");
            return false;
        }

        let is_m3u = content_ext.to_ascii_lowercase().contains("m3u");
        let mut cd_index = 0;
        if is_m3u {
            if !self.disks.load_playlist(&content_path, &self.base_dir) {
                info!("failed to read m3u file");
                return false;
            }
            cd_index = self.disks.start_index();
            if let Some(path) = self.disks.image_path(cd_index) {
                content_path = path.to_path_buf();
            }
        } else {
            self.disks.load_single(&content_path);
        }

        let system_dir = self.host.system_directory();
        let carthw = system_path(system_dir.as_deref(), "carthw.cfg");
        let bios = |region: Region| find_bios(system_dir.as_deref(), region);
        let request = MediaRequest {
            path: &content_path,
            data: data.as_deref(),
            carthw_config: &carthw,
            bios: &bios,
        };

        let result = {
            let (engine, mut sink) = self.sink();
            engine.load_media(&request, &mut sink)
        };
        self.disks.set_current(cd_index);

        let kind = match result {
            Ok(kind) => kind,
            Err(e) => {
                error!("{}", e);
                return false;
            }
        };
        info!("loaded {:?} from {}", kind, content_path.display());

        self.host.set_input_descriptors(&input::descriptors(kind == MediaKind::Mark3));

        self.engine.loop_prepare();
        self.engine.rerate(false);

        let target = self.video.set_format(self.video.format, self.engine.hardware());
        self.engine.set_draw_target(target);

        let maps = memory::memory_maps(&mut self.engine);
        if !maps.is_empty() {
            self.host.set_memory_maps(&maps);
        }

        self.init_frameskip();
        self.loaded = Some(kind);
        true
    }

    pub fn unload_game(&mut self) {
        debug!("unload game");
        self.loaded = None;
    }

    // -- per frame --

    pub fn run(&mut self) {
        if self.host.variables_updated() {
            self.update_variables(false);
        }

        self.host.input_poll();
        let pads = input::poll_pads(&mut self.host, self.bitmasks);

        if !self.cheats.is_empty() {
            self.cheats.apply(&mut self.engine);
        }

        let skip = self.frameskip.should_skip();

        if let Some(latency) = self.frameskip.take_latency_update() {
            self.host.set_minimum_audio_latency(latency);
        }

        {
            let (engine, mut sink) = self.sink();
            engine.run_frame(pads, skip, &mut sink);
        }

        let width = self.video.width();
        let height = self.video.height();
        let pitch = self.video.pitch();

        if skip {
            self.host.video_refresh(None, width as u32, height as u32, pitch);
            return;
        }

        let frame = match self.engine.framebuffer() {
            FrameBuffer::Rgb565(pixels) => Some(self.video.crop(pixels)),
            FrameBuffer::Indexed { pixels, palette } => {
                if self.video.convert_indexed(pixels, palette) {
                    Some(self.video.frame())
                } else {
                    warn!("short CLUT frame ({} bytes), repeating last frame", pixels.len());
                    None
                }
            }
        };
        // never report more lines than the slice holds
        let height = frame.map_or(height, |pixels| height.min(pixels.len() / width));
        self.host.video_refresh(frame, width as u32, height as u32, pitch);
    }

    pub fn audio_buffer_status(&mut self, active: bool, occupancy: u32, underrun_likely: bool) {
        self.frameskip.set_buffer_status(AudioBufferStatus { active, occupancy, underrun_likely });
    }

    // -- save states --

    pub fn serialize_size(&mut self) -> usize {
        let mut stream = SaveStateStream::probe();
        match self.engine.save_state(&mut stream) {
            Ok(()) => stream.position(),
            Err(e) => {
                error!("{}", e);
                0
            }
        }
    }

    pub fn serialize(&mut self, data: &mut [u8]) -> bool {
        let mut stream = SaveStateStream::save(data);
        self.engine
            .save_state(&mut stream)
            .map_err(|e| error!("{}", e))
            .is_ok()
    }

    pub fn unserialize(&mut self, data: &[u8]) -> bool {
        let mut stream = SaveStateStream::load(data);
        self.engine
            .load_state(&mut stream)
            .map_err(|e| error!("{}", e))
            .is_ok()
    }

    // -- memory --

    pub fn memory_data(&mut self, id: u32) -> Option<&mut [u8]> {
        memory::data(&mut self.engine, RetroMemory::from_id(id)?)
    }

    pub fn memory_size(&mut self, id: u32) -> usize {
        RetroMemory::from_id(id).map_or(0, |kind| memory::size(&mut self.engine, kind))
    }

    // -- cheats --

    pub fn cheat_reset(&mut self) {
        self.cheats.reset(&mut self.engine);
    }

    pub fn cheat_set(&mut self, index: u32, enabled: bool, code: &str) {
        // bad codes are already logged
        let _ = self.cheats.set(index, enabled, code, &mut self.engine);
    }

    // -- disk control --

    pub fn disk_set_image_index(&mut self, index: usize) -> bool {
        self.disks.set_image_index(index, &mut self.engine)
    }

    pub fn disk_replace_image_index(&mut self, index: usize, path: Option<&Path>) -> bool {
        self.disks.replace_image_index(index, path, &mut self.engine)
    }

    // -- configuration --

    fn init_frameskip(&mut self) {
        let supported = if self.frameskip.mode != FrameskipMode::Disabled {
            let ok = self.host.set_audio_buffer_status_callback(true);
            if !ok {
                warn!("Frameskip disabled - frontend does not support audio buffer status monitoring.");
            }
            ok
        } else {
            self.host.set_audio_buffer_status_callback(false);
            false
        };
        self.frameskip.configure(supported, self.engine.is_pal());
    }

    fn refresh_video_mode(&mut self) {
        if let Some(mode) = self.video.mode() {
            let target = {
                let (engine, mut sink) = self.sink();
                sink.video_mode_changed(mode, engine.hardware())
            };
            self.engine.set_draw_target(target);
        }
    }

    /// Re-read every variable and apply what changed.
    pub fn update_variables(&mut self, first_run: bool) {
        let opts = CoreOptions::read(&mut self.host);

        for (port, device) in opts.input.iter().enumerate() {
            if let Some(device) = device {
                self.engine.set_input_device(port, *device);
            }
        }

        let old_flags = self.engine.options();
        let mut flags = old_flags;
        if let Some(disabled) = opts.sprite_limit_disabled {
            flags.set(EngineOptions::DIS_SPRITE_LIM, disabled);
        }
        if let Some(ramcart) = opts.ramcart {
            flags.set(EngineOptions::EN_MCD_RAMCART, ramcart);
        }
        if let Some(drc) = opts.drc {
            flags.set(EngineOptions::EN_DRC, drc);
        }
        flags.set(EngineOptions::EN_SNDFILTER, opts.lowpass_filter);
        if let Some(renderer) = opts.renderer {
            flags.set(EngineOptions::ALT_RENDERER, renderer == engine::RenderFormat::Fast);
        }
        self.engine.set_options(flags);

        let old_region = self.engine.region_override();
        if let Some(region) = opts.region {
            self.engine.set_region_override(region);
        }
        let region_changed = self.engine.region_override() != old_region;
        if self.engine.has_media() && region_changed {
            self.engine.detect_region();
            self.engine.loop_prepare();
            self.engine.rerate(true);
        }

        let old_aspect = self.video.user_aspect_width;
        if let Some(width) = opts.aspect_width {
            self.video.user_aspect_width = width;
        }
        if self.video.user_aspect_width != old_aspect {
            let info = self.av_info();
            self.host.set_geometry(&info);
        }

        let old_overscan = self.video.show_overscan;
        self.video.show_overscan = opts.overscan;

        if let Some(percent) = opts.overclock_68k {
            self.engine.set_overclock_68k(percent);
        }

        let filter_changed = old_flags.contains(EngineOptions::EN_SNDFILTER) != opts.lowpass_filter;
        if filter_changed || self.options.lowpass_alpha() != opts.lowpass_alpha() {
            self.engine
                .reset_sound_filter(opts.lowpass_filter.then(|| opts.lowpass_alpha()));
        }

        let old_frameskip = self.frameskip.mode;
        self.frameskip.mode = opts.frameskip;
        self.frameskip.threshold = opts.frameskip_threshold;

        let old_format = self.video.format;
        if let Some(renderer) = opts.renderer {
            let target = self.video.set_format(renderer, self.engine.hardware());
            self.engine.set_draw_target(target);
        }

        if let Some(rate) = opts.sound_rate.filter(|&rate| rate != 0) {
            if rate != self.engine.sound_rate() {
                self.engine.set_sound_rate(rate);
                self.engine.rerate(true);
                let info = self.av_info();
                self.host.set_system_av_info(&info);
            }
        }

        if self.video.show_overscan != old_overscan || self.video.format != old_format {
            self.refresh_video_mode();
        }

        let frameskip_changed = self.frameskip.mode != old_frameskip
            || (self.engine.has_media() && region_changed);
        if frameskip_changed && !first_run {
            self.init_frameskip();
        }

        self.options = opts;
    }
}

/// Directory holding the content, `.` when the path has none.
fn content_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn system_path(system_dir: Option<&Path>, file: &str) -> PathBuf {
    match system_dir {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

/// First CD BIOS image present for `region`, `.bin` preferred over `.zip`.
pub fn find_bios(system_dir: Option<&Path>, region: Region) -> Option<PathBuf> {
    let files: &[&str] = match region {
        Region::Usa => &BIOS_US,
        Region::Europe => &BIOS_EU,
        Region::JapanNtsc | Region::JapanPal => &BIOS_JP,
        Region::Auto => return None,
    };

    let found = files
        .iter()
        .flat_map(|name| [format!("{}.bin", name), format!("{}.zip", name)])
        .map(|file| system_path(system_dir, &file))
        .find(|path| path.is_file());

    match &found {
        Some(path) => info!("using bios: {}", path.display()),
        None => warn!("no {:?} CD BIOS found", region),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{InputDevice, RenderFormat};
    use crate::core::host::GameInfoExt;
    use crate::core::input::PadButtons;
    use crate::core::testing::{MockEngine, MockHost};
    use std::fs;

    fn core() -> Core<MockEngine, MockHost> {
        let mut core = Core::new(MockEngine::default(), MockHost::default());
        core.set_environment();
        core.init();
        core
    }

    fn loaded(path: &str) -> Core<MockEngine, MockHost> {
        let mut core = core();
        let info = GameInfo { path: Some(PathBuf::from(path)), data: None };
        assert!(core.load_game(Some(&info)));
        core
    }

    #[test]
    fn test_environment_and_init() {
        let core = core();
        assert_eq!(core.host.definitions.len(), DEFINITIONS.len());
        assert_eq!(core.host.content_override.as_deref(), Some(IN_MEMORY_EXTENSIONS));
        assert_eq!(core.host.performance_level, Some(0));
        assert_eq!(core.host.disk_interface_extended, Some(true));
        assert!(core.engine.initialized);
        assert_eq!(core.engine.sound_rate(), DEFAULT_SOUND_RATE);
        assert!(core.bitmasks);
    }

    #[test]
    fn test_init_sound_rate_variable() {
        let mut host = MockHost::default();
        host.set_var(options::SOUND_RATE, "22050");
        let mut core = Core::new(MockEngine::default(), host);
        core.init();
        assert_eq!(core.engine.sound_rate(), 22050);
    }

    #[test]
    fn test_load_requires_path_and_rgb565() {
        let mut core = core();
        assert!(!core.load_game(None));

        core.host.accept_rgb565 = false;
        let info = GameInfo { path: Some(PathBuf::from("/roms/sonic.md")), data: None };
        assert!(!core.load_game(Some(&info)));
    }

    #[test]
    fn test_load_single_cart() {
        let core = loaded("/roms/sonic.md");
        assert_eq!(core.loaded(), Some(MediaKind::MegaDrive));
        assert_eq!(core.disks.num_images(), 1);
        assert_eq!(core.disks.image_label(0), Some("sonic"));
        assert_eq!(core.base_dir, PathBuf::from("/roms"));
        assert_eq!(core.host.descriptors.len(), 24);
        assert!(core.engine.loop_prepared);
        assert_eq!(core.engine.loaded_path, Some(PathBuf::from("/roms/sonic.md")));
        assert_eq!(core.engine.carthw, Some(PathBuf::from("/system/carthw.cfg")));
        assert!(core.host.memory_maps.is_empty());
    }

    #[test]
    fn test_load_failure_reported() {
        let mut core = core();
        core.engine.media_result = Err(engine::MediaError::MissingBios);
        let info = GameInfo { path: Some(PathBuf::from("/cd/game.cue")), data: None };
        assert!(!core.load_game(Some(&info)));
        assert_eq!(core.loaded(), None);
    }

    #[test]
    fn test_load_from_archive_uses_fake_path() {
        let mut core = core();
        core.host.game_info_ext = Some(GameInfoExt {
            full_path: Some(PathBuf::from("/roms/pack.zip#game.sms")),
            dir: PathBuf::from("/roms"),
            name: "game".into(),
            ext: "sms".into(),
            file_in_archive: true,
            data: Some(vec![1, 2, 3]),
        });
        core.engine.media_result = Ok(MediaKind::Mark3);
        assert!(core.load_game(None));
        assert_eq!(core.engine.loaded_path, Some(PathBuf::from("/roms/game.sms")));
        assert_eq!(core.engine.loaded_data, Some(vec![1, 2, 3]));
        assert_eq!(core.host.descriptors.len(), 14);
    }

    #[test]
    fn test_load_playlist_with_initial_image() {
        let dir = std::env::temp_dir().join(format!("pico-retro-m3u-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let m3u = dir.join("game.m3u");
        fs::write(&m3u, "#EXTM3U\ndisc1.cue\ndisc2.cue\n").unwrap();

        let mut core = core();
        assert!(core.disks.set_initial_image(1, &dir.join("disc2.cue")));
        core.engine.media_result = Ok(MediaKind::MegaCd);
        core.engine.hw = Hardware::MCD;
        let info = GameInfo { path: Some(m3u), data: None };
        assert!(core.load_game(Some(&info)));

        assert_eq!(core.disks.num_images(), 2);
        assert_eq!(core.disks.image_index(), 1);
        assert_eq!(core.engine.loaded_path, Some(dir.join("disc2.cue")));
        assert_eq!(core.host.memory_maps.len(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_playlist_fails() {
        let mut core = core();
        let info = GameInfo { path: Some(PathBuf::from("/nonexistent/x.m3u")), data: None };
        assert!(!core.load_game(Some(&info)));
    }

    #[test]
    fn test_find_bios_prefers_bin() {
        let dir = std::env::temp_dir().join(format!("pico-retro-bios-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bios_CD_E.zip"), b"zip").unwrap();
        fs::write(dir.join("eu_mcd1_9210.bin"), b"bin").unwrap();

        assert_eq!(find_bios(Some(&dir), Region::Europe), Some(dir.join("eu_mcd1_9210.bin")));
        assert_eq!(find_bios(Some(&dir), Region::Usa), None);
        assert_eq!(find_bios(Some(&dir), Region::Auto), None);

        fs::remove_file(dir.join("eu_mcd1_9210.bin")).unwrap();
        assert_eq!(find_bios(Some(&dir), Region::Europe), Some(dir.join("bios_CD_E.zip")));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_rgb_frame() {
        let mut core = loaded("/roms/sonic.md");
        core.engine.pending_mode = Some(VideoMode { start_line: 8, line_count: 224, is_32cols: false });
        core.host.buttons[0] = 1 << 3;
        core.run();

        assert_eq!(core.engine.last_pads[0], PadButtons::START);
        assert_eq!(core.engine.frames, 1);
        assert_eq!(core.host.geometry.map(|g| g.geometry.base_height), Some(224));

        let (frame, width, height, pitch) = core.host.last_frame.clone().unwrap();
        assert_eq!((width, height, pitch), (320, 224, 640));
        let frame = frame.unwrap();
        assert_eq!(frame.len(), 320 * 224);
        // engine fills every pixel with its line number
        assert_eq!(frame[0], 8);
        assert_eq!(frame[320 * 224 - 1], 8 + 223);
        assert_eq!(core.host.audio.len(), 2 * 735);
    }

    #[test]
    fn test_run_frame_never_exceeds_buffer() {
        let mut core = loaded("/roms/sonic.md");
        core.engine.pending_mode = Some(VideoMode { start_line: 16, line_count: 240, is_32cols: false });
        core.run();

        let (frame, width, height, pitch) = core.host.last_frame.clone().unwrap();
        let frame = frame.unwrap();
        assert_eq!((width, height, pitch), (320, 224, 640));
        assert!(frame.len() >= (height as usize) * pitch / 2);
        assert_eq!(frame[0], 16);
        assert_eq!(frame[frame.len() - 1], 239);
    }

    #[test]
    fn test_run_indexed_frame() {
        let mut core = core();
        core.host.set_var(options::RENDERER, "good");
        core.host.updated = true;
        let info = GameInfo { path: Some(PathBuf::from("/roms/sonic.md")), data: None };
        assert!(core.load_game(Some(&info)));

        core.engine.pending_mode = Some(VideoMode { start_line: 0, line_count: 224, is_32cols: true });
        core.run();

        assert_eq!(core.video.format, RenderFormat::Good);
        assert!(!core.engine.options().contains(EngineOptions::ALT_RENDERER));
        let (frame, width, ..) = core.host.last_frame.clone().unwrap();
        assert_eq!(width, 256);
        let frame = frame.unwrap();
        // CLUT index is the line number, palette maps i to !i
        assert_eq!(frame[0], !0u16);
        assert_eq!(frame[256 * 5], !5u16);
    }

    #[test]
    fn test_frameskip_sends_dupe() {
        let mut core = core();
        core.host.set_var(options::FRAMESKIP, "auto");
        core.update_variables(false);
        let info = GameInfo { path: Some(PathBuf::from("/roms/sonic.md")), data: None };
        assert!(core.load_game(Some(&info)));
        assert_eq!(core.frameskip.mode, FrameskipMode::Auto);
        assert_eq!(core.host.buffer_status_enabled, Some(true));

        core.audio_buffer_status(true, 0, true);
        core.run();

        assert!(core.engine.last_skip);
        assert_eq!(core.host.min_latency, Some(128));
        let (frame, ..) = core.host.last_frame.clone().unwrap();
        assert!(frame.is_none());
    }

    #[test]
    fn test_cheats_applied_before_frame() {
        let mut core = loaded("/roms/sonic.md");
        core.cheat_set(0, true, "FF0000:1234");
        core.cheat_set(1, true, "not a code");
        assert_eq!(core.cheats.len(), 1);

        core.run();
        assert_eq!(core.engine.read_bus_word(0xFF0000), 0x1234);

        core.cheat_reset();
        assert!(core.cheats.is_empty());
        assert_eq!(core.engine.read_bus_word(0xFF0000), 0);
    }

    #[test]
    fn test_serialize_roundtrip_sizes() {
        let mut core = loaded("/roms/sonic.md");
        core.engine.state = (0..100u8).collect();

        let size = core.serialize_size();
        assert_eq!(size, 100);

        let mut buf = vec![0u8; size];
        assert!(core.serialize(&mut buf));
        assert_eq!(buf, core.engine.state);

        core.engine.state.clear();
        assert!(core.unserialize(&buf));
        assert_eq!(core.engine.state, buf);

        let mut short = vec![0u8; 10];
        assert!(!core.serialize(&mut short));
    }

    #[test]
    fn test_region_change_reprepares() {
        let mut core = loaded("/roms/sonic.md");
        core.engine.loop_prepared = false;
        core.host.set_var(options::REGION, "Europe");
        core.host.updated = true;
        core.run();

        assert_eq!(core.engine.region_override(), Region::Europe);
        assert!(core.engine.loop_prepared);
        assert!(core.engine.is_pal());
        assert_eq!(core.region(), REGION_PAL);
        assert!(core.engine.rerates > 0);
    }

    #[test]
    fn test_sound_rate_change_pushes_av_info() {
        let mut core = loaded("/roms/sonic.md");
        core.host.set_var(options::SOUND_RATE, "32000");
        core.update_variables(false);
        assert_eq!(core.engine.sound_rate(), 32000);
        let info = core.host.system_av_info.unwrap();
        assert_eq!(info.timing.sample_rate, 32000.0);
    }

    #[test]
    fn test_input_devices_and_flags() {
        let mut core = core();
        core.host.set_var(options::INPUT1, "6 button pad");
        core.host.set_var(options::INPUT2, "None");
        core.host.set_var(options::SPRITE_LIMIT, "enabled");
        core.host.set_var(options::AUDIO_FILTER, "low-pass");
        core.update_variables(false);

        assert_eq!(core.engine.devices[0], InputDevice::Pad6Button);
        assert_eq!(core.engine.devices[1], InputDevice::Nothing);
        assert!(core.engine.options().contains(EngineOptions::DIS_SPRITE_LIM));
        assert!(core.engine.options().contains(EngineOptions::EN_SNDFILTER));
        assert_eq!(core.engine.sound_filter, Some(Some(60 * 0x10000 / 100)));
    }

    #[test]
    fn test_deinit_clears_state() {
        let mut core = loaded("/roms/sonic.md");
        core.deinit();
        assert!(!core.engine.initialized);
        assert_eq!(core.disks.num_images(), 0);
        assert!(!core.bitmasks);
        assert_eq!(core.loaded(), None);
        assert!(!core.load_game_special(0, &[]));
    }

    #[test]
    fn test_memory_queries() {
        let mut core = loaded("/roms/sonic.md");
        assert_eq!(core.memory_size(2), memory::WORK_RAM_SIZE);
        assert!(core.memory_data(2).is_some());
        assert!(core.memory_data(7).is_none());
        assert_eq!(core.memory_size(7), 0);
    }
}
