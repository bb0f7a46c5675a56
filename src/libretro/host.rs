// pico-retro/src/libretro/host.rs

//! [`Host`] over the callbacks the frontend registered.
//!
//! Everything handed to the frontend by pointer (variable definitions, input
//! descriptors, memory maps) is kept alive here until it is replaced.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr, CString};
use std::path::PathBuf;
use std::ptr;

use log::warn;

use crate::core::host::{
    AvInfo, GameInfo, GameInfoExt, Geometry, Host, InputDescriptor, MemoryDescriptor, PixelFormat,
};
use crate::core::options::OptionDefinition;

use super::sys::*;

/// `CString` from Rust text; interior NULs cut the string short.
pub(crate) fn c_string(text: &str) -> CString {
    let bytes = text.as_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    CString::new(&bytes[..end]).unwrap_or_default()
}

/// # Safety
/// `ptr` must be null or point to a NUL terminated string.
pub(crate) unsafe fn string_from(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// # Safety
/// `ptr` must be null or point to `size` readable bytes.
unsafe fn bytes_from(ptr: *const c_void, size: usize) -> Option<Vec<u8>> {
    if ptr.is_null() || size == 0 {
        return None;
    }
    Some(std::slice::from_raw_parts(ptr.cast::<u8>(), size).to_vec())
}

/// Copy a `retro_game_info` handed in by the frontend.
///
/// # Safety
/// `info` must be null or point to a valid `retro_game_info`.
pub(crate) unsafe fn game_info_from(info: *const retro_game_info) -> Option<GameInfo> {
    let info = info.as_ref()?;
    Some(GameInfo {
        path: string_from(info.path).map(PathBuf::from),
        data: bytes_from(info.data, info.size),
    })
}

fn geometry(geometry: &Geometry) -> retro_game_geometry {
    retro_game_geometry {
        base_width: geometry.base_width,
        base_height: geometry.base_height,
        max_width: geometry.max_width,
        max_height: geometry.max_height,
        aspect_ratio: geometry.aspect_ratio,
    }
}

pub(crate) fn av_info(info: &AvInfo) -> retro_system_av_info {
    retro_system_av_info {
        geometry: geometry(&info.geometry),
        timing: retro_system_timing {
            fps: info.timing.fps,
            sample_rate: info.timing.sample_rate,
        },
    }
}

pub struct RetroHost {
    environment: Option<retro_environment_t>,
    video_refresh: Option<retro_video_refresh_t>,
    audio_sample: Option<retro_audio_sample_t>,
    audio_sample_batch: Option<retro_audio_sample_batch_t>,
    input_poll: Option<retro_input_poll_t>,
    input_state: Option<retro_input_state_t>,

    disk_control: retro_disk_control_ext_callback,
    audio_status: retro_audio_buffer_status_callback,

    // storage the frontend may still point into
    variables: Vec<(CString, CString)>,
    extensions: CString,
    descriptors: Vec<CString>,
    addrspaces: Vec<CString>,
}

impl RetroHost {
    pub fn new(
        disk_control: retro_disk_control_ext_callback,
        audio_status: retro_audio_buffer_status_callback,
    ) -> Self {
        Self {
            environment: None,
            video_refresh: None,
            audio_sample: None,
            audio_sample_batch: None,
            input_poll: None,
            input_state: None,
            disk_control,
            audio_status,
            variables: Vec::new(),
            extensions: CString::default(),
            descriptors: Vec::new(),
            addrspaces: Vec::new(),
        }
    }

    pub fn set_environment_callback(&mut self, cb: retro_environment_t) {
        self.environment = Some(cb);
    }

    pub fn set_video_refresh_callback(&mut self, cb: retro_video_refresh_t) {
        self.video_refresh = Some(cb);
    }

    pub fn set_audio_sample_callback(&mut self, cb: retro_audio_sample_t) {
        self.audio_sample = Some(cb);
    }

    pub fn set_audio_sample_batch_callback(&mut self, cb: retro_audio_sample_batch_t) {
        self.audio_sample_batch = Some(cb);
    }

    pub fn set_input_poll_callback(&mut self, cb: retro_input_poll_t) {
        self.input_poll = Some(cb);
    }

    pub fn set_input_state_callback(&mut self, cb: retro_input_state_t) {
        self.input_state = Some(cb);
    }

    fn env(&mut self, cmd: c_uint, data: *mut c_void) -> bool {
        match self.environment {
            Some(cb) => unsafe { cb(cmd, data) },
            None => false,
        }
    }

    fn env_with<T>(&mut self, cmd: c_uint, value: &mut T) -> bool {
        self.env(cmd, (value as *mut T).cast())
    }

    /// The frontend's log function, if it has one.
    pub fn log_interface(&mut self) -> Option<retro_log_printf_t> {
        let mut logging = retro_log_callback { log: None };
        if self.env_with(RETRO_ENVIRONMENT_GET_LOG_INTERFACE, &mut logging) {
            logging.log
        } else {
            None
        }
    }
}

impl Host for RetroHost {
    fn variable(&mut self, key: &str) -> Option<String> {
        let key = c_string(key);
        let mut var = retro_variable {
            key: key.as_ptr(),
            value: ptr::null(),
        };
        if !self.env_with(RETRO_ENVIRONMENT_GET_VARIABLE, &mut var) {
            return None;
        }
        unsafe { string_from(var.value) }
    }

    fn variables_updated(&mut self) -> bool {
        let mut updated = false;
        self.env_with(RETRO_ENVIRONMENT_GET_VARIABLE_UPDATE, &mut updated) && updated
    }

    fn set_variables(&mut self, definitions: &[OptionDefinition]) -> bool {
        self.variables = definitions
            .iter()
            .map(|def| (c_string(def.key), c_string(&def.legacy_value())))
            .collect();

        let mut vars: Vec<retro_variable> = self
            .variables
            .iter()
            .map(|(key, value)| retro_variable {
                key: key.as_ptr(),
                value: value.as_ptr(),
            })
            .collect();
        vars.push(retro_variable {
            key: ptr::null(),
            value: ptr::null(),
        });
        self.env(RETRO_ENVIRONMENT_SET_VARIABLES, vars.as_mut_ptr().cast())
    }

    fn set_content_info_override(&mut self, extensions: &str, need_fullpath: bool) -> bool {
        self.extensions = c_string(extensions);
        let mut overrides = [
            retro_content_info_override {
                extensions: self.extensions.as_ptr(),
                need_fullpath,
                persistent_data: false,
            },
            retro_content_info_override {
                extensions: ptr::null(),
                need_fullpath: false,
                persistent_data: false,
            },
        ];
        self.env(RETRO_ENVIRONMENT_SET_CONTENT_INFO_OVERRIDE, overrides.as_mut_ptr().cast())
    }

    fn set_performance_level(&mut self, level: u32) -> bool {
        let mut level: c_uint = level;
        self.env_with(RETRO_ENVIRONMENT_SET_PERFORMANCE_LEVEL, &mut level)
    }

    fn supports_input_bitmasks(&mut self) -> bool {
        self.env(RETRO_ENVIRONMENT_GET_INPUT_BITMASKS, ptr::null_mut())
    }

    fn disk_control_interface_version(&mut self) -> Option<u32> {
        let mut version: c_uint = 0;
        self.env_with(RETRO_ENVIRONMENT_GET_DISK_CONTROL_INTERFACE_VERSION, &mut version)
            .then_some(version)
    }

    fn set_disk_control_interface(&mut self, extended: bool) -> bool {
        if extended {
            let mut callbacks = self.disk_control;
            self.env_with(RETRO_ENVIRONMENT_SET_DISK_CONTROL_EXT_INTERFACE, &mut callbacks)
        } else {
            let mut callbacks = self.disk_control.v0();
            self.env_with(RETRO_ENVIRONMENT_SET_DISK_CONTROL_INTERFACE, &mut callbacks)
        }
    }

    fn system_directory(&mut self) -> Option<PathBuf> {
        let mut dir: *const c_char = ptr::null();
        if !self.env_with(RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY, &mut dir) {
            return None;
        }
        unsafe { string_from(dir) }.map(PathBuf::from)
    }

    fn game_info_ext(&mut self) -> Option<GameInfoExt> {
        let mut info: *const retro_game_info_ext = ptr::null();
        if !self.env_with(RETRO_ENVIRONMENT_GET_GAME_INFO_EXT, &mut info) {
            return None;
        }
        let info = unsafe { info.as_ref()? };

        unsafe {
            Some(GameInfoExt {
                full_path: string_from(info.full_path).map(PathBuf::from),
                dir: string_from(info.dir).map(PathBuf::from).unwrap_or_default(),
                name: string_from(info.name).unwrap_or_default(),
                ext: string_from(info.ext).unwrap_or_default(),
                file_in_archive: info.file_in_archive,
                data: bytes_from(info.data, info.size),
            })
        }
    }

    fn set_pixel_format(&mut self, format: PixelFormat) -> bool {
        let mut format: c_int = match format {
            PixelFormat::Rgb1555 => RETRO_PIXEL_FORMAT_0RGB1555,
            PixelFormat::Xrgb8888 => RETRO_PIXEL_FORMAT_XRGB8888,
            PixelFormat::Rgb565 => RETRO_PIXEL_FORMAT_RGB565,
        };
        self.env_with(RETRO_ENVIRONMENT_SET_PIXEL_FORMAT, &mut format)
    }

    fn set_input_descriptors(&mut self, descriptors: &[InputDescriptor]) -> bool {
        self.descriptors = descriptors.iter().map(|d| c_string(d.description)).collect();

        let mut table: Vec<retro_input_descriptor> = descriptors
            .iter()
            .zip(&self.descriptors)
            .map(|(d, description)| retro_input_descriptor {
                port: d.port,
                device: d.device,
                index: d.index,
                id: d.id,
                description: description.as_ptr(),
            })
            .collect();
        table.push(retro_input_descriptor {
            port: 0,
            device: 0,
            index: 0,
            id: 0,
            description: ptr::null(),
        });
        self.env(RETRO_ENVIRONMENT_SET_INPUT_DESCRIPTORS, table.as_mut_ptr().cast())
    }

    fn set_memory_maps(&mut self, descriptors: &[MemoryDescriptor]) -> bool {
        self.addrspaces = descriptors.iter().map(|d| c_string(d.addrspace)).collect();

        let table: Vec<retro_memory_descriptor> = descriptors
            .iter()
            .zip(&self.addrspaces)
            .map(|(d, addrspace)| retro_memory_descriptor {
                flags: d.flags,
                ptr: d.ptr.cast(),
                offset: d.offset,
                start: d.start,
                select: d.select,
                disconnect: d.disconnect,
                len: d.len,
                addrspace: addrspace.as_ptr(),
            })
            .collect();
        let mut map = retro_memory_map {
            descriptors: table.as_ptr(),
            num_descriptors: table.len() as c_uint,
        };
        self.env_with(RETRO_ENVIRONMENT_SET_MEMORY_MAPS, &mut map)
    }

    fn set_geometry(&mut self, info: &AvInfo) -> bool {
        let mut geometry = geometry(&info.geometry);
        self.env_with(RETRO_ENVIRONMENT_SET_GEOMETRY, &mut geometry)
    }

    fn set_system_av_info(&mut self, info: &AvInfo) -> bool {
        let mut info = av_info(info);
        self.env_with(RETRO_ENVIRONMENT_SET_SYSTEM_AV_INFO, &mut info)
    }

    fn set_audio_buffer_status_callback(&mut self, enable: bool) -> bool {
        if enable {
            let mut callback = retro_audio_buffer_status_callback {
                callback: self.audio_status.callback,
            };
            self.env_with(RETRO_ENVIRONMENT_SET_AUDIO_BUFFER_STATUS_CALLBACK, &mut callback)
        } else {
            self.env(RETRO_ENVIRONMENT_SET_AUDIO_BUFFER_STATUS_CALLBACK, ptr::null_mut())
        }
    }

    fn set_minimum_audio_latency(&mut self, latency_ms: u32) -> bool {
        let mut latency: c_uint = latency_ms;
        self.env_with(RETRO_ENVIRONMENT_SET_MINIMUM_AUDIO_LATENCY, &mut latency)
    }

    fn video_refresh(&mut self, frame: Option<&[u16]>, width: u32, height: u32, pitch: usize) {
        if let Some(cb) = self.video_refresh {
            let (data, height) = match frame {
                Some(pixels) if pitch > 0 => {
                    let lines = (pixels.len() * 2 / pitch).min(height as usize);
                    (pixels.as_ptr().cast(), lines as c_uint)
                }
                _ => (ptr::null(), height),
            };
            unsafe { cb(data, width, height, pitch) };
        }
    }

    fn audio_sample_batch(&mut self, samples: &[i16]) -> usize {
        let frames = samples.len() / 2;
        if let Some(cb) = self.audio_sample_batch {
            return unsafe { cb(samples.as_ptr(), frames) };
        }
        if let Some(cb) = self.audio_sample {
            for frame in samples.chunks_exact(2) {
                unsafe { cb(frame[0], frame[1]) };
            }
            return frames;
        }
        warn!("no audio callback, dropping {} frames", frames);
        frames
    }

    fn input_poll(&mut self) {
        if let Some(cb) = self.input_poll {
            unsafe { cb() };
        }
    }

    fn input_state(&mut self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        match self.input_state {
            Some(cb) => unsafe { cb(port, device, index, id) },
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_string_cuts_at_nul() {
        assert_eq!(c_string("abc").as_bytes(), b"abc");
        assert_eq!(c_string("ab\0cd").as_bytes(), b"ab");
        assert_eq!(c_string("").as_bytes(), b"");
    }

    #[test]
    fn test_game_info_copy() {
        let path = c_string("/roms/sonic.md");
        let data = [1u8, 2, 3];
        let info = retro_game_info {
            path: path.as_ptr(),
            data: data.as_ptr().cast(),
            size: data.len(),
            meta: ptr::null(),
        };
        let copy = unsafe { game_info_from(&info) }.unwrap();
        assert_eq!(copy.path, Some(PathBuf::from("/roms/sonic.md")));
        assert_eq!(copy.data.as_deref(), Some(&data[..]));

        assert!(unsafe { game_info_from(ptr::null()) }.is_none());
    }
}
