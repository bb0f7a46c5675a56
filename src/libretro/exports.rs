// pico-retro/src/libretro/exports.rs

//! Bodies of the `retro_*` symbols emitted by `libretro_core!`.

use std::ffi::{c_char, c_uint, c_void, CString};
use std::ptr;
use std::sync::OnceLock;

use crate::core::Core;

use super::host::{self, c_string, RetroHost};
use super::sys::*;
use super::{logger, with_core, CoreProvider};

pub fn api_version() -> c_uint {
    RETRO_API_VERSION
}

pub fn set_environment<P: CoreProvider>(cb: retro_environment_t) {
    with_core::<P, _>(|core| {
        core.host_mut().set_environment_callback(cb);
        core.set_environment();
    })
}

pub fn set_video_refresh<P: CoreProvider>(cb: retro_video_refresh_t) {
    with_core::<P, _>(|core| core.host_mut().set_video_refresh_callback(cb))
}

pub fn set_audio_sample<P: CoreProvider>(cb: retro_audio_sample_t) {
    with_core::<P, _>(|core| core.host_mut().set_audio_sample_callback(cb))
}

pub fn set_audio_sample_batch<P: CoreProvider>(cb: retro_audio_sample_batch_t) {
    with_core::<P, _>(|core| core.host_mut().set_audio_sample_batch_callback(cb))
}

pub fn set_input_poll<P: CoreProvider>(cb: retro_input_poll_t) {
    with_core::<P, _>(|core| core.host_mut().set_input_poll_callback(cb))
}

pub fn set_input_state<P: CoreProvider>(cb: retro_input_state_t) {
    with_core::<P, _>(|core| core.host_mut().set_input_state_callback(cb))
}

pub fn init<P: CoreProvider>() {
    with_core::<P, _>(|core| {
        logger::install(core.host_mut().log_interface());
        core.init();
    })
}

pub fn deinit<P: CoreProvider>() {
    with_core::<P, _>(|core| core.deinit())
}

/// NUL terminated copies of the strings in `retro_system_info`.
struct SystemStrings {
    library_name: CString,
    library_version: CString,
    valid_extensions: CString,
}

static SYSTEM_STRINGS: OnceLock<SystemStrings> = OnceLock::new();

/// # Safety
/// `info` must be null or point to a writable `retro_system_info`.
pub unsafe fn get_system_info<P: CoreProvider>(info: *mut retro_system_info) {
    let Some(info) = info.as_mut() else {
        return;
    };
    let system = Core::<P::Engine, RetroHost>::system_info();
    let strings = SYSTEM_STRINGS.get_or_init(|| SystemStrings {
        library_name: c_string(system.library_name),
        library_version: c_string(system.library_version),
        valid_extensions: c_string(system.valid_extensions),
    });

    *info = retro_system_info {
        library_name: strings.library_name.as_ptr(),
        library_version: strings.library_version.as_ptr(),
        valid_extensions: strings.valid_extensions.as_ptr(),
        need_fullpath: system.need_fullpath,
        block_extract: system.block_extract,
    };
}

/// # Safety
/// `info` must be null or point to a writable `retro_system_av_info`.
pub unsafe fn get_system_av_info<P: CoreProvider>(info: *mut retro_system_av_info) {
    if let Some(info) = info.as_mut() {
        *info = host::av_info(&with_core::<P, _>(|core| core.av_info()));
    }
}

pub fn set_controller_port_device<P: CoreProvider>(port: c_uint, device: c_uint) {
    with_core::<P, _>(|core| core.set_controller_port_device(port, device))
}

pub fn reset<P: CoreProvider>() {
    with_core::<P, _>(|core| core.reset())
}

pub fn run<P: CoreProvider>() {
    with_core::<P, _>(|core| core.run())
}

pub fn serialize_size<P: CoreProvider>() -> usize {
    with_core::<P, _>(|core| core.serialize_size())
}

/// # Safety
/// `data` must be null or point to `size` writable bytes.
pub unsafe fn serialize<P: CoreProvider>(data: *mut c_void, size: usize) -> bool {
    if data.is_null() {
        return false;
    }
    let buf = std::slice::from_raw_parts_mut(data.cast::<u8>(), size);
    with_core::<P, _>(|core| core.serialize(buf))
}

/// # Safety
/// `data` must be null or point to `size` readable bytes.
pub unsafe fn unserialize<P: CoreProvider>(data: *const c_void, size: usize) -> bool {
    if data.is_null() {
        return false;
    }
    let buf = std::slice::from_raw_parts(data.cast::<u8>(), size);
    with_core::<P, _>(|core| core.unserialize(buf))
}

pub fn cheat_reset<P: CoreProvider>() {
    with_core::<P, _>(|core| core.cheat_reset())
}

/// # Safety
/// `code` must be null or point to a NUL terminated string.
pub unsafe fn cheat_set<P: CoreProvider>(index: c_uint, enabled: bool, code: *const c_char) {
    let Some(code) = host::string_from(code) else {
        return;
    };
    with_core::<P, _>(|core| core.cheat_set(index, enabled, &code))
}

/// # Safety
/// `info` must be null or point to a valid `retro_game_info`.
pub unsafe fn load_game<P: CoreProvider>(info: *const retro_game_info) -> bool {
    let info = host::game_info_from(info);
    with_core::<P, _>(|core| core.load_game(info.as_ref()))
}

/// # Safety
/// `info` must be null or point to `num_info` valid `retro_game_info`s.
pub unsafe fn load_game_special<P: CoreProvider>(
    game_type: c_uint,
    info: *const retro_game_info,
    num_info: usize,
) -> bool {
    let infos: Vec<_> = if info.is_null() {
        Vec::new()
    } else {
        (0..num_info)
            .filter_map(|i| host::game_info_from(info.add(i)))
            .collect()
    };
    with_core::<P, _>(|core| core.load_game_special(game_type, &infos))
}

pub fn unload_game<P: CoreProvider>() {
    with_core::<P, _>(|core| core.unload_game())
}

pub fn get_region<P: CoreProvider>() -> c_uint {
    with_core::<P, _>(|core| core.region())
}

pub fn get_memory_data<P: CoreProvider>(id: c_uint) -> *mut c_void {
    // the block belongs to the engine and outlives the lock
    with_core::<P, _>(|core| {
        core.memory_data(id)
            .map_or(ptr::null_mut(), |mem| mem.as_mut_ptr().cast())
    })
}

pub fn get_memory_size<P: CoreProvider>(id: c_uint) -> usize {
    with_core::<P, _>(|core| core.memory_size(id))
}
