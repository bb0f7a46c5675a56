// pico-retro/src/libretro/mod.rs

//! libretro C ABI.
//!
//! An engine crate turns itself into a libretro core with one line:
//!
//! ```ignore
//! pico_retro::libretro_core!(MyEngine, MyEngine::new());
//! ```
//!
//! The macro emits the `retro_*` entry points and the `plat_*` memory hooks as
//! `#[no_mangle]` symbols. Their bodies live in [`exports`], generic over the
//! [`CoreProvider`] the macro declares.

pub mod exports;
pub mod host;
pub mod logger;
pub mod sys;

use std::ffi::{c_char, c_uint};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::core::engine::Engine;
use crate::core::Core;

pub use host::RetroHost;
pub use logger::RetroLogger;

use sys::{retro_audio_buffer_status_callback, retro_disk_control_ext_callback, retro_game_info};

pub type RetroCore<E> = Core<E, RetroHost>;

/// The one core instance behind the exported symbols.
pub struct CoreSlot<E: Engine> {
    core: Mutex<Option<RetroCore<E>>>,
}

impl<E: Engine> CoreSlot<E> {
    pub const fn new() -> Self {
        Self {
            core: Mutex::new(None),
        }
    }

    /// Run `f` on the core, creating it with `create` on first use.
    pub fn with<R>(
        &self,
        create: impl FnOnce() -> RetroCore<E>,
        f: impl FnOnce(&mut RetroCore<E>) -> R,
    ) -> R {
        let mut slot = self.core.lock().unwrap_or_else(PoisonError::into_inner);
        f(slot.get_or_insert_with(create))
    }
}

impl<E: Engine> Default for CoreSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Binds the exported symbols to one engine type. Implemented by `libretro_core!`.
pub trait CoreProvider: 'static {
    type Engine: Engine + Send;

    fn slot() -> &'static CoreSlot<Self::Engine>;
    fn create() -> Self::Engine;
}

pub fn with_core<P: CoreProvider, R>(f: impl FnOnce(&mut RetroCore<P::Engine>) -> R) -> R {
    P::slot().with(
        || Core::new(P::create(), RetroHost::new(disk_callbacks::<P>(), audio_status::<P>())),
        f,
    )
}

// -- frontend callbacks --

pub fn disk_callbacks<P: CoreProvider>() -> retro_disk_control_ext_callback {
    retro_disk_control_ext_callback {
        set_eject_state: disk_set_eject_state::<P>,
        get_eject_state: disk_get_eject_state::<P>,
        get_image_index: disk_get_image_index::<P>,
        set_image_index: disk_set_image_index::<P>,
        get_num_images: disk_get_num_images::<P>,
        replace_image_index: disk_replace_image_index::<P>,
        add_image_index: disk_add_image_index::<P>,
        set_initial_image: disk_set_initial_image::<P>,
        get_image_path: disk_get_image_path::<P>,
        get_image_label: disk_get_image_label::<P>,
    }
}

pub fn audio_status<P: CoreProvider>() -> retro_audio_buffer_status_callback {
    retro_audio_buffer_status_callback {
        callback: audio_buffer_status::<P>,
    }
}

unsafe extern "C" fn audio_buffer_status<P: CoreProvider>(
    active: bool,
    occupancy: c_uint,
    underrun_likely: bool,
) {
    with_core::<P, _>(|core| core.audio_buffer_status(active, occupancy, underrun_likely));
}

unsafe extern "C" fn disk_set_eject_state<P: CoreProvider>(ejected: bool) -> bool {
    with_core::<P, _>(|core| core.disks_mut().set_eject_state(ejected))
}

unsafe extern "C" fn disk_get_eject_state<P: CoreProvider>() -> bool {
    with_core::<P, _>(|core| core.disks().eject_state())
}

unsafe extern "C" fn disk_get_image_index<P: CoreProvider>() -> c_uint {
    with_core::<P, _>(|core| core.disks().image_index() as c_uint)
}

unsafe extern "C" fn disk_set_image_index<P: CoreProvider>(index: c_uint) -> bool {
    with_core::<P, _>(|core| core.disk_set_image_index(index as usize))
}

unsafe extern "C" fn disk_get_num_images<P: CoreProvider>() -> c_uint {
    with_core::<P, _>(|core| core.disks().num_images() as c_uint)
}

unsafe extern "C" fn disk_replace_image_index<P: CoreProvider>(
    index: c_uint,
    info: *const retro_game_info,
) -> bool {
    // a null info or path removes the image
    let path = host::game_info_from(info).and_then(|info| info.path);
    with_core::<P, _>(|core| core.disk_replace_image_index(index as usize, path.as_deref()))
}

unsafe extern "C" fn disk_add_image_index<P: CoreProvider>() -> bool {
    with_core::<P, _>(|core| core.disks_mut().add_image_index())
}

unsafe extern "C" fn disk_set_initial_image<P: CoreProvider>(
    index: c_uint,
    path: *const c_char,
) -> bool {
    let Some(path) = host::string_from(path) else {
        return false;
    };
    with_core::<P, _>(|core| {
        core.disks_mut()
            .set_initial_image(index as usize, Path::new(&path))
    })
}

unsafe extern "C" fn disk_get_image_path<P: CoreProvider>(
    index: c_uint,
    out: *mut c_char,
    len: usize,
) -> bool {
    let path: Option<PathBuf> =
        with_core::<P, _>(|core| core.disks().image_path(index as usize).map(Path::to_path_buf));
    match path {
        Some(path) => copy_out(&path.to_string_lossy(), out, len),
        None => false,
    }
}

unsafe extern "C" fn disk_get_image_label<P: CoreProvider>(
    index: c_uint,
    out: *mut c_char,
    len: usize,
) -> bool {
    let label: Option<String> =
        with_core::<P, _>(|core| core.disks().image_label(index as usize).map(str::to_owned));
    match label {
        Some(label) => copy_out(&label, out, len),
        None => false,
    }
}

/// `strncpy` into a frontend buffer, always NUL terminated.
///
/// # Safety
/// `out` must be null or point to `len` writable bytes.
unsafe fn copy_out(text: &str, out: *mut c_char, len: usize) -> bool {
    if out.is_null() || len == 0 {
        return false;
    }
    let bytes = text.as_bytes();
    let n = bytes.len().min(len - 1);
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), out.cast::<u8>(), n);
    *out.add(n) = 0;
    true
}

/// Emit the libretro entry points for an engine type.
///
/// `$engine` must implement [`Engine`] and `Send`; `$create` builds it the
/// first time the frontend calls into the core.
#[macro_export]
macro_rules! libretro_core {
    ($engine:ty, $create:expr) => {
        #[doc(hidden)]
        pub struct __PicoRetroCore;

        static __PICO_RETRO_SLOT: $crate::libretro::CoreSlot<$engine> =
            $crate::libretro::CoreSlot::new();

        impl $crate::libretro::CoreProvider for __PicoRetroCore {
            type Engine = $engine;

            fn slot() -> &'static $crate::libretro::CoreSlot<$engine> {
                &__PICO_RETRO_SLOT
            }

            fn create() -> $engine {
                $create
            }
        }

        #[no_mangle]
        pub extern "C" fn retro_api_version() -> ::std::ffi::c_uint {
            $crate::libretro::exports::api_version()
        }

        #[no_mangle]
        pub extern "C" fn retro_set_environment(cb: $crate::libretro::sys::retro_environment_t) {
            $crate::libretro::exports::set_environment::<__PicoRetroCore>(cb)
        }

        #[no_mangle]
        pub extern "C" fn retro_set_video_refresh(cb: $crate::libretro::sys::retro_video_refresh_t) {
            $crate::libretro::exports::set_video_refresh::<__PicoRetroCore>(cb)
        }

        #[no_mangle]
        pub extern "C" fn retro_set_audio_sample(cb: $crate::libretro::sys::retro_audio_sample_t) {
            $crate::libretro::exports::set_audio_sample::<__PicoRetroCore>(cb)
        }

        #[no_mangle]
        pub extern "C" fn retro_set_audio_sample_batch(cb: $crate::libretro::sys::retro_audio_sample_batch_t) {
            $crate::libretro::exports::set_audio_sample_batch::<__PicoRetroCore>(cb)
        }

        #[no_mangle]
        pub extern "C" fn retro_set_input_poll(cb: $crate::libretro::sys::retro_input_poll_t) {
            $crate::libretro::exports::set_input_poll::<__PicoRetroCore>(cb)
        }

        #[no_mangle]
        pub extern "C" fn retro_set_input_state(cb: $crate::libretro::sys::retro_input_state_t) {
            $crate::libretro::exports::set_input_state::<__PicoRetroCore>(cb)
        }

        #[no_mangle]
        pub extern "C" fn retro_init() {
            $crate::libretro::exports::init::<__PicoRetroCore>()
        }

        #[no_mangle]
        pub extern "C" fn retro_deinit() {
            $crate::libretro::exports::deinit::<__PicoRetroCore>()
        }

        #[no_mangle]
        pub unsafe extern "C" fn retro_get_system_info(info: *mut $crate::libretro::sys::retro_system_info) {
            $crate::libretro::exports::get_system_info::<__PicoRetroCore>(info)
        }

        #[no_mangle]
        pub unsafe extern "C" fn retro_get_system_av_info(info: *mut $crate::libretro::sys::retro_system_av_info) {
            $crate::libretro::exports::get_system_av_info::<__PicoRetroCore>(info)
        }

        #[no_mangle]
        pub extern "C" fn retro_set_controller_port_device(port: ::std::ffi::c_uint, device: ::std::ffi::c_uint) {
            $crate::libretro::exports::set_controller_port_device::<__PicoRetroCore>(port, device)
        }

        #[no_mangle]
        pub extern "C" fn retro_reset() {
            $crate::libretro::exports::reset::<__PicoRetroCore>()
        }

        #[no_mangle]
        pub extern "C" fn retro_run() {
            $crate::libretro::exports::run::<__PicoRetroCore>()
        }

        #[no_mangle]
        pub extern "C" fn retro_serialize_size() -> usize {
            $crate::libretro::exports::serialize_size::<__PicoRetroCore>()
        }

        #[no_mangle]
        pub unsafe extern "C" fn retro_serialize(data: *mut ::std::ffi::c_void, size: usize) -> bool {
            $crate::libretro::exports::serialize::<__PicoRetroCore>(data, size)
        }

        #[no_mangle]
        pub unsafe extern "C" fn retro_unserialize(data: *const ::std::ffi::c_void, size: usize) -> bool {
            $crate::libretro::exports::unserialize::<__PicoRetroCore>(data, size)
        }

        #[no_mangle]
        pub extern "C" fn retro_cheat_reset() {
            $crate::libretro::exports::cheat_reset::<__PicoRetroCore>()
        }

        #[no_mangle]
        pub unsafe extern "C" fn retro_cheat_set(
            index: ::std::ffi::c_uint,
            enabled: bool,
            code: *const ::std::ffi::c_char,
        ) {
            $crate::libretro::exports::cheat_set::<__PicoRetroCore>(index, enabled, code)
        }

        #[no_mangle]
        pub unsafe extern "C" fn retro_load_game(info: *const $crate::libretro::sys::retro_game_info) -> bool {
            $crate::libretro::exports::load_game::<__PicoRetroCore>(info)
        }

        #[no_mangle]
        pub unsafe extern "C" fn retro_load_game_special(
            game_type: ::std::ffi::c_uint,
            info: *const $crate::libretro::sys::retro_game_info,
            num_info: usize,
        ) -> bool {
            $crate::libretro::exports::load_game_special::<__PicoRetroCore>(game_type, info, num_info)
        }

        #[no_mangle]
        pub extern "C" fn retro_unload_game() {
            $crate::libretro::exports::unload_game::<__PicoRetroCore>()
        }

        #[no_mangle]
        pub extern "C" fn retro_get_region() -> ::std::ffi::c_uint {
            $crate::libretro::exports::get_region::<__PicoRetroCore>()
        }

        #[no_mangle]
        pub extern "C" fn retro_get_memory_data(id: ::std::ffi::c_uint) -> *mut ::std::ffi::c_void {
            $crate::libretro::exports::get_memory_data::<__PicoRetroCore>(id)
        }

        #[no_mangle]
        pub extern "C" fn retro_get_memory_size(id: ::std::ffi::c_uint) -> usize {
            $crate::libretro::exports::get_memory_size::<__PicoRetroCore>(id)
        }

        // engine-facing memory hooks

        #[no_mangle]
        pub extern "C" fn plat_mmap(
            addr: ::std::ffi::c_ulong,
            size: usize,
            need_exec: ::std::ffi::c_int,
            is_fixed: ::std::ffi::c_int,
        ) -> *mut ::std::ffi::c_void {
            $crate::platform::plat_mmap(addr, size, need_exec, is_fixed)
        }

        #[no_mangle]
        pub unsafe extern "C" fn plat_mremap(
            ptr: *mut ::std::ffi::c_void,
            old_size: usize,
            new_size: usize,
        ) -> *mut ::std::ffi::c_void {
            $crate::platform::plat_mremap(ptr, old_size, new_size)
        }

        #[no_mangle]
        pub unsafe extern "C" fn plat_munmap(ptr: *mut ::std::ffi::c_void, size: usize) {
            $crate::platform::plat_munmap(ptr, size)
        }

        #[no_mangle]
        pub extern "C" fn plat_mem_get_for_drc(size: usize) -> *mut ::std::ffi::c_void {
            $crate::platform::plat_mem_get_for_drc(size)
        }

        #[no_mangle]
        pub unsafe extern "C" fn plat_mem_set_exec(ptr: *mut ::std::ffi::c_void, size: usize) -> ::std::ffi::c_int {
            $crate::platform::plat_mem_set_exec(ptr, size)
        }

        #[no_mangle]
        pub unsafe extern "C" fn cache_flush_d_inval_i(start: *mut ::std::ffi::c_void, end: *mut ::std::ffi::c_void) {
            $crate::platform::cache_flush(start.cast(), end.cast())
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_out_truncates() {
        let mut buf = [0x7f as c_char; 6];
        unsafe {
            assert!(copy_out("disc one", buf.as_mut_ptr(), buf.len()));
            assert_eq!(std::ffi::CStr::from_ptr(buf.as_ptr()).to_bytes(), b"disc ");
            assert!(copy_out("ab", buf.as_mut_ptr(), buf.len()));
            assert_eq!(std::ffi::CStr::from_ptr(buf.as_ptr()).to_bytes(), b"ab");
            assert!(!copy_out("ab", buf.as_mut_ptr(), 0));
            assert!(!copy_out("ab", std::ptr::null_mut(), 4));
        }
    }
}
