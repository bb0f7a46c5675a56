// pico-retro/src/core/disk/mod.rs

//! Multi-disc support.
//!
//! Backs the host's disk control interface: a fixed table of image slots, the
//! current index and the tray state. Switching discs goes through the engine,
//! which checks the image before inserting it.

pub mod m3u;

use std::path::{Path, PathBuf};

use log::{error, info};

use crate::core::engine::Engine;

/// Number of image slots.
pub const MAX_DISKS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskImage {
    pub path: PathBuf,
    pub label: String,
}

impl DiskImage {
    pub fn new(path: PathBuf) -> Self {
        let label = disk_label(&path);
        Self { path, label }
    }
}

/// File name without directory or last extension.
pub fn disk_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct DiskControl {
    slots: [Option<DiskImage>; MAX_DISKS],
    current: usize,
    count: usize,
    ejected: bool,
    /// Start disc requested by the host before content loads.
    initial: Option<(usize, PathBuf)>,
}

impl DiskControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty every slot. The requested initial image survives.
    pub fn clear(&mut self) {
        self.slots = Default::default();
        self.current = 0;
        self.count = 0;
        self.ejected = false;
    }

    pub fn set_eject_state(&mut self, ejected: bool) -> bool {
        self.ejected = ejected;
        true
    }

    pub fn eject_state(&self) -> bool {
        self.ejected
    }

    pub fn image_index(&self) -> usize {
        self.current
    }

    pub fn num_images(&self) -> usize {
        self.count
    }

    pub fn set_image_index<E: Engine + ?Sized>(&mut self, index: usize, engine: &mut E) -> bool {
        if index >= MAX_DISKS {
            return false;
        }

        let Some(disk) = &self.slots[index] else {
            // the host selects "no disk" with index == count
            error!("missing disk #{}", index);
            self.current = index;
            return true;
        };

        info!("switching to disk {}: \"{}\"", index, disk.path.display());

        if let Err(e) = engine.insert_disc(&disk.path) {
            error!("Load failed, invalid CD image? ({})", e);
            return false;
        }

        self.current = index;
        true
    }

    pub fn replace_image_index<E: Engine + ?Sized>(
        &mut self,
        index: usize,
        path: Option<&Path>,
        engine: &mut E,
    ) -> bool {
        if index >= MAX_DISKS {
            return false;
        }

        self.slots[index] = None;

        match path {
            Some(path) => {
                self.slots[index] = Some(DiskImage::new(path.to_path_buf()));
                if index == self.current {
                    self.set_image_index(index, engine)
                } else {
                    true
                }
            }
            None => true,
        }
    }

    pub fn add_image_index(&mut self) -> bool {
        if self.count >= MAX_DISKS {
            return false;
        }
        self.count += 1;
        true
    }

    pub fn set_initial_image(&mut self, index: usize, path: &Path) -> bool {
        if index >= MAX_DISKS || path.as_os_str().is_empty() {
            return false;
        }
        self.initial = Some((index, path.to_path_buf()));
        true
    }

    pub fn image_path(&self, index: usize) -> Option<&Path> {
        self.slots
            .get(index)?
            .as_ref()
            .map(|disk| disk.path.as_path())
            .filter(|path| !path.as_os_str().is_empty())
    }

    pub fn image_label(&self, index: usize) -> Option<&str> {
        self.slots
            .get(index)?
            .as_ref()
            .map(|disk| disk.label.as_str())
            .filter(|label| !label.is_empty())
    }

    /// Fill the table from a playlist. Returns false when it yields no entry.
    pub fn load_playlist(&mut self, m3u: &Path, base_dir: &Path) -> bool {
        self.clear();

        let entries = match m3u::read(m3u, base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("failed to read m3u file {}: {}", m3u.display(), e);
                return false;
            }
        };

        self.fill(entries);
        self.count != 0
    }

    /// Single image content: one slot, current.
    pub fn load_single(&mut self, path: &Path) {
        self.clear();
        self.fill([path.to_path_buf()]);
    }

    fn fill<I: IntoIterator<Item = PathBuf>>(&mut self, paths: I) {
        for (slot, path) in self.slots.iter_mut().zip(paths) {
            *slot = Some(DiskImage::new(path));
            self.count += 1;
        }
    }

    /// Slot the content should boot from.
    ///
    /// The host's initial image is honoured only if it is past the first slot,
    /// inside the table, and still names the same file.
    pub fn start_index(&self) -> usize {
        match &self.initial {
            Some((index, path))
                if *index > 0
                    && *index < self.count
                    && self.image_path(*index) == Some(path.as_path()) =>
            {
                *index
            }
            _ => 0,
        }
    }

    /// Record the slot the engine actually booted.
    pub fn set_current(&mut self, index: usize) {
        self.current = index.min(MAX_DISKS - 1);
    }

    pub fn tray_open(&mut self) {
        info!("cd tray open");
        self.ejected = true;
    }

    pub fn tray_close(&mut self) {
        info!("cd tray close");
        self.ejected = false;
    }
}
