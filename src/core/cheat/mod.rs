// pico-retro/src/core/cheat/mod.rs

//! Cheat patches entered through the host.
//!
//! Patches below the end of ROM are written into the ROM image; everything else
//! is poked through the 68k bus once per frame. The value found at the address
//! is captured when the patch is added so it can be put back exactly.

pub mod decode;

use log::{debug, error};
use thiserror::Error;

use crate::core::engine::Engine;

pub use decode::{decode, Decoded};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheatError {
    #[error("CHEATS: Invalid code: {0}")]
    InvalidCode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheatPatch {
    pub code: String,
    pub address: u32,
    pub value: u16,
    pub compare: Option<u8>,
    pub original: u16,
    pub active: bool,
}

impl CheatPatch {
    /// Word-aligned address used for reads and writes.
    fn word_address(&self) -> u32 {
        self.address & !1
    }

    fn in_rom<E: Engine + ?Sized>(&self, engine: &E) -> bool {
        (self.word_address() as usize) < engine.rom_size()
    }

    fn compare_matches(&self, current: u16) -> bool {
        self.compare.map_or(true, |cmp| cmp == current as u8)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheatList {
    patches: Vec<CheatPatch>,
}

impl CheatList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn patches(&self) -> &[CheatPatch] {
        &self.patches
    }

    /// Add every `+`-separated sub-code of `code`.
    ///
    /// The host's slot index is not tracked. Decoding stops at the first bad
    /// sub-code; the ones before it stay in the list.
    pub fn set<E: Engine + ?Sized>(
        &mut self,
        index: u32,
        enabled: bool,
        code: &str,
        engine: &mut E,
    ) -> Result<(), CheatError> {
        if code.is_empty() {
            return Ok(());
        }

        for part in code.split('+').filter(|part| !part.is_empty()) {
            let decoded = decode(part)
                .and_then(|decoded| match decoded.value {
                    // 0xFFFF is the decoder's failure marker
                    u16::MAX => Err(CheatError::InvalidCode(part.to_string())),
                    _ => Ok(decoded),
                })
                .map_err(|e| {
                    error!("{}", e);
                    e
                })?;

            let mut patch = CheatPatch {
                code: part.to_string(),
                address: decoded.address,
                value: decoded.value,
                compare: decoded.compare,
                original: 0,
                active: enabled,
            };
            let addr = patch.word_address();
            patch.original = if patch.in_rom(engine) {
                engine.read_rom_word(addr)
            } else {
                engine.read_bus_word(addr)
            };

            debug!(
                "cheat #{}: {} -> {:06X}={:04X} (was {:04X})",
                index, part, patch.address, patch.value, patch.original
            );
            self.patches.push(patch);
        }
        Ok(())
    }

    /// Write patches into memory. Runs once per frame before the engine steps.
    pub fn apply<E: Engine + ?Sized>(&self, engine: &mut E) {
        for (i, patch) in self.patches.iter().enumerate() {
            let addr = patch.word_address();

            if patch.in_rom(engine) {
                if patch.active {
                    if patch.compare_matches(engine.read_rom_word(addr)) {
                        engine.write_rom_word(addr, patch.value);
                    }
                } else if !self.patches[..i].iter().any(|p| p.word_address() == addr) {
                    // no older patch owns this address, restore it
                    engine.write_rom_word(addr, patch.original);
                }
            } else if patch.active && patch.compare_matches(engine.read_bus_word(addr)) {
                engine.write_bus_word(addr, patch.value);
            }
        }
    }

    /// Put back the original value under every active patch and drop the list.
    pub fn reset<E: Engine + ?Sized>(&mut self, engine: &mut E) {
        // newest first: a later patch on the same address captured the
        // earlier patch's value, so the oldest capture must be written last
        for patch in self.patches.iter().rev().filter(|p| p.active) {
            let addr = patch.word_address();
            if patch.in_rom(engine) {
                engine.write_rom_word(addr, patch.original);
            } else {
                engine.write_bus_word(addr, patch.original);
            }
        }
        self.patches.clear();
    }
}
