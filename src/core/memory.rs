// pico-retro/src/core/memory.rs

//! Regiões de memória expostas ao frontend (save RAM, RAM do sistema, mapas).

use crate::core::engine::{Engine, EngineOptions, Hardware, MemoryId};
use crate::core::host::{MemoryDescriptor, MEMDESC_SYSTEM_RAM};

pub const MCD_BRAM_SIZE: usize = 0x2000;
/// RAM cart do Mega CD (usa o buffer de save do cartucho).
pub const MCD_RAMCART_SIZE: usize = 0x12000;
pub const SMS_RAM_SIZE: usize = 0x2000;
pub const WORK_RAM_SIZE: usize = 0x10000;

pub const PRG_RAM_SIZE: usize = 0x80000;
/// Bit de espaço virtual: permite alcançar toda a PRG-RAM em $80020000.
const SCD_BIT: usize = 1 << 31;

/// Tipos de memória do libretro suportados.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetroMemory {
    SaveRam,
    SystemRam,
}

impl RetroMemory {
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(RetroMemory::SaveRam),
            2 => Some(RetroMemory::SystemRam),
            _ => None,
        }
    }
}

/// Bloco da engine por trás de cada tipo, mais o tamanho fixo quando existe.
fn select<E: Engine + ?Sized>(engine: &E, kind: RetroMemory) -> (MemoryId, Option<usize>) {
    let hw = engine.hardware();
    match kind {
        RetroMemory::SaveRam if hw.contains(Hardware::MCD) => {
            if engine.options().contains(EngineOptions::EN_MCD_RAMCART) {
                (MemoryId::CartSave, Some(MCD_RAMCART_SIZE))
            } else {
                (MemoryId::CdBackup, Some(MCD_BRAM_SIZE))
            }
        }
        RetroMemory::SaveRam => (MemoryId::CartSave, None),
        RetroMemory::SystemRam if hw.contains(Hardware::SMS) => {
            (MemoryId::Z80Ram, Some(SMS_RAM_SIZE))
        }
        RetroMemory::SystemRam => (MemoryId::WorkRam, Some(WORK_RAM_SIZE)),
    }
}

/// Ponteiro para a região pedida pelo frontend.
pub fn data<E: Engine + ?Sized>(engine: &mut E, kind: RetroMemory) -> Option<&mut [u8]> {
    let (id, _) = select(engine, kind);
    engine.memory(id)
}

/// Tamanho da região pedida.
///
/// A save RAM do cartucho é reportada como vazia depois do primeiro frame
/// enquanto estiver toda zerada, para o frontend não gravar um .srm inútil.
pub fn size<E: Engine + ?Sized>(engine: &mut E, kind: RetroMemory) -> usize {
    let (id, fixed) = select(engine, kind);
    let first_frame = engine.frame_count() == 0;

    let Some(mem) = engine.memory(id) else {
        return 0;
    };

    match fixed {
        Some(len) => len.min(mem.len()),
        None if first_frame => mem.len(),
        None if mem.iter().all(|&b| b == 0) => 0,
        None => mem.len(),
    }
}

/// Mapa de memória publicado para conteúdo de Mega CD; vazio nos demais casos.
pub fn memory_maps<E: Engine + ?Sized>(engine: &mut E) -> Vec<MemoryDescriptor> {
    if !engine.hardware().contains(Hardware::MCD) {
        return Vec::new();
    }

    let mut descs = Vec::with_capacity(2);
    let blocks = [
        (MemoryId::WorkRam, 0xFF0000, WORK_RAM_SIZE, "68KRAM"),
        (MemoryId::CdPrgRam, SCD_BIT | 0x020000, PRG_RAM_SIZE, "PRGRAM"),
    ];
    for (id, start, len, addrspace) in blocks {
        if let Some(mem) = engine.memory(id) {
            descs.push(MemoryDescriptor {
                flags: MEMDESC_SYSTEM_RAM,
                ptr: mem.as_mut_ptr(),
                offset: 0,
                start,
                select: 0,
                disconnect: 0,
                len: len.min(mem.len()),
                addrspace,
            });
        }
    }
    descs
}
