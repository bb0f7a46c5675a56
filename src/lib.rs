// Este é o ponto de entrada principal da biblioteca.
// O engine de emulação fica do lado de fora: este crate só adapta o ciclo de
// vida do libretro para a API estreita definida em `core::engine::Engine`.

// Módulos principais do projeto.
pub mod core;
pub mod platform;

// A implementação da API libretro (tipos C, host e macro de exportação).
pub mod libretro;

// Re-exportações para facilitar o uso.
pub use crate::core::engine::{Engine, EngineError, EngineSink, MediaError, MediaKind};
pub use crate::core::host::Host;
pub use crate::core::Core;
pub use crate::platform::{ExecMemory, NativeMemory};

/// Versão do adaptador.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nome reportado ao frontend.
pub const LIBRARY_NAME: &str = "PicoDrive";

/// Versão reportada ao frontend (inclui a revisão git quando disponível).
pub const LIBRARY_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    env!("PICO_RETRO_GIT_SUFFIX")
);

/// Extensões de conteúdo aceitas.
pub const VALID_EXTENSIONS: &str = "bin|gen|smd|md|32x|cue|iso|chd|sms|m3u|68k|sgd";
