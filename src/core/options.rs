// pico-retro/src/core/options.rs

//! Frontend configuration variables.
//!
//! Every option the core understands is declared once in [`DEFINITIONS`]; the
//! same table feeds `SET_VARIABLES` and the parser in [`CoreOptions::read`].

use log::warn;

use crate::core::engine::{InputDevice, Region, RenderFormat};
use crate::core::frameskip::FrameskipMode;
use crate::core::host::Host;

/// A frontend variable: key, label and accepted values (default first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDefinition {
    pub key: &'static str,
    pub description: &'static str,
    pub values: &'static [&'static str],
}

impl OptionDefinition {
    /// `"Description; a|b|c"`, the legacy variable value syntax.
    pub fn legacy_value(&self) -> String {
        format!("{}; {}", self.description, self.values.join("|"))
    }

    pub fn default_value(&self) -> &'static str {
        self.values.first().copied().unwrap_or("")
    }
}

pub const INPUT1: &str = "picodrive_input1";
pub const INPUT2: &str = "picodrive_input2";
pub const SPRITE_LIMIT: &str = "picodrive_sprlim";
pub const RAMCART: &str = "picodrive_ramcart";
pub const REGION: &str = "picodrive_region";
pub const ASPECT: &str = "picodrive_aspect";
pub const OVERSCAN: &str = "picodrive_overscan";
pub const OVERCLOCK_68K: &str = "picodrive_overclk68k";
pub const DRC: &str = "picodrive_drc";
pub const AUDIO_FILTER: &str = "picodrive_audio_filter";
pub const LOWPASS_RANGE: &str = "picodrive_lowpass_range";
pub const FRAMESKIP: &str = "picodrive_frameskip";
pub const FRAMESKIP_THRESHOLD: &str = "picodrive_frameskip_threshold";
pub const RENDERER: &str = "picodrive_renderer";
pub const SOUND_RATE: &str = "picodrive_sound_rate";

pub const DEFINITIONS: &[OptionDefinition] = &[
    OptionDefinition {
        key: INPUT1,
        description: "Input device 1",
        values: &["3 button pad", "6 button pad", "None"],
    },
    OptionDefinition {
        key: INPUT2,
        description: "Input device 2",
        values: &["3 button pad", "6 button pad", "None"],
    },
    OptionDefinition {
        key: SPRITE_LIMIT,
        description: "No sprite limit",
        values: &["disabled", "enabled"],
    },
    OptionDefinition {
        key: RAMCART,
        description: "MegaCD RAM cart",
        values: &["disabled", "enabled"],
    },
    OptionDefinition {
        key: REGION,
        description: "Region",
        values: &["Auto", "Japan NTSC", "Japan PAL", "US", "Europe"],
    },
    OptionDefinition {
        key: ASPECT,
        description: "Core-provided aspect ratio",
        values: &["PAR", "4/3", "CRT"],
    },
    OptionDefinition {
        key: OVERSCAN,
        description: "Show Overscan",
        values: &["disabled", "enabled"],
    },
    OptionDefinition {
        key: OVERCLOCK_68K,
        description: "68K Overclock",
        values: &["disabled", "+25%", "+50%", "+75%", "+100%", "+200%", "+400%"],
    },
    OptionDefinition {
        key: DRC,
        description: "Dynamic recompilers",
        values: &["enabled", "disabled"],
    },
    OptionDefinition {
        key: AUDIO_FILTER,
        description: "Audio filter",
        values: &["disabled", "low-pass"],
    },
    OptionDefinition {
        key: LOWPASS_RANGE,
        description: "Low-pass filter %",
        values: &[
            "60", "65", "70", "75", "80", "85", "90", "95", "5", "10", "15", "20", "25", "30",
            "35", "40", "45", "50", "55",
        ],
    },
    OptionDefinition {
        key: FRAMESKIP,
        description: "Frameskip",
        values: &["disabled", "auto", "manual"],
    },
    OptionDefinition {
        key: FRAMESKIP_THRESHOLD,
        description: "Frameskip Threshold (%)",
        values: &[
            "33", "36", "39", "42", "45", "48", "51", "54", "57", "60", "15", "18", "21", "24",
            "27", "30",
        ],
    },
    OptionDefinition {
        key: RENDERER,
        description: "Renderer",
        values: &["accurate", "good", "fast"],
    },
    OptionDefinition {
        key: SOUND_RATE,
        description: "Sound quality",
        values: &["44100", "16000", "22050", "32000"],
    },
];

/// Default sample rate before the sound-rate variable is read.
pub const DEFAULT_SOUND_RATE: u32 = 44100;
pub const DEFAULT_FRAMESKIP_THRESHOLD: u32 = 33;
pub const DEFAULT_LOWPASS_PERCENT: u32 = 60;

pub const ASPECT_PAR: f32 = 0.0;
pub const ASPECT_4_3: f32 = 224.0 * (4.0 / 3.0);
pub const ASPECT_CRT: f32 = 224.0 * 1.29911;

/// Parsed snapshot of the frontend variables.
///
/// `None` means the host did not answer for that key; the core then keeps the
/// engine's current setting, except where a default is documented on the field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoreOptions {
    pub input: [Option<InputDevice>; 2],
    pub sprite_limit_disabled: Option<bool>,
    pub ramcart: Option<bool>,
    pub region: Option<Region>,
    pub aspect_width: Option<f32>,
    /// Defaults to off.
    pub overscan: bool,
    pub overclock_68k: Option<u32>,
    pub drc: Option<bool>,
    /// Defaults to off.
    pub lowpass_filter: bool,
    /// Defaults to 60%.
    pub lowpass_percent: u32,
    /// Defaults to disabled.
    pub frameskip: FrameskipMode,
    /// Defaults to 33.
    pub frameskip_threshold: u32,
    pub renderer: Option<RenderFormat>,
    pub sound_rate: Option<u32>,
}

impl CoreOptions {
    /// Query every variable from the host.
    pub fn read<H: Host + ?Sized>(host: &mut H) -> Self {
        let mut get = |key: &str| host.variable(key);

        Self {
            input: [
                get(INPUT1).map(|v| parse_input_device(&v)),
                get(INPUT2).map(|v| parse_input_device(&v)),
            ],
            sprite_limit_disabled: get(SPRITE_LIMIT).map(|v| v == "enabled"),
            ramcart: get(RAMCART).map(|v| v == "enabled"),
            region: get(REGION).and_then(|v| parse_region(&v)),
            aspect_width: get(ASPECT).map(|v| parse_aspect(&v)),
            overscan: get(OVERSCAN).map_or(false, |v| v == "enabled"),
            overclock_68k: get(OVERCLOCK_68K).map(|v| parse_overclock(&v)),
            drc: get(DRC).map(|v| v == "enabled"),
            lowpass_filter: get(AUDIO_FILTER).map_or(false, |v| v == "low-pass"),
            lowpass_percent: get(LOWPASS_RANGE)
                .map_or(DEFAULT_LOWPASS_PERCENT, |v| leading_number(&v)),
            frameskip: get(FRAMESKIP).map_or(FrameskipMode::Disabled, |v| parse_frameskip(&v)),
            frameskip_threshold: get(FRAMESKIP_THRESHOLD)
                .map_or(DEFAULT_FRAMESKIP_THRESHOLD, |v| leading_number(&v)),
            renderer: get(RENDERER).and_then(|v| parse_renderer(&v)),
            sound_rate: get(SOUND_RATE).map(|v| leading_number(&v)),
        }
    }

    /// Low-pass filter coefficient in 16.16 fixed point.
    pub fn lowpass_alpha(&self) -> u32 {
        self.lowpass_percent.min(100) * 0x10000 / 100
    }
}

pub fn parse_input_device(name: &str) -> InputDevice {
    match name {
        "3 button pad" => InputDevice::Pad3Button,
        "6 button pad" => InputDevice::Pad6Button,
        "None" => InputDevice::Nothing,
        _ => {
            warn!("invalid picodrive_input: '{}'", name);
            InputDevice::Pad3Button
        }
    }
}

/// Unknown names leave the override untouched.
pub fn parse_region(name: &str) -> Option<Region> {
    match name {
        "Auto" => Some(Region::Auto),
        "Japan NTSC" => Some(Region::JapanNtsc),
        "Japan PAL" => Some(Region::JapanPal),
        "US" => Some(Region::Usa),
        "Europe" => Some(Region::Europe),
        _ => None,
    }
}

pub fn parse_aspect(name: &str) -> f32 {
    match name {
        "4/3" => ASPECT_4_3,
        "CRT" => ASPECT_CRT,
        _ => ASPECT_PAR,
    }
}

/// `"+50%"` is 50; anything not starting with `+` turns overclocking off.
pub fn parse_overclock(value: &str) -> u32 {
    value.strip_prefix('+').map_or(0, leading_number)
}

pub fn parse_frameskip(value: &str) -> FrameskipMode {
    match value {
        "auto" => FrameskipMode::Auto,
        "manual" => FrameskipMode::Manual,
        _ => FrameskipMode::Disabled,
    }
}

pub fn parse_renderer(value: &str) -> Option<RenderFormat> {
    match value {
        "fast" => Some(RenderFormat::Fast),
        "good" => Some(RenderFormat::Good),
        "accurate" => Some(RenderFormat::Accurate),
        _ => None,
    }
}

/// Decimal digits at the start of `value` (0 when there are none).
pub fn leading_number(value: &str) -> u32 {
    value
        .trim_start()
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u32, |acc, b| acc.saturating_mul(10).saturating_add(u32::from(b - b'0')))
}
