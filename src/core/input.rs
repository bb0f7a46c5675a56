//! Joypad sampling: host RetroPad buttons to Genesis pad bits.

use bitflags::bitflags;

use crate::core::host::{Host, InputDescriptor, DEVICE_JOYPAD, JOYPAD_MASK};

bitflags! {
    /// Genesis pad buttons as seen by the engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PadButtons: u16 {
        const UP    = 1 << 0;
        const DOWN  = 1 << 1;
        const LEFT  = 1 << 2;
        const RIGHT = 1 << 3;
        const B     = 1 << 4;
        const C     = 1 << 5;
        const A     = 1 << 6;
        const START = 1 << 7;
        const Z     = 1 << 8;
        const Y     = 1 << 9;
        const X     = 1 << 10;
        const MODE  = 1 << 11;
    }
}

/// Number of controller ports sampled each frame.
pub const PORTS: usize = 2;

/// Indexed by RetroPad button id (B, Y, SELECT, START, UP, DOWN, LEFT, RIGHT, A, X, L, R).
pub const PAD_MAP: [PadButtons; 12] = [
    PadButtons::B,
    PadButtons::A,
    PadButtons::MODE,
    PadButtons::START,
    PadButtons::UP,
    PadButtons::DOWN,
    PadButtons::LEFT,
    PadButtons::RIGHT,
    PadButtons::C,
    PadButtons::Y,
    PadButtons::X,
    PadButtons::Z,
];

/// Translate a RetroPad bitmask into pad bits.
pub fn map_bitmask(mask: u16) -> PadButtons {
    PAD_MAP
        .iter()
        .enumerate()
        .filter(|(id, _)| mask & (1 << id) != 0)
        .fold(PadButtons::empty(), |acc, (_, button)| acc | *button)
}

/// Sample both ports. Uses one bitmask query per port when the host supports it.
pub fn poll_pads<H: Host + ?Sized>(host: &mut H, bitmasks: bool) -> [PadButtons; PORTS] {
    let mut pads = [PadButtons::empty(); PORTS];
    for (port, pad) in pads.iter_mut().enumerate() {
        let port = port as u32;
        if bitmasks {
            let mask = host.input_state(port, DEVICE_JOYPAD, 0, JOYPAD_MASK);
            *pad = map_bitmask(mask as u16);
        } else {
            for (id, button) in PAD_MAP.iter().enumerate() {
                if host.input_state(port, DEVICE_JOYPAD, 0, id as u32) != 0 {
                    *pad |= *button;
                }
            }
        }
    }
    pads
}

const GENESIS_LABELS: [(u32, &str); 12] = [
    (6, "D-Pad Left"),
    (4, "D-Pad Up"),
    (5, "D-Pad Down"),
    (7, "D-Pad Right"),
    (0, "B"),
    (8, "C"),
    (9, "Y"),
    (1, "A"),
    (10, "X"),
    (11, "Z"),
    (2, "Mode"),
    (3, "Start"),
];

const MARK3_LABELS: [(u32, &str); 7] = [
    (6, "D-Pad Left"),
    (4, "D-Pad Up"),
    (5, "D-Pad Down"),
    (7, "D-Pad Right"),
    (0, "Button 1 Start"),
    (8, "Button 2"),
    (3, "Button Pause"),
];

/// Input descriptors for both ports; `mark3` selects the Master System layout.
pub fn descriptors(mark3: bool) -> Vec<InputDescriptor> {
    let labels: &[(u32, &str)] = if mark3 { &MARK3_LABELS } else { &GENESIS_LABELS };
    (0..PORTS as u32)
        .flat_map(|port| {
            labels.iter().map(move |&(id, description)| InputDescriptor {
                port,
                device: DEVICE_JOYPAD,
                index: 0,
                id,
                description,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MockHost;

    #[test]
    fn test_bitmask_mapping() {
        // B + START + UP
        let pad = map_bitmask((1 << 0) | (1 << 3) | (1 << 4));
        assert_eq!(pad, PadButtons::B | PadButtons::START | PadButtons::UP);

        // RetroPad A is the Genesis C button, L/R are X/Z
        assert_eq!(map_bitmask(1 << 8), PadButtons::C);
        assert_eq!(map_bitmask((1 << 10) | (1 << 11)), PadButtons::X | PadButtons::Z);

        // bits above the table are ignored
        assert_eq!(map_bitmask(1 << 12), PadButtons::empty());
    }

    #[test]
    fn test_poll_both_modes_agree() {
        let mut host = MockHost::default();
        host.buttons[0] = (1 << 1) | (1 << 7);
        host.buttons[1] = 1 << 2;

        let with_mask = poll_pads(&mut host, true);
        let per_button = poll_pads(&mut host, false);

        assert_eq!(with_mask, per_button);
        assert_eq!(with_mask[0], PadButtons::A | PadButtons::RIGHT);
        assert_eq!(with_mask[1], PadButtons::MODE);
    }

    #[test]
    fn test_descriptor_layouts() {
        assert_eq!(descriptors(false).len(), 24);
        let sms = descriptors(true);
        assert_eq!(sms.len(), 14);
        assert!(sms.iter().all(|d| d.device == DEVICE_JOYPAD));
        assert_eq!(sms[7].port, 1);
    }
}
