// pico-retro/src/core/audio.rs

//! Forward engine audio to the host.

use log::trace;

use crate::core::host::Host;

/// One interleaved stereo frame.
pub type StereoFrame = [i16; 2];

/// View interleaved samples as stereo frames, dropping a trailing odd sample.
pub fn frames(samples: &[i16]) -> &[StereoFrame] {
    let even = samples.len() & !1;
    bytemuck::cast_slice(&samples[..even])
}

/// Push every frame to the host, retrying while it makes progress.
///
/// Returns the number of frames accepted.
pub fn forward<H: Host + ?Sized>(host: &mut H, samples: &[i16]) -> usize {
    let mut pending = frames(samples);
    let mut sent = 0;

    while !pending.is_empty() {
        let taken = host.audio_sample_batch(bytemuck::cast_slice(pending)).min(pending.len());
        if taken == 0 {
            trace!("audio: host dropped {} frames", pending.len());
            break;
        }
        sent += taken;
        pending = &pending[taken..];
    }
    sent
}
