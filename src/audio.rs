// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
Vorbis codec seam (spec.md §4.3, §4.4), backed by the real `lewton` crate.

`lewton::audio::read_audio_packet_generic::<Vec<Vec<f32>>>` decodes one
packet straight to per-channel deinterleaved samples (no separate
`pcmout`/`synthesis` staging the way libvorbis's C API works). The
non-generic `read_audio_packet` hardcodes `i16` output; spec.md §6 needs
32-bit float, so this goes through the generic entry point instead,
which accepts `Vec<Vec<f32>>` via `impl Sample for f32` /
`impl<S: Sample> Samples for Vec<Vec<S>>`. spec.md §4.4 describes the
libvorbis two-step "drain, then feed" shape, so the steady-state audio
phase in `worker.rs` collapses that to "feed one packet, get its frames
back immediately" while keeping the externally observable behaviour
(batched, timestamped `AudioPacket` items) identical.
*/

use crate::config::AudioFormat;
use crate::error::{BootstrapError, DecodeError};
use lewton::audio::{read_audio_packet_generic, PreviousWindowRight};
use lewton::header::{read_header_comment, read_header_ident, read_header_setup, IdentHeader, SetupHeader};

/// The capability seam a Vorbis decode context must provide. Implemented
/// for real by [`VorbisBackend`]; implemented by a synthetic fixture in
/// `worker`'s test module so the producer loop can be exercised without a
/// real Vorbis bitstream.
pub trait AudioCodec: Sized {
    fn try_identify(packet: &[u8]) -> Option<AudioFormat>;

    fn new() -> Self;

    /// Feeds one of the three mandatory header packets, in order
    /// (identification, comment, setup).
    fn feed_header(&mut self, packet: &[u8]) -> Result<(), BootstrapError>;

    /// Decodes one packet, returning its per-channel deinterleaved
    /// samples. May return zero frames for the very first packet after
    /// headers, while the decoder's overlap window fills.
    fn decode_packet(&mut self, packet: &[u8]) -> Result<Vec<Vec<f32>>, DecodeError>;
}

/// Real implementation, backed by `lewton`.
pub struct VorbisBackend {
    headers_read: u8,
    ident: Option<IdentHeader>,
    setup: Option<SetupHeader>,
    window: PreviousWindowRight,
}

impl AudioCodec for VorbisBackend {
    fn try_identify(packet: &[u8]) -> Option<AudioFormat> {
        let ident = read_header_ident(packet).ok()?;
        Some(AudioFormat { channels: ident.audio_channels as u32, sample_rate: ident.audio_sample_rate })
    }

    fn new() -> Self {
        VorbisBackend { headers_read: 0, ident: None, setup: None, window: PreviousWindowRight::new() }
    }

    fn feed_header(&mut self, packet: &[u8]) -> Result<(), BootstrapError> {
        match self.headers_read {
            0 => {
                let ident = read_header_ident(packet).map_err(|_| BootstrapError::RejectedHeader)?;
                self.ident = Some(ident);
            }
            1 => {
                read_header_comment(packet).map_err(|_| BootstrapError::RejectedHeader)?;
            }
            2 => {
                let ident = self.ident.as_ref().ok_or(BootstrapError::TruncatedHeaders)?;
                let setup = read_header_setup(packet, ident.audio_channels, (ident.blocksize_0, ident.blocksize_1))
                    .map_err(|_| BootstrapError::RejectedHeader)?;
                self.setup = Some(setup);
            }
            _ => return Err(BootstrapError::RejectedHeader),
        }
        self.headers_read += 1;
        Ok(())
    }

    fn decode_packet(&mut self, packet: &[u8]) -> Result<Vec<Vec<f32>>, DecodeError> {
        let ident = self.ident.as_ref().expect("headers read before steady state");
        let setup = self.setup.as_ref().expect("headers read before steady state");
        read_audio_packet_generic::<Vec<Vec<f32>>>(ident, setup, packet, &mut self.window)
            .map_err(|_| DecodeError::Rejected)
    }
}
