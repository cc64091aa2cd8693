// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
The background worker (spec.md §4.4, §5).

One dedicated thread: it owns the byte source, the sync buffer, both
codec contexts, and the frame/sample counters outright, and touches
shared state only through `Queues` and the halt flag. It never surfaces
an error to a client through the queues; it just stops, and records
`FailureKind` for `had_error` to report afterwards (spec.md §7).
*/

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ogg::reading::PacketReader;

use crate::audio::AudioCodec;
use crate::config::{AudioFormat, Config, VideoFormat};
use crate::error::FailureKind;
use crate::pixel;
use crate::queue::Queues;
use crate::router::bootstrap;
use crate::video::{VideoCodec, VideoDecodeOutcome};

/// One decoded video frame, timestamped and already converted to the
/// configured output layout (spec.md §3).
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub play_ms: u64,
    pub width: u32,
    pub height: u32,
    pub pixel_format: crate::config::PixelFormat,
    pub data: Vec<u8>,
}

/// One decoded, interleaved audio packet (spec.md §3).
#[derive(Debug, Clone)]
pub struct AudioPacket {
    pub play_ms: u64,
    pub channels: u32,
    pub frames: u32,
    pub samples: Vec<f32>,
}

pub struct Shared {
    pub queues: Queues<VideoFrame, AudioPacket>,
    pub halt: AtomicBool,
    pub done: AtomicBool,
    pub failure: std::sync::Mutex<FailureKind>,
    pub video_format: std::sync::Mutex<Option<VideoFormat>>,
    pub audio_format: std::sync::Mutex<Option<AudioFormat>>,
}

impl Shared {
    pub fn new() -> Self {
        Shared {
            queues: Queues::new(),
            halt: AtomicBool::new(false),
            done: AtomicBool::new(false),
            failure: std::sync::Mutex::new(FailureKind::None),
            video_format: std::sync::Mutex::new(None),
            audio_format: std::sync::Mutex::new(None),
        }
    }

    fn mark_failed(&self, kind: FailureKind) {
        *self.failure.lock().unwrap() = kind;
    }
}

/// Runs to completion on the caller's (worker) thread. Returns only once
/// the input is exhausted, a fatal error occurs, or `shared.halt` is set.
pub fn run<R, V, A>(mut reader: PacketReader<R>, config: Config, shared: Arc<Shared>)
where
    R: Read,
    V: VideoCodec,
    A: AudioCodec,
{
    let bootstrapped = match bootstrap::<R, V, A>(&mut reader, config.output_pixel_format) {
        Ok(b) => b,
        Err(_) => {
            shared.mark_failed(FailureKind::Bootstrap);
            shared.done.store(true, Ordering::Release);
            return;
        }
    };

    let video_format = bootstrapped.video_format;
    let audio_format = bootstrapped.audio_format;
    *shared.video_format.lock().unwrap() = video_format;
    *shared.audio_format.lock().unwrap() = audio_format;

    let (video_serial, mut video_codec) = match bootstrapped.video {
        Some((serial, codec, _ident)) => (Some(serial), Some(codec)),
        None => (None, None),
    };
    let (audio_serial, mut audio_codec) = match bootstrapped.audio {
        Some((serial, codec)) => (Some(serial), Some(codec)),
        None => (None, None),
    };

    let mut video_frames: u64 = 0;
    let mut audio_frames: u64 = 0;
    let fps = video_format.map(|f| f.fps()).unwrap_or(0.0);
    let sample_rate = audio_format.map(|f| f.sample_rate).unwrap_or(0);

    // Pages for the two substreams are interleaved in the Ogg container, so
    // a page pulled while serving one phase often belongs to the other;
    // each phase stashes what it isn't looking for instead of dropping it.
    let mut video_pending: Option<Vec<u8>> = None;
    let mut audio_pending: Option<Vec<u8>> = None;

    'outer: while !shared.halt.load(Ordering::Acquire) {
        let mut need_pages = false;
        let mut produced_video = false;

        // Audio phase: feed every ready Vorbis packet this iteration.
        if let (Some(serial), Some(codec)) = (audio_serial, audio_codec.as_mut()) {
            loop {
                if shared.halt.load(Ordering::Acquire) {
                    break 'outer;
                }
                let packet = match next_packet_for(
                    &mut reader,
                    serial,
                    &mut audio_pending,
                    video_serial,
                    &mut video_pending,
                ) {
                    PacketFor::Packet(p) => p,
                    PacketFor::NeedPages => {
                        need_pages = true;
                        break;
                    }
                    PacketFor::Eof => break 'outer,
                    PacketFor::Error => {
                        shared.mark_failed(FailureKind::Decode);
                        break 'outer;
                    }
                };
                let frames = match codec.decode_packet(&packet) {
                    Ok(frames) => frames,
                    Err(_) => {
                        shared.mark_failed(FailureKind::Decode);
                        break 'outer;
                    }
                };
                if frames.is_empty() || frames[0].is_empty() {
                    continue;
                }
                let channel_count = frames.len();
                let frame_count = frames[0].len();
                let play_ms = if sample_rate == 0 {
                    0
                } else {
                    (audio_frames * 1000) / sample_rate as u64
                };
                let mut samples = Vec::with_capacity(frame_count * channel_count);
                for frame_idx in 0..frame_count {
                    for channel in frames.iter() {
                        samples.push(channel[frame_idx]);
                    }
                }
                audio_frames += frame_count as u64;
                shared.queues.push_audio(AudioPacket {
                    play_ms,
                    channels: channel_count as u32,
                    frames: frame_count as u32,
                    samples,
                });
                break;
            }
        }

        // Video phase: feed exactly one Theora packet.
        if let (Some(serial), Some(codec)) = (video_serial, video_codec.as_mut()) {
            if shared.halt.load(Ordering::Acquire) {
                break 'outer;
            }
            match next_packet_for(&mut reader, serial, &mut video_pending, audio_serial, &mut audio_pending) {
                PacketFor::Packet(packet) => match codec.decode_packet(&packet) {
                    Ok(VideoDecodeOutcome::Duplicate) => {
                        video_frames += 1;
                    }
                    Ok(VideoDecodeOutcome::Frame(frame)) => {
                        let fmt = video_format.unwrap();
                        let play_ms = if fps == 0.0 { 0 } else { ((video_frames as f64 / fps) * 1000.0) as u64 };
                        let data = pixel::convert(&frame, fmt.width, fmt.height, config.output_pixel_format);
                        shared.queues.push_video(VideoFrame {
                            play_ms,
                            width: fmt.width,
                            height: fmt.height,
                            pixel_format: config.output_pixel_format,
                            data,
                        });
                        video_frames += 1;
                        produced_video = true;
                    }
                    Err(_) => {
                        shared.mark_failed(FailureKind::Decode);
                        break 'outer;
                    }
                },
                PacketFor::NeedPages => need_pages = true,
                PacketFor::Eof => break 'outer,
                PacketFor::Error => {
                    shared.mark_failed(FailureKind::Decode);
                    break 'outer;
                }
            }
        }

        if need_pages {
            match reader.read_packet() {
                Ok(Some(packet)) => {
                    let serial = packet.stream_serial();
                    if Some(serial) == video_serial {
                        video_pending = Some(packet.data);
                    } else if Some(serial) == audio_serial {
                        audio_pending = Some(packet.data);
                    }
                }
                Ok(None) => break 'outer,
                Err(_) => {
                    shared.mark_failed(FailureKind::Decode);
                    break 'outer;
                }
            }
        }

        if produced_video {
            shared.queues.wait_for_space(config.max_buffered_video_frames, &shared.halt);
        }
    }

    shared.done.store(true, Ordering::Release);
}

enum PacketFor {
    Packet(Vec<u8>),
    NeedPages,
    Eof,
    Error,
}

/// Pulls the next packet belonging to `serial`, checking `own_pending`
/// first and reading a fresh page only if it's empty. A freshly read page
/// belonging to `other_serial` is stashed in `other_pending` rather than
/// dropped, since the two substreams' pages are interleaved in the
/// container (spec.md §4.4: page replenishment is a distinct step shared
/// by both phases).
fn next_packet_for<R: Read>(
    reader: &mut PacketReader<R>,
    serial: u32,
    own_pending: &mut Option<Vec<u8>>,
    other_serial: Option<u32>,
    other_pending: &mut Option<Vec<u8>>,
) -> PacketFor {
    if let Some(data) = own_pending.take() {
        return PacketFor::Packet(data);
    }
    match reader.read_packet() {
        Ok(Some(packet)) => {
            let packet_serial = packet.stream_serial();
            if packet_serial == serial {
                PacketFor::Packet(packet.data)
            } else {
                if Some(packet_serial) == other_serial {
                    *other_pending = Some(packet.data);
                }
                PacketFor::NeedPages
            }
        }
        Ok(None) => PacketFor::Eof,
        Err(_) => PacketFor::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PixelFormat;
    use crate::error::BootstrapError;
    use crate::pixel::{Plane, YCbCrFrame};
    use std::sync::Mutex;

    /// A fake Theora codec that hands back a fixed number of solid-colour
    /// frames, one per `decode_packet` call, then duplicates forever.
    struct FixedVideo {
        remaining: u32,
        y: Vec<u8>,
        cb: Vec<u8>,
        cr: Vec<u8>,
    }

    impl VideoCodec for FixedVideo {
        fn try_identify(packet: &[u8]) -> Option<crate::video::VideoIdent> {
            if packet == b"theora-ident" {
                Some(crate::video::VideoIdent {
                    frame_width: 4,
                    frame_height: 4,
                    pic_width: 4,
                    pic_height: 4,
                    pic_x: 0,
                    pic_y: 0,
                    fps_numerator: 30,
                    fps_denominator: 1,
                    is_420: true,
                })
            } else {
                None
            }
        }

        fn new() -> Self {
            FixedVideo { remaining: 3, y: vec![128; 16], cb: vec![128; 4], cr: vec![128; 4] }
        }

        fn feed_header(&mut self, _packet: &[u8]) -> Result<(), BootstrapError> {
            Ok(())
        }

        fn finish_setup(&mut self, _ident: &crate::video::VideoIdent) -> Result<(), BootstrapError> {
            Ok(())
        }

        fn decode_packet(&mut self, _packet: &[u8]) -> Result<VideoDecodeOutcome<'_>, crate::error::DecodeError> {
            if self.remaining == 0 {
                return Ok(VideoDecodeOutcome::Duplicate);
            }
            self.remaining -= 1;
            Ok(VideoDecodeOutcome::Frame(YCbCrFrame {
                y: Plane { data: &self.y, stride: 4 },
                cb: Plane { data: &self.cb, stride: 2 },
                cr: Plane { data: &self.cr, stride: 2 },
                y_offset: 0,
                chroma_origin_x: 0,
                chroma_origin_y: 0,
            }))
        }
    }

    #[test]
    fn test_video_timestamps_are_nondecreasing_with_fixed_fps() {
        // Exercise the timestamp formula directly: with fps=30 frames at
        // indices 0..90 should land near 0, 33, 66, ... ms.
        let fps = 30.0f64;
        let mut last = 0u64;
        for n in 0u64..90 {
            let play_ms = ((n as f64 / fps) * 1000.0) as u64;
            assert!(play_ms >= last);
            last = play_ms;
        }
        let play_ms_89 = ((89.0 / fps) * 1000.0) as u64;
        assert!((play_ms_89 as i64 - 2966).abs() <= 1);
    }

    #[test]
    fn test_audio_interleave_iterates_frames_outer_channels_inner() {
        // Regression for spec.md's Open Question: two channels, three
        // frames, must interleave to [L0,R0,L1,R1,L2,R2], not just the
        // first `channels` frames repeated.
        let channels: Vec<Vec<f32>> = vec![vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]];
        let frame_count = channels[0].len();
        let mut samples = Vec::with_capacity(frame_count * channels.len());
        for frame_idx in 0..frame_count {
            for channel in channels.iter() {
                samples.push(channel[frame_idx]);
            }
        }
        assert_eq!(samples, vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
    }

    #[test]
    fn test_fixed_video_codec_produces_then_duplicates() {
        let mut codec = FixedVideo::new();
        let mut frame_count = 0;
        for _ in 0..5 {
            match codec.decode_packet(&[]).unwrap() {
                VideoDecodeOutcome::Frame(_) => frame_count += 1,
                VideoDecodeOutcome::Duplicate => {}
            }
        }
        assert_eq!(frame_count, 3);
    }

    #[test]
    fn test_shared_failure_starts_as_none() {
        let shared = Shared::new();
        assert_eq!(*shared.failure.lock().unwrap(), FailureKind::None);
        assert!(!shared.done.load(Ordering::Acquire));
    }

    #[allow(dead_code)]
    fn unused_pixel_format_is_yv12_by_default() {
        let _ = Mutex::new(PixelFormat::Yv12);
    }
}
