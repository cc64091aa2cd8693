// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
Stream router and codec bootstrap (spec.md §4.3).

Generalises the teacher's `inside_ogg::read_headers_with_ident_packet`
(which binds exactly one Vorbis stream by serial number and reads its
three headers) to up to two substreams of two different codecs, selected
by probing each beginning-of-stream page's first packet against both
codecs' identification-header parsers.
*/

use ogg::reading::{Packet, PacketReader};
use std::io::Read;

use crate::audio::AudioCodec;
use crate::config::{AudioFormat, PixelFormat, VideoFormat};
use crate::error::BootstrapError;
use crate::video::{VideoCodec, VideoIdent};

/// A bound, partially- or fully-initialised substream.
struct Bound<C> {
    serial: u32,
    codec: C,
    headers_read: u32,
}

/// Everything the worker needs to enter its steady-state loop.
pub struct Bootstrapped<V, A> {
    pub video: Option<(u32, V, VideoIdent)>,
    pub audio: Option<(u32, A)>,
    pub video_format: Option<VideoFormat>,
    pub audio_format: Option<AudioFormat>,
}

/// Reads beginning-of-stream pages until both substream slots are bound
/// (or pages stop being beginning-of-stream pages), then pumps header
/// packets until each bound codec has consumed exactly three headers.
pub fn bootstrap<R, V, A>(
    reader: &mut PacketReader<R>,
    pixel_format: PixelFormat,
) -> Result<Bootstrapped<V, A>, BootstrapError>
where
    R: Read,
    V: VideoCodec,
    A: AudioCodec,
{
    let mut video: Option<Bound<V>> = None;
    let mut audio: Option<Bound<A>> = None;
    let mut video_ident: Option<VideoIdent> = None;
    let mut audio_ident: Option<AudioFormat> = None;

    // Classify beginning-of-stream pages. The first non-BOS packet we see
    // belongs to the steady-state loop instead and is fed to whichever
    // substream(s) claim it immediately below (spec.md §4.3: "the first
    // non-beginning-of-stream page is re-queued for the steady-state
    // router").
    let mut carry: Option<Packet> = None;
    loop {
        let packet = match reader.read_packet()? {
            Some(p) => p,
            None => return Err(BootstrapError::TruncatedHeaders),
        };
        if !packet.first_in_stream() {
            carry = Some(packet);
            break;
        }

        if video.is_none() {
            if let Some(ident) = V::try_identify(&packet.data) {
                let mut codec = V::new();
                codec.feed_header(&packet.data)?;
                video = Some(Bound { serial: packet.stream_serial(), codec, headers_read: 1 });
                video_ident = Some(ident);
                continue;
            }
        }
        if audio.is_none() {
            if let Some(fmt) = A::try_identify(&packet.data) {
                let mut codec = A::new();
                codec.feed_header(&packet.data)?;
                audio = Some(Bound { serial: packet.stream_serial(), codec, headers_read: 1 });
                audio_ident = Some(fmt);
                continue;
            }
        }
        // Neither codec recognised this substream: discard it.
    }

    if video.is_none() && audio.is_none() {
        return Err(BootstrapError::NoRecognisedStream);
    }

    // Pull the remaining two header packets for each bound codec. `carry`
    // (if any) is processed as an ordinary packet first.
    let mut pending = carry;
    loop {
        let video_done = video.as_ref().map_or(true, |b| b.headers_read >= 3);
        let audio_done = audio.as_ref().map_or(true, |b| b.headers_read >= 3);
        if video_done && audio_done {
            break;
        }

        let packet = match pending.take() {
            Some(p) => p,
            None => match reader.read_packet()? {
                Some(p) => p,
                None => return Err(BootstrapError::TruncatedHeaders),
            },
        };

        if let Some(b) = video.as_mut() {
            if b.serial == packet.stream_serial() && b.headers_read < 3 {
                b.codec.feed_header(&packet.data)?;
                b.headers_read += 1;
                continue;
            }
        }
        if let Some(b) = audio.as_mut() {
            if b.serial == packet.stream_serial() && b.headers_read < 3 {
                b.codec.feed_header(&packet.data)?;
                b.headers_read += 1;
                continue;
            }
        }
        // A page belonging to neither bound stream arrived while still
        // bootstrapping; the codec libraries tolerate this, so we do too.
    }

    let video_format = if video.is_some() {
        let ident = video_ident.unwrap();
        if ident.pic_width >= 100_000 || ident.pic_height >= 100_000 {
            return Err(BootstrapError::UnreasonableDimensions {
                width: ident.pic_width,
                height: ident.pic_height,
            });
        }
        if !ident.is_420 {
            return Err(BootstrapError::UnsupportedChromaFormat);
        }
        Some(ident.to_format(pixel_format))
    } else {
        None
    };

    if let Some(b) = video.as_mut() {
        b.codec.finish_setup(video_ident.as_ref().unwrap())?;
    }

    let audio_format = audio.as_ref().and(audio_ident);

    Ok(Bootstrapped {
        video: video.map(|b| (b.serial, b.codec, video_ident.unwrap())),
        audio: audio.map(|b| (b.serial, b.codec)),
        video_format,
        audio_format,
    })
}
