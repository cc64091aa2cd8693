// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
Background-threaded Ogg Theora/Vorbis decoder.

[`DecoderHandle::start`] spawns one worker thread per open stream. The
worker demuxes Ogg pages, bootstraps up to one Theora and one Vorbis
substream by reading their three mandatory headers, then alternates
between decoding a Vorbis packet and a Theora packet, pushing finished
items onto two FIFOs the client drains with [`DecoderHandle::get_video`]
and [`DecoderHandle::get_audio`]. The worker throttles itself against
the video queue so an idle client cannot make it buffer without bound.

Ogg demuxing is provided by the `ogg` crate and Vorbis decoding by the
`lewton` crate; both are used as opaque codec libraries. Theora
decoding has no equivalent published wrapper, so it is reached through a
small hand-written binding (`theora_sys`) directly over `libtheoradec`.

No item enqueued on either FIFO ever carries an error: a failure during
bootstrap or steady-state decoding stops the worker outright, and is
visible afterwards only through [`DecoderHandle::had_error`].
*/

mod audio;
mod config;
mod error;
mod handle;
mod pixel;
mod queue;
mod router;
mod source;
mod theora_sys;
mod video;
mod worker;

pub use audio::{AudioCodec, VorbisBackend};
pub use config::{AudioFormat, Config, PixelFormat, VideoFormat, DEFAULT_MAX_BUFFERED_VIDEO_FRAMES};
pub use error::{BootstrapError, DecodeError, FailureKind, OpenError};
pub use handle::DecoderHandle;
pub use pixel::{Plane, YCbCrFrame};
pub use video::{TheoraBackend, VideoCodec, VideoDecodeOutcome, VideoIdent};
pub use worker::{AudioPacket, VideoFrame};
