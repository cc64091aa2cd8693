// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
Error types for the decode pipeline.

Mirrors the shape of a small hand-rolled error hierarchy: one enum per
layer (`BootstrapError`, `DecodeError`), plus a top level type that wraps
both for anything that needs to talk across layers. None of these ever
reach a client through the queues (see the crate root docs); they exist
so the worker thread can decide what to record in its single `FailureKind`
before exiting.
*/

use std::fmt;
use std::io;

/// Failure opening the byte source. Returned synchronously by `start`.
#[derive(Debug)]
pub enum OpenError {
    /// The path could not be opened for reading.
    Io(io::Error),
    /// The worker thread could not be spawned.
    SpawnFailed(io::Error),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpenError::Io(e) => write!(f, "could not open input: {}", e),
            OpenError::SpawnFailed(e) => write!(f, "could not spawn decode worker: {}", e),
        }
    }
}

impl std::error::Error for OpenError {}

impl From<io::Error> for OpenError {
    fn from(e: io::Error) -> Self {
        OpenError::Io(e)
    }
}

/// Failure during the three-header bootstrap handshake (spec.md §4.3).
#[derive(Debug)]
pub enum BootstrapError {
    /// Neither a Theora nor a Vorbis beginning-of-stream page was found.
    NoRecognisedStream,
    /// A header packet was rejected by the codec that claimed the stream.
    RejectedHeader,
    /// The byte source ran out before all three headers of a bound
    /// substream arrived.
    TruncatedHeaders,
    /// Frame dimensions were absurd (width or height >= 100000).
    UnreasonableDimensions { width: u32, height: u32 },
    /// The Theora stream uses a chroma subsampling other than 4:2:0.
    UnsupportedChromaFormat,
    /// The underlying Ogg container could not be parsed.
    Ogg(ogg::OggReadError),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BootstrapError::NoRecognisedStream =>
                write!(f, "no Theora or Vorbis beginning-of-stream page found"),
            BootstrapError::RejectedHeader =>
                write!(f, "codec rejected a header packet"),
            BootstrapError::TruncatedHeaders =>
                write!(f, "input ended before all header packets arrived"),
            BootstrapError::UnreasonableDimensions { width, height } =>
                write!(f, "frame dimensions {}x{} exceed the supported range", width, height),
            BootstrapError::UnsupportedChromaFormat =>
                write!(f, "only 4:2:0 chroma subsampling is supported"),
            BootstrapError::Ogg(e) => write!(f, "ogg container error: {}", e),
        }
    }
}

impl std::error::Error for BootstrapError {}

impl From<ogg::OggReadError> for BootstrapError {
    fn from(e: ogg::OggReadError) -> Self {
        BootstrapError::Ogg(e)
    }
}

/// Failure while decoding a packet in the steady-state loop (spec.md §4.4).
#[derive(Debug)]
pub enum DecodeError {
    /// The codec rejected a packet outright.
    Rejected,
    /// Allocation of an output item failed.
    OutOfMemory,
    /// The underlying Ogg container could not be parsed.
    Ogg(ogg::OggReadError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::Rejected => write!(f, "codec rejected a packet"),
            DecodeError::OutOfMemory => write!(f, "allocation failure building an output item"),
            DecodeError::Ogg(e) => write!(f, "ogg container error: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<ogg::OggReadError> for DecodeError {
    fn from(e: ogg::OggReadError) -> Self {
        DecodeError::Ogg(e)
    }
}

/// The reason the worker thread stopped producing items.
///
/// This is worker-private bookkeeping; the only thing a client observes
/// is `DecoderHandle::had_error`, which is `kind != FailureKind::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Still running, or ran to completion with no error.
    None,
    Bootstrap,
    Decode,
}
