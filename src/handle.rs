// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
The public decoder handle (spec.md §4.1, §7).

`DecoderHandle` is the only type a client touches. It owns the worker
thread's `JoinHandle` and an `Arc<Shared>`; every query method is a
cheap lock/load against that shared state, never a message round-trip
to the worker.
*/

use std::io::Read;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use ogg::reading::PacketReader;

use crate::audio::{AudioCodec, VorbisBackend};
use crate::config::{AudioFormat, Config, VideoFormat};
use crate::error::OpenError;
use crate::source::RetryingReader;
use crate::video::{TheoraBackend, VideoCodec};
use crate::worker::{self, AudioPacket, Shared, VideoFrame};

/// A live decode in progress: a background thread feeding two output
/// queues, plus the handful of synchronised fields a client can poll
/// (spec.md §4.1's operation list).
pub struct DecoderHandle {
    shared: Arc<Shared>,
    join: Option<JoinHandle<()>>,
}

impl DecoderHandle {
    /// Opens `source`, spawns the worker thread, and returns immediately;
    /// bootstrap (the three-header handshake) happens on the worker
    /// thread, not here (spec.md §4.1: "does not block waiting on the
    /// stream to identify itself").
    pub fn start<R>(source: R, config: Config) -> Result<Self, OpenError>
    where
        R: Read + Send + 'static,
    {
        Self::start_with_codecs::<R, TheoraBackend, VorbisBackend>(source, config)
    }

    /// As [`start`](Self::start), but generic over the codec backends.
    /// Exposed so tests can drive the worker with synthetic codecs; real
    /// callers should use [`start`](Self::start).
    pub fn start_with_codecs<R, V, A>(source: R, config: Config) -> Result<Self, OpenError>
    where
        R: Read + Send + 'static,
        V: VideoCodec + Send + 'static,
        A: AudioCodec + Send + 'static,
    {
        let reader = PacketReader::new(RetryingReader::new(source));
        let shared = Arc::new(Shared::new());
        let worker_shared = shared.clone();

        let join = std::thread::Builder::new()
            .name("oggav-worker".into())
            .spawn(move || worker::run::<_, V, A>(reader, config, worker_shared))
            .map_err(OpenError::SpawnFailed)?;

        Ok(DecoderHandle { shared, join: Some(join) })
    }

    /// True until the worker has exhausted the input, hit a fatal error,
    /// or been stopped (spec.md §4.1).
    pub fn is_decoding(&self) -> bool {
        !self.shared.done.load(Ordering::Acquire)
    }

    /// Pops the oldest buffered video frame, if any.
    pub fn get_video(&self) -> Option<VideoFrame> {
        self.shared.queues.pop_video()
    }

    /// Pops the oldest buffered audio packet, if any.
    pub fn get_audio(&self) -> Option<AudioPacket> {
        self.shared.queues.pop_audio()
    }

    /// Releases one item returned by [`get_video`](Self::get_video)
    /// (spec.md §4.1's `free_video`: "must be called for every item
    /// returned by get_*"). Ownership already makes this the caller's
    /// to drop; the method exists so the public surface matches spec.md's
    /// operation list literally.
    pub fn free_video(&self, _item: VideoFrame) {}

    /// Releases one item returned by [`get_audio`](Self::get_audio).
    pub fn free_audio(&self, _item: AudioPacket) {}

    /// True once the worker has recorded a bootstrap or decode failure.
    pub fn had_error(&self) -> bool {
        *self.shared.failure.lock().unwrap() != crate::error::FailureKind::None
    }

    /// Video geometry and rate, once bootstrap has completed. `None`
    /// before that, or if the input carries no video substream.
    pub fn video_format(&self) -> Option<VideoFormat> {
        *self.shared.video_format.lock().unwrap()
    }

    /// Channel count and sample rate, once bootstrap has completed.
    /// `None` before that, or if the input carries no audio substream.
    pub fn audio_format(&self) -> Option<AudioFormat> {
        *self.shared.audio_format.lock().unwrap()
    }

    /// Signals the worker to stop at its next loop boundary, drains both
    /// queues, and joins the worker thread (spec.md §4.1's `stop`).
    pub fn stop(mut self) {
        self.shared.halt.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        self.shared.queues.drain();
    }
}

impl Drop for DecoderHandle {
    fn drop(&mut self) {
        self.shared.halt.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PixelFormat;
    use crate::error::{BootstrapError, DecodeError};
    use crate::video::VideoDecodeOutcome;

    /// A codec that never identifies anything, driving bootstrap straight
    /// to `NoRecognisedStream` once the (empty) input runs out.
    struct NeverIdentifies;

    impl VideoCodec for NeverIdentifies {
        fn try_identify(_packet: &[u8]) -> Option<crate::video::VideoIdent> {
            None
        }
        fn new() -> Self {
            NeverIdentifies
        }
        fn feed_header(&mut self, _packet: &[u8]) -> Result<(), BootstrapError> {
            Ok(())
        }
        fn finish_setup(&mut self, _ident: &crate::video::VideoIdent) -> Result<(), BootstrapError> {
            Ok(())
        }
        fn decode_packet(&mut self, _packet: &[u8]) -> Result<VideoDecodeOutcome<'_>, DecodeError> {
            Ok(VideoDecodeOutcome::Duplicate)
        }
    }

    impl AudioCodec for NeverIdentifies {
        fn try_identify(_packet: &[u8]) -> Option<AudioFormat> {
            None
        }
        fn new() -> Self {
            NeverIdentifies
        }
        fn feed_header(&mut self, _packet: &[u8]) -> Result<(), BootstrapError> {
            Ok(())
        }
        fn decode_packet(&mut self, _packet: &[u8]) -> Result<Vec<Vec<f32>>, DecodeError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_empty_input_reports_bootstrap_error_and_stops() {
        let handle =
            DecoderHandle::start_with_codecs::<_, NeverIdentifies, NeverIdentifies>(&b""[..], Config::default())
                .unwrap();
        // The worker thread runs to completion almost immediately on empty
        // input; give it a moment, then assert on its terminal state.
        for _ in 0..200 {
            if !handle.is_decoding() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(!handle.is_decoding());
        assert!(handle.had_error());
        assert!(handle.get_video().is_none());
        assert!(handle.get_audio().is_none());
        handle.stop();
    }

    #[test]
    fn test_pixel_format_default_is_yv12() {
        assert_eq!(Config::default().output_pixel_format, PixelFormat::Yv12);
    }
}
