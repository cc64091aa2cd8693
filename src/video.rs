// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
Theora codec seam (spec.md §4.3, §4.4), backed by the real `libtheoradec`
C library through the hand-written bindings in [`crate::theora_sys`].

No published Rust crate wraps Theora decoding the way `lewton` wraps
Vorbis, so `TheoraBackend` talks to the reference C decoder directly —
the same shape the teacher's own `dev/cmp/Cargo.toml` uses for `vorbis =
"0.1"` (a thin FFI crate over `libvorbis`), just without an existing
published crate to depend on for the video side. `VideoCodec` is the
capability seam itself, so the steady-state loop in `worker.rs` can be
driven by a fake implementation in tests without linking a real decoder.
*/

use std::os::raw::c_int;
use std::ptr;

use crate::config::VideoFormat;
use crate::error::{BootstrapError, DecodeError};
use crate::pixel::{Plane, YCbCrFrame};
use crate::theora_sys as sys;

/// Parsed identification header geometry (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoIdent {
    pub frame_width: u32,
    pub frame_height: u32,
    pub pic_width: u32,
    pub pic_height: u32,
    pub pic_x: u32,
    pub pic_y: u32,
    pub fps_numerator: u32,
    pub fps_denominator: u32,
    pub is_420: bool,
}

impl VideoIdent {
    pub fn to_format(self, pixel_format: crate::config::PixelFormat) -> VideoFormat {
        VideoFormat {
            width: self.pic_width,
            height: self.pic_height,
            fps_numerator: self.fps_numerator,
            fps_denominator: self.fps_denominator,
            pixel_format,
        }
    }
}

/// What decoding one Theora packet produced.
pub enum VideoDecodeOutcome<'a> {
    /// The codec's dup-frame indicator: the prior frame's presentation
    /// time should simply repeat. No new pixel data.
    Duplicate,
    /// A freshly decoded frame, planes still owned by the decode context.
    Frame(YCbCrFrame<'a>),
}

/// The capability seam a Theora decode context must provide.
///
/// Implemented for real by [`TheoraBackend`] over `libtheoradec`;
/// implemented by a synthetic fixture in `worker`'s test module.
pub trait VideoCodec: Sized {
    /// Attempts to parse `packet` as a Theora identification header
    /// without committing any state. Used by the router to classify a
    /// beginning-of-stream page (spec.md §4.3).
    fn try_identify(packet: &[u8]) -> Option<VideoIdent>;

    fn new() -> Self;

    /// Feeds one of the three mandatory header packets.
    fn feed_header(&mut self, packet: &[u8]) -> Result<(), BootstrapError>;

    /// Allocates the decode context once all three headers are in, and
    /// requests maximum post-processing quality (spec.md §4.3).
    fn finish_setup(&mut self, ident: &VideoIdent) -> Result<(), BootstrapError>;

    fn decode_packet(&mut self, packet: &[u8]) -> Result<VideoDecodeOutcome<'_>, DecodeError>;
}

/// Real implementation, backed directly by `libtheoradec` (spec.md §1:
/// the codec library is an opaque decoder whose capabilities, not API
/// shape, are specified).
pub struct TheoraBackend {
    info: sys::ThInfo,
    comment: sys::ThComment,
    setup: *mut sys::ThSetupInfo,
    ctx: *mut sys::ThDecCtx,
    headers_read: u32,
}

// `TheoraBackend` is only ever touched from the worker thread that owns
// it (handed across exactly one `thread::spawn` boundary in `handle.rs`);
// nothing here is shared or accessed concurrently, so `Send` is safe the
// same way any owned raw-pointer FFI handle's is.
unsafe impl Send for TheoraBackend {}

impl TheoraBackend {
    fn header_probe(packet: &[u8]) -> (c_int, sys::ThInfo) {
        let mut info = sys::ThInfo::default();
        let mut comment = sys::ThComment::default();
        let mut setup: *mut sys::ThSetupInfo = ptr::null_mut();
        unsafe {
            sys::th_info_init(&mut info);
            sys::th_comment_init(&mut comment);
        }
        let op = sys::OggPacket::from_bytes(packet);
        let ret = unsafe { sys::th_decode_headerin(&mut info, &mut comment, &mut setup, &op) };
        unsafe {
            sys::th_comment_clear(&mut comment);
            if !setup.is_null() {
                sys::th_setup_free(setup);
            }
        }
        (ret, info)
    }
}

impl VideoCodec for TheoraBackend {
    fn try_identify(packet: &[u8]) -> Option<VideoIdent> {
        let (ret, info) = Self::header_probe(packet);
        if ret < 0 {
            return None;
        }
        Some(VideoIdent {
            frame_width: info.frame_width,
            frame_height: info.frame_height,
            pic_width: info.pic_width,
            pic_height: info.pic_height,
            pic_x: info.pic_x,
            pic_y: info.pic_y,
            fps_numerator: info.fps_numerator,
            fps_denominator: info.fps_denominator,
            is_420: info.pixel_fmt == sys::TH_PF_420,
        })
    }

    fn new() -> Self {
        let mut info = sys::ThInfo::default();
        let mut comment = sys::ThComment::default();
        unsafe {
            sys::th_info_init(&mut info);
            sys::th_comment_init(&mut comment);
        }
        TheoraBackend { info, comment, setup: ptr::null_mut(), ctx: ptr::null_mut(), headers_read: 0 }
    }

    fn feed_header(&mut self, packet: &[u8]) -> Result<(), BootstrapError> {
        let op = sys::OggPacket::from_bytes(packet);
        let ret = unsafe { sys::th_decode_headerin(&mut self.info, &mut self.comment, &mut self.setup, &op) };
        if ret < 0 {
            return Err(BootstrapError::RejectedHeader);
        }
        self.headers_read += 1;
        Ok(())
    }

    fn finish_setup(&mut self, _ident: &VideoIdent) -> Result<(), BootstrapError> {
        if self.headers_read < 3 || self.setup.is_null() {
            return Err(BootstrapError::TruncatedHeaders);
        }
        let ctx = unsafe { sys::th_decode_alloc(&self.info, self.setup) };
        unsafe { sys::th_setup_free(self.setup) };
        self.setup = ptr::null_mut();
        if ctx.is_null() {
            return Err(BootstrapError::RejectedHeader);
        }
        self.ctx = ctx;

        let mut pp_max: c_int = 0;
        unsafe {
            sys::th_decode_ctl(
                self.ctx,
                sys::TH_DECCTL_GET_PPLEVEL_MAX,
                &mut pp_max as *mut c_int as *mut _,
                std::mem::size_of::<c_int>(),
            );
            sys::th_decode_ctl(
                self.ctx,
                sys::TH_DECCTL_SET_PPLEVEL,
                &mut pp_max as *mut c_int as *mut _,
                std::mem::size_of::<c_int>(),
            );
        }
        Ok(())
    }

    fn decode_packet(&mut self, packet: &[u8]) -> Result<VideoDecodeOutcome<'_>, DecodeError> {
        let op = sys::OggPacket::from_bytes(packet);
        let mut granpos: i64 = 0;
        let ret = unsafe { sys::th_decode_packetin(self.ctx, &op, &mut granpos) };
        if ret < 0 {
            return Err(DecodeError::Rejected);
        }
        if ret == sys::TH_DUPFRAME {
            return Ok(VideoDecodeOutcome::Duplicate);
        }

        let mut planes: sys::ThYcbcrBuffer = unsafe { std::mem::zeroed() };
        let ok = unsafe { sys::th_decode_ycbcr_out(self.ctx, planes.as_mut_ptr()) };
        if ok < 0 {
            return Err(DecodeError::Rejected);
        }

        // Planes cover the full coded frame, not just the picture region;
        // the picture origin must be applied by the caller (spec.md §4.4).
        // Luma offsets align down to even coordinates, chroma offsets use
        // the picture origin divided by two.
        let y_stride = planes[0].stride as usize;
        let cb_stride = planes[1].stride as usize;
        let cr_stride = planes[2].stride as usize;
        let y_plane_len = planes[0].height as usize * y_stride;
        let cb_plane_len = planes[1].height as usize * cb_stride;
        let cr_plane_len = planes[2].height as usize * cr_stride;

        let y_data = unsafe { std::slice::from_raw_parts(planes[0].data, y_plane_len) };
        let cb_data = unsafe { std::slice::from_raw_parts(planes[1].data, cb_plane_len) };
        let cr_data = unsafe { std::slice::from_raw_parts(planes[2].data, cr_plane_len) };

        let pic_x_even = (self.info.pic_x as usize) & !1;
        let pic_y_even = (self.info.pic_y as usize) & !1;
        let y_offset = pic_y_even * y_stride + pic_x_even;
        let chroma_origin_x = self.info.pic_x as usize / 2;
        let chroma_origin_y = self.info.pic_y as usize / 2;

        Ok(VideoDecodeOutcome::Frame(YCbCrFrame {
            y: Plane { data: y_data, stride: y_stride },
            cb: Plane { data: cb_data, stride: cb_stride },
            cr: Plane { data: cr_data, stride: cr_stride },
            y_offset,
            chroma_origin_x,
            chroma_origin_y,
        }))
    }
}

impl Drop for TheoraBackend {
    fn drop(&mut self) {
        unsafe {
            if !self.setup.is_null() {
                sys::th_setup_free(self.setup);
            }
            if !self.ctx.is_null() {
                sys::th_decode_free(self.ctx);
            }
            sys::th_comment_clear(&mut self.comment);
        }
    }
}
