// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
Raw bindings to `libtheoradec`'s public C API (`theora/theoradec.h`,
`theora/codec.h`).

spec.md §1 treats Theora as "an opaque decoder assumed available", naming
the capabilities it needs (identify headers, allocate a context, decode a
packet, read back YCbCr planes, request maximum post-processing) without
prescribing an API shape. No published Rust crate wraps `libtheoradec` the
way `lewton` wraps Vorbis decoding or the way `vorbis = "0.1"` (named in
the teacher's own `dev/cmp/Cargo.toml`) wraps `libvorbis`, so this module
is a small hand-written binding in the same spirit: declare exactly the
entry points `video.rs` calls, link the real system library via
`build.rs` + `pkg-config`, and keep every other module in this crate free
of `unsafe`.

Field layouts below mirror the real `libtheoradec` headers; anything
marked "opaque" is never constructed or field-accessed on the Rust side,
only passed back and forth as a pointer, which is the usual shape for a
minimal hand-written binding that doesn't need `bindgen`'s exhaustiveness.
*/

#![allow(non_camel_case_types, dead_code)]

use std::os::raw::{c_int, c_long, c_void};

/// Mirrors `ogg_packet` from `ogg/ogg.h`. `libtheoradec`'s packet-feeding
/// entry points take this by pointer; we build one on the stack per call
/// instead of linking against libogg's own packet type, since the `ogg`
/// crate already handed us the packet bytes as a plain `Vec<u8>`.
#[repr(C)]
pub struct OggPacket {
    pub packet: *mut u8,
    pub bytes: c_long,
    pub b_o_s: c_long,
    pub e_o_s: c_long,
    pub granulepos: i64,
    pub packetno: i64,
}

impl OggPacket {
    pub fn from_bytes(data: &[u8]) -> Self {
        OggPacket {
            packet: data.as_ptr() as *mut u8,
            bytes: data.len() as c_long,
            b_o_s: 0,
            e_o_s: 0,
            granulepos: -1,
            packetno: 0,
        }
    }
}

/// `th_pixel_fmt` (`theora/codec.h`). This crate only accepts `TH_PF_420`
/// (spec.md §4.3's chroma-format check), but the identification header
/// reports whichever format the stream actually uses.
pub const TH_PF_420: c_int = 0;
pub const TH_PF_RSVD: c_int = 1;
pub const TH_PF_422: c_int = 2;
pub const TH_PF_444: c_int = 3;

/// `th_decode_packetin` returns this when the packet advances the
/// timebase without producing a new decoded frame (spec.md §4.4's
/// "duplicate frame" indicator).
pub const TH_DUPFRAME: c_int = 1;

/// `th_decode_ctl` request codes (`theora/theoradec.h`). Queried then set
/// right after `th_decode_alloc` to request maximum post-processing
/// quality (spec.md §4.3).
pub const TH_DECCTL_GET_PPLEVEL_MAX: c_int = 11;
pub const TH_DECCTL_SET_PPLEVEL: c_int = 12;

/// Mirrors `th_info` (`theora/codec.h`). Every field here is one the
/// router (`router.rs`) or the steady-state loop reads after
/// `th_decode_headerin` fills it in from the identification header.
#[repr(C)]
pub struct ThInfo {
    pub frame_width: u32,
    pub frame_height: u32,
    pub pic_width: u32,
    pub pic_height: u32,
    pub pic_x: u32,
    pub pic_y: u32,
    pub colorspace: c_int,
    pub pixel_fmt: c_int,
    pub target_bitrate: u32,
    pub quality: c_int,
    pub keyframe_granule_shift: c_int,
    pub version_major: u8,
    pub version_minor: u8,
    pub version_subminor: u8,
    pub codec_setup: *mut c_void,
    pub aspect_numerator: u32,
    pub aspect_denominator: u32,
    pub fps_numerator: u32,
    pub fps_denominator: u32,
}

impl Default for ThInfo {
    fn default() -> Self {
        // Zero-initialised is what `th_info_init` produces before any
        // header has been parsed into it.
        unsafe { std::mem::zeroed() }
    }
}

/// Mirrors `th_comment` (`theora/codec.h`). This crate never reads the
/// comment fields back (spec.md names no metadata-accessor requirement
/// beyond `video_format`/`audio_format`, both derived from `th_info`), so
/// every field is opaque padding sized to the real struct.
#[repr(C)]
pub struct ThComment {
    user_comments: *mut *mut std::os::raw::c_char,
    comment_lengths: *mut c_int,
    comments: c_int,
    vendor: *mut std::os::raw::c_char,
}

impl Default for ThComment {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

/// Opaque handle allocated by `th_decode_alloc`, freed by `th_decode_free`.
#[repr(C)]
pub struct ThDecCtx {
    _private: [u8; 0],
}

/// Opaque handle produced by `th_decode_headerin`'s third call, consumed
/// by `th_decode_alloc`, freed by `th_setup_free`.
#[repr(C)]
pub struct ThSetupInfo {
    _private: [u8; 0],
}

/// One plane of `th_ycbcr_buffer` (`theora/codec.h`): luma at index 0,
/// Cb at index 1, Cr at index 2.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ThImgPlane {
    pub width: c_int,
    pub height: c_int,
    pub stride: c_int,
    pub data: *mut u8,
}

pub type ThYcbcrBuffer = [ThImgPlane; 3];

extern "C" {
    pub fn th_info_init(info: *mut ThInfo);
    pub fn th_comment_init(tc: *mut ThComment);
    pub fn th_comment_clear(tc: *mut ThComment);

    /// Feeds one header packet. Returns 0 once `info`/`setup` are fully
    /// populated and ready for `th_decode_alloc`, a positive value while
    /// more header packets are still expected, and a negative value if
    /// `op` is not a valid Theora header.
    pub fn th_decode_headerin(
        info: *mut ThInfo,
        tc: *mut ThComment,
        setup: *mut *mut ThSetupInfo,
        op: *const OggPacket,
    ) -> c_int;

    pub fn th_setup_free(setup: *mut ThSetupInfo);

    pub fn th_decode_alloc(info: *const ThInfo, setup: *const ThSetupInfo) -> *mut ThDecCtx;
    pub fn th_decode_free(ctx: *mut ThDecCtx);

    pub fn th_decode_ctl(ctx: *mut ThDecCtx, req: c_int, buf: *mut c_void, buf_sz: usize) -> c_int;

    /// Decodes one packet. Returns 0 on a newly decoded frame,
    /// `TH_DUPFRAME` when the packet only repeats the previous frame's
    /// timestamp, and a negative value on a rejected packet.
    pub fn th_decode_packetin(
        ctx: *mut ThDecCtx,
        op: *const OggPacket,
        granpos: *mut i64,
    ) -> c_int;

    pub fn th_decode_ycbcr_out(ctx: *mut ThDecCtx, ycbcr: *mut ThImgPlane) -> c_int;
}
