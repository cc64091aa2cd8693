// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

//! Locates the system `libtheoradec` (Theora's decode-only library) the
//! same way any `-sys`-style crate wrapping a reference C codec does: ask
//! `pkg-config` for the flags instead of hard-coding a link path.
//!
//! There is no published Rust binding for Theora decoding in the way
//! `lewton` exists for Vorbis, so `src/theora_sys.rs` declares the handful
//! of `libtheoradec` entry points this crate calls directly via `extern
//! "C"` and this script only has to make the linker find them.

fn main() {
    if let Err(e) = pkg_config::Config::new().atleast_version("1.1").probe("theoradec") {
        panic!(
            "could not locate libtheoradec via pkg-config (package `theoradec`, \
             usually shipped as libtheora-dev / libtheora-devel): {}",
            e
        );
    }
}
