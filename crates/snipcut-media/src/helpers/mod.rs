// crates/snipcut-media/src/helpers/mod.rs
//
// Decode/encode implementation details shared across modules. Not part of the
// public API.

pub mod pixels;
pub mod seek;
