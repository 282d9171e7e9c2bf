// crates/snipcut-core/src/helpers/mod.rs
//
// Small pure utilities shared by the engine and the UI crate.

pub mod paths;
pub mod time;
