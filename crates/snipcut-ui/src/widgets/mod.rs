// src/widgets/mod.rs
// Custom egui widgets.

pub mod range_slider;

pub use range_slider::RangeSlider;
