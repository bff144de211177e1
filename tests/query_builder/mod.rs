//! Query Builder Tests Module
//!
//! Covers normalization, WHERE compilation, composition, join ordering and
//! statement assembly through the public API.

// Query builder component tests
pub mod binding;
pub mod builder;
pub mod composer;
pub mod joins;
pub mod normalize;
pub mod projection;
