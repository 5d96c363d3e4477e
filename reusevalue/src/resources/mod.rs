//! Resource implementations

pub mod string_reuse;

pub use string_reuse::StringReuseResource;
