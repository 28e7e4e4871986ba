//! Domain layer: the post lifecycle rules.

pub mod error;
pub mod posts;
