//! Common types shared by every crate in the workspace

pub mod errors;
pub mod fixed_point;
pub mod identifiers;
