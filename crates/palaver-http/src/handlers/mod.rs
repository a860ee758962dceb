//! HTTP handlers, one module per resource.

pub mod messages;
pub mod poll;
pub mod reactions;
