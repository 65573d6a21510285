//! Server-rendered HTML.

pub mod views;
