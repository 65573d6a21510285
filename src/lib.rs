//! Blogicum: a small multi-author blog served as server-rendered HTML.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
