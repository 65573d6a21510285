//! Use cases over the domain, expressed against repository traits.

pub mod accounts;
pub mod blog;
pub mod catalog;
pub mod comments;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod posts;
pub mod query;
pub mod repos;
pub mod sessions;
