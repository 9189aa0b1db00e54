pub mod handlers;
pub mod models;
pub mod resolver;

pub use resolver::{resolve_template, MatchTier, TemplateMatch};
