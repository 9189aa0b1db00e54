pub mod generation;
pub mod handlers;
pub mod models;
pub mod retrieval;
