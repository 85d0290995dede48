pub mod components;
pub mod engine;
pub mod handlers;
pub mod skills;
pub mod text;
pub mod tfidf;
