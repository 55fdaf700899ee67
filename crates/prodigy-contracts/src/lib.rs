pub mod chat;
pub mod events;
pub mod export;
pub mod latex;
pub mod models;
pub mod preferences;
pub mod prompt;
pub mod session;
pub mod upload;
