// Services module - business logic layer

pub mod namer;
pub mod organizer;
pub mod transfer;

// Metadata providers
pub mod douban;
pub mod metadata;
pub mod provider;
pub mod tmdb;
