pub mod client;
pub mod models;

mod auth;
mod catalog;
mod user;

pub use catalog::AudioFilter;
pub use client::ApiClient;
