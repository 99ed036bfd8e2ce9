pub mod config;
pub mod credential;
pub mod handlers;
pub mod models;
pub mod redemption;
pub mod routes;
pub mod security;
pub mod store;
pub mod utils;
