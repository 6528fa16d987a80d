// src/lib.rs
pub mod api;
pub mod banner;
pub mod config;
pub mod errors;
pub mod identity;
pub mod judge;
pub mod models;
pub mod proctor;
pub mod runner;
pub mod store;
pub mod tracker;
