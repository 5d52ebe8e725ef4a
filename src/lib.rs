pub mod broadcast;
pub mod client;
pub mod common;
pub mod config;
pub mod playback;
pub mod protocol;
pub mod rest;
pub mod server;
pub mod session;
pub mod ws;
