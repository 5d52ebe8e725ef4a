pub mod commands;
pub mod events;
pub mod models;

pub use commands::Command;
pub use events::OutgoingMessage;
