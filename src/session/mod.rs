pub mod chat;
pub mod clock;
pub mod machine;
pub mod queue;
pub mod registry;

pub use machine::{MachineState, SessionMachine};
