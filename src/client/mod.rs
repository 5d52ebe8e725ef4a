pub mod projection;

pub use projection::{ClientProjection, SessionPhase};
