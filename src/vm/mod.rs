mod alu;
mod instance;
mod types;

pub use instance::{Emulator, State};
pub use types::LogLevel;
