/// Console dump switches threaded through the emulator.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLevel {
    pub dump_steps: bool,
}
