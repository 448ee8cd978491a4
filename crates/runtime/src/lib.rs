pub mod event_bus;
pub mod latch;
pub mod sequencer;

pub use event_bus::*;
pub use latch::*;
pub use sequencer::*;
