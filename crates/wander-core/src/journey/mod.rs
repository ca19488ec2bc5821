mod machine;
mod model;
mod path;
mod phase;

pub use machine::{Input, JourneyMachine, Snapshot};
pub use model::{EtaSample, Journey, JourneyRecord, Timing, MAX_JOURNEY_SECS};
pub use path::PathTrace;
pub use phase::{classify, Phase};
