//! Live progress fan-out

mod broadcaster;

pub use broadcaster::{CurrentRun, PROGRESS_CHANNEL, ProgressBroadcaster, ProgressEvent};
