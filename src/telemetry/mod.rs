mod refresh;

pub use refresh::{DrainOutcome, RefreshTelemetry};
