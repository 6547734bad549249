pub mod refresh;

pub use refresh::{run_refresh, RefreshError, RefreshOptions, RefreshOutcome};
