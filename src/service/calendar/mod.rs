pub mod fetcher;
pub mod partition;
pub mod reducer;

pub use fetcher::{fetch_all, FetchError};
pub use partition::{month_ranges, DateRange};
pub use reducer::{reduce, to_canonical_json, ReduceStats, Reduction};
