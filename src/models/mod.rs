pub mod earnings;
pub mod symbols;
pub mod timestamp;

pub use earnings::{EarningsIndex, EarningsRecord, RawEvent, TimeFlag};
pub use symbols::{SymbolListing, SymbolUniverse};
