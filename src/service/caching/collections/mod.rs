pub mod earnings_index;
pub mod run_stats;
pub mod symbol_universe;
