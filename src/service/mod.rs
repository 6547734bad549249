pub mod automation;
pub mod caching;
pub mod calendar;
pub mod finance;
pub mod universe;
