pub mod day_range;
pub mod views;
pub mod writer;
