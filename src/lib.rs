pub mod analysis;
pub mod assign;
pub mod chart;
pub mod geometry;
pub mod load;
pub mod map;
pub mod output;
pub mod types;
