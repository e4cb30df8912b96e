pub mod entity;
pub mod grid;
pub mod occupancy;
pub mod rules;
