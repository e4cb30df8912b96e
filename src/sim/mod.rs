pub mod event;
pub mod level;
pub mod registry;
pub mod step;
pub mod world;
