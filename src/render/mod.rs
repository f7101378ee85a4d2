pub mod canvas;
pub mod host;
pub mod registry;
pub mod world;
