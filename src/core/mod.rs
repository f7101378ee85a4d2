pub mod acquire;
pub mod color;
pub mod error;
pub mod graph;
pub mod pixel;
pub mod quantize;
