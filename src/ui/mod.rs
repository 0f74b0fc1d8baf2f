pub mod caps;
pub mod input;
pub mod render;
