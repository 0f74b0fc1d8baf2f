pub mod config;
pub mod engine;
pub mod fields;
pub mod history;
pub mod layout;
pub mod window;
