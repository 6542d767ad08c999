pub mod interpreter;
pub mod loader;
