pub mod filesystem;
pub mod prompt;
