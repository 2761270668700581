pub mod backup;
pub mod cleaner_orchestrator;
pub mod cleaners;
pub mod error;
pub mod fresh_start;
pub mod host;
pub mod logs;
pub mod paths;
pub mod restore;
pub mod settings;
