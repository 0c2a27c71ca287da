pub mod error;
pub mod logger;
pub mod procs;
pub mod validation;
