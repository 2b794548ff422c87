pub mod batch;
pub mod chromosome;
pub mod command;
pub mod file;
pub mod install;
pub mod reference;
pub mod system;
pub mod worksheet;
