// QuietBrowser shared type definitions
// Each submodule defines types used across the application.

pub mod command;
pub mod errors;
pub mod rules;
pub mod settings;
pub mod snapshot;
pub mod tab;
