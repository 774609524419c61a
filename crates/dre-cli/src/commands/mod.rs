//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Store opening and the init/status commands
//! - `import` - Spreadsheet import
//! - `records` - Stored record listing
//! - `reports` - Monthly report, project and year lists
//! - `serve` - Web server command

pub mod core;
pub mod import;
pub mod records;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use records::*;
pub use reports::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
