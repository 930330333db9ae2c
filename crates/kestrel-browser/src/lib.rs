// Headless Chrome integration: accessibility/responsiveness scanning and Lighthouse audits

pub mod axe;
mod chrome_finder;
mod error;
pub mod launcher;
mod lighthouse;
pub mod network_idle;
mod profile;
mod scanner;

pub use axe::{AxeEngine, AxeSource};
pub use chrome_finder::ChromeFinder;
pub use error::{Error, Result};
pub use launcher::{ChromeLauncher, ChromeProcess};
pub use lighthouse::{LighthouseOptions, LighthouseRunner, AUDIT_CATEGORIES};
pub use profile::ProfileManager;
pub use scanner::{validate_target_url, ChromeScanner, ScannerOptions};
