mod execution;
mod settings;

pub use execution::{ExecutionEvent, UNKNOWN};
pub use settings::{Settings, SettingsError};
