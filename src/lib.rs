// Export modules for use in tests
pub mod export;
pub mod notes;
pub mod panic_handler;
pub mod pdf;
pub mod settings;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the main viewer components
pub use notes::{NoteSink, WriterSink};
pub use settings::Settings;
pub use viewer::{ScrollOutcome, ScrollPosition, Viewer};
