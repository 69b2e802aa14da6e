pub mod walk;

pub use walk::{scan_tree, validate_root, ScanOutcome};
