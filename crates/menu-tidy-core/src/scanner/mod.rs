pub mod filter;
pub mod walk;

pub use filter::EntryFilter;
pub use walk::{scan_actual, scan_layout, LayoutScan, ObservedFolder, ObservedItem, Snapshot};
