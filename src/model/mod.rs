//! Data model for comic page layouts and reassembled documents.
//!
//! Layout records come from the external panel detector and are read-only
//! for the rest of the pipeline.

mod chapter;
mod page;
mod panel;

pub use chapter::{Chapter, OutputDocument};
pub use page::{PageRecord, PercentageRecord};
pub use panel::{PanelEntry, PanelRect};
