//! Fare quotes for a fishing-boat booking form: shared-boat and charter
//! pricing, holiday-aware rate tiers, and reservation email drafts.

pub mod calendar;
pub mod catalog;
pub mod conl_ser;
pub mod format;
pub mod pricing;
pub mod session;
pub mod types;
pub mod utils;

pub use types::*;
