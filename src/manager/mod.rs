//! Settings store module
//!
//! This module contains the [`SettingsStore`] struct which is the primary entry point
//! for reading, updating and persisting extension settings.

mod builder;
mod core;
mod io;
mod operations;
mod transfer;

pub use builder::SettingsStoreBuilder;
pub use core::{SettingsStore, StoreState};
pub use io::{QuotaStatus, StorageReport, StorageStats};
pub use transfer::{ExportPayload, ImportReport, SkippedSetting};
