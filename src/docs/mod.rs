//! Document directory: listing, filtering, tagging, upload staging and
//! the bulk actions of the directory view.
//!
//! All state here is a projection of the backend; every mutating action
//! ends with a full refetch.

pub mod client;
pub mod dashboard;
pub mod describe;
pub mod index;
pub mod kind;
pub mod modal;
pub mod schema;
pub mod selection;
pub mod tags;
pub mod toast;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{FileDirectory, HttpDirectory};
pub use dashboard::{Dashboard, Workflow};
pub use index::{taxonomy, FileFilter, FileIndex};
pub use schema::{ChatMessage, FileRecord, UploadSlot};
pub use upload::{StagedFile, UploadPhase, UploadSnapshot};
