//! CloudDocs client: session handling, the backend's file API and the
//! directory-view workflows (upload with AI suggestions, tagging, rename,
//! share, bulk delete).

pub mod config;
pub mod docs;
pub mod error;
pub mod session;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{Claims, FileTokenStore, MemoryTokenStore, SessionStore, TokenStore};
