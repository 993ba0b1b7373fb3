//! Durable storage: keyword presets, the signed-in session and result IDs

pub mod init;
pub mod keyword_sets;
pub mod result_ids;
pub mod session;

pub use init::*;
pub use keyword_sets::*;
pub use result_ids::*;
pub use session::*;
