pub mod logging;
pub mod upload;

pub use upload::{sanitize_filename, spool_upload, LocalFile};
