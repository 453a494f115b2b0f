//! Custom extractors.

mod multipart;

pub use multipart::RecordForm;
