//! Persistence gateway.
//!
//! Turns bytes into files in the downloads area and hands back a reference
//! only after the write is confirmed:
//!
//! ```text
//! download() ──► id ──► search(id) every poll interval
//!                          ├─ complete    ──► file:// URL
//!                          ├─ interrupted ──► WriteInterrupted
//!                          ├─ unknown id  ──► DownloadNotFound
//!                          └─ in progress ──► poll again (until the write timeout)
//! ```
//!
//! The CSV mirror is fire-and-forget: its failures are logged and dropped.

mod gateway;

pub use gateway::{CsvExport, PersistenceGateway, SavedImage, export_filename};
