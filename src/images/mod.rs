//! Product image downloads
//!
//! Images for one product are written under
//! `<images-dir>/<sanitized-product-name>/<filename>`, one download at a time.

mod fetcher;
mod naming;

pub use fetcher::{download_sequentially, DownloadOutcome, DownloadStatus, ImageFetcher};
pub use naming::{product_output_dir, sanitize_folder_name};
