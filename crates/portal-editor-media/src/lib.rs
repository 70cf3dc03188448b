//! portal-editor-media: turning picked files into image blocks.
//!
//! - `validate` - MIME checks on selected files
//! - `downsample` - shrinking oversized images before upload
//! - `store` - the image storage collaborator and its HTTP client
//! - `pipeline` - concurrent batches applied to an [`Editor`](portal_editor_core::Editor)

pub mod downsample;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod validate;

pub use downsample::{DownsampleOptions, PreparedImage, downsample, prepare};
pub use error::{IngestError, human_size};
pub use pipeline::{Applied, BatchReport, IngestBatch, IngestOptions, IngestOutcome, IngestPipeline};
pub use store::{HttpImageStore, ImageStore, UploadError, UploadRequest, extract_image_url};
pub use validate::{SelectedFile, image_mime};
