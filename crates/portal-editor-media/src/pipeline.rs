//! Concurrent batch ingestion.
//!
//! Every file in a selection gets its own task: validate, downsample if large,
//! upload. Outcomes come back over a channel in resolution order and are
//! applied to the editor on the task that owns it, one at a time.
//!
//! Insertion order follows resolution order. Each batch keeps a cursor that
//! advances past every inserted image, so an image that resolves later lands
//! after one that resolved earlier, whatever their selection order.

use std::sync::Arc;

use portal_common::{EditorConfig, ImageDomainType, ImageServerType, UploadConfig};
use portal_editor_core::{Editor, EditorError, ImageBlock, Position};
use tokio::sync::mpsc;

use crate::downsample::{DownsampleOptions, prepare};
use crate::error::IngestError;
use crate::store::{ImageStore, UploadRequest};
use crate::validate::{SelectedFile, image_mime};

/// Tags and limits applied to every file of a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestOptions {
    pub domain: ImageDomainType,
    pub server: ImageServerType,
    pub downsample: DownsampleOptions,
}

impl IngestOptions {
    pub fn new(editor: &EditorConfig, upload: &UploadConfig) -> Self {
        Self {
            domain: editor.image_domain_type,
            server: editor.image_server_type,
            downsample: DownsampleOptions::from(upload),
        }
    }
}

/// Result of one file, as delivered by its task.
#[derive(Debug)]
pub struct IngestOutcome {
    /// Position of the file in the selection.
    pub index: usize,
    pub name: String,
    pub result: Result<ImageBlock, IngestError>,
}

/// What applying one outcome did to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Inserted { name: String, url: String, at: Position },
    Failed(IngestError),
    /// The upload succeeded but the editor was gone.
    Discarded { name: String },
}

/// Summary of a finished batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub inserted: Vec<String>,
    pub errors: Vec<IngestError>,
    pub discarded: usize,
}

impl BatchReport {
    pub fn user_messages(&self) -> Vec<String> {
        self.errors.iter().map(IngestError::user_message).collect()
    }
}

/// Spawns per-file ingestion tasks against an [`ImageStore`].
#[derive(Debug)]
pub struct IngestPipeline<S> {
    store: Arc<S>,
    options: IngestOptions,
}

impl<S> Clone for IngestPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            options: self.options,
        }
    }
}

impl<S: ImageStore> IngestPipeline<S> {
    pub fn new(store: S, options: IngestOptions) -> Self {
        Self {
            store: Arc::new(store),
            options,
        }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Start ingesting `files`, to be inserted at `at`.
    ///
    /// Must be called inside a tokio runtime. Returns immediately; the files
    /// are processed concurrently and independently.
    pub fn start(&self, files: Vec<SelectedFile>, at: Position) -> IngestBatch {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = files.len();
        tracing::info!(files = pending, %at, "starting image batch");
        for (index, file) in files.into_iter().enumerate() {
            let store = self.store.clone();
            let options = self.options;
            let tx = tx.clone();
            tokio::spawn(async move {
                let name = file.name.clone();
                let result = ingest_file(store.as_ref(), file, options).await;
                // A dropped batch no longer wants outcomes.
                let _ = tx.send(IngestOutcome {
                    index,
                    name,
                    result,
                });
            });
        }
        IngestBatch {
            rx,
            cursor: at,
            pending,
        }
    }
}

#[tracing::instrument(skip_all, fields(file = %file.name, size = file.size()))]
async fn ingest_file<S: ImageStore>(
    store: &S,
    file: SelectedFile,
    options: IngestOptions,
) -> Result<ImageBlock, IngestError> {
    let mime = image_mime(&file)?;
    let size = file.size();
    let prepared = prepare(&file.name, file.data, mime, options.downsample).await;

    let upload_failed = |reason: String| IngestError::UploadFailed {
        name: file.name.clone(),
        size,
        server: options.server,
        reason,
    };

    let url = store
        .upload(UploadRequest {
            data: prepared.data,
            filename: file.name.clone(),
            mime: prepared.mime,
            domain: options.domain,
            server: options.server,
        })
        .await
        .map_err(|err| upload_failed(err.to_string()))?;

    let image = ImageBlock::new(url, String::new())
        .ok_or_else(|| upload_failed("storage returned an empty url".to_string()))?;
    tracing::info!(url = image.url(), downsampled = prepared.downsampled, "uploaded");
    Ok(image)
}

/// Outcomes of one started batch, waiting to be applied to an editor.
#[derive(Debug)]
pub struct IngestBatch {
    rx: mpsc::UnboundedReceiver<IngestOutcome>,
    cursor: Position,
    pending: usize,
}

impl IngestBatch {
    /// Files whose outcome has not been applied yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Where the next image of this batch will be inserted.
    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Wait for the next file to resolve and apply it.
    ///
    /// Returns `None` once every file has been applied.
    pub async fn apply_next(&mut self, editor: &mut Editor) -> Option<Applied> {
        let outcome = self.rx.recv().await?;
        self.pending = self.pending.saturating_sub(1);
        Some(self.apply(outcome, editor))
    }

    /// Apply every outcome as it resolves.
    pub async fn apply_all(mut self, editor: &mut Editor) -> BatchReport {
        let mut report = BatchReport::default();
        while let Some(applied) = self.apply_next(editor).await {
            match applied {
                Applied::Inserted { url, .. } => report.inserted.push(url),
                Applied::Failed(err) => report.errors.push(err),
                Applied::Discarded { .. } => report.discarded += 1,
            }
        }
        report
    }

    fn apply(&mut self, outcome: IngestOutcome, editor: &mut Editor) -> Applied {
        let IngestOutcome {
            index,
            name,
            result,
        } = outcome;
        let image = match result {
            Ok(image) => image,
            Err(err) => {
                tracing::error!(index, file = %name, error = %err, "image not inserted");
                return Applied::Failed(err);
            }
        };
        let url = image.url().to_string();
        match editor.insert_uploaded_image(self.cursor, image) {
            Ok(next) => {
                let at = self.cursor;
                self.cursor = next;
                Applied::Inserted { name, url, at }
            }
            Err(EditorError::Unmounted) => {
                tracing::debug!(file = %name, "editor unmounted, dropping upload");
                Applied::Discarded { name }
            }
            Err(err) => {
                tracing::warn!(file = %name, error = %err, "insert failed");
                Applied::Discarded { name }
            }
        }
    }
}
