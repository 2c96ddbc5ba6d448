use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use bytes::Bytes;
use tracing::debug;

use crate::consumer::BodyConsumer;
use crate::error::TransferError;

/// Writes body chunks to a destination file, yielding the path as the body.
///
/// The file is opened lazily (create-or-truncate, write-only) on the first
/// chunk, so a zero-byte body never touches the filesystem. Writes happen
/// synchronously inside the listener callback.
#[derive(Debug)]
pub struct FileConsumer {
    path: PathBuf,
    file: Option<File>,
}

impl FileConsumer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), file: None }
    }
}

impl BodyConsumer for FileConsumer {
    type Body = PathBuf;

    fn on_next(&mut self, content: Bytes) -> Result<(), TransferError> {
        if self.file.is_none() {
            debug!(path = %self.path.display(), "creating destination file");
            self.file = Some(File::create(&self.path)?);
        }

        // checked above
        let file = self.file.as_mut().ok_or_else(|| TransferError::consumer("destination file not open"))?;
        file.write_all(&content)?;
        Ok(())
    }

    fn on_complete(&mut self) -> Result<(), TransferError> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }

    fn take_body(&mut self) -> Result<PathBuf, TransferError> {
        Ok(self.path.clone())
    }

    fn close(&mut self) -> Result<(), TransferError> {
        // tolerates a body that never produced a chunk
        self.file = None;
        Ok(())
    }
}
