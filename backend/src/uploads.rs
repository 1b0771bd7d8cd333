//! Flat directory of uploaded images.
//!
//! Stored names look like `image-1715329800123-482913377.jpg`: the form field,
//! the upload time in milliseconds and a random suffix, so concurrent uploads
//! never collide. Only the bare file name is ever stored in records.

use crate::error::AppError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// An image written to the uploads directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub file_name: String,
    pub original_name: String,
    pub size: usize,
}

#[derive(Clone, Debug)]
pub struct UploadDir {
    root: Arc<PathBuf>,
    max_bytes: usize,
}

impl UploadDir {
    pub fn new(root: impl AsRef<Path>, max_bytes: usize) -> Result<Self, AppError> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: Arc::new(root.as_ref().to_path_buf()),
            max_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Path of a stored file. Directory components in `file_name` are ignored.
    pub fn path_of(&self, file_name: &str) -> PathBuf {
        let bare = Path::new(file_name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        self.root.join(bare)
    }

    /// Opens a new file for an upload received in form field `field`.
    pub fn create(&self, field: &str, original_name: &str) -> Result<UploadWriter, AppError> {
        let extension = image_extension(original_name)?;
        let file_name = unique_name(field, &extension);
        let path = self.path_of(&file_name);
        let file = File::create(&path)?;
        Ok(UploadWriter {
            writer: Some(BufWriter::new(file)),
            path,
            image: StoredImage {
                file_name,
                original_name: original_name.to_string(),
                size: 0,
            },
            max_bytes: self.max_bytes,
        })
    }

    /// Writes an in-memory image (already size-checked) to the directory.
    pub fn save_bytes(
        &self,
        field: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, AppError> {
        let mut writer = self.create(field, original_name)?;
        if let Err(e) = writer.write_chunk(bytes) {
            writer.abort();
            return Err(e);
        }
        writer.finish()
    }

    pub async fn read(&self, file_name: &str) -> Result<Vec<u8>, AppError> {
        Ok(tokio::fs::read(self.path_of(file_name)).await?)
    }

    /// Best-effort delete. Failures are logged, never returned.
    pub fn remove_logged(&self, file_name: &str) {
        let path = self.path_of(file_name);
        if let Err(e) = fs::remove_file(&path) {
            log::warn!("Could not delete image file {}: {}", path.display(), e);
        }
    }
}

/// Streams one upload to disk, enforcing the per-file size limit.
pub struct UploadWriter {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    image: StoredImage,
    max_bytes: usize,
}

impl UploadWriter {
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), AppError> {
        self.image.size += chunk.len();
        if self.image.size > self.max_bytes {
            return Err(AppError::Validation(format!(
                "File {} exceeds the {} byte limit",
                self.image.original_name, self.max_bytes
            )));
        }
        match self.writer.as_mut() {
            Some(w) => Ok(w.write_all(chunk)?),
            None => Err(AppError::Internal("upload already closed".to_string())),
        }
    }

    pub fn finish(mut self) -> Result<StoredImage, AppError> {
        if let Some(mut w) = self.writer.take() {
            if let Err(e) = w.flush() {
                drop(w);
                self.remove_file();
                return Err(e.into());
            }
        }
        Ok(self.image)
    }

    /// Closes and deletes the partial file.
    pub fn abort(mut self) {
        self.writer.take();
        self.remove_file();
    }

    fn remove_file(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Could not delete partial upload {}: {}", self.path.display(), e);
        }
    }
}

/// Lower-cased extension of an accepted image name.
pub fn image_extension(original_name: &str) -> Result<String, AppError> {
    let rejected = || {
        AppError::Validation(format!(
            "Unsupported file {original_name:?}: only .png, .jpg, .jpeg and .webp images are allowed"
        ))
    };

    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(rejected)?;
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(rejected());
    }

    let is_image = mime_guess::from_path(original_name)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE);
    if !is_image {
        return Err(rejected());
    }
    Ok(extension)
}

fn unique_name(field: &str, extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().as_u128() % 1_000_000_000;
    let field: String = field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("{field}-{millis}-{suffix}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_image_extensions() {
        assert_eq!(image_extension("leaf.JPG").unwrap(), "jpg");
        assert_eq!(image_extension("leaf.webp").unwrap(), "webp");
        assert!(image_extension("leaf.gif").is_err());
        assert!(image_extension("leaf").is_err());
        assert!(image_extension("notes.txt").is_err());
    }

    #[test]
    fn names_carry_field_and_extension() {
        let name = unique_name("image", "png");
        assert!(name.starts_with("image-"));
        assert!(name.ends_with(".png"));
        assert_ne!(name, unique_name("image", "png"));
    }

    #[test]
    fn oversized_writes_are_rejected_and_aborted() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path(), 4).unwrap();
        let mut writer = uploads.create("image", "leaf.png").unwrap();
        let path = writer.path.clone();
        assert!(writer.write_chunk(b"12345").is_err());
        writer.abort();
        assert!(!path.exists());
    }

    #[test]
    fn saved_bytes_can_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path(), 1024).unwrap();
        let stored = uploads.save_bytes("image", "leaf.jpeg", b"jpeg").unwrap();
        assert_eq!(stored.size, 4);
        assert!(uploads.path_of(&stored.file_name).exists());
        uploads.remove_logged(&stored.file_name);
        assert!(!uploads.path_of(&stored.file_name).exists());
    }

    #[test]
    fn path_of_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path(), 1024).unwrap();
        assert_eq!(uploads.path_of("../../etc/passwd"), dir.path().join("passwd"));
    }
}
