//! Multipart form reading shared by the upload, species and queue endpoints.

use crate::error::AppError;
use crate::uploads::{image_extension, StoredImage, UploadDir};
use actix_multipart::{Field, Multipart};
use actix_web::http::header::CONTENT_LENGTH;
use actix_web::{web, HttpRequest};
use common::requests::SubmissionMetadata;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Upper bound for a single text field.
const MAX_TEXT_FIELD_BYTES: usize = 1024 * 1024;

/// Text fields plus the images already written to the uploads directory.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub images: Vec<StoredImage>,
}

impl UploadForm {
    /// Trimmed, non-empty value of a text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Deletes every stored image of this form.
    pub fn discard(self, uploads: &UploadDir) {
        for image in &self.images {
            uploads.remove_logged(&image.file_name);
        }
    }

    /// Submitter and attributes taken from the text fields.
    pub fn metadata(&self) -> Result<SubmissionMetadata, AppError> {
        fields_as(&self.fields)
    }
}

/// Deserializes trimmed text fields into `T` as if they were a JSON object
/// of strings.
pub fn fields_as<T: DeserializeOwned>(fields: &HashMap<String, String>) -> Result<T, AppError> {
    let object: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.trim().to_string())))
        .collect();
    serde_json::from_value(Value::Object(object))
        .map_err(|e| AppError::Validation(format!("Invalid form fields: {e}")))
}

/// Logs how much of the request body has arrived, in quarters of the
/// announced `Content-Length`.
#[derive(Debug, Default)]
pub struct UploadProgress {
    expected: Option<u64>,
    received: u64,
    reported: u64,
}

impl UploadProgress {
    pub fn from_request(req: &HttpRequest) -> Self {
        let expected = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|n| *n > 0);
        Self {
            expected,
            ..Self::default()
        }
    }

    fn advance(&mut self, bytes: usize) {
        self.received += bytes as u64;
        let Some(total) = self.expected else {
            return;
        };
        let percent = (self.received.saturating_mul(100) / total).min(100);
        let step = percent / 25 * 25;
        if step > self.reported {
            self.reported = step;
            log::info!(
                "Upload progress: {step}% ({} of {total} bytes)",
                self.received
            );
        }
    }
}

/// Reads a multipart form, streaming every file part named `file_field` into
/// the uploads directory. On error all files written so far are removed.
pub async fn read_upload_form(
    mut payload: Multipart,
    uploads: &UploadDir,
    file_field: &str,
    progress: &mut UploadProgress,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    match collect_parts(&mut payload, uploads, file_field, progress, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard(uploads);
            Err(e)
        }
    }
}

async fn collect_parts(
    payload: &mut Multipart,
    uploads: &UploadDir,
    file_field: &str,
    progress: &mut UploadProgress,
    form: &mut UploadForm,
) -> Result<(), AppError> {
    while let Some(item) = payload.next().await {
        let mut field = item?;
        let (name, file_name) = part_names(&field);

        match file_name {
            Some(original) if name == file_field => {
                let mut writer = uploads.create(&name, &original)?;
                while let Some(chunk) = field.next().await {
                    let written = chunk.map_err(AppError::from).and_then(|bytes| {
                        progress.advance(bytes.len());
                        writer.write_chunk(&bytes)
                    });
                    if let Err(e) = written {
                        writer.abort();
                        return Err(e);
                    }
                }
                form.images.push(writer.finish()?);
            }
            Some(_) => {
                return Err(AppError::Validation(format!("Unexpected file field {name:?}")));
            }
            None => {
                let value = read_text(&mut field, progress).await?;
                form.fields.insert(name, value);
            }
        }
    }
    Ok(())
}

/// An image held in memory rather than on disk.
#[derive(Debug, Clone)]
pub struct InMemoryImage {
    pub original_name: String,
    pub bytes: web::Bytes,
}

/// Reads every `file_field` part into memory, enforcing the type filter and
/// `max_bytes` per file. Text parts are ignored.
pub async fn read_images_in_memory(
    mut payload: Multipart,
    file_field: &str,
    max_bytes: usize,
) -> Result<Vec<InMemoryImage>, AppError> {
    let mut images = Vec::new();
    let mut progress = UploadProgress::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let (name, file_name) = part_names(&field);
        let Some(original_name) = file_name.filter(|_| name == file_field) else {
            read_text(&mut field, &mut progress).await?;
            continue;
        };
        image_extension(&original_name)?;

        let mut buffer = web::BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if buffer.len() + chunk.len() > max_bytes {
                return Err(AppError::Validation(format!(
                    "File {original_name} exceeds the {max_bytes} byte limit"
                )));
            }
            buffer.extend_from_slice(&chunk);
        }
        images.push(InMemoryImage {
            original_name,
            bytes: buffer.freeze(),
        });
    }
    Ok(images)
}

/// Form name and, for file parts, the client file name. An empty file name
/// (a file input left blank) counts as no file.
fn part_names(field: &Field) -> (String, Option<String>) {
    let disposition = field.content_disposition();
    let name = disposition
        .and_then(|cd| cd.get_name())
        .unwrap_or_default()
        .to_string();
    let file_name = disposition
        .and_then(|cd| cd.get_filename())
        .filter(|f| !f.trim().is_empty())
        .map(str::to_string);
    (name, file_name)
}

async fn read_text(field: &mut Field, progress: &mut UploadProgress) -> Result<String, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        progress.advance(chunk.len());
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::Validation("Form field too large".to_string()));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes).map_err(|_| AppError::Validation("Form field is not valid UTF-8".into()))
}
