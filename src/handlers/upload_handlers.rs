//! `POST /upload` — accept a document and its descriptor fields, archive it.
//!
//! The `file` part is spooled to an anonymous temporary file while the text
//! fields are collected, since browsers are free to send the parts in any
//! order. The temp file is closed and gone once the handler returns, whatever
//! the outcome.

use crate::{
    errors::AppError,
    models::descriptor::RawUploadForm,
    services::uploader::Uploader,
};
use axum::{
    extract::{Multipart, State, multipart::Field},
    http::header,
    response::IntoResponse,
};
use std::io::{self, SeekFrom};
use tokio::{
    fs::File,
    io::{AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

/// Form field carrying the document itself.
pub const FILE_FIELD: &str = "file";

pub const SUCCESS_MESSAGE: &str = "File uploaded successfully!";

pub async fn upload_document(
    State(uploader): State<Uploader>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = RawUploadForm::default();
    let mut file: Option<File> = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == FILE_FIELD {
            // A part without a filename is a plain value, which is what
            // browsers send when no file was chosen. Only the first file counts.
            let has_file_name = field.file_name().is_some_and(|n| !n.is_empty());
            if has_file_name && file.is_none() {
                file = Some(spool(field).await?);
            }
        } else {
            form.set(&name, field.text().await?);
        }
    }

    let file = file.ok_or_else(|| {
        AppError::bad_request(format!("request is missing the `{}` part", FILE_FIELD))
    })?;
    let descriptor = form.validate()?;

    let receipt = uploader.upload(&descriptor, file).await?;

    let body = format!(
        "{}\nBlob {} uploaded ({} bytes, md5 {}).\n",
        SUCCESS_MESSAGE, receipt.key, receipt.size_bytes, receipt.md5
    );
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}

/// Copy a multipart field into an unnamed temp file and rewind it.
async fn spool(mut field: Field<'_>) -> Result<File, AppError> {
    let filename = field.file_name().map(str::to_owned);
    let mut file = File::from_std(tempfile::tempfile().map_err(spool_error)?);

    let mut size_bytes: u64 = 0;
    while let Some(chunk) = field.chunk().await? {
        size_bytes += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(spool_error)?;
    }
    file.flush().await.map_err(spool_error)?;
    file.seek(SeekFrom::Start(0)).await.map_err(spool_error)?;

    debug!(filename = ?filename, size_bytes, "spooled upload");
    Ok(file)
}

fn spool_error(err: io::Error) -> AppError {
    AppError::internal(format!("spooling upload: {}", err))
}
