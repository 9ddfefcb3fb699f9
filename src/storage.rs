use rocket::{
    async_trait,
    data::{FromData, Outcome, ToByteUnit},
    fairing::AdHoc,
    http::Status,
    Request,
};
use rocket_okapi::request::OpenApiFromData;
use std::{
    io::{Error, ErrorKind, Result as IoResult},
    path::PathBuf,
};
use tokio::{fs::File, io::AsyncWriteExt};

use crate::config::get_app_config;

const MAX_FILE_SIZE_MIB: u64 = 20;

/// Uploaded documents on the local filesystem, stored as `{base}/{user_id}/{doc_id}.{ext}`
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalStorage {
            base_path: base_path.into(),
        }
    }

    pub fn document_path(&self, user_id: &str, doc_id: &str, ext: &str) -> IoResult<PathBuf> {
        for part in [user_id, doc_id, ext] {
            if part.is_empty() || part.contains(['/', '\\']) || part.contains("..") {
                return Err(Error::new(ErrorKind::InvalidInput, "Invalid path component"));
            }
        }
        Ok(self
            .base_path
            .join(user_id)
            .join(format!("{}.{}", doc_id, ext)))
    }

    pub async fn save_document(
        &self,
        user_id: &str,
        doc_id: &str,
        ext: &str,
        bytes: &[u8],
    ) -> IoResult<PathBuf> {
        let path = self.document_path(user_id, doc_id, ext)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let mut file = File::create_new(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(path)
    }

    /// Delete a stored document. Returns `false` if there was no file.
    pub async fn remove_document(&self, user_id: &str, doc_id: &str, ext: &str) -> IoResult<bool> {
        let path = self.document_path(user_id, doc_id, ext)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Fairing that creates the upload directory and the document storage
pub fn setup_storage() -> AdHoc {
    AdHoc::try_on_ignite("Document storage", |rocket| async {
        let upload_dir = get_app_config(&rocket).upload_dir().to_owned();
        if let Err(e) = tokio::fs::create_dir_all(&upload_dir).await {
            rocket::error!("Failed to create upload directory {}: {}", upload_dir, e);
            return Err(rocket);
        }

        Ok(rocket.manage(LocalStorage::new(upload_dir)))
    })
}

/// Data guard reading an uploaded file's raw bytes
pub struct FileData {
    pub bytes: Vec<u8>,
}

#[async_trait]
impl<'r> FromData<'r> for FileData {
    type Error = &'static str;

    async fn from_data(
        _req: &'r Request<'_>,
        data: rocket::Data<'r>,
    ) -> Outcome<'r, Self, Self::Error> {
        let capped = match data.open(MAX_FILE_SIZE_MIB.mebibytes()).into_bytes().await {
            Ok(capped) => capped,
            Err(e) => {
                rocket::warn!("Failed to read upload: {}", e);
                return Outcome::Error((Status::BadRequest, "Failed to read file"));
            }
        };
        if !capped.is_complete() {
            return Outcome::Error((Status::PayloadTooLarge, "File size exceeds maximum"));
        }
        if capped.is_empty() {
            return Outcome::Error((Status::BadRequest, "No data found"));
        }

        Outcome::Success(FileData {
            bytes: capped.into_inner(),
        })
    }
}

impl<'r> OpenApiFromData<'r> for FileData {
    fn request_body(
        _gen: &mut rocket_okapi::r#gen::OpenApiGenerator,
    ) -> rocket_okapi::Result<rocket_okapi::okapi::openapi3::RequestBody> {
        Ok(rocket_okapi::okapi::openapi3::RequestBody {
            description: Some("Document contents (PDF or plain text)".to_string()),
            content: {
                let mut content = schemars::Map::new();
                content.insert(
                    "application/octet-stream".into(),
                    rocket_okapi::okapi::openapi3::MediaType {
                        schema: Some(rocket_okapi::okapi::openapi3::SchemaObject {
                            instance_type: Some(schemars::schema::SingleOrVec::Single(Box::new(
                                schemars::schema::InstanceType::String,
                            ))),
                            format: Some("binary".to_string()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                );
                content
            },
            required: true,
            ..Default::default()
        })
    }
}
