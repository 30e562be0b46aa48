// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Image Intake (`spec.md` §4.5): validate, hash, encrypt, thumbnail, and
//! assemble an `ImageRecord`, with compensating deletes on partial failure.
//! Also owns secure delete: three-pass random overwrite with fsync between
//! passes before unlinking the blob and thumbnail.

use rand::RngCore;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vault_domain::error::VaultError;
use vault_domain::services::{CryptoService, ImageRepository, TagCodecService};
use vault_domain::value_objects::{FileHash, ImageId, MimeType, TagSet};
use vault_domain::ImageRecord;

const THUMBNAIL_MAX_DIM: u32 = 256;
const THUMBNAIL_QUALITY: u8 = 85;
const SECURE_DELETE_PASSES: u32 = 3;

/// Caller-supplied fields for a new image. `original_filename` and
/// `creation_time` land in canonicalized metadata alongside whatever extra
/// keys the caller provides.
pub struct IntakeRequest {
    pub plaintext: Vec<u8>,
    pub original_filename: String,
    pub tags: Vec<String>,
    pub extra_metadata: HashMap<String, String>,
}

pub struct ImageIntake {
    crypto: Arc<dyn CryptoService>,
    tag_codec: Arc<dyn TagCodecService>,
    repository: Arc<dyn ImageRepository>,
    data_dir: PathBuf,
    thumbnails_dir: PathBuf,
    max_file_size_bytes: u64,
    accepted_mime_prefixes: Vec<String>,
}

impl ImageIntake {
    pub fn new(
        crypto: Arc<dyn CryptoService>,
        tag_codec: Arc<dyn TagCodecService>,
        repository: Arc<dyn ImageRepository>,
        data_dir: impl Into<PathBuf>,
        thumbnails_dir: impl Into<PathBuf>,
        max_file_size_bytes: u64,
        accepted_mime_prefixes: Vec<String>,
    ) -> Self {
        Self {
            crypto,
            tag_codec,
            repository,
            data_dir: data_dir.into(),
            thumbnails_dir: thumbnails_dir.into(),
            max_file_size_bytes,
            accepted_mime_prefixes,
        }
    }

    fn guess_mime(&self, plaintext: &[u8]) -> Result<MimeType, VaultError> {
        let format = image::guess_format(plaintext)
            .map_err(|_| VaultError::input("unrecognized image format"))?;
        let mime = match format {
            image::ImageFormat::Png => "image/png",
            image::ImageFormat::Jpeg => "image/jpeg",
            image::ImageFormat::Gif => "image/gif",
            image::ImageFormat::WebP => "image/webp",
            image::ImageFormat::Bmp => "image/bmp",
            image::ImageFormat::Tiff => "image/tiff",
            _ => return Err(VaultError::input("unsupported image format")),
        };
        if !self.accepted_mime_prefixes.iter().any(|p| mime.starts_with(p.as_str())) {
            return Err(VaultError::input(format!("mime type {mime} not in the configured allow-list")));
        }
        MimeType::parse(mime)
    }

    fn build_thumbnail(plaintext: &[u8], dest: &Path) -> Option<()> {
        let decoded = image::load_from_memory(plaintext).ok()?;
        let scaled = decoded.resize(
            THUMBNAIL_MAX_DIM,
            THUMBNAIL_MAX_DIM,
            image::imageops::FilterType::Lanczos3,
        );
        let mut bytes: Vec<u8> = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, THUMBNAIL_QUALITY);
        scaled.write_with_encoder(encoder).ok()?;
        std::fs::write(dest, &bytes).ok()
    }

    fn canonical_metadata(request: &IntakeRequest) -> HashMap<String, String> {
        let mut metadata = request.extra_metadata.clone();
        metadata.insert("original_filename".to_string(), request.original_filename.clone());
        let extension = Path::new(&request.original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        metadata.insert("file_extension".to_string(), extension);
        metadata.insert("creation_time".to_string(), chrono::Utc::now().to_rfc3339());
        metadata
    }

    /// Implements `spec.md` §4.5 steps 1-8, including blob/thumbnail cleanup
    /// if the database insert fails.
    pub async fn add_image(&self, request: IntakeRequest) -> Result<ImageRecord, VaultError> {
        if request.plaintext.len() as u64 > self.max_file_size_bytes {
            return Err(VaultError::input("file exceeds max_file_size"));
        }
        let mime = self.guess_mime(&request.plaintext)?;

        let hash = FileHash::of_bytes(&request.plaintext);
        if self.repository.find_by_hash(&hash).await?.is_some() {
            return Err(VaultError::DuplicateContent);
        }

        let id = ImageId::new();
        let blob_path = self.data_dir.join(format!("{}.enc", id));
        let sealed = self.crypto.seal(&request.plaintext).await?;
        std::fs::write(&blob_path, &sealed).map_err(|e| VaultError::io(e.to_string()))?;

        let thumbnail_path = self.thumbnails_dir.join(format!("{}.jpg", id));
        let thumbnail_ok = Self::build_thumbnail(&request.plaintext, &thumbnail_path).is_some();

        let tags = TagSet::from_raw(request.tags.clone());
        let metadata = Self::canonical_metadata(&request);

        let record_result = async {
            let encrypted_tags = self.tag_codec.encode_tags(&tags).await?;
            let encrypted_metadata = self.tag_codec.encode_metadata(&metadata).await?;

            let mut record = ImageRecord::new(
                request.original_filename.clone(),
                blob_path.to_string_lossy().to_string(),
                request.plaintext.len() as u64,
                sealed.len() as u64,
                mime,
                hash,
                encrypted_tags,
                encrypted_metadata,
                thumbnail_ok.then(|| thumbnail_path.to_string_lossy().to_string()),
            );
            record.id = id.clone();
            self.repository.insert(&record).await?;
            Ok::<ImageRecord, VaultError>(record)
        }
        .await;

        match record_result {
            Ok(record) => Ok(record),
            Err(err) => {
                let _ = std::fs::remove_file(&blob_path);
                if thumbnail_ok {
                    let _ = std::fs::remove_file(&thumbnail_path);
                }
                Err(err)
            }
        }
    }

    /// Overwrites the blob three times with cryptographically random bytes
    /// (fsync between passes), then unlinks the blob, thumbnail, and DB row.
    pub async fn delete_image(&self, id: ImageId) -> Result<(), VaultError> {
        let record = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| VaultError::input("image not found"))?;

        let blob_path = PathBuf::from(&record.encrypted_path);
        if blob_path.exists() {
            Self::secure_overwrite(&blob_path)?;
            std::fs::remove_file(&blob_path).map_err(|e| VaultError::io(e.to_string()))?;
        }
        if let Some(thumb) = &record.thumbnail_path {
            let _ = std::fs::remove_file(thumb);
        }

        self.repository.delete(id).await?;
        Ok(())
    }

    fn secure_overwrite(path: &Path) -> Result<(), VaultError> {
        let len = std::fs::metadata(path).map_err(|e| VaultError::io(e.to_string()))?.len();
        let mut rng = rand::rng();
        for _ in 0..SECURE_DELETE_PASSES {
            let mut buffer = vec![0u8; len as usize];
            rng.fill_bytes(&mut buffer);
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(|e| VaultError::io(e.to_string()))?;
            file.write_all(&buffer).map_err(|e| VaultError::io(e.to_string()))?;
            file.sync_all().map_err(|e| VaultError::io(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::{CryptoController, JsonTagCodec};
    use crate::infrastructure::repositories::SqliteImageRepository;
    use crate::infrastructure::repositories::schema::initialize_database;
    use tempfile::tempdir;

    async fn intake() -> (ImageIntake, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::create_dir_all(dir.path().join("thumbnails")).unwrap();
        let db_path = dir.path().join("vault.db");
        let url = format!("sqlite://{}", db_path.display());
        let pool = initialize_database(&url).await.unwrap();

        let crypto: Arc<dyn CryptoService> = Arc::new(CryptoController::new());
        crypto.initialize("pw").await.unwrap();
        let tag_codec: Arc<dyn TagCodecService> = Arc::new(JsonTagCodec::new(crypto.clone()));
        let repository: Arc<dyn ImageRepository> = Arc::new(SqliteImageRepository::new(pool));

        let intake = ImageIntake::new(
            crypto,
            tag_codec,
            repository,
            dir.path().join("data"),
            dir.path().join("thumbnails"),
            100 * 1024 * 1024,
            vec!["image/".to_string()],
        );
        (intake, dir)
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::new(4, 4);
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn add_image_persists_blob_and_row() {
        let (intake, _dir) = intake().await;
        let request = IntakeRequest {
            plaintext: png_bytes(),
            original_filename: "test.png".to_string(),
            tags: vec!["Beach".to_string()],
            extra_metadata: HashMap::new(),
        };
        let record = intake.add_image(request).await.unwrap();
        assert!(PathBuf::from(&record.encrypted_path).exists());
        assert_eq!(record.mime_type.as_str(), "image/png");
    }

    #[tokio::test]
    async fn duplicate_content_is_rejected() {
        let (intake, _dir) = intake().await;
        let bytes = png_bytes();
        let first = IntakeRequest {
            plaintext: bytes.clone(),
            original_filename: "a.png".to_string(),
            tags: vec![],
            extra_metadata: HashMap::new(),
        };
        intake.add_image(first).await.unwrap();

        let second = IntakeRequest {
            plaintext: bytes,
            original_filename: "b.png".to_string(),
            tags: vec![],
            extra_metadata: HashMap::new(),
        };
        let err = intake.add_image(second).await.unwrap_err();
        assert!(matches!(err, VaultError::DuplicateContent));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let (intake, _dir) = intake().await;
        let request = IntakeRequest {
            plaintext: png_bytes(),
            original_filename: "test.png".to_string(),
            tags: vec![],
            extra_metadata: HashMap::new(),
        };
        let mut tiny_intake = intake;
        tiny_intake.max_file_size_bytes = 4;
        let err = tiny_intake.add_image(request).await.unwrap_err();
        assert!(matches!(err, VaultError::InputError(_)));
    }

    #[tokio::test]
    async fn mime_type_outside_allow_list_is_rejected() {
        let (intake, _dir) = intake().await;
        let mut restricted = intake;
        restricted.accepted_mime_prefixes = vec!["image/jpeg".to_string()];
        let request = IntakeRequest {
            plaintext: png_bytes(),
            original_filename: "test.png".to_string(),
            tags: vec![],
            extra_metadata: HashMap::new(),
        };
        let err = restricted.add_image(request).await.unwrap_err();
        assert!(matches!(err, VaultError::InputError(_)));
    }

    #[tokio::test]
    async fn delete_image_removes_blob_and_row() {
        let (intake, _dir) = intake().await;
        let request = IntakeRequest {
            plaintext: png_bytes(),
            original_filename: "test.png".to_string(),
            tags: vec![],
            extra_metadata: HashMap::new(),
        };
        let record = intake.add_image(request).await.unwrap();
        let blob_path = PathBuf::from(&record.encrypted_path);
        intake.delete_image(record.id).await.unwrap();
        assert!(!blob_path.exists());
    }
}
