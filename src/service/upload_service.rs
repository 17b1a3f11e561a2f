// service/upload_service.rs
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    service::{
        storage::{StorageBackend, StorageError},
        watermark_service::{resolve_display_source, Watermarker},
    },
    utils::i18n::{translate, translate_with, Language},
};

const PDF: &[&str] = &["application/pdf"];
const IMAGES: &[&str] = &["image/jpeg", "image/png", "image/webp"];
const PDF_OR_IMAGE: &[&str] = &["application/pdf", "image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Contract,
    Voucher,
    PropertyImage,
    PropertyPlan,
    FranchiseDocument,
}

impl UploadKind {
    pub fn parse(value: &str) -> Option<UploadKind> {
        match value {
            "contract" => Some(UploadKind::Contract),
            "voucher" => Some(UploadKind::Voucher),
            "property_image" | "property-image" => Some(UploadKind::PropertyImage),
            "property_plan" | "property-plan" => Some(UploadKind::PropertyPlan),
            "franchise_document" | "franchise-document" => Some(UploadKind::FranchiseDocument),
            _ => None,
        }
    }

    pub fn bucket(&self) -> &'static str {
        match self {
            UploadKind::Contract => "contracts",
            UploadKind::Voucher => "vouchers",
            UploadKind::PropertyImage => "property-images",
            UploadKind::PropertyPlan => "property-plans",
            UploadKind::FranchiseDocument => "franchise-documents",
        }
    }

    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Contract => PDF,
            UploadKind::PropertyImage => IMAGES,
            UploadKind::Voucher | UploadKind::PropertyPlan | UploadKind::FranchiseDocument => {
                PDF_OR_IMAGE
            }
        }
    }

    pub fn default_limits(&self) -> UploadLimits {
        let (max_files, max_size_mb) = match self {
            UploadKind::Contract => (1, 10),
            UploadKind::Voucher => (3, 5),
            UploadKind::PropertyImage => (20, 5),
            UploadKind::PropertyPlan => (5, 10),
            UploadKind::FranchiseDocument => (10, 10),
        };
        UploadLimits {
            max_files,
            max_size_mb,
        }
    }

    pub fn watermarked(&self) -> bool {
        matches!(self, UploadKind::PropertyImage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_size_mb: u64,
}

impl UploadLimits {
    /// Applies caller-requested limits. They can only tighten the kind's own.
    pub fn narrowed(self, max_files: Option<usize>, max_size_mb: Option<u64>) -> Self {
        UploadLimits {
            max_files: max_files.map_or(self.max_files, |n| n.min(self.max_files)),
            max_size_mb: max_size_mb.map_or(self.max_size_mb, |n| n.min(self.max_size_mb)),
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone)]
pub struct PendingFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl PendingFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "application/pdf" => "pdf",
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum UploadError {
    #[error("Too many files: {attempted} exceeds the maximum of {max}")]
    TooManyFiles { attempted: usize, max: usize },

    #[error("File {file_name} is larger than {max_size_mb} MB")]
    FileTooLarge { file_name: String, max_size_mb: u64 },

    #[error("File {file_name} has a disallowed type {content_type}")]
    InvalidFileType {
        file_name: String,
        content_type: String,
    },

    #[error("No files were provided")]
    EmptyBatch,

    #[error("Index {index} is out of range for {len} files")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UploadError {
    pub fn message_key(&self) -> &'static str {
        match self {
            UploadError::TooManyFiles { .. } => "upload.too_many_files",
            UploadError::FileTooLarge { .. } => "upload.file_too_large",
            UploadError::InvalidFileType { .. } => "upload.invalid_type",
            UploadError::EmptyBatch => "upload.empty",
            UploadError::IndexOutOfRange { .. } => "upload.index_out_of_range",
            UploadError::Storage(StorageError::QuotaExceeded(_)) => "upload.quota_exceeded",
            UploadError::Storage(StorageError::Network(_)) => "upload.network",
            UploadError::Storage(StorageError::Timeout) => "upload.timeout",
            UploadError::Storage(_) => "upload.server",
        }
    }

    pub fn localized(&self, lang: Language) -> String {
        match self {
            UploadError::TooManyFiles { max, .. } => {
                translate_with(lang, self.message_key(), &[("max", max.to_string())])
            }
            UploadError::FileTooLarge {
                file_name,
                max_size_mb,
            } => translate_with(
                lang,
                self.message_key(),
                &[("file", file_name.clone()), ("max", max_size_mb.to_string())],
            ),
            UploadError::InvalidFileType { file_name, .. } => {
                translate_with(lang, self.message_key(), &[("file", file_name.clone())])
            }
            _ => translate(lang, self.message_key()).to_string(),
        }
    }

    pub fn into_http_error(self, lang: Language) -> HttpError {
        let message = self.localized(lang);
        match self {
            UploadError::Storage(StorageError::QuotaExceeded(_)) => {
                HttpError::payload_too_large(message)
            }
            UploadError::Storage(StorageError::Timeout) => {
                HttpError::new(message, axum::http::StatusCode::GATEWAY_TIMEOUT)
            }
            UploadError::Storage(StorageError::Rejected { .. }) => HttpError::bad_request(message),
            UploadError::Storage(_) => {
                HttpError::new(message, axum::http::StatusCode::BAD_GATEWAY)
            }
            _ => HttpError::bad_request(message),
        }
    }
}

/// Checks a batch before anything touches storage: total count first, then
/// each file's size, then each file's declared MIME type.
pub fn validate_batch(
    kind: UploadKind,
    limits: UploadLimits,
    existing: usize,
    files: &[PendingFile],
) -> Result<(), UploadError> {
    if files.is_empty() {
        return Err(UploadError::EmptyBatch);
    }

    let attempted = existing + files.len();
    if attempted > limits.max_files {
        return Err(UploadError::TooManyFiles {
            attempted,
            max: limits.max_files,
        });
    }

    if let Some(file) = files.iter().find(|f| f.size() > limits.max_size_bytes()) {
        return Err(UploadError::FileTooLarge {
            file_name: file.file_name.clone(),
            max_size_mb: limits.max_size_mb,
        });
    }

    let allowed = kind.allowed_mime_types();
    if let Some(file) = files
        .iter()
        .find(|f| !allowed.contains(&f.content_type.as_str()))
    {
        return Err(UploadError::InvalidFileType {
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
        });
    }

    Ok(())
}

pub fn remove_at(urls: &[String], index: usize) -> Result<Vec<String>, UploadError> {
    if index >= urls.len() {
        return Err(UploadError::IndexOutOfRange {
            index,
            len: urls.len(),
        });
    }

    Ok(urls
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, url)| url.clone())
        .collect())
}

pub fn object_key(file: &PendingFile) -> String {
    format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        file.extension()
    )
}

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn StorageBackend>,
    watermarker: Arc<dyn Watermarker>,
}

impl UploadService {
    pub fn new(storage: Arc<dyn StorageBackend>, watermarker: Arc<dyn Watermarker>) -> Self {
        Self {
            storage,
            watermarker,
        }
    }

    /// Validates and stores a batch. Uploads run concurrently and join
    /// all-or-nothing: a single failure returns the error and no URL is kept.
    /// Returns `existing` followed by the new URLs.
    pub async fn upload_batch(
        &self,
        kind: UploadKind,
        limits: UploadLimits,
        existing: Vec<String>,
        files: Vec<PendingFile>,
    ) -> Result<Vec<String>, UploadError> {
        validate_batch(kind, limits, existing.len(), &files)?;

        tracing::info!(
            "Uploading {} file(s) to {} ({} already attached)",
            files.len(),
            kind.bucket(),
            existing.len()
        );

        let uploads = files.into_iter().map(|file| {
            let storage = self.storage.clone();
            async move {
                let key = object_key(&file);
                storage
                    .upload(kind.bucket(), &key, file.data, &file.content_type)
                    .await
                    .map_err(|e| {
                        tracing::error!("Upload of {} failed: {}", file.file_name, e);
                        UploadError::from(e)
                    })
            }
        });

        let mut uploaded = try_join_all(uploads).await?;

        if kind.watermarked() {
            let watermarker = self.watermarker.as_ref();
            let storage = self.storage.as_ref();
            uploaded = join_all(
                uploaded
                    .into_iter()
                    .map(|url| resolve_display_source(watermarker, storage, url)),
            )
            .await;
        }

        let mut urls = existing;
        urls.extend(uploaded);
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::watermark_service::tests::{FailingWatermarker, SuffixWatermarker};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStorage {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl CountingStorage {
        fn new(fail_on: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_on,
            })
        }
    }

    #[async_trait]
    impl StorageBackend for CountingStorage {
        async fn upload(
            &self,
            bucket: &str,
            key: &str,
            _data: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, StorageError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(n) {
                return Err(StorageError::QuotaExceeded("bucket full".to_string()));
            }
            Ok(self.public_url(bucket, key))
        }

        fn public_url(&self, bucket: &str, key: &str) -> String {
            format!("http://storage.test/files/{}/{}", bucket, key)
        }

        fn owns_url(&self, url: &str) -> bool {
            url.starts_with("http://storage.test/files/")
        }
    }

    fn file(name: &str, content_type: &str, size: usize) -> PendingFile {
        PendingFile {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            data: vec![0u8; size],
        }
    }

    fn service(storage: Arc<CountingStorage>) -> UploadService {
        UploadService::new(
            storage,
            Arc::new(FailingWatermarker {
                calls: AtomicUsize::new(0),
            }),
        )
    }

    const MB: usize = 1024 * 1024;

    #[tokio::test]
    async fn count_overflow_makes_no_storage_call() {
        let storage = CountingStorage::new(None);
        let limits = UploadLimits {
            max_files: 5,
            max_size_mb: 5,
        };
        let existing = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let files = vec![
            file("1.jpg", "image/jpeg", 10),
            file("2.jpg", "image/jpeg", 10),
            file("3.jpg", "image/jpeg", 10),
        ];

        let err = service(storage.clone())
            .upload_batch(UploadKind::PropertyImage, limits, existing, files)
            .await
            .unwrap_err();

        assert_eq!(err, UploadError::TooManyFiles { attempted: 6, max: 5 });
        assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversize_file_is_rejected_before_upload() {
        let storage = CountingStorage::new(None);
        let limits = UploadLimits {
            max_files: 5,
            max_size_mb: 1,
        };
        let files = vec![
            file("small.jpg", "image/jpeg", 10),
            file("big.jpg", "image/jpeg", MB + 1),
        ];

        let err = service(storage.clone())
            .upload_batch(UploadKind::PropertyImage, limits, vec![], files)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::FileTooLarge { ref file_name, .. } if file_name == "big.jpg"));
        assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn file_exactly_at_limit_is_accepted() {
        let limits = UploadLimits {
            max_files: 1,
            max_size_mb: 1,
        };
        assert!(validate_batch(
            UploadKind::PropertyImage,
            limits,
            0,
            &[file("edge.png", "image/png", MB)]
        )
        .is_ok());
    }

    #[test]
    fn contract_accepts_only_pdf_regardless_of_extension() {
        let limits = UploadKind::Contract.default_limits();

        let disguised = file("contrato.pdf", "image/png", 10);
        assert!(matches!(
            validate_batch(UploadKind::Contract, limits, 0, &[disguised]),
            Err(UploadError::InvalidFileType { .. })
        ));

        let real = file("contrato.bin", "application/pdf", 10);
        assert!(validate_batch(UploadKind::Contract, limits, 0, &[real]).is_ok());
    }

    #[test]
    fn validation_reports_count_before_size_before_type() {
        let limits = UploadLimits {
            max_files: 1,
            max_size_mb: 1,
        };
        let files = [
            file("a.exe", "application/x-msdownload", 2 * MB),
            file("b.exe", "application/x-msdownload", 2 * MB),
        ];
        assert!(matches!(
            validate_batch(UploadKind::Voucher, limits, 0, &files),
            Err(UploadError::TooManyFiles { .. })
        ));
        assert!(matches!(
            validate_batch(UploadKind::Voucher, limits, 0, &files[..1]),
            Err(UploadError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn requested_limits_never_widen_the_kind_limits() {
        let limits = UploadKind::Voucher.default_limits().narrowed(Some(50), Some(1));
        assert_eq!(limits.max_files, 3);
        assert_eq!(limits.max_size_mb, 1);
    }

    #[test]
    fn remove_at_preserves_order_and_shortens_list() {
        let urls: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();

        let remaining = remove_at(&urls, 1).unwrap();

        assert_eq!(remaining, vec!["a", "c", "d"]);
        assert_eq!(
            remove_at(&urls, 4),
            Err(UploadError::IndexOutOfRange { index: 4, len: 4 })
        );
    }

    #[tokio::test]
    async fn one_failing_upload_fails_the_batch_with_quota_message() {
        let storage = CountingStorage::new(Some(2));
        let limits = UploadLimits {
            max_files: 5,
            max_size_mb: 5,
        };
        let files = vec![
            file("1.jpg", "image/jpeg", 10),
            file("2.jpg", "image/jpeg", 10),
            file("3.jpg", "image/jpeg", 10),
        ];

        let err = service(storage)
            .upload_batch(UploadKind::PropertyImage, limits, vec![], files)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Storage(StorageError::QuotaExceeded(_))));
        assert_eq!(
            err.localized(Language::Es),
            "El almacenamiento está lleno. Contacte al administrador"
        );
        assert_eq!(
            err.into_http_error(Language::Es).status,
            axum::http::StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn successful_batch_appends_to_existing_urls() {
        let storage = CountingStorage::new(None);

        let urls = service(storage)
            .upload_batch(
                UploadKind::Voucher,
                UploadKind::Voucher.default_limits(),
                vec!["http://storage.test/files/vouchers/old.pdf".to_string()],
                vec![file("nuevo.pdf", "application/pdf", 100)],
            )
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "http://storage.test/files/vouchers/old.pdf");
        assert!(urls[1].starts_with("http://storage.test/files/vouchers/"));
        assert!(urls[1].ends_with(".pdf"));
    }

    #[tokio::test]
    async fn property_images_keep_original_url_when_watermark_fails() {
        let storage = CountingStorage::new(None);
        let urls = service(storage)
            .upload_batch(
                UploadKind::PropertyImage,
                UploadKind::PropertyImage.default_limits(),
                vec![],
                vec![file("casa.jpg", "image/jpeg", 100)],
            )
            .await
            .unwrap();

        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("http://storage.test/files/property-images/"));
        assert!(!urls[0].contains("/watermarked/"));
    }

    #[tokio::test]
    async fn property_images_use_watermarked_url_when_available() {
        let storage = CountingStorage::new(None);
        let service = UploadService::new(storage, Arc::new(SuffixWatermarker));

        let urls = service
            .upload_batch(
                UploadKind::PropertyImage,
                UploadKind::PropertyImage.default_limits(),
                vec![],
                vec![file("casa.png", "image/png", 100)],
            )
            .await
            .unwrap();

        assert!(urls[0].contains("/property-images/watermarked/"));
    }

    #[test]
    fn error_messages_are_localized() {
        let err = UploadError::TooManyFiles { attempted: 4, max: 3 };
        assert_eq!(err.localized(Language::En), "Too many files. Maximum allowed: 3");
        assert_eq!(
            UploadError::Storage(StorageError::Network("dns".into())).localized(Language::Es),
            "Error de conexión. Verifique su conexión a internet"
        );
    }
}
