use serde::{Deserialize, Serialize};

use crate::service::upload_service::UploadKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveFileDto {
    pub urls: Vec<String>,
    pub index: usize,
}

/// The new authoritative list the caller should keep.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileListDto {
    pub status: String,
    pub kind: Option<UploadKind>,
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientErrorReportDto {
    pub message: String,
    pub source: Option<String>,
    pub stack: Option<String>,
    pub url: Option<String>,
}
