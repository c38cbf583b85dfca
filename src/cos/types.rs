//! COS types and response structures

use serde::{Deserialize, Serialize};

/// Bucket entry from the service listing
///
/// The service reports full names as `{name}-{app_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    /// Logical bucket name, without the application id suffix
    pub name: String,
    /// Application id the bucket belongs to
    pub app_id: String,
    /// Region the bucket lives in (e.g. ap-guangzhou)
    pub region: String,
    /// Creation timestamp as reported by the service
    pub creation_date: Option<String>,
}

impl BucketInfo {
    /// Full bucket name as used in hostnames
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.app_id)
    }
}

/// Response from the GET Service (list buckets) operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBucketsResponse {
    pub owner_id: Option<String>,
    pub owner_display_name: Option<String>,
    pub buckets: Vec<BucketInfo>,
}

/// Response from PUT Object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutObjectOutput {
    /// ETag header, quotes stripped
    pub etag: Option<String>,
}
