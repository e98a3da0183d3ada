//! Display models for table and JSON output
//!
//! Display models turn domain types into CLI-friendly rows with column
//! names and serialization.

use serde::Serialize;
use tabled::Tabled;

use crate::collections::CollectionSummary;
use crate::output::formatters::truncate_string;
use crate::router::BucketInfo;

const DESCRIPTION_WIDTH: usize = 40;

/// One collection row
#[derive(Debug, Clone, Tabled, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDisplay {
    #[tabled(rename = "ADDRESS")]
    pub address: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "COVER")]
    pub cover: String,

    #[tabled(rename = "DESCRIPTION")]
    pub description: String,
}

impl From<&CollectionSummary> for CollectionDisplay {
    fn from(summary: &CollectionSummary) -> Self {
        Self {
            address: summary.address.clone(),
            name: summary.name.clone(),
            cover: summary.cover.clone().unwrap_or_else(|| "-".to_string()),
            description: truncate_string(&summary.description, DESCRIPTION_WIDTH),
        }
    }
}

/// One router bucket row
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct BucketDisplay {
    #[tabled(rename = "BUCKET")]
    pub name: String,

    #[tabled(rename = "ENTRIES")]
    pub entries: usize,

    #[tabled(rename = "VERSION")]
    pub status: String,
}

impl From<BucketInfo> for BucketDisplay {
    fn from(bucket: BucketInfo) -> Self {
        Self {
            name: bucket.name,
            entries: bucket.entries,
            status: if bucket.current { "current" } else { "outdated" }.to_string(),
        }
    }
}
