//! Core data types shared across acquisition and analytics.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A resolved pointer to one dataset asset inside a registry release.
///
/// Immutable once resolved; a new reference is built per process startup
/// or on an explicit tag change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// The resolved release tag. When the caller asked for `latest`, this
    /// is the concrete tag the registry reported, not the alias.
    pub tag: String,
    pub asset_name: String,
    pub download_url: String,
    /// Asset size as recorded by the registry, when it reports one.
    pub size: Option<u64>,
}

/// A complete local copy of a dataset artifact.
///
/// Owned by the fetcher; existence of `path` implies the download finished
/// and was atomically promoted. Consumers only ever read the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub tag: String,
    pub acquired_at: DateTime<Utc>,
}

/// One order-item-level transaction from the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFact {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: NaiveDate,
    pub revenue: f64,
    pub is_return: bool,
    /// 1..=5 when the order was reviewed, `None` otherwise.
    pub review_score: Option<u8>,
}

/// One day of marketing spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendFact {
    pub date: NaiveDate,
    pub spend: f64,
}

/// Marketing spend is an optional source table: some artifacts simply do
/// not carry it, and that is an expected state rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SpendSource {
    Present(Vec<SpendFact>),
    Absent,
}

impl SpendSource {
    pub fn is_present(&self) -> bool {
        matches!(self, SpendSource::Present(_))
    }
}
