use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::cost::DamageReport;
use crate::storage::S3Service;

/// Row of the weight refresh table. `id` keeps whatever key type the table uses.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightFlag {
    pub id: AttributeValue,
    pub new_weight: bool,
}

/// Audit row written for every published severity mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub group: usize,
    pub role: String,
    pub mask_url: String,
    pub mask_sha256: String,
    pub report: serde_json::Value,
    pub total_estimated_cost: f64,
    pub created_at: DateTime<Utc>,
}

impl AssessmentRecord {
    pub fn new(
        group: usize,
        role: &str,
        mask_url: &str,
        mask_png: &[u8],
        report: &DamageReport,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            group,
            role: role.to_string(),
            mask_url: mask_url.to_string(),
            mask_sha256: S3Service::calculate_image_hash(mask_png),
            report: serde_json::to_value(report)?,
            total_estimated_cost: report.total_estimated_cost,
            created_at: Utc::now(),
        })
    }
}
