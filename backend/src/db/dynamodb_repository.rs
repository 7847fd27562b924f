use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use futures::future::BoxFuture;
use std::collections::HashMap;

use super::{AssessmentLog, WeightFlagStore};
use super::models::{AssessmentRecord, WeightFlag};

#[derive(Clone)]
pub struct DynamoDbRepository {
    client: Client,
    weights_table: Option<String>,
    assessments_table: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid data format: {0}")]
    InvalidData(String),
    #[error("No table configured for {0}")]
    NotConfigured(&'static str),
}

impl DynamoDbRepository {
    pub fn new(
        client: Client,
        weights_table: Option<String>,
        assessments_table: Option<String>,
    ) -> Self {
        Self {
            client,
            weights_table,
            assessments_table,
        }
    }

    fn weights_table(&self) -> Result<&str, RepositoryError> {
        self.weights_table
            .as_deref()
            .ok_or(RepositoryError::NotConfigured("weight refresh flags"))
    }

    /// Reads the first row of the weight refresh table, if there is one.
    pub async fn get_weight_flag(&self) -> Result<Option<WeightFlag>, RepositoryError> {
        let table = self.weights_table()?;
        let result = self
            .client
            .scan()
            .table_name(table)
            .limit(1)
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        match result.items.and_then(|items| items.into_iter().next()) {
            Some(item) => Ok(Some(parse_weight_flag(item)?)),
            None => Ok(None),
        }
    }

    pub async fn clear_weight_flag(&self, flag: &WeightFlag) -> Result<(), RepositoryError> {
        let table = self.weights_table()?;
        self.client
            .update_item()
            .table_name(table)
            .key("id", flag.id.clone())
            .update_expression("SET new_weight = :new_weight")
            .expression_attribute_values(":new_weight", AttributeValue::Bool(false))
            .send()
            .await
            .map_err(|e| {
                log::error!("DynamoDB update_item failed for weight flag {:?}: {:?}", flag.id, e);
                RepositoryError::DynamoDb(e.to_string())
            })?;

        log::info!("Cleared new_weight flag in '{}'", table);
        Ok(())
    }

    pub async fn create_assessment(&self, record: &AssessmentRecord) -> Result<(), RepositoryError> {
        let table = self
            .assessments_table
            .as_deref()
            .ok_or(RepositoryError::NotConfigured("assessment records"))?;

        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::S(record.id.to_string()));
        item.insert(
            "group_index".to_string(),
            AttributeValue::N(record.group.to_string()),
        );
        item.insert("role".to_string(), AttributeValue::S(record.role.clone()));
        item.insert(
            "mask_url".to_string(),
            AttributeValue::S(record.mask_url.clone()),
        );
        item.insert(
            "mask_sha256".to_string(),
            AttributeValue::S(record.mask_sha256.clone()),
        );
        item.insert(
            "report".to_string(),
            AttributeValue::S(serde_json::to_string(&record.report)?),
        );
        item.insert(
            "total_estimated_cost".to_string(),
            AttributeValue::N(record.total_estimated_cost.to_string()),
        );
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(record.created_at.to_rfc3339()),
        );

        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| {
                log::error!("DynamoDB put_item failed for assessment {}: {:?}", record.id, e);
                RepositoryError::DynamoDb(e.to_string())
            })?;

        log::debug!("Recorded assessment {} for {}", record.id, record.role);
        Ok(())
    }
}

fn parse_weight_flag(item: HashMap<String, AttributeValue>) -> Result<WeightFlag, RepositoryError> {
    let id = item
        .get("id")
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidData("Missing id attribute".to_string()))?;
    let new_weight = match item.get("new_weight") {
        Some(AttributeValue::Bool(flag)) => *flag,
        Some(AttributeValue::N(n)) => n != "0",
        Some(other) => {
            return Err(RepositoryError::InvalidData(format!(
                "Unexpected new_weight attribute: {:?}",
                other
            )));
        }
        None => false,
    };
    Ok(WeightFlag { id, new_weight })
}

impl AssessmentLog for DynamoDbRepository {
    fn record<'a>(&'a self, record: &'a AssessmentRecord) -> BoxFuture<'a, Result<(), RepositoryError>> {
        Box::pin(self.create_assessment(record))
    }
}

impl WeightFlagStore for DynamoDbRepository {
    fn weight_flag(&self) -> BoxFuture<'_, Result<Option<WeightFlag>, RepositoryError>> {
        Box::pin(self.get_weight_flag())
    }

    fn clear<'a>(&'a self, flag: &'a WeightFlag) -> BoxFuture<'a, Result<(), RepositoryError>> {
        Box::pin(self.clear_weight_flag(flag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pairs: &[(&str, AttributeValue)]) -> HashMap<String, AttributeValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn parses_boolean_and_numeric_flags() {
        let flag = parse_weight_flag(item(&[
            ("id", AttributeValue::N("1".into())),
            ("new_weight", AttributeValue::Bool(true)),
        ]))
        .unwrap();
        assert_eq!(flag.id, AttributeValue::N("1".into()));
        assert!(flag.new_weight);

        let flag = parse_weight_flag(item(&[
            ("id", AttributeValue::S("row".into())),
            ("new_weight", AttributeValue::N("0".into())),
        ]))
        .unwrap();
        assert!(!flag.new_weight);
    }

    #[test]
    fn missing_flag_means_no_new_weights() {
        let flag = parse_weight_flag(item(&[("id", AttributeValue::S("row".into()))])).unwrap();
        assert!(!flag.new_weight);
    }

    #[test]
    fn rejects_rows_without_an_id() {
        assert!(matches!(
            parse_weight_flag(item(&[("new_weight", AttributeValue::Bool(true))])),
            Err(RepositoryError::InvalidData(_))
        ));
    }
}
