use async_trait::async_trait;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument};

use crate::models::{RepositoryError, RepositoryResult, ServiceDocument, ServiceRecord};

/// Read access to the hosted service collection
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Read every valid service record in the collection
    async fn find_all(&self) -> RepositoryResult<Vec<ServiceRecord>>;
}

/// DynamoDB implementation of the ServiceRepository trait
pub struct DynamoDbServiceRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbServiceRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    /// Create a DynamoDB subsegment span with X-Ray attributes
    fn create_dynamodb_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "aws.request_id" = tracing::field::Empty,
            "aws.remote.service" = "AWS::DynamoDB",
            "aws.remote.operation" = operation,
            "aws.remote.resource.type" = "AWS::DynamoDB::Table",
            "aws.remote.resource.identifier" = %self.table_name,
            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),
            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonDynamoDBv2",
            "rpc.method" = operation,
            "http.status_code" = tracing::field::Empty,
            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,
            "component" = "aws-sdk-dynamodb",
        )
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Convert a DynamoDB item into an unchecked document. Returns the
    /// document key alongside it.
    pub fn item_to_document(
        &self,
        item: &HashMap<String, AttributeValue>,
    ) -> RepositoryResult<(String, ServiceDocument)> {
        let id = item
            .get("id")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidDocument {
                id: "<unknown>".to_string(),
                message: "Missing id".to_string(),
            })?
            .clone();

        let price = match item.get("Price") {
            Some(value) => {
                let raw = value
                    .as_n()
                    .or_else(|_| value.as_s())
                    .map_err(|_| RepositoryError::InvalidDocument {
                        id: id.clone(),
                        message: "Price is neither a number nor a string".to_string(),
                    })?;
                let price =
                    Decimal::from_str(raw.trim()).map_err(|e| RepositoryError::InvalidDocument {
                        id: id.clone(),
                        message: format!("Invalid Price '{}': {}", raw, e),
                    })?;
                Some(price)
            }
            None => None,
        };

        let document = ServiceDocument {
            id: Some(id.clone()),
            creator: string_attribute(item, &["Creator"]),
            price,
            name: string_attribute(item, &["ServiceName"]),
            description: string_attribute(item, &["Description", "Details"]),
            image_url: string_attribute(item, &["ImageUrl", "imageUrl"]),
            customizations: list_attribute(item, "Customizations"),
            sizes: list_attribute(item, "Sizes"),
        };

        Ok((id, document))
    }

    fn map_dynamodb_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);

        if let DynamoDbError::ResourceNotFoundException(_) = error {
            return RepositoryError::TableNotFound {
                table_name: self.table_name.clone(),
            };
        }

        RepositoryError::AwsSdk {
            message: error.to_string(),
        }
    }
}

fn string_attribute(item: &HashMap<String, AttributeValue>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| item.get(*name).and_then(|v| v.as_s().ok()).cloned())
}

/// String lists are stored either as a list of strings or as a string set
fn list_attribute(item: &HashMap<String, AttributeValue>, name: &str) -> Option<Vec<String>> {
    let value = item.get(name)?;

    if let Ok(list) = value.as_l() {
        return Some(
            list.iter()
                .filter_map(|v| v.as_s().ok().cloned())
                .collect(),
        );
    }

    value.as_ss().ok().cloned()
}

#[async_trait]
impl ServiceRepository for DynamoDbServiceRepository {
    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<ServiceRecord>> {
        info!("Reading service collection");

        let mut services = Vec::new();
        let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;
        let mut pages = 0usize;

        loop {
            let scan_span = self.create_dynamodb_span("Scan");

            let output = async {
                let result = self
                    .client
                    .scan()
                    .table_name(&self.table_name)
                    .select(Select::AllAttributes)
                    .set_exclusive_start_key(exclusive_start_key.clone())
                    .send()
                    .await;

                match &result {
                    Ok(output) => {
                        tracing::Span::current().record("http.status_code", 200);
                        if let Some(request_id) = output.request_id() {
                            tracing::Span::current().record("aws.request_id", request_id);
                        }
                    }
                    Err(e) => {
                        tracing::Span::current().record("http.status_code", 400);
                        error!("DynamoDB Scan failed: {}", e);
                    }
                }

                result.map_err(|e| self.map_dynamodb_error(e.into()))
            }
            .instrument(scan_span)
            .await?;

            pages += 1;

            for item in output.items() {
                let (id, document) = match self.item_to_document(item) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!("Failed to parse service item: {}", e);
                        continue;
                    }
                };

                match ServiceRecord::from_document(&id, document) {
                    Ok(record) => services.push(record),
                    Err(e) => {
                        warn!(service_id = %id, "Skipping invalid service document: {}", e);
                    }
                }
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }

        info!(pages = pages, "Found {} services", services.len());
        Ok(services)
    }
}

/// Catalog held in memory, optionally seeded from a JSON file of documents
#[derive(Debug, Clone, Default)]
pub struct InMemoryServiceRepository {
    services: Vec<ServiceRecord>,
}

impl InMemoryServiceRepository {
    pub fn new(services: Vec<ServiceRecord>) -> Self {
        Self { services }
    }

    /// Load a JSON array of service documents. Each document must carry its
    /// `id`; documents that fail validation are skipped.
    pub async fn from_json_file(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            RepositoryError::SourceUnreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        let services = Self::parse_documents(&contents)?;
        info!(path = %path.display(), "Seeded {} services", services.len());
        Ok(Self { services })
    }

    pub fn parse_documents(json: &str) -> RepositoryResult<Vec<ServiceRecord>> {
        let documents: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let mut services = Vec::with_capacity(documents.len());

        for (index, value) in documents.into_iter().enumerate() {
            let document: ServiceDocument = match serde_json::from_value(value) {
                Ok(document) => document,
                Err(e) => {
                    warn!(index = index, "Failed to parse service document: {}", e);
                    continue;
                }
            };

            let Some(id) = document.id.clone() else {
                warn!(index = index, "Skipping service document without id");
                continue;
            };

            match ServiceRecord::from_document(&id, document) {
                Ok(record) => services.push(record),
                Err(e) => warn!(service_id = %id, "Skipping invalid service document: {}", e),
            }
        }

        Ok(services)
    }
}

#[async_trait]
impl ServiceRepository for InMemoryServiceRepository {
    async fn find_all(&self) -> RepositoryResult<Vec<ServiceRecord>> {
        Ok(self.services.clone())
    }
}
