use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    validate_creator, validate_image_url, validate_label_list, validate_service_id,
    validate_service_name, validate_service_price, ValidationError, ValidationResult,
};

/// One purchasable spa service as read from the document store.
///
/// Field names on the wire follow the stored documents (`ServiceName`,
/// `Price`, ...), so records round-trip through local storage unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    #[serde(rename = "Creator")]
    pub creator: String,
    #[serde(rename = "Price")]
    pub price: Decimal,
    #[serde(rename = "ServiceName")]
    pub name: String,
    #[serde(
        rename = "Description",
        alias = "Details",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        rename = "ImageUrl",
        alias = "imageUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(rename = "Customizations", default, skip_serializing_if = "Vec::is_empty")]
    pub customizations: Vec<String>,
    #[serde(rename = "Sizes", default, skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<String>,
}

/// Unchecked document as it arrives from a catalog source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "Creator", default)]
    pub creator: Option<String>,
    #[serde(rename = "Price", default)]
    pub price: Option<Decimal>,
    #[serde(rename = "ServiceName", default)]
    pub name: Option<String>,
    #[serde(rename = "Description", alias = "Details", default)]
    pub description: Option<String>,
    #[serde(rename = "ImageUrl", alias = "imageUrl", default)]
    pub image_url: Option<String>,
    #[serde(rename = "Customizations", default)]
    pub customizations: Option<Vec<String>>,
    #[serde(rename = "Sizes", default)]
    pub sizes: Option<Vec<String>>,
}

impl ServiceRecord {
    /// Validate a raw document into a record. The store-assigned id wins over
    /// any `id` field embedded in the document body.
    pub fn from_document(id: &str, document: ServiceDocument) -> ValidationResult<Self> {
        validate_service_id(id)?;

        let name = document.name.ok_or_else(|| ValidationError::RequiredField {
            field: "ServiceName".to_string(),
        })?;
        validate_service_name(&name)?;

        let creator = document.creator.ok_or_else(|| ValidationError::RequiredField {
            field: "Creator".to_string(),
        })?;
        validate_creator(&creator)?;

        let price = document.price.ok_or_else(|| ValidationError::RequiredField {
            field: "Price".to_string(),
        })?;
        validate_service_price(&price)?;

        let image_url = document
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        if let Some(url) = &image_url {
            validate_image_url(url)?;
        }

        let customizations = document.customizations.unwrap_or_default();
        validate_label_list("Customizations", &customizations)?;

        let sizes = document.sizes.unwrap_or_default();
        validate_label_list("Sizes", &sizes)?;

        Ok(Self {
            id: id.trim().to_string(),
            creator: creator.trim().to_string(),
            price,
            name: name.trim().to_string(),
            description: document
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            image_url,
            customizations,
            sizes,
        })
    }

    /// Case-insensitive substring match on the display name only.
    /// `needle_lower` must already be lower-cased.
    pub fn name_contains(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
    }
}
