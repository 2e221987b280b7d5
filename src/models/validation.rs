use rust_decimal::Decimal;
use std::collections::HashSet;

use super::{ServiceDocument, ValidationError, ValidationResult};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_SERVICE_ID_LENGTH: usize = 128;
pub const MAX_SERVICE_NAME_LENGTH: usize = 200;
pub const MAX_CREATOR_LENGTH: usize = 100;
pub const MAX_IMAGE_URL_LENGTH: usize = 2048;
pub const MAX_LABEL_LENGTH: usize = 100;
pub const MAX_LABELS_COUNT: usize = 50;
pub const MAX_SESSION_ID_LENGTH: usize = 100;
pub const MAX_PRICE: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 0);

impl Validate for ServiceDocument {
    fn validate(&self) -> ValidationResult<()> {
        match &self.name {
            Some(name) => validate_service_name(name)?,
            None => {
                return Err(ValidationError::RequiredField {
                    field: "ServiceName".to_string(),
                })
            }
        }
        match &self.price {
            Some(price) => validate_service_price(price)?,
            None => {
                return Err(ValidationError::RequiredField {
                    field: "Price".to_string(),
                })
            }
        }
        if let Some(creator) = &self.creator {
            validate_creator(creator)?;
        }
        if let Some(labels) = &self.customizations {
            validate_label_list("Customizations", labels)?;
        }
        if let Some(labels) = &self.sizes {
            validate_label_list("Sizes", labels)?;
        }
        Ok(())
    }
}

/// Validate a store-assigned service identifier
pub fn validate_service_id(id: &str) -> ValidationResult<()> {
    let trimmed = id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "id".to_string(),
        });
    }

    if trimmed.len() > MAX_SERVICE_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max_length: MAX_SERVICE_ID_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if trimmed.contains('/') {
        return Err(ValidationError::InvalidFormat {
            field: "id".to_string(),
            expected: "Document identifier without '/'".to_string(),
        });
    }

    Ok(())
}

/// Validate the display name of a service
pub fn validate_service_name(name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "ServiceName".to_string(),
        });
    }

    if trimmed.len() > MAX_SERVICE_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "ServiceName".to_string(),
            max_length: MAX_SERVICE_NAME_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if trimmed
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(ValidationError::InvalidValue {
            field: "ServiceName".to_string(),
            value: name.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate the creator name
pub fn validate_creator(creator: &str) -> ValidationResult<()> {
    let trimmed = creator.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "Creator".to_string(),
        });
    }

    if trimmed.len() > MAX_CREATOR_LENGTH {
        return Err(ValidationError::TooLong {
            field: "Creator".to_string(),
            max_length: MAX_CREATOR_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    Ok(())
}

/// Validate a service price. Prices are in the minor unit of the store
/// currency and may be zero (complimentary services) but never negative.
pub fn validate_service_price(price: &Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::InvalidValue {
            field: "Price".to_string(),
            value: price.to_string(),
            reason: "Price cannot be negative".to_string(),
        });
    }

    if *price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "Price".to_string(),
            min: "0".to_string(),
            max: MAX_PRICE.to_string(),
            value: price.to_string(),
        });
    }

    Ok(())
}

/// Validate an image reference
pub fn validate_image_url(url: &str) -> ValidationResult<()> {
    if url.len() > MAX_IMAGE_URL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "ImageUrl".to_string(),
            max_length: MAX_IMAGE_URL_LENGTH,
            actual_length: url.len(),
        });
    }

    if url.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "ImageUrl".to_string(),
            expected: "URI without whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validate a list of labels (customizations, size labels)
pub fn validate_label_list(field: &str, labels: &[String]) -> ValidationResult<()> {
    if labels.len() > MAX_LABELS_COUNT {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: labels.len().to_string(),
            reason: format!("Too many labels, maximum allowed: {}", MAX_LABELS_COUNT),
        });
    }

    let mut seen = HashSet::new();

    for (index, label) in labels.iter().enumerate() {
        let trimmed = label.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("{}[{}]", field, index),
                value: label.clone(),
                reason: "Label cannot be empty".to_string(),
            });
        }

        if trimmed.len() > MAX_LABEL_LENGTH {
            return Err(ValidationError::TooLong {
                field: format!("{}[{}]", field, index),
                max_length: MAX_LABEL_LENGTH,
                actual_length: trimmed.len(),
            });
        }

        if !seen.insert(trimmed.to_lowercase()) {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                value: label.clone(),
                reason: "Duplicate label found".to_string(),
            });
        }
    }

    Ok(())
}

/// Validate a browsing session identifier
pub fn validate_session_id(session_id: &str) -> ValidationResult<()> {
    let trimmed = session_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "session_id".to_string(),
        });
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "session_id".to_string(),
            expected:
                "Session ID must contain only alphanumeric characters, hyphens, and underscores"
                    .to_string(),
        });
    }

    if trimmed.len() > MAX_SESSION_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: "session_id".to_string(),
            max_length: MAX_SESSION_ID_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_service_name() {
        assert!(validate_service_name("Foot Massage").is_ok());
        assert!(validate_service_name("Gội đầu dưỡng sinh").is_ok());

        assert!(validate_service_name("").is_err());
        assert!(validate_service_name("   ").is_err());
        assert!(validate_service_name(&"a".repeat(MAX_SERVICE_NAME_LENGTH + 1)).is_err());
        assert!(validate_service_name("Bad\x00Name").is_err());
    }

    #[test]
    fn test_validate_service_price() {
        assert!(validate_service_price(&dec!(0)).is_ok());
        assert!(validate_service_price(&dec!(150000)).is_ok());
        assert!(validate_service_price(&dec!(12.5)).is_ok());

        assert!(validate_service_price(&dec!(-1)).is_err());
        assert!(validate_service_price(&dec!(-0.01)).is_err());
        assert!(validate_service_price(&(MAX_PRICE + dec!(1))).is_err());
    }

    #[test]
    fn test_validate_service_id() {
        assert!(validate_service_id("abc123XYZ").is_ok());

        assert!(validate_service_id("").is_err());
        assert!(validate_service_id("Service/abc").is_err());
        assert!(validate_service_id(&"x".repeat(MAX_SERVICE_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_label_list() {
        assert!(validate_label_list("Sizes", &[]).is_ok());
        assert!(validate_label_list("Sizes", &["S".to_string(), "M".to_string()]).is_ok());

        assert!(validate_label_list("Sizes", &["".to_string()]).is_err());
        assert!(validate_label_list("Sizes", &["M".to_string(), "m".to_string()]).is_err());
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("session-1_a").is_ok());

        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../etc/passwd").is_err());
        assert!(validate_session_id(&"a".repeat(MAX_SESSION_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_service_document_validation() {
        let document = ServiceDocument {
            name: Some("Towel Service".to_string()),
            price: Some(dec!(20000)),
            creator: Some("Mai".to_string()),
            ..Default::default()
        };
        assert!(document.validate().is_ok());

        let document = ServiceDocument {
            name: Some("Towel Service".to_string()),
            ..Default::default()
        };
        assert!(document.validate().is_err());
    }
}
