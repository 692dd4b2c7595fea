use super::{types::Config, ConfigError};
use crate::identifier::Placeholder;

/// Validate configuration
/// Currently validates:
/// - Template is non-empty and uses only supported placeholders
/// - Fallback entries are header-field placeholders
/// - Worker count and converter timeout are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let conversion = &config.conversion;

    if conversion.template.as_str().trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "conversion.template cannot be empty".to_string(),
        ));
    }
    conversion
        .template
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("conversion.template: {}", e)))?;

    for token in &conversion.fallback_placeholders {
        let is_field = Placeholder::from_token(token).is_some_and(|p| p.field().is_some());
        if !is_field {
            return Err(ConfigError::ValidationError(format!(
                "conversion.fallback_placeholders: {} is not a header field placeholder",
                token
            )));
        }
    }

    if conversion.max_workers == Some(0) {
        return Err(ConfigError::ValidationError(
            "conversion.max_workers cannot be 0".to_string(),
        ));
    }

    if config.converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
