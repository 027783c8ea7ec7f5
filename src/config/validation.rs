use thiserror::Error;

/// First violation found while validating an engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::InvalidField { field, .. } => field,
        }
    }
}

pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidField {
        field,
        reason: reason.into(),
    }
}

/// Inclusive range check for float fields. NaN never passes.
pub(crate) fn ensure_range_f64(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("{} is outside of [{}, {}]", value, min, max),
        ))
    }
}

pub(crate) fn ensure_range_u32(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("{} is outside of [{}, {}]", value, min, max),
        ))
    }
}

pub(crate) fn ensure_range_usize(
    field: &'static str,
    value: usize,
    min: usize,
    max: usize,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("{} is outside of [{}, {}]", value, min, max),
        ))
    }
}
