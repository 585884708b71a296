use uuid::Uuid;

use crate::errors::ServiceError;

/// Parse a comma-separated `id` query parameter.
pub fn parse_id_list(raw: Option<&str>, param: &str) -> Result<Vec<Uuid>, ServiceError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ServiceError::validation(format!("Invalid Parameter, {param} is required")));
    }
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Uuid::parse_str(s).map_err(|_| ServiceError::validation(format!("Invalid Parameter, bad {param} '{s}'"))))
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(ServiceError::validation(format!("Invalid Parameter, {param} is required")));
    }
    Ok(ids)
}
