use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 120;
const MAX_USERNAME_LEN: usize = 64;

/// Content names (categories, subjects, topics, exercise titles) are
/// free-form text; only emptiness and length are policed here.
fn validate_text(name: &str, entity: &str, max_len: usize) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{entity} cannot be empty"));
    }
    if name.len() > max_len {
        return Err(format!("{entity} cannot exceed {max_len} characters"));
    }
    Ok(())
}

pub fn validate_name(name: &str, entity: &str) -> Result<(), ApiError> {
    validate_text(name, entity, MAX_NAME_LEN).map_err(ApiError::bad_request)
}

pub fn validate_username(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if name.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '@')
    {
        return Err(ApiError::bad_request(
            "Username can only contain alphanumeric characters, hyphens, underscores, periods, and at signs",
        ));
    }
    Ok(())
}
