use crate::models::OrderRequest;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyItem,
    BlankId,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyItem => write!(f, "Field 'item' must not be empty"),
            ValidationError::BlankId => write!(f, "Order id must not be blank"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_order_request(req: &OrderRequest) -> Result<(), ValidationError> {
    if req.item.trim().is_empty() {
        return Err(ValidationError::EmptyItem);
    }

    Ok(())
}

pub fn validate_order_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::BlankId);
    }

    Ok(())
}
