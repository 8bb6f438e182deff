use crate::error::{Error, Result};

/// Passes when the principal owns the resource, otherwise `Forbidden`.
pub fn ensure_owner(principal_id: i64, owner_id: i64) -> Result<()> {
    if principal_id == owner_id {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}
