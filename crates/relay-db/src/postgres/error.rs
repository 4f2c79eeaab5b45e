//! Error mapping for SQLx failures

use relay_core::DomainError;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub(crate) fn map_db_error(e: SqlxError) -> DomainError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_check_violation() {
            return DomainError::ValidationError(db_err.message().to_string());
        }
        if db_err.is_foreign_key_violation() {
            return DomainError::ValidationError("referenced room does not exist".to_string());
        }
    }
    DomainError::DatabaseError(e.to_string())
}
