//! Mapping of database errors onto ledger errors

use core_kernel::LedgerError;

/// Converts a SQLx error into the ledger's error vocabulary
///
/// Connection-level problems become [`LedgerError::Unavailable`]; everything
/// the database itself rejected becomes [`LedgerError::Storage`] with the
/// PostgreSQL error code attached.
pub fn map_sqlx_error(error: sqlx::Error) -> LedgerError {
    match &error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            LedgerError::Unavailable("connection pool exhausted or closed".to_string())
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => {
            LedgerError::Unavailable(error.to_string())
        }
        sqlx::Error::Database(db_err) => {
            // https://www.postgresql.org/docs/current/errcodes-appendix.html
            match db_err.code() {
                Some(code) => LedgerError::Storage(format!("[{}] {}", code, db_err.message())),
                None => LedgerError::Storage(db_err.message().to_string()),
            }
        }
        sqlx::Error::Migrate(_) => LedgerError::Storage(format!("migration failed: {}", error)),
        _ => LedgerError::Storage(error.to_string()),
    }
}
