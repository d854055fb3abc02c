use crate::common::error::AppError;

// ---
// Helpers de erro do banco
// ---

/// Converte violações de chave única / estrangeira em erros de domínio.
/// Qualquer outro erro segue como `DatabaseError` (500).
pub(crate) fn map_constraint_error(e: sqlx::Error, conflict_message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(conflict_message.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::InvalidPayload("Um dos registros referenciados não existe.".to_string());
        }
    }
    e.into()
}

/// Mesma conversão para erros que já saíram do repositório como `AppError`.
pub(crate) fn remap_constraint_error(e: AppError, conflict_message: &str) -> AppError {
    match e {
        AppError::DatabaseError(inner) => map_constraint_error(inner, conflict_message),
        other => other,
    }
}

/// `fetch_optional` -> `NotFound` quando a linha não existe.
pub(crate) fn found<T>(row: Option<T>, what: &'static str) -> Result<T, AppError> {
    row.ok_or(AppError::NotFound(what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_row_is_not_found() {
        let err = found::<u8>(None, "Serviço").unwrap_err();
        assert!(matches!(err, AppError::NotFound("Serviço")));
        assert_eq!(found(Some(3), "Serviço").unwrap(), 3);
    }

    #[test]
    fn non_database_errors_pass_through() {
        let err = map_constraint_error(sqlx::Error::RowNotFound, "duplicado");
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[test]
    fn domain_errors_are_not_remapped() {
        let err = remap_constraint_error(AppError::NotFound("Formulário"), "duplicado");
        assert!(matches!(err, AppError::NotFound("Formulário")));
    }
}
