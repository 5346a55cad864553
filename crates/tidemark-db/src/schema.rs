//! Schema checks run once at startup.

use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::info;

use tidemark_core::{Error, Result};

/// Columns that store bookmark embeddings. Both share one dimension.
pub const EMBEDDING_COLUMNS: [&str; 2] = ["title_embedding", "summary_embedding"];

/// Declared dimension of each embedding column, as `(column, atttypmod)`.
const EMBEDDING_TYPMOD_SQL: &str = "SELECT a.attname::text AS column_name, a.atttypmod \
     FROM pg_attribute a \
     WHERE a.attrelid = 'bookmark'::regclass \
       AND a.attname = ANY($1::text[]) \
       AND NOT a.attisdropped";

/// pgvector stores a column's dimension as its type modifier; an
/// unconstrained `vector` column has none.
pub fn dimension_from_typmod(typmod: i32) -> Option<usize> {
    usize::try_from(typmod).ok().filter(|d| *d > 0)
}

/// Fail unless every declared column dimension equals `configured`.
pub fn check_embedding_dimension(
    columns: &[(String, Option<usize>)],
    configured: usize,
) -> Result<()> {
    for (column, declared) in columns {
        if let Some(declared) = declared {
            if *declared != configured {
                return Err(Error::Config(format!(
                    "Embedding dimension {} does not match bookmark.{} (vector({})); \
                     set OLLAMA_EMBED_DIM to {} or migrate the column",
                    configured, column, declared, declared
                )));
            }
        }
    }
    Ok(())
}

/// Read the embedding column dimensions and compare them to `configured`.
pub async fn verify_embedding_dimension(pool: &PgPool, configured: usize) -> Result<()> {
    let names: Vec<String> = EMBEDDING_COLUMNS.iter().map(|c| c.to_string()).collect();
    let rows = sqlx::query(EMBEDDING_TYPMOD_SQL)
        .bind(&names)
        .fetch_all(pool)
        .await?;

    let columns = rows
        .iter()
        .map(|row| -> Result<(String, Option<usize>)> {
            let name: String = row.try_get("column_name")?;
            let typmod: i32 = row.try_get("atttypmod")?;
            Ok((name, dimension_from_typmod(typmod)))
        })
        .collect::<Result<Vec<_>>>()?;

    if columns.len() != EMBEDDING_COLUMNS.len() {
        return Err(Error::Config(format!(
            "bookmark table is missing embedding columns (found {} of {})",
            columns.len(),
            EMBEDDING_COLUMNS.len()
        )));
    }

    check_embedding_dimension(&columns, configured)?;
    info!(
        subsystem = "db",
        component = "schema",
        dimension = configured,
        "Embedding columns match configured dimension"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(dims: [Option<usize>; 2]) -> Vec<(String, Option<usize>)> {
        EMBEDDING_COLUMNS
            .iter()
            .zip(dims)
            .map(|(name, dim)| (name.to_string(), dim))
            .collect()
    }

    #[test]
    fn test_dimension_from_typmod() {
        assert_eq!(dimension_from_typmod(768), Some(768));
        assert_eq!(dimension_from_typmod(-1), None);
        assert_eq!(dimension_from_typmod(0), None);
    }

    #[test]
    fn test_matching_dimension_passes() {
        assert!(check_embedding_dimension(&columns([Some(768), Some(768)]), 768).is_ok());
    }

    #[test]
    fn test_mismatched_dimension_is_config_error() {
        let err = check_embedding_dimension(&columns([Some(768), Some(768)]), 1024).unwrap_err();
        match err {
            Error::Config(message) => {
                assert!(message.contains("1024"));
                assert!(message.contains("bookmark.title_embedding"));
                assert!(message.contains("vector(768)"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_unconstrained_column_accepts_any_dimension() {
        assert!(check_embedding_dimension(&columns([None, None]), 1024).is_ok());
        assert!(check_embedding_dimension(&columns([None, Some(768)]), 1024).is_err());
    }
}
