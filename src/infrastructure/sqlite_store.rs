use crate::infrastructure::document_store::{
    DocumentFields, StudyDocument, StudyDocumentStore, USERS_COLLECTION,
};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Keeps each identity's document as one JSON row.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    db_path: PathBuf,
}

impl SqliteDocumentStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    fn load(connection: &Connection, key: &str) -> Result<Option<StudyDocument>, InfraError> {
        let payload: Option<String> = connection
            .query_row(
                "SELECT payload FROM study_documents WHERE key = ?1 AND collection = ?2",
                params![key, USERS_COLLECTION],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&payload)?))
    }

    fn store(connection: &Connection, key: &str, document: &StudyDocument) -> Result<(), InfraError> {
        let payload = serde_json::to_string(document)?;
        connection.execute(
            "INSERT INTO study_documents (key, collection, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
               payload = excluded.payload,
               updated_at = excluded.updated_at",
            params![key, USERS_COLLECTION, payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[async_trait]
impl StudyDocumentStore for SqliteDocumentStore {
    async fn read_document(&self, key: &str) -> Result<Option<StudyDocument>, InfraError> {
        let connection = self.connect()?;
        Self::load(&connection, key)
    }

    async fn create_document(&self, key: &str, initial: &StudyDocument) -> Result<(), InfraError> {
        let connection = self.connect()?;
        Self::store(&connection, key, initial)
    }

    async fn merge_fields(&self, key: &str, fields: &DocumentFields) -> Result<(), InfraError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        let mut document =
            Self::load(&transaction, key)?.ok_or_else(|| InfraError::NotFound(key.to_string()))?;
        document.merge(fields);
        Self::store(&transaction, key, &document)?;
        transaction.commit()?;
        Ok(())
    }
}
