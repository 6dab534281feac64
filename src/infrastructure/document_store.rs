use crate::domain::models::{DailyLedger, StudyData, Subject};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

pub const USERS_COLLECTION: &str = "users";

/// Stored per-identity document. Every field is optional on read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<Subject>>,
    #[serde(rename = "studyRecords", default, skip_serializing_if = "Option::is_none")]
    pub study_records: Option<DailyLedger>,
}

impl StudyDocument {
    pub fn initial() -> Self {
        Self {
            subjects: Some(Vec::new()),
            study_records: Some(DailyLedger::new()),
        }
    }

    pub fn into_study_data(self) -> StudyData {
        StudyData::normalized(self.subjects, self.study_records)
    }

    /// Replaces each field present in `fields`; absent fields are kept.
    pub fn merge(&mut self, fields: &DocumentFields) {
        if let Some(subjects) = &fields.subjects {
            self.subjects = Some(subjects.clone());
        }
        if let Some(study_records) = &fields.study_records {
            self.study_records = Some(study_records.clone());
        }
    }
}

impl From<&StudyData> for StudyDocument {
    fn from(data: &StudyData) -> Self {
        Self {
            subjects: Some(data.subjects.clone()),
            study_records: Some(data.daily_ledger.clone()),
        }
    }
}

/// Partial update: each present field is written wholesale.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DocumentFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<Subject>>,
    #[serde(rename = "studyRecords", skip_serializing_if = "Option::is_none")]
    pub study_records: Option<DailyLedger>,
}

impl DocumentFields {
    pub fn subjects(subjects: Vec<Subject>) -> Self {
        Self {
            subjects: Some(subjects),
            study_records: None,
        }
    }

    pub fn with_study_records(mut self, study_records: DailyLedger) -> Self {
        self.study_records = Some(study_records);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_none() && self.study_records.is_none()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.subjects.is_some() {
            names.push("subjects");
        }
        if self.study_records.is_some() {
            names.push("studyRecords");
        }
        names
    }
}

#[async_trait]
pub trait StudyDocumentStore: Send + Sync {
    async fn read_document(&self, key: &str) -> Result<Option<StudyDocument>, InfraError>;

    async fn create_document(&self, key: &str, initial: &StudyDocument) -> Result<(), InfraError>;

    async fn merge_fields(&self, key: &str, fields: &DocumentFields) -> Result<(), InfraError>;
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<String, StudyDocument>>,
}

impl InMemoryDocumentStore {
    pub fn with_document(key: &str, document: StudyDocument) -> Self {
        Self {
            documents: Mutex::new(HashMap::from([(key.to_string(), document)])),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StudyDocument>>, InfraError> {
        self.documents
            .lock()
            .map_err(|error| InfraError::Lock(format!("document store lock poisoned: {error}")))
    }

    pub fn snapshot(&self, key: &str) -> Result<Option<StudyDocument>, InfraError> {
        Ok(self.lock()?.get(key).cloned())
    }
}

#[async_trait]
impl StudyDocumentStore for InMemoryDocumentStore {
    async fn read_document(&self, key: &str) -> Result<Option<StudyDocument>, InfraError> {
        self.snapshot(key)
    }

    async fn create_document(&self, key: &str, initial: &StudyDocument) -> Result<(), InfraError> {
        self.lock()?.insert(key.to_string(), initial.clone());
        Ok(())
    }

    async fn merge_fields(&self, key: &str, fields: &DocumentFields) -> Result<(), InfraError> {
        let mut documents = self.lock()?;
        let document = documents
            .get_mut(key)
            .ok_or_else(|| InfraError::NotFound(key.to_string()))?;
        document.merge(fields);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{SubjectColor, SubjectDraft};

    fn subject(id: &str) -> Subject {
        Subject::from_draft(id, &SubjectDraft::new("Math", SubjectColor::Blue))
    }

    #[test]
    fn document_without_records_normalizes_to_empty_ledger() {
        let document: StudyDocument = serde_json::from_value(serde_json::json!({
            "subjects": [{ "id": "s1", "displayName": "Math" }]
        }))
        .expect("deserialize document");
        let data = document.into_study_data();
        assert_eq!(data.subjects.len(), 1);
        assert!(data.daily_ledger.is_empty());

        let empty: StudyDocument = serde_json::from_str("{}").expect("deserialize empty");
        assert_eq!(empty.into_study_data(), StudyData::empty());
    }

    #[test]
    fn fields_serialize_only_present_entries() {
        let fields = DocumentFields::subjects(vec![subject("s1")]);
        let value = serde_json::to_value(&fields).expect("serialize fields");
        assert!(value.get("subjects").is_some());
        assert!(value.get("studyRecords").is_none());
        assert_eq!(fields.field_names(), vec!["subjects"]);
        assert!(DocumentFields::default().is_empty());
    }

    #[tokio::test]
    async fn merge_replaces_only_present_fields() {
        let mut ledger = DailyLedger::new();
        ledger.add_minutes("2026-10-14", "s1", 25);
        let store = InMemoryDocumentStore::default();
        store
            .create_document(
                "user-1",
                &StudyDocument {
                    subjects: Some(vec![subject("s1")]),
                    study_records: Some(ledger.clone()),
                },
            )
            .await
            .expect("create");

        store
            .merge_fields("user-1", &DocumentFields::subjects(vec![subject("s1"), subject("s2")]))
            .await
            .expect("merge");

        let stored = store
            .read_document("user-1")
            .await
            .expect("read")
            .expect("document exists");
        assert_eq!(stored.subjects.map(|subjects| subjects.len()), Some(2));
        assert_eq!(stored.study_records, Some(ledger));
    }

    #[tokio::test]
    async fn merge_into_missing_document_fails() {
        let store = InMemoryDocumentStore::default();
        let result = store
            .merge_fields("nobody", &DocumentFields::subjects(Vec::new()))
            .await;
        assert!(result.is_err());
    }
}
