use crate::infrastructure::document_store::{
    DocumentFields, StudyDocument, StudyDocumentStore, USERS_COLLECTION,
};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

/// Document store served over HTTP as `{base}/users/{key}`.
#[derive(Debug, Clone)]
pub struct RestDocumentStore {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl RestDocumentStore {
    pub fn new(base_url: &str) -> Result<Self, InfraError> {
        let base_url = Url::parse(base_url)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid store base url: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(format!(
                "store base url cannot be a base: {base_url}"
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.bearer_token = Some(token).filter(|value| !value.trim().is_empty());
        self
    }

    fn document_endpoint(&self, key: &str) -> Result<Url, InfraError> {
        if key.trim().is_empty() {
            return Err(InfraError::InvalidConfig("document key must not be empty".to_string()));
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("store base url cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push(USERS_COLLECTION);
            segments.push(key);
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn http_error(action: &str, status: StatusCode, body: &str) -> InfraError {
        if body.trim().is_empty() {
            InfraError::Http(format!("{action} failed: http {}", status.as_u16()))
        } else {
            InfraError::Http(format!("{action} failed: http {}; body={body}", status.as_u16()))
        }
    }

    async fn send(&self, action: &str, request: RequestBuilder) -> Result<(StatusCode, String), InfraError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while {action}: {error}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading response while {action}: {error}")))?;
        Ok((status, body))
    }
}

#[async_trait]
impl StudyDocumentStore for RestDocumentStore {
    async fn read_document(&self, key: &str) -> Result<Option<StudyDocument>, InfraError> {
        let url = self.document_endpoint(key)?;
        let (status, body) = self
            .send("reading study document", self.client.get(url))
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::http_error("read study document", status, &body));
        }

        let document = serde_json::from_str::<StudyDocument>(&body).map_err(|error| {
            InfraError::Http(format!("invalid study document payload: {error}; body={body}"))
        })?;
        Ok(Some(document))
    }

    async fn create_document(&self, key: &str, initial: &StudyDocument) -> Result<(), InfraError> {
        let url = self.document_endpoint(key)?;
        let (status, body) = self
            .send("creating study document", self.client.put(url).json(initial))
            .await?;
        if !status.is_success() {
            return Err(Self::http_error("create study document", status, &body));
        }
        Ok(())
    }

    async fn merge_fields(&self, key: &str, fields: &DocumentFields) -> Result<(), InfraError> {
        let url = self.document_endpoint(key)?;
        let (status, body) = self
            .send("updating study document", self.client.patch(url).json(fields))
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Err(InfraError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(Self::http_error("update study document", status, &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_endpoint_appends_collection_and_key() {
        let store = RestDocumentStore::new("https://store.example.com/v1/").expect("valid url");
        let url = store.document_endpoint("user/1").expect("endpoint");
        assert_eq!(url.as_str(), "https://store.example.com/v1/users/user%2F1");

        let store = RestDocumentStore::new("https://store.example.com/v1").expect("valid url");
        let url = store.document_endpoint("abc").expect("endpoint");
        assert_eq!(url.as_str(), "https://store.example.com/v1/users/abc");
    }

    #[test]
    fn rejects_invalid_base_and_blank_key() {
        assert!(RestDocumentStore::new("not a url").is_err());
        assert!(RestDocumentStore::new("mailto:someone@example.com").is_err());
        let store = RestDocumentStore::new("https://store.example.com").expect("valid url");
        assert!(store.document_endpoint("  ").is_err());
    }

    #[test]
    fn blank_bearer_token_is_ignored() {
        let store = RestDocumentStore::new("https://store.example.com")
            .expect("valid url")
            .with_bearer_token("   ");
        assert!(store.bearer_token.is_none());
    }
}
