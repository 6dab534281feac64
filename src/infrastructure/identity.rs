use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Ok,
    Failed(String),
}

impl AuthOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("email and password are required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub credentials: Credentials,
    pub confirm_password: String,
}

impl Registration {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Credentials::new(email, password),
            confirm_password: confirm_password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.credentials.validate()?;
        if self.credentials.password != self.confirm_password {
            return Err("passwords do not match".to_string());
        }
        Ok(())
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Yields `None` while signed out.
    fn current_identity(&self) -> watch::Receiver<Option<Identity>>;

    async fn sign_in(&self, credentials: &Credentials) -> AuthOutcome;

    async fn sign_up(&self, registration: &Registration) -> AuthOutcome;

    async fn sign_out(&self) -> AuthOutcome;
}

struct LocalAccount {
    id: String,
    password: String,
}

/// In-process accounts keyed by lowercase email.
pub struct LocalIdentityProvider {
    accounts: Mutex<HashMap<String, LocalAccount>>,
    current: watch::Sender<Option<Identity>>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            current,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, LocalAccount>>, InfraError> {
        self.accounts
            .lock()
            .map_err(|error| InfraError::Lock(format!("identity accounts lock poisoned: {error}")))
    }

    fn publish(&self, identity: Option<Identity>) {
        self.current.send_replace(identity);
    }

    fn register(&self, credentials: &Credentials) -> Result<Identity, String> {
        let email = credentials.email.trim().to_ascii_lowercase();
        let mut accounts = self.lock().map_err(|error| error.to_string())?;
        if accounts.contains_key(&email) {
            return Err(format!("an account already exists for {email}"));
        }
        let id = Uuid::new_v4().to_string();
        accounts.insert(
            email.clone(),
            LocalAccount {
                id: id.clone(),
                password: credentials.password.clone(),
            },
        );
        Ok(Identity { id, email })
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<Identity, String> {
        let email = credentials.email.trim().to_ascii_lowercase();
        let accounts = self.lock().map_err(|error| error.to_string())?;
        match accounts.get(&email) {
            Some(account) if account.password == credentials.password => Ok(Identity {
                id: account.id.clone(),
                email,
            }),
            _ => Err("invalid email or password".to_string()),
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn current_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    async fn sign_in(&self, credentials: &Credentials) -> AuthOutcome {
        if let Err(message) = credentials.validate() {
            return AuthOutcome::Failed(message);
        }
        match self.authenticate(credentials) {
            Ok(identity) => {
                tracing::info!(identity = %identity.id, "signed in");
                self.publish(Some(identity));
                AuthOutcome::Ok
            }
            Err(message) => {
                tracing::warn!(error = %message, "sign-in rejected");
                AuthOutcome::Failed(message)
            }
        }
    }

    async fn sign_up(&self, registration: &Registration) -> AuthOutcome {
        if let Err(message) = registration.validate() {
            return AuthOutcome::Failed(message);
        }
        match self.register(&registration.credentials) {
            Ok(identity) => {
                tracing::info!(identity = %identity.id, "account created");
                self.publish(Some(identity));
                AuthOutcome::Ok
            }
            Err(message) => AuthOutcome::Failed(message),
        }
    }

    async fn sign_out(&self) -> AuthOutcome {
        self.publish(None);
        tracing::info!("signed out");
        AuthOutcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_checks_run_before_the_provider() {
        assert_eq!(
            Credentials::new("", "secret").validate(),
            Err("email and password are required".to_string())
        );
        assert_eq!(
            Registration::new("a@example.com", "one", "two").validate(),
            Err("passwords do not match".to_string())
        );
        assert!(Registration::new("a@example.com", "same", "same").validate().is_ok());
    }

    #[tokio::test]
    async fn sign_up_sign_out_sign_in_publishes_identity() {
        let provider = LocalIdentityProvider::new();
        let receiver = provider.current_identity();
        assert!(receiver.borrow().is_none());

        let outcome = provider
            .sign_up(&Registration::new("Student@Example.com", "pw", "pw"))
            .await;
        assert!(outcome.is_ok());
        let created = receiver.borrow().clone().expect("identity after sign-up");
        assert_eq!(created.email, "student@example.com");

        assert!(provider.sign_out().await.is_ok());
        assert!(receiver.borrow().is_none());

        let outcome = provider
            .sign_in(&Credentials::new("student@example.com", "pw"))
            .await;
        assert!(outcome.is_ok());
        assert_eq!(receiver.borrow().clone(), Some(created));
    }

    #[tokio::test]
    async fn wrong_password_and_duplicate_account_fail() {
        let provider = LocalIdentityProvider::new();
        assert!(provider.sign_up(&Registration::new("a@example.com", "pw", "pw")).await.is_ok());
        assert!(matches!(
            provider.sign_up(&Registration::new("a@example.com", "pw", "pw")).await,
            AuthOutcome::Failed(_)
        ));
        provider.sign_out().await;
        assert_eq!(
            provider.sign_in(&Credentials::new("a@example.com", "nope")).await,
            AuthOutcome::Failed("invalid email or password".to_string())
        );
        assert!(provider.current_identity().borrow().is_none());
    }
}
