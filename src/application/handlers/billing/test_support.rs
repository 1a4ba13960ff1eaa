//! Shared mock ports for billing handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::account::User;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::profile::Profile;
use crate::ports::{
    BillingProvider, EntitlementRepository, ProviderCustomer, ProviderError, ProviderSubscription,
    SaveResult, WebhookEventRecord, WebhookEventRepository,
};

// ════════════════════════════════════════════════════════════════════════════
// MockEntitlementRepository
// ════════════════════════════════════════════════════════════════════════════

pub struct MockEntitlementRepository {
    users: Mutex<Vec<User>>,
    profiles: Mutex<Vec<Profile>>,
    attach_calls: Mutex<Vec<(UserId, String)>>,
    fail_writes: AtomicBool,
}

impl MockEntitlementRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            profiles: Mutex::new(Vec::new()),
            attach_calls: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn with_user(user: User) -> Self {
        let repo = Self::new();
        repo.users.lock().unwrap().push(user);
        repo
    }

    pub fn with_user_and_profile(user: User, profile: Profile) -> Self {
        let repo = Self::new();
        repo.users.lock().unwrap().push(user);
        repo.profiles.lock().unwrap().push(profile);
        repo
    }

    /// All subsequent writes fail with a database error.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn get_users(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn get_profiles(&self) -> Vec<Profile> {
        self.profiles.lock().unwrap().clone()
    }

    pub fn attach_calls(&self) -> Vec<(UserId, String)> {
        self.attach_calls.lock().unwrap().clone()
    }

    fn write_guard(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(DomainError::new(
                ErrorCode::DatabaseError,
                "connection refused",
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EntitlementRepository for MockEntitlementRepository {
    async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, DomainError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.billing_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn attach_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        self.write_guard()?;
        self.attach_calls
            .lock()
            .unwrap()
            .push((*user_id, customer_id.to_string()));
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| &u.id == user_id) {
            Some(user) => {
                user.billing_customer_id = Some(customer_id.to_string());
                Ok(())
            }
            None => Err(DomainError::not_found("User", user_id.to_string())),
        }
    }

    async fn update_user(&self, user: &User) -> Result<(), DomainError> {
        self.write_guard()?;
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(DomainError::not_found("User", user.id.to_string())),
        }
    }

    async fn find_profile_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Profile>, DomainError> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles.iter().find(|p| &p.user_id == user_id).cloned())
    }

    async fn update_user_and_profile(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<(), DomainError> {
        self.write_guard()?;
        let mut users = self.users.lock().unwrap();
        let mut profiles = self.profiles.lock().unwrap();
        let stored_user = users.iter_mut().find(|u| u.id == user.id);
        let stored_profile = profiles.iter_mut().find(|p| p.id == profile.id);
        match (stored_user, stored_profile) {
            (Some(u), Some(p)) => {
                *u = user.clone();
                *p = profile.clone();
                Ok(())
            }
            _ => Err(DomainError::not_found("User", user.id.to_string())),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MockBillingProvider
// ════════════════════════════════════════════════════════════════════════════

pub struct MockBillingProvider {
    customers: Mutex<HashMap<String, ProviderCustomer>>,
    subscriptions: Mutex<HashMap<String, ProviderSubscription>>,
    error: Mutex<Option<ProviderError>>,
    pub customer_calls: AtomicU32,
    pub subscription_calls: AtomicU32,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self {
            customers: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            error: Mutex::new(None),
            customer_calls: AtomicU32::new(0),
            subscription_calls: AtomicU32::new(0),
        }
    }

    /// Every lookup fails with the given error.
    pub fn failing(error: ProviderError) -> Self {
        let provider = Self::new();
        *provider.error.lock().unwrap() = Some(error);
        provider
    }

    pub fn with_customer(self, id: &str, email: Option<&str>) -> Self {
        self.customers.lock().unwrap().insert(
            id.to_string(),
            ProviderCustomer {
                id: id.to_string(),
                email: email.map(String::from),
            },
        );
        self
    }

    pub fn with_subscription(self, id: &str, customer_id: &str, status: &str) -> Self {
        self.subscriptions.lock().unwrap().insert(
            id.to_string(),
            ProviderSubscription {
                id: id.to_string(),
                customer_id: customer_id.to_string(),
                status: status.to_string(),
                current_period_end: None,
                cancel_at_period_end: false,
            },
        );
        self
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProviderCustomer>, ProviderError> {
        self.customer_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.customers.lock().unwrap().get(customer_id).cloned())
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, ProviderError> {
        self.subscription_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MockWebhookEventRepository
// ════════════════════════════════════════════════════════════════════════════

pub struct MockWebhookEventRepository {
    records: Mutex<HashMap<String, WebhookEventRecord>>,
    conflict_on_save: AtomicBool,
}

impl MockWebhookEventRepository {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            conflict_on_save: AtomicBool::new(false),
        }
    }

    pub fn with_record(record: WebhookEventRecord) -> Self {
        let repo = Self::new();
        repo.records
            .lock()
            .unwrap()
            .insert(record.event_id.clone(), record);
        repo
    }

    /// Simulates a concurrent worker winning the insert race.
    pub fn conflict_on_save(&self) {
        self.conflict_on_save.store(true, Ordering::SeqCst);
    }

    pub fn get_records(&self) -> Vec<WebhookEventRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl WebhookEventRepository for MockWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.records.lock().unwrap().get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        if self.conflict_on_save.load(Ordering::SeqCst) {
            return Ok(SaveResult::AlreadyExists);
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.event_id) {
            Ok(SaveResult::AlreadyExists)
        } else {
            records.insert(record.event_id.clone(), record);
            Ok(SaveResult::Inserted)
        }
    }

    async fn delete_before(
        &self,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, DomainError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| r.processed_at >= timestamp);
        Ok((before - records.len()) as u64)
    }
}
