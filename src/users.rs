//! Demo user registration behind an injectable store.
//!
//! This is a placeholder for a real account system: passwords are stored and
//! compared in plaintext and the "token" handed back is the user id. The
//! [`UserStore`] trait is the seam where a persistent implementation would
//! plug in without touching the routes.

use crate::error::SnapTexError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Role chosen at sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Student,
    Educator,
}

/// A stored user, password included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub user_type: UserType,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Public view of a user: everything except the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
}

impl From<DemoUser> for UserResponse {
    fn from(u: DemoUser) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            user_type: u.user_type,
            created_at: u.created_at,
        }
    }
}

/// Storage for demo users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; fails with [`SnapTexError::UserExists`] on a taken email.
    async fn create(&self, user: NewUser) -> Result<DemoUser, SnapTexError>;

    async fn find_by_email(&self, email: &str) -> Option<DemoUser>;

    async fn find_by_id(&self, id: Uuid) -> Option<DemoUser>;
}

/// Check email and password, returning the matching user.
pub async fn authenticate(store: &dyn UserStore, creds: &Credentials) -> Result<DemoUser, SnapTexError> {
    match store.find_by_email(&creds.email).await {
        Some(user) if user.password == creds.password => Ok(user),
        _ => Err(SnapTexError::InvalidCredentials),
    }
}

/// Process-local store; contents vanish on restart.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, DemoUser>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<DemoUser, SnapTexError> {
        // Held across the duplicate check so two registrations cannot race.
        let mut users = self.users.write().await;
        if users.values().any(|u| same_email(&u.email, &user.email)) {
            return Err(SnapTexError::UserExists { email: user.email });
        }

        let record = DemoUser {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email.trim().to_string(),
            user_type: user.user_type,
            password: user.password,
            created_at: Utc::now(),
        };
        users.insert(record.id, record.clone());
        info!("Registered demo user {} ({:?})", record.id, record.user_type);
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Option<DemoUser> {
        self.users
            .read()
            .await
            .values()
            .find(|u| same_email(&u.email, email))
            .cloned()
    }

    async fn find_by_id(&self, id: Uuid) -> Option<DemoUser> {
        self.users.read().await.get(&id).cloned()
    }
}
