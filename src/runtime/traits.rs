//! Trait abstractions for runtime I/O
//!
//! These traits let the session runtime run against mock collaborators in
//! tests.

use crate::db::{Database, UserProfile};
use async_trait::async_trait;
use std::sync::Arc;

/// The identity store consumed by session runtimes
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile stored under `user_id`
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, String>;

    /// Find the profile registered with `email`, case-insensitively
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, String>;

    /// Create a profile for `user_id`
    async fn create(
        &self,
        user_id: &str,
        email: &str,
        username: &str,
    ) -> Result<UserProfile, String>;

    /// Add a subject (union semantics); returns the updated profile
    async fn add_subject(&self, user_id: &str, subject: &str) -> Result<UserProfile, String>;

    /// Remove a subject (difference semantics); returns the updated profile
    async fn remove_subject(&self, user_id: &str, subject: &str) -> Result<UserProfile, String>;
}

#[async_trait]
impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, String> {
        (**self).get(user_id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, String> {
        (**self).find_by_email(email).await
    }

    async fn create(
        &self,
        user_id: &str,
        email: &str,
        username: &str,
    ) -> Result<UserProfile, String> {
        (**self).create(user_id, email, username).await
    }

    async fn add_subject(&self, user_id: &str, subject: &str) -> Result<UserProfile, String> {
        (**self).add_subject(user_id, subject).await
    }

    async fn remove_subject(&self, user_id: &str, subject: &str) -> Result<UserProfile, String> {
        (**self).remove_subject(user_id, subject).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter exposing the SQLite database as a `ProfileStore`
#[derive(Clone)]
pub struct DatabaseProfiles {
    db: Database,
}

impl DatabaseProfiles {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for DatabaseProfiles {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, String> {
        self.db.get_profile(user_id).map_err(|e| e.to_string())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, String> {
        self.db.find_by_email(email).map_err(|e| e.to_string())
    }

    async fn create(
        &self,
        user_id: &str,
        email: &str,
        username: &str,
    ) -> Result<UserProfile, String> {
        self.db
            .create_profile(user_id, email, username)
            .map_err(|e| e.to_string())
    }

    async fn add_subject(&self, user_id: &str, subject: &str) -> Result<UserProfile, String> {
        self.db
            .add_subject(user_id, subject)
            .map_err(|e| e.to_string())
    }

    async fn remove_subject(&self, user_id: &str, subject: &str) -> Result<UserProfile, String> {
        self.db
            .remove_subject(user_id, subject)
            .map_err(|e| e.to_string())
    }
}
