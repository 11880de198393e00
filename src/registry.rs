//! In-memory user registry.
//!
//! Provides a thread-safe store of [`User`] records with:
//! - Generated identities that are never reused
//! - Case-normalized, unique email addresses
//! - Insertion-ordered listing and case-insensitive search
//!
//! All state lives behind a single `RwLock`. Every read-modify-write
//! sequence (uniqueness check + insert, uniqueness check + update,
//! existence check + delete) runs under one write guard, so two racing
//! `create` calls with the same email can never both succeed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Timestamp format used for `created_at` on the wire.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A registered user. Values handed out by the registry are snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creation time rendered the way every binding reports it.
    pub fn created_at_string(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

/// Partial update. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Domain failures raised by registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Email {0} is already used by another user")]
    DuplicateEmail(String),

    #[error("User ID {0} does not exist")]
    NotFound(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Lock-protected registry state.
///
/// `users` is keyed by an insertion sequence number so iteration yields
/// insertion order; `ids` and `emails` are auxiliary indexes kept in step
/// with it under the same guard.
#[derive(Default)]
struct Inner {
    users: BTreeMap<u64, User>,
    ids: HashMap<String, u64>,
    emails: HashMap<String, String>,
    next_seq: u64,
}

impl Inner {
    fn lookup(&self, id: &str) -> Option<(u64, &User)> {
        let seq = *self.ids.get(id)?;
        self.users.get(&seq).map(|user| (seq, user))
    }

    fn email_owner(&self, email: &str) -> Option<&str> {
        self.emails.get(email).map(String::as_str)
    }
}

/// Thread-safe user registry
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Arc<Self> {
        info!("Initializing user registry");
        Arc::new(Self {
            inner: RwLock::new(Inner::default()),
        })
    }

    // Mutations validate before touching any map, so a guard poisoned by a
    // panicking reader or writer still protects consistent state.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a user from a name and email
    pub fn create(&self, name: &str, email: &str) -> RegistryResult<User> {
        let name = normalize_name(name)?;
        let email = normalize_email(email)?;

        let mut inner = self.write();
        if inner.email_owner(&email).is_some() {
            return Err(RegistryError::DuplicateEmail(email));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            created_at: Utc::now(),
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.ids.insert(user.id.clone(), seq);
        inner.emails.insert(user.email.clone(), user.id.clone());
        inner.users.insert(seq, user.clone());

        info!(id = %user.id, name = %user.name, email = %user.email, "Created user");
        Ok(user)
    }

    /// Get a user by identity
    pub fn get(&self, id: &str) -> RegistryResult<User> {
        self.read()
            .lookup(id)
            .map(|(_, user)| user.clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// List every user in insertion order
    pub fn list(&self) -> Vec<User> {
        self.read().users.values().cloned().collect()
    }

    /// Apply a partial update to a user.
    ///
    /// Existence is checked before the supplied fields are validated.
    pub fn update(&self, id: &str, patch: UserPatch) -> RegistryResult<User> {
        let mut inner = self.write();
        let (seq, current) = inner
            .lookup(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let old_email = current.email.clone();

        let name = patch.name.as_deref().map(normalize_name).transpose()?;
        let email = patch.email.as_deref().map(normalize_email).transpose()?;

        if let Some(email) = &email {
            if matches!(inner.email_owner(email), Some(owner) if owner != id) {
                return Err(RegistryError::DuplicateEmail(email.clone()));
            }
        }

        let Some(user) = inner.users.get_mut(&seq) else {
            return Err(RegistryError::NotFound(id.to_string()));
        };
        let before = format!("{} ({})", user.name, user.email);
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        let updated = user.clone();

        if updated.email != old_email {
            inner.emails.remove(&old_email);
            inner
                .emails
                .insert(updated.email.clone(), updated.id.clone());
        }

        info!(
            id = %updated.id,
            before = %before,
            after = %format!("{} ({})", updated.name, updated.email),
            "Updated user"
        );
        Ok(updated)
    }

    /// Delete a user, returning the removed record
    pub fn delete(&self, id: &str) -> RegistryResult<User> {
        let mut inner = self.write();
        let seq = inner
            .ids
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let user = inner
            .users
            .remove(&seq)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        inner.emails.remove(&user.email);

        info!(id = %user.id, name = %user.name, "Deleted user");
        Ok(user)
    }

    /// Case-insensitive substring search over name and email.
    ///
    /// A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<User> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let results: Vec<User> = self
            .read()
            .users
            .values()
            .filter(|user| {
                user.name.to_lowercase().contains(&query) || user.email.contains(&query)
            })
            .cloned()
            .collect();

        debug!(query = %query, matches = results.len(), "Searched users");
        results
    }

    /// Number of live users
    pub fn len(&self) -> usize {
        self.read().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert the sample users used for demos. Existing emails are skipped.
    pub fn seed_sample_users(&self) {
        for (name, email) in SAMPLE_USERS {
            if let Err(e) = self.create(name, email) {
                debug!(error = %e, "Skipping sample user");
            }
        }
    }
}

const SAMPLE_USERS: [(&str, &str); 3] = [
    ("Lucy", "lucy@example.com"),
    ("David", "david@example.com"),
    ("Kevin", "kevin@example.com"),
];

fn normalize_name(name: &str) -> RegistryResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistryError::InvalidInput(
            "Username cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn normalize_email(email: &str) -> RegistryResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(RegistryError::InvalidInput(
            "Email cannot be empty".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(RegistryError::InvalidInput(
            "Invalid email format".to_string(),
        ));
    }
    Ok(email.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_create_then_get() {
        let registry = Registry::new();

        let created = registry.create("  Lucy ", " Lucy@Example.COM ").unwrap();
        assert_eq!(created.name, "Lucy");
        assert_eq!(created.email, "lucy@example.com");

        let fetched = registry.get(&created.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let registry = Registry::new();

        assert!(matches!(
            registry.create("   ", "a@b.c"),
            Err(RegistryError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.create("Ann", ""),
            Err(RegistryError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.create("Ann", "not-an-email"),
            Err(RegistryError::InvalidInput(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_email_is_case_insensitive() {
        let registry = Registry::new();

        registry.create("Lucy", "lucy@example.com").unwrap();
        let result = registry.create("Other Lucy", "LUCY@example.com");
        assert_eq!(
            result,
            Err(RegistryError::DuplicateEmail("lucy@example.com".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_create_same_email_single_winner() {
        let registry = Registry::new();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let email = if i % 2 == 0 {
                        "race@example.com"
                    } else {
                        "RACE@example.com"
                    };
                    registry.create(&format!("racer-{i}"), email)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(RegistryError::DuplicateEmail(_))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_update_and_create_same_email_single_winner() {
        let registry = Registry::new();
        let existing: Vec<User> = (0..8)
            .map(|i| {
                registry
                    .create(&format!("user-{i}"), &format!("user{i}@example.com"))
                    .unwrap()
            })
            .collect();

        let mut handles: Vec<_> = existing
            .iter()
            .map(|user| {
                let registry = Arc::clone(&registry);
                let id = user.id.clone();
                thread::spawn(move || {
                    registry
                        .update(
                            &id,
                            UserPatch {
                                name: None,
                                email: Some("Target@example.com".to_string()),
                            },
                        )
                        .map(|_| ())
                })
            })
            .collect();
        handles.push({
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.create("Newcomer", "target@example.com").map(|_| ()))
        });

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, RegistryError::DuplicateEmail(_))));

        // Email index and records agree
        let holders = registry.search("target@example.com");
        assert_eq!(holders.len(), 1);
        let emails: HashSet<_> = registry.list().into_iter().map(|u| u.email).collect();
        assert_eq!(emails.len(), registry.len());

        // Losing updaters kept their own address
        for user in &existing {
            let current = registry.get(&user.id).unwrap();
            assert!(current.email == user.email || current.id == holders[0].id);
        }
    }

    #[test]
    fn test_update_changes_only_supplied_fields() {
        let registry = Registry::new();
        let user = registry.create("David", "david@example.com").unwrap();

        let updated = registry
            .update(
                &user.id,
                UserPatch {
                    name: Some("Dave".to_string()),
                    email: None,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Dave");
        assert_eq!(updated.email, "david@example.com");
        assert_eq!(updated.created_at, user.created_at);

        let updated = registry
            .update(
                &user.id,
                UserPatch {
                    name: None,
                    email: Some("Dave@Example.com".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Dave");
        assert_eq!(updated.email, "dave@example.com");

        // The old address is free again
        registry.create("New David", "david@example.com").unwrap();
    }

    #[test]
    fn test_update_duplicate_email_excludes_self() {
        let registry = Registry::new();
        let lucy = registry.create("Lucy", "lucy@example.com").unwrap();
        registry.create("Kevin", "kevin@example.com").unwrap();

        // Re-submitting its own email is allowed
        let same = registry
            .update(
                &lucy.id,
                UserPatch {
                    name: None,
                    email: Some("LUCY@example.com".to_string()),
                },
            )
            .unwrap();
        assert_eq!(same.email, "lucy@example.com");

        let clash = registry.update(
            &lucy.id,
            UserPatch {
                name: Some("Renamed".to_string()),
                email: Some("kevin@example.com".to_string()),
            },
        );
        assert!(matches!(clash, Err(RegistryError::DuplicateEmail(_))));

        // A failed update leaves the record untouched
        assert_eq!(registry.get(&lucy.id).unwrap().name, "Lucy");
    }

    #[test]
    fn test_update_validation_and_missing() {
        let registry = Registry::new();
        let user = registry.create("Kevin", "kevin@example.com").unwrap();

        let result = registry.update(
            &user.id,
            UserPatch {
                name: Some("  ".to_string()),
                email: None,
            },
        );
        assert!(matches!(result, Err(RegistryError::InvalidInput(_))));

        let result = registry.update("missing", UserPatch::default());
        assert_eq!(
            result,
            Err(RegistryError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_delete_removes_and_identity_not_reused() {
        let registry = Registry::new();
        let user = registry.create("Lucy", "lucy@example.com").unwrap();

        let removed = registry.delete(&user.id).unwrap();
        assert_eq!(removed.id, user.id);
        assert!(matches!(
            registry.get(&user.id),
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            registry.delete(&user.id),
            Err(RegistryError::NotFound(_))
        ));

        let mut seen = HashSet::new();
        seen.insert(user.id.clone());
        for i in 0..50 {
            let next = registry
                .create("Lucy", &format!("lucy{i}@example.com"))
                .unwrap();
            assert!(seen.insert(next.id));
        }
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let registry = Registry::new();
        let a = registry.create("A", "a@example.com").unwrap();
        let b = registry.create("B", "b@example.com").unwrap();
        let c = registry.create("C", "c@example.com").unwrap();
        registry.delete(&b.id).unwrap();
        let d = registry.create("D", "d@example.com").unwrap();

        let ids: Vec<_> = registry.list().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![a.id, c.id, d.id]);
    }

    #[test]
    fn test_search() {
        let registry = Registry::new();
        registry.seed_sample_users();

        assert!(registry.search("").is_empty());
        assert!(registry.search("   ").is_empty());

        let hits = registry.search("LUC");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Lucy");

        // Matches on email too
        assert_eq!(registry.search("EXAMPLE.com").len(), 3);
        assert_eq!(registry.search("vid@").len(), 1);
        assert!(registry.search("nobody").is_empty());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let registry = Registry::new();
        registry.seed_sample_users();
        registry.seed_sample_users();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_user_serializes_timestamp() {
        let registry = Registry::new();
        let user = registry.create("Lucy", "lucy@example.com").unwrap();

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], user.id.as_str());
        assert_eq!(json["created_at"], user.created_at_string().as_str());
    }
}
