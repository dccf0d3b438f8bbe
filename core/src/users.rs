use std::collections::HashMap;

use crate::api::User;
use crate::api::UserId;

/// Status assumed for users the server did not report on.
pub const DEFAULT_STATUS: &str = "offline";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub status: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<UserId, UserInfo>,
}

impl UserDirectory {
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        let mut dir = Self::default();
        for user in users {
            dir.insert(user);
        }
        dir
    }

    /// Add or rename a user. An existing status is preserved.
    pub fn insert(&mut self, user: User) {
        let User { id, username } = user;
        self.users
            .entry(id.clone())
            .and_modify(|info| info.username = username.clone())
            .or_insert_with(|| UserInfo {
                id,
                username,
                status: DEFAULT_STATUS.to_string(),
            });
    }

    pub fn get(&self, id: &UserId) -> Option<&UserInfo> {
        self.users.get(id)
    }

    pub fn username(&self, id: &UserId) -> Option<&str> {
        self.users.get(id).map(|info| info.username.as_str())
    }

    pub fn ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.users.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn set_status(&mut self, id: &UserId, status: impl Into<String>) -> bool {
        match self.users.get_mut(id) {
            Some(info) => {
                info.status = status.into();
                true
            }
            None => false,
        }
    }

    /// Overwrite every known user's status from `statuses`, falling back to
    /// [`DEFAULT_STATUS`] for users missing from the map.
    pub fn apply_statuses(&mut self, statuses: &HashMap<UserId, String>) {
        for (id, info) in &mut self.users {
            info.status = statuses
                .get(id)
                .cloned()
                .unwrap_or_else(|| DEFAULT_STATUS.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user(id: &str, name: &str) -> User {
        User {
            id: UserId::new(id),
            username: name.to_string(),
        }
    }

    #[test]
    fn missing_statuses_default_to_offline() {
        let mut dir = UserDirectory::from_users([user("u1", "ana"), user("u2", "bo")]);
        dir.set_status(&UserId::new("u2"), "away");
        let statuses = HashMap::from([(UserId::new("u1"), "online".to_string())]);
        dir.apply_statuses(&statuses);

        assert_eq!(dir.get(&UserId::new("u1")).map(|u| u.status.as_str()), Some("online"));
        assert_eq!(dir.get(&UserId::new("u2")).map(|u| u.status.as_str()), Some("offline"));
    }

    #[test]
    fn reinserting_keeps_status() {
        let mut dir = UserDirectory::from_users([user("u1", "ana")]);
        assert!(dir.set_status(&UserId::new("u1"), "dnd"));
        dir.insert(user("u1", "ana2"));
        assert_eq!(dir.username(&UserId::new("u1")), Some("ana2"));
        assert_eq!(dir.get(&UserId::new("u1")).map(|u| u.status.as_str()), Some("dnd"));
        assert!(!dir.set_status(&UserId::new("nobody"), "online"));
    }
}
