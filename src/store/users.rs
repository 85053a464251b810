use dashmap::DashMap;
use uuid::Uuid;

use crate::models::user::{Role, User};

#[derive(Default)]
pub struct UserRepository {
    users: DashMap<Uuid, User>,
}

impl UserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Placeholder attribution policy for imported orders: the oldest
    /// customer account on file.
    pub fn first_customer(&self) -> Option<User> {
        self.users
            .iter()
            .filter(|entry| entry.value().role == Role::Customer)
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| entry.value().clone())
    }
}
