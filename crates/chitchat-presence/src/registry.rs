//! The user registry: every active (connection, username, room) triple.
//!
//! # Concurrency note
//!
//! `UserRegistry` is NOT thread-safe by itself. It is owned by a single
//! task (the router actor) and every mutation goes through `&mut self`,
//! which is what makes the check-then-insert in [`add_user`] indivisible.
//!
//! [`add_user`]: UserRegistry::add_user

use std::collections::HashMap;

use chitchat_transport::ConnectionId;

use crate::{PresenceError, RoomIndex, User, normalize};

/// Authoritative store of connected users.
///
/// ## Invariants
///
/// - No two users in one room share a lowercased username.
/// - A connection id maps to at most one user.
/// - Every user appears in the [`RoomIndex`] under its room, exactly once.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: HashMap<ConnectionId, User>,
    index: RoomIndex,
}

impl UserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user for `id`.
    ///
    /// Both names are trimmed; the room is matched case-insensitively, as
    /// is the username within it.
    ///
    /// # Errors
    /// - [`PresenceError::MissingFields`] if either is empty after trimming
    /// - [`PresenceError::UsernameTaken`] if the room already has that name
    /// - [`PresenceError::AlreadyRegistered`] if `id` already has a user
    ///   (release builds only; this is a caller bug)
    pub fn add_user(
        &mut self,
        id: ConnectionId,
        username: &str,
        room: &str,
    ) -> Result<User, PresenceError> {
        let username = username.trim();
        let room = room.trim();
        if username.is_empty() || room.is_empty() {
            return Err(PresenceError::MissingFields);
        }

        debug_assert!(
            !self.users.contains_key(&id),
            "connection {id} registered twice"
        );
        if self.users.contains_key(&id) {
            tracing::error!(%id, "duplicate registration rejected");
            return Err(PresenceError::AlreadyRegistered(id));
        }

        let user = User::new(id, username, room);

        let taken = self
            .index
            .members(user.room())
            .iter()
            .filter_map(|member| self.users.get(member))
            .any(|member| member.username_key() == user.username_key());
        if taken {
            return Err(PresenceError::UsernameTaken {
                username: username.to_string(),
                room: user.room().to_string(),
            });
        }

        self.index.insert(user.room(), id);
        self.users.insert(id, user.clone());

        tracing::debug!(
            %id,
            username = %user.username(),
            room = %user.room(),
            "user registered"
        );
        Ok(user)
    }

    /// Removes and returns the user for `id`, if any. Idempotent.
    pub fn remove_user(&mut self, id: ConnectionId) -> Option<User> {
        let user = self.users.remove(&id)?;
        let indexed = self.index.remove(user.room(), id);
        debug_assert!(indexed, "user {id} missing from room index");
        tracing::debug!(%id, room = %user.room(), "user removed");
        Some(user)
    }

    /// Looks up the user bound to `id`.
    pub fn get_user(&self, id: ConnectionId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Returns `true` if `id` has a user.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.users.contains_key(&id)
    }

    /// All users in `room`, in the order they joined.
    ///
    /// `room` is normalized first, so `" General "` finds `general`.
    pub fn users_in_room(&self, room: &str) -> Vec<User> {
        self.index
            .members(&normalize(room))
            .iter()
            .filter_map(|id| self.users.get(id))
            .cloned()
            .collect()
    }

    /// Display names in `room`, in join order.
    pub fn usernames_in_room(&self, room: &str) -> Vec<String> {
        self.index
            .members(&normalize(room))
            .iter()
            .filter_map(|id| self.users.get(id))
            .map(|user| user.username().to_string())
            .collect()
    }

    /// Connection ids in `room`, in join order.
    pub fn connections_in_room(&self, room: &str) -> &[ConnectionId] {
        self.index.members(&normalize(room))
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.index.room_count()
    }

    /// Names of rooms with at least one member, sorted.
    pub fn rooms(&self) -> Vec<String> {
        self.index.room_names()
    }
}

// =========================================================================
// Tests
// =========================================================================
