//! Room index: normalized room name → member connections in join order.

use std::collections::HashMap;

use chitchat_transport::ConnectionId;

/// Members of each room, in the order they joined.
///
/// The index holds only connection ids; the [`User`](crate::User) records
/// live in the registry. A room's entry exists exactly as long as it has
/// at least one member.
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: HashMap<String, Vec<ConnectionId>>,
}

impl RoomIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` to `room`, creating the room on first use.
    pub fn insert(&mut self, room: &str, id: ConnectionId) {
        self.rooms.entry(room.to_string()).or_default().push(id);
    }

    /// Removes `id` from `room`. Drops the room when it empties.
    ///
    /// Returns `true` if the id was present.
    pub fn remove(&mut self, room: &str, id: ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let Some(pos) = members.iter().position(|m| *m == id) else {
            return false;
        };
        // `remove`, not `swap_remove`: join order must survive departures.
        members.remove(pos);
        if members.is_empty() {
            self.rooms.remove(room);
        }
        true
    }

    /// Members of `room` in join order. Empty for unknown rooms.
    pub fn members(&self, room: &str) -> &[ConnectionId] {
        self.rooms.get(room).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Names of all non-empty rooms, sorted.
    pub fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.keys().cloned().collect();
        names.sort();
        names
    }
}
