//! In-memory move buffer for active rooms.
//!
//! Process-local and intentionally not persisted: entries live only for the
//! active window of their room and are purged at finalization or
//! abandonment. Each room holds an append-ordered list so player-slot
//! assignment at finalize time is explicit rather than an accident of map
//! iteration order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use derive_getters::Getters;
use derive_new::new;
use tracing::{debug, info, instrument};

/// One buffered move: who played it and what they played.
#[derive(Debug, Clone, new, Getters)]
pub struct BufferedMove {
    /// The player's external platform id.
    player: i64,
    /// The raw submitted move string (validated at finalize time).
    choice: String,
}

/// Transient store of submitted moves keyed by room code.
///
/// Clones share the same underlying store. All mutation serializes on one
/// mutex; every critical section is O(1) in the number of rooms.
#[derive(Debug, Clone, Default)]
pub struct MoveBuffer {
    rooms: Arc<Mutex<HashMap<String, Vec<BufferedMove>>>>,
}

impl MoveBuffer {
    /// Creates an empty move buffer.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating move buffer");
        Self::default()
    }

    /// Records a player's move for a room, overwriting any earlier move by
    /// the same player in place so their slot order is preserved.
    ///
    /// Returns the count of distinct players who have moved in the room.
    #[instrument(skip(self))]
    pub fn submit(&self, room_code: &str, player: i64, choice: &str) -> usize {
        let mut rooms = self.rooms.lock().unwrap();
        let moves = rooms.entry(room_code.to_string()).or_default();

        match moves.iter_mut().find(|m| *m.player() == player) {
            Some(existing) => {
                debug!(room_code, player, "Overwriting earlier move");
                existing.choice = choice.to_string();
            }
            None => moves.push(BufferedMove::new(player, choice.to_string())),
        }

        debug!(room_code, player, count = moves.len(), "Move buffered");
        moves.len()
    }

    /// Returns the buffered moves for a room in submission order, or `None`
    /// if no moves were submitted.
    #[instrument(skip(self))]
    pub fn peek(&self, room_code: &str) -> Option<Vec<BufferedMove>> {
        let rooms = self.rooms.lock().unwrap();
        rooms.get(room_code).cloned()
    }

    /// Removes all buffered moves for a room.
    #[instrument(skip(self))]
    pub fn clear(&self, room_code: &str) {
        let mut rooms = self.rooms.lock().unwrap();
        if rooms.remove(room_code).is_some() {
            debug!(room_code, "Buffer entry cleared");
        }
    }

    /// Number of rooms currently holding buffered moves.
    #[instrument(skip(self))]
    pub fn len(&self) -> usize {
        self.rooms.lock().unwrap().len()
    }

    /// Whether no room currently holds buffered moves.
    #[instrument(skip(self))]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
