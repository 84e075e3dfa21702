//! Single-writer store for one room.
//!
//! The store only persists what the actor computes; it never decides whether
//! an action is legal. It is owned by the room actor, so every mutation is
//! visible to the next read without any locking.

use super::models::{Room, Seat, UserId};
use thiserror::Error;

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The room has been destroyed
    #[error("Room not found")]
    RoomNotFound,

    /// No seat for the user in this room
    #[error("Seat not found for user {0}")]
    SeatNotFound(UserId),

    /// The store was shut down and can no longer serve the room
    #[error("Room store unavailable")]
    Unavailable,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Which seats `list_seats` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatFilter {
    All,
    /// Not folded and not spectating
    Active,
    /// Human players only
    Real,
    Bots,
    Disconnected,
}

impl SeatFilter {
    fn matches(self, seat: &Seat) -> bool {
        match self {
            SeatFilter::All => true,
            SeatFilter::Active => seat.is_active(),
            SeatFilter::Real => !seat.is_bot,
            SeatFilter::Bots => seat.is_bot,
            SeatFilter::Disconnected => seat.is_disconnected(),
        }
    }
}

#[derive(Debug)]
enum Slot {
    Live(Room),
    Destroyed,
    Shutdown,
}

/// Authoritative record for one room
#[derive(Debug)]
pub struct RoomStore {
    slot: Slot,
}

impl RoomStore {
    pub fn new(room: Room) -> Self {
        Self {
            slot: Slot::Live(room),
        }
    }

    pub fn get_room(&self) -> StoreResult<&Room> {
        match &self.slot {
            Slot::Live(room) => Ok(room),
            Slot::Destroyed => Err(StoreError::RoomNotFound),
            Slot::Shutdown => Err(StoreError::Unavailable),
        }
    }

    fn room_mut(&mut self) -> StoreResult<&mut Room> {
        match &mut self.slot {
            Slot::Live(room) => Ok(room),
            Slot::Destroyed => Err(StoreError::RoomNotFound),
            Slot::Shutdown => Err(StoreError::Unavailable),
        }
    }

    /// Apply `f` to the room and return its result
    pub fn mutate_room<F, R>(&mut self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Room) -> R,
    {
        self.room_mut().map(f)
    }

    pub fn get_seat(&self, user_id: UserId) -> StoreResult<&Seat> {
        self.get_room()?
            .seat(user_id)
            .ok_or(StoreError::SeatNotFound(user_id))
    }

    pub fn list_seats(&self, filter: SeatFilter) -> StoreResult<Vec<&Seat>> {
        Ok(self
            .get_room()?
            .seats
            .iter()
            .filter(|seat| filter.matches(seat))
            .collect())
    }

    /// Apply `f` to one seat and return its result
    pub fn mutate_seat<F, R>(&mut self, user_id: UserId, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Seat) -> R,
    {
        self.room_mut()?
            .seat_mut(user_id)
            .map(f)
            .ok_or(StoreError::SeatNotFound(user_id))
    }

    /// Seat a new player and return the assigned seat ordinal
    pub fn insert_seat(&mut self, seat: Seat) -> StoreResult<u32> {
        self.mutate_room(|room| room.push_seat(seat))
    }

    pub fn remove_seat(&mut self, user_id: UserId) -> StoreResult<Seat> {
        let room = self.room_mut()?;
        let idx = room
            .index_of(user_id)
            .ok_or(StoreError::SeatNotFound(user_id))?;
        Ok(room.seats.remove(idx))
    }

    /// Copy of the current record for rolling back a failed action
    pub fn checkpoint(&self) -> StoreResult<Room> {
        self.get_room().cloned()
    }

    /// Put back a record taken with [`RoomStore::checkpoint`]
    pub fn restore(&mut self, room: Room) -> StoreResult<()> {
        let current = self.room_mut()?;
        *current = room;
        Ok(())
    }

    /// Drop the room; later reads report `RoomNotFound`
    pub fn destroy(&mut self) -> StoreResult<Room> {
        match std::mem::replace(&mut self.slot, Slot::Destroyed) {
            Slot::Live(room) => Ok(room),
            Slot::Destroyed => Err(StoreError::RoomNotFound),
            Slot::Shutdown => {
                self.slot = Slot::Shutdown;
                Err(StoreError::Unavailable)
            }
        }
    }

    /// Take the store out of service; later reads report `Unavailable`
    pub fn shutdown(&mut self) {
        self.slot = Slot::Shutdown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RoomStore {
        let mut room = Room::new(1, 5, None);
        room.push_seat(Seat::new(1, "asha", 1_000));
        room.push_seat(Seat::new(2, "ravi", 1_000));
        RoomStore::new(room)
    }

    #[test]
    fn test_mutation_is_visible_to_next_read() {
        let mut store = store();
        store.mutate_room(|room| room.pot += 200).unwrap();
        assert_eq!(store.get_room().unwrap().pot, 200);

        store.mutate_seat(2, |seat| seat.is_folded = true).unwrap();
        assert!(store.get_seat(2).unwrap().is_folded);
    }

    #[test]
    fn test_seat_not_found() {
        let mut store = store();
        assert_eq!(store.get_seat(9).unwrap_err(), StoreError::SeatNotFound(9));
        assert_eq!(
            store.mutate_seat(9, |seat| seat.current_bet = 1).unwrap_err(),
            StoreError::SeatNotFound(9)
        );
    }

    #[test]
    fn test_list_seats_filters() {
        let mut store = store();
        store.mutate_seat(1, |seat| seat.is_folded = true).unwrap();
        let active = store.list_seats(SeatFilter::Active).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, 2);
        assert_eq!(store.list_seats(SeatFilter::Bots).unwrap().len(), 0);
    }

    #[test]
    fn test_checkpoint_and_restore() {
        let mut store = store();
        let checkpoint = store.checkpoint().unwrap();
        store.mutate_room(|room| room.pot = 999).unwrap();
        store.restore(checkpoint).unwrap();
        assert_eq!(store.get_room().unwrap().pot, 0);
    }

    #[test]
    fn test_destroyed_room_is_not_found() {
        let mut store = store();
        store.destroy().unwrap();
        assert_eq!(store.get_room().unwrap_err(), StoreError::RoomNotFound);
        assert_eq!(store.get_seat(1).unwrap_err(), StoreError::RoomNotFound);
    }

    #[test]
    fn test_shutdown_store_is_unavailable() {
        let mut store = store();
        store.shutdown();
        assert_eq!(store.get_room().unwrap_err(), StoreError::Unavailable);
        assert_eq!(store.destroy().unwrap_err(), StoreError::Unavailable);
    }
}
