//! Append-only game history.
//!
//! Room actors emit a [`GameEvent`] for every coin movement and fold. Sinks are
//! fire-and-forget: recording never blocks or fails the round, and nothing in
//! the engine reads history back.

pub mod models;
pub mod sink;

pub use models::{GameAction, GameEvent, SeatSnapshot};
pub use sink::{EventSink, LogEventSink, MemoryEventSink, PgEventSink};
