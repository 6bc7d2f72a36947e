//! Local-first state for a shared retrospective board.
//!
//! Every peer holds a full copy of the board and the countdown timer.
//! Local edits are applied immediately and published as whole-partition
//! replacements; inbound events overwrite the matching partition when it
//! differs. A [`session::RoomSession`] ties the engines to a
//! [`channel::ChannelGateway`].

pub mod board;
pub mod collision;
pub mod config;
pub mod dispatcher;
pub mod drag;
pub mod presence;
pub mod session;
pub mod timer;

pub use board::{BoardAction, BoardEngine};
pub use config::SessionConfig;
pub use session::{RoomSession, SessionCommand, SessionEvent, SessionHandle, SessionSnapshot};
