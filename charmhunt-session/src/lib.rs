//! Charmhunt sessions
//!
//! Runs the targeting engine from `charmhunt-core` against live or recorded
//! sensor streams on a tokio runtime.
//!
//! - [`providers`]: location and orientation provider traits and
//!   channel-backed implementations
//! - [`session`]: [`HuntSession`], the event loop publishing [`Snapshot`]s
//! - [`feed`]: JSON-lines sensor recordings and their playback
//! - [`cli`] and [`runner`]: the `charmhunt` replay tool
//!
//! [`Snapshot`]: charmhunt_core::Snapshot

pub mod cli;
pub mod feed;
pub mod providers;
pub mod runner;
pub mod session;

pub use feed::{Feed, FeedError, Playback};
pub use providers::{
    channel_location, channel_orientation, LocationProvider, NoSensor, OrientationProvider,
};
pub use session::{HuntSession, SessionHandle};
