//! Chat sync client.
//!
//! DESIGN
//! ======
//! Split by concern so front ends can depend on small pieces:
//! - `state`: immutable snapshots and the reducer
//! - `client`: the poll loop and send dispatch that drive the reducer
//! - `render`: snapshot to display rows
//! - `scroll`: the auto-scroll decision

pub mod client;
pub mod render;
pub mod scroll;
pub mod state;

pub use client::{ChatClient, ClientEvent, ClientOptions, SubmitOutcome};
pub use render::ChatView;
pub use state::{ChatAction, ChatState, SendStatus};
