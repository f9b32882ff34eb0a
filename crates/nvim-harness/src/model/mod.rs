pub mod ids;
pub mod request;
pub mod state;
pub mod terminal;

pub use ids::{DirectoryId, SessionId, SnapshotId};
pub use request::*;
pub use state::SessionState;
pub use terminal::*;
