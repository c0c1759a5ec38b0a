/*
    Sync subsystem

    The engine drains the persisted queue through the RemotePush seam,
    one pass at a time, and keeps record sync statuses honest.
*/

pub mod engine;
pub mod push;

pub use engine::{SyncEngine, SyncReport};
pub use push::{PushError, RemotePush};
