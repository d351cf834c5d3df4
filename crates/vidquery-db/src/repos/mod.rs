//! Repository implementations

mod snapshot;
mod video;

pub use snapshot::SnapshotRepo;
pub use video::VideoRepo;
