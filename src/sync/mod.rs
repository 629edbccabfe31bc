pub mod coordinator;
pub mod save_queue;

pub use coordinator::{LoadOutcome, LoadSource, SyncCoordinator, SyncStatus};
pub use save_queue::{create_save_queue, PendingSave, QueueStats, SaveQueue};
