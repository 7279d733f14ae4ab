mod covers;
mod downloads;
mod liked_tracks;
mod play_history;
mod queue;
mod settings;

pub use covers::{CoverArtRepository, SqliteCoverArtRepository};
pub use downloads::{DownloadRepository, SqliteDownloadRepository};
pub use liked_tracks::{LikedTrackRepository, SqliteLikedTrackRepository};
pub use play_history::{PlayHistoryRepository, SqlitePlayHistoryRepository};
pub use queue::{QueueRepository, SqliteQueueRepository};
pub use settings::{SettingsRepository, SqliteSettingsRepository};
