//! Read access to materialized downloads

use bridge_traits::time::Clock;
use core_store::{DownloadedTrack, OfflineStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Downloaded tracks, their payloads and cached cover art.
#[derive(Clone)]
pub struct OfflineLibrary {
    store: OfflineStore,
    clock: Arc<dyn Clock>,
}

impl OfflineLibrary {
    pub fn new(store: OfflineStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Newest download first
    pub async fn downloaded_tracks(&self) -> Result<Vec<DownloadedTrack>> {
        Ok(self.store.downloads().list_recent().await?)
    }

    pub async fn is_downloaded(&self, track_id: &str) -> Result<bool> {
        Ok(self.store.downloads().exists(track_id).await?)
    }

    pub async fn downloaded_track_ids(&self) -> Result<HashSet<String>> {
        Ok(self.store.downloads().list_ids().await?.into_iter().collect())
    }

    pub async fn downloaded_track_count(&self) -> Result<u64> {
        Ok(self.store.downloads().count().await?)
    }

    /// Delete the record and its payload. Returns whether anything was deleted.
    #[instrument(skip(self))]
    pub async fn delete_download(&self, track_id: &str) -> Result<bool> {
        match self.store.downloads().delete(track_id).await? {
            Some(freed) => {
                info!(freed, "Deleted download");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Payload for playback.
    ///
    /// Opening a track counts as a play: `last_played_at` moves to now and
    /// `play_count` increments, which keeps it away from eviction.
    #[instrument(skip(self))]
    pub async fn open_track(&self, track_id: &str) -> Result<Option<Vec<u8>>> {
        let Some(payload) = self.store.downloads().payload(track_id).await? else {
            debug!("Track not downloaded");
            return Ok(None);
        };

        self.store
            .downloads()
            .record_play(track_id, self.clock.unix_timestamp_millis())
            .await?;
        Ok(Some(payload))
    }

    pub async fn cover_art(&self, url: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.covers().get(url).await?.map(|cover| cover.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::time::SystemClock;
    use core_store::db::create_test_pool;

    async fn library() -> OfflineLibrary {
        let store = OfflineStore::new(create_test_pool().await.unwrap());
        OfflineLibrary::new(store, Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn test_open_track_records_play() {
        let library = library().await;
        let track = DownloadedTrack::new("t1", "Song", "Artist", 3, 1_000);
        library
            .store
            .downloads()
            .insert(&track, &[1, 2, 3])
            .await
            .unwrap();

        assert_eq!(library.open_track("t1").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(library.open_track("missing").await.unwrap(), None);

        let stored = library.store.downloads().find("t1").await.unwrap().unwrap();
        assert_eq!(stored.play_count, 1);
        assert!(stored.last_played_at.is_some());
    }

    #[tokio::test]
    async fn test_ids_count_and_delete() {
        let library = library().await;
        for (id, at) in [("a", 1), ("b", 2)] {
            let track = DownloadedTrack::new(id, id, "Artist", 1, at);
            library.store.downloads().insert(&track, &[0]).await.unwrap();
        }

        let ids = library.downloaded_track_ids().await.unwrap();
        assert!(ids.contains("a") && ids.contains("b"));
        assert_eq!(library.downloaded_track_count().await.unwrap(), 2);
        assert_eq!(library.downloaded_tracks().await.unwrap()[0].id, "b");

        assert!(library.delete_download("a").await.unwrap());
        assert!(!library.delete_download("a").await.unwrap());
        assert!(!library.is_downloaded("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_cover_art_lookup() {
        let library = library().await;
        library
            .store
            .covers()
            .put("https://cdn/c.jpg", &[9, 9], 0)
            .await
            .unwrap();

        assert_eq!(
            library.cover_art("https://cdn/c.jpg").await.unwrap(),
            Some(vec![9, 9])
        );
        assert_eq!(library.cover_art("https://cdn/x.jpg").await.unwrap(), None);
    }
}
