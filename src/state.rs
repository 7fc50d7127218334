use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::gateway::BlobCleanup;
use crate::storage::BlobStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn blob_cleanup(&self) -> BlobCleanup {
        BlobCleanup::from_strict(self.config.media.strict_cleanup)
    }
}
