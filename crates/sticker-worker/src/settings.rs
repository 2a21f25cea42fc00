//! Settings persistence for the pipeline.
//!
//! Credits resolve per-user override first, then the global default. Empty
//! strings count as unset.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sticker_firestore::SettingsRepository;
use sticker_models::{Credits, GlobalSettings, UserCredits};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};

/// Global settings file inside the data directory.
pub const GLOBAL_SETTINGS_FILE: &str = "settings.json";
/// Per-user overrides file (`{user_id: {name, author}}`) inside the data directory.
pub const USER_SETTINGS_FILE: &str = "user-settings.json";

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn global_settings(&self) -> WorkerResult<GlobalSettings>;

    async fn set_global_settings(&self, settings: GlobalSettings) -> WorkerResult<()>;

    /// Stored overrides for `user_id`; empty when none were set.
    async fn user_credits(&self, user_id: &str) -> WorkerResult<UserCredits>;

    /// Merge `credits` into the stored overrides. `None` fields are left untouched.
    async fn set_user_credits(&self, user_id: &str, credits: UserCredits) -> WorkerResult<()>;

    /// Effective credits for `user_id`.
    async fn credits_for(&self, user_id: &str) -> WorkerResult<Credits> {
        let global = self.global_settings().await?;
        let user = self.user_credits(user_id).await?;
        Ok(user.resolve(&global))
    }
}

/// Process-local settings store.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    global: RwLock<GlobalSettings>,
    users: RwLock<HashMap<String, UserCredits>>,
}

impl InMemorySettingsStore {
    pub fn new(global: GlobalSettings) -> Self {
        Self {
            global: RwLock::new(global),
            users: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn global_settings(&self) -> WorkerResult<GlobalSettings> {
        Ok(self.global.read().await.clone())
    }

    async fn set_global_settings(&self, settings: GlobalSettings) -> WorkerResult<()> {
        *self.global.write().await = settings;
        Ok(())
    }

    async fn user_credits(&self, user_id: &str) -> WorkerResult<UserCredits> {
        Ok(self.users.read().await.get(user_id).cloned().unwrap_or_default())
    }

    async fn set_user_credits(&self, user_id: &str, credits: UserCredits) -> WorkerResult<()> {
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .merge(credits);
        Ok(())
    }
}

/// Firestore-backed store with a write-through cache.
///
/// Global settings are loaded once; user documents are read on first use and
/// then served from the cache.
pub struct FirestoreSettingsStore {
    repo: SettingsRepository,
    global: RwLock<GlobalSettings>,
    users: RwLock<HashMap<String, UserCredits>>,
}

impl FirestoreSettingsStore {
    /// Load global settings, falling back to `defaults` when none are stored.
    pub async fn load(repo: SettingsRepository, defaults: GlobalSettings) -> WorkerResult<Self> {
        let global = repo.get_global().await?.unwrap_or(defaults);
        debug!(
            pack = %global.default_pack,
            require_caption = global.require_caption_keyword,
            "Loaded global settings"
        );
        Ok(Self {
            repo,
            global: RwLock::new(global),
            users: RwLock::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl SettingsStore for FirestoreSettingsStore {
    async fn global_settings(&self) -> WorkerResult<GlobalSettings> {
        Ok(self.global.read().await.clone())
    }

    async fn set_global_settings(&self, settings: GlobalSettings) -> WorkerResult<()> {
        self.repo.set_global(&settings).await?;
        *self.global.write().await = settings;
        Ok(())
    }

    async fn user_credits(&self, user_id: &str) -> WorkerResult<UserCredits> {
        if let Some(cached) = self.users.read().await.get(user_id) {
            return Ok(cached.clone());
        }
        let loaded = self.repo.get_user(user_id).await?.unwrap_or_default();
        self.users
            .write()
            .await
            .insert(user_id.to_string(), loaded.clone());
        Ok(loaded)
    }

    async fn set_user_credits(&self, user_id: &str, credits: UserCredits) -> WorkerResult<()> {
        self.repo.set_user(user_id, &credits).await?;
        let mut current = self.user_credits(user_id).await?;
        current.merge(credits);
        self.users.write().await.insert(user_id.to_string(), current);
        Ok(())
    }
}

/// Store backed by two JSON files in a data directory.
///
/// Both files are read once on open. Every write replaces the whole file
/// through a sibling `.tmp` file and a rename, so a crash never leaves a
/// half-written file behind.
pub struct JsonFileSettingsStore {
    dir: PathBuf,
    global: RwLock<GlobalSettings>,
    users: RwLock<HashMap<String, UserCredits>>,
}

impl JsonFileSettingsStore {
    /// Open the store in `dir`, creating it if needed.
    ///
    /// A missing or malformed settings file yields `defaults`; a missing or
    /// malformed user file yields no overrides.
    pub async fn open(dir: impl Into<PathBuf>, defaults: GlobalSettings) -> WorkerResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_error("creating", &dir, e))?;

        let global = read_json(&dir.join(GLOBAL_SETTINGS_FILE)).await?.unwrap_or(defaults);
        let users: HashMap<String, UserCredits> =
            read_json(&dir.join(USER_SETTINGS_FILE)).await?.unwrap_or_default();
        debug!(
            dir = %dir.display(),
            pack = %global.default_pack,
            users = users.len(),
            "Opened settings files"
        );

        Ok(Self {
            dir,
            global: RwLock::new(global),
            users: RwLock::new(users),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn global_settings(&self) -> WorkerResult<GlobalSettings> {
        Ok(self.global.read().await.clone())
    }

    async fn set_global_settings(&self, settings: GlobalSettings) -> WorkerResult<()> {
        let mut global = self.global.write().await;
        write_json_atomic(&self.dir.join(GLOBAL_SETTINGS_FILE), &settings).await?;
        *global = settings;
        Ok(())
    }

    async fn user_credits(&self, user_id: &str) -> WorkerResult<UserCredits> {
        Ok(self.users.read().await.get(user_id).cloned().unwrap_or_default())
    }

    async fn set_user_credits(&self, user_id: &str, credits: UserCredits) -> WorkerResult<()> {
        let mut users = self.users.write().await;
        let mut updated = users.clone();
        updated.entry(user_id.to_string()).or_default().merge(credits);
        write_json_atomic(&self.dir.join(USER_SETTINGS_FILE), &updated).await?;
        *users = updated;
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> WorkerResult<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(storage_error("reading", path, e)),
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed settings file");
            Ok(None)
        }
    }
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> WorkerResult<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| WorkerError::storage(format!("encoding {}: {e}", path.display())))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| storage_error("writing", &tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| storage_error("replacing", path, e))
}

fn storage_error(action: &str, path: &Path, e: io::Error) -> WorkerError {
    WorkerError::storage(format!("{action} {}: {e}", path.display()))
}
