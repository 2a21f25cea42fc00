//! Bot settings persistence.
//!
//! Layout:
//! - `settings/global`: `defaultPack`, `defaultAuthor`, `requireCaption`
//! - `users/{userId}`: `name`, `author`
//!
//! All writes are merges: only the fields being set are sent in the update mask.

use std::collections::HashMap;

use sticker_models::{GlobalSettings, UserCredits};
use tracing::debug;

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{Document, ToFirestoreValue, Value};

const SETTINGS_COLLECTION: &str = "settings";
const GLOBAL_DOC_ID: &str = "global";
const USERS_COLLECTION: &str = "users";

const FIELD_DEFAULT_PACK: &str = "defaultPack";
const FIELD_DEFAULT_AUTHOR: &str = "defaultAuthor";
const FIELD_REQUIRE_CAPTION: &str = "requireCaption";
const FIELD_NAME: &str = "name";
const FIELD_AUTHOR: &str = "author";

/// Repository for global settings and per-user credits.
#[derive(Clone)]
pub struct SettingsRepository {
    client: FirestoreClient,
}

impl SettingsRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Global settings; `None` when the document does not exist yet.
    pub async fn get_global(&self) -> FirestoreResult<Option<GlobalSettings>> {
        let doc = self
            .client
            .with_retry("get_global_settings", || {
                self.client.get_document(SETTINGS_COLLECTION, GLOBAL_DOC_ID)
            })
            .await?;
        Ok(doc.map(|d| global_from_document(&d)))
    }

    pub async fn set_global(&self, settings: &GlobalSettings) -> FirestoreResult<()> {
        let (fields, mask) = global_to_fields(settings);
        self.client
            .with_retry("set_global_settings", || {
                self.client.update_document(
                    SETTINGS_COLLECTION,
                    GLOBAL_DOC_ID,
                    fields.clone(),
                    Some(mask.clone()),
                )
            })
            .await?;
        debug!(require_caption = settings.require_caption_keyword, "Saved global settings");
        Ok(())
    }

    /// Per-user credits; `None` when the user never set any.
    pub async fn get_user(&self, user_id: &str) -> FirestoreResult<Option<UserCredits>> {
        let doc = self
            .client
            .with_retry("get_user_credits", || {
                self.client.get_document(USERS_COLLECTION, user_id)
            })
            .await?;
        Ok(doc.map(|d| user_from_document(&d)))
    }

    /// Merge credits into the user's document. `None` fields are not written.
    pub async fn set_user(&self, user_id: &str, credits: &UserCredits) -> FirestoreResult<()> {
        let (fields, mask) = user_to_fields(credits);
        if mask.is_empty() {
            return Ok(());
        }
        self.client
            .with_retry("set_user_credits", || {
                self.client.update_document(
                    USERS_COLLECTION,
                    user_id,
                    fields.clone(),
                    Some(mask.clone()),
                )
            })
            .await?;
        debug!(user_id, "Saved user credits");
        Ok(())
    }
}

fn global_from_document(doc: &Document) -> GlobalSettings {
    let defaults = GlobalSettings::default();
    GlobalSettings {
        default_pack: doc
            .field(FIELD_DEFAULT_PACK)
            .unwrap_or(defaults.default_pack),
        default_author: doc
            .field(FIELD_DEFAULT_AUTHOR)
            .unwrap_or(defaults.default_author),
        require_caption_keyword: doc
            .field(FIELD_REQUIRE_CAPTION)
            .unwrap_or(defaults.require_caption_keyword),
    }
}

fn global_to_fields(settings: &GlobalSettings) -> (HashMap<String, Value>, Vec<String>) {
    let fields: HashMap<String, Value> = [
        (FIELD_DEFAULT_PACK, settings.default_pack.to_firestore_value()),
        (FIELD_DEFAULT_AUTHOR, settings.default_author.to_firestore_value()),
        (
            FIELD_REQUIRE_CAPTION,
            settings.require_caption_keyword.to_firestore_value(),
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let mask = fields.keys().cloned().collect();
    (fields, mask)
}

fn user_from_document(doc: &Document) -> UserCredits {
    UserCredits {
        name: doc.field(FIELD_NAME),
        author: doc.field(FIELD_AUTHOR),
    }
}

fn user_to_fields(credits: &UserCredits) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();
    if let Some(name) = &credits.name {
        fields.insert(FIELD_NAME.to_string(), name.to_firestore_value());
    }
    if let Some(author) = &credits.author {
        fields.insert(FIELD_AUTHOR.to_string(), author.to_firestore_value());
    }
    let mask = fields.keys().cloned().collect();
    (fields, mask)
}
