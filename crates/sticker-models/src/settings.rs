//! Bot settings and sticker credits.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Pack name used when nothing else is configured.
pub const DEFAULT_PACK_NAME: &str = "Sticker Pack";
/// Author name used when nothing else is configured.
pub const DEFAULT_AUTHOR_NAME: &str = "Sticker Bot";

/// Global bot settings (one document for the whole deployment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Pack name for users without an override
    #[serde(default = "default_pack")]
    pub default_pack: String,

    /// Author name for users without an override
    #[serde(default = "default_author")]
    pub default_author: String,

    /// Only convert media whose caption contains the keyword
    #[serde(default, rename = "requireCaption")]
    pub require_caption_keyword: bool,
}

fn default_pack() -> String {
    DEFAULT_PACK_NAME.to_string()
}
fn default_author() -> String {
    DEFAULT_AUTHOR_NAME.to_string()
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_pack: default_pack(),
            default_author: default_author(),
            require_caption_keyword: false,
        }
    }
}

impl GlobalSettings {
    /// Settings with custom default credits.
    pub fn with_defaults(pack: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            default_pack: pack.into(),
            default_author: author.into(),
            require_caption_keyword: false,
        }
    }

    /// Human-readable description of the keyword mode.
    pub fn mode_label(require_keyword: bool) -> &'static str {
        if require_keyword {
            "Caption must include \"sticker\""
        } else {
            "Auto on any media"
        }
    }
}

/// Per-user credit overrides. `None` fields fall back to the global defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserCredits {
    /// Sticker pack name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Sticker author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl UserCredits {
    /// Override only the pack name.
    pub fn pack(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            author: None,
        }
    }

    /// Override only the author.
    pub fn author(author: impl Into<String>) -> Self {
        Self {
            name: None,
            author: Some(author.into()),
        }
    }

    /// Apply `update` on top of `self`; unset fields in `update` keep current values.
    pub fn merge(&mut self, update: UserCredits) {
        if update.name.is_some() {
            self.name = update.name;
        }
        if update.author.is_some() {
            self.author = update.author;
        }
    }

    /// Resolve against global defaults (per-user override first).
    pub fn resolve(&self, global: &GlobalSettings) -> Credits {
        Credits {
            pack_name: non_empty(self.name.as_deref()).unwrap_or(&global.default_pack).to_string(),
            author_name: non_empty(self.author.as_deref())
                .unwrap_or(&global.default_author)
                .to_string(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Credits attached to an outgoing sticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Credits {
    pub pack_name: String,
    pub author_name: String,
}

impl Credits {
    pub fn new(pack_name: impl Into<String>, author_name: impl Into<String>) -> Self {
        Self {
            pack_name: pack_name.into(),
            author_name: author_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_settings_wire_names() {
        let json = r#"{"defaultPack":"P","defaultAuthor":"A","requireCaption":true}"#;
        let settings: GlobalSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.default_pack, "P");
        assert_eq!(settings.default_author, "A");
        assert!(settings.require_caption_keyword);

        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["requireCaption"], true);
    }

    #[test]
    fn test_settings_schema_uses_wire_names() {
        let schema = serde_json::to_value(schemars::schema_for!(GlobalSettings)).unwrap();
        let props = &schema["properties"];
        assert!(props.get("requireCaption").is_some());
        assert!(props.get("defaultPack").is_some());
    }

    #[test]
    fn test_global_settings_missing_fields_use_defaults() {
        let settings: GlobalSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, GlobalSettings::default());
    }

    #[test]
    fn test_resolve_prefers_user_override() {
        let global = GlobalSettings::with_defaults("Pack", "Author");
        let user = UserCredits::pack("Mine");
        let credits = user.resolve(&global);
        assert_eq!(credits, Credits::new("Mine", "Author"));
    }

    #[test]
    fn test_resolve_ignores_blank_override() {
        let global = GlobalSettings::with_defaults("Pack", "Author");
        let user = UserCredits {
            name: Some("   ".into()),
            author: Some(String::new()),
        };
        assert_eq!(user.resolve(&global), Credits::new("Pack", "Author"));
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let mut user = UserCredits::pack("Mine");
        user.merge(UserCredits::author("Me"));
        assert_eq!(user.name.as_deref(), Some("Mine"));
        assert_eq!(user.author.as_deref(), Some("Me"));
    }
}
