//! Text commands: welcome, credit overrides and the caption keyword mode.

use std::sync::Arc;

use sticker_models::{Credits, GlobalSettings, UserCredits};
use tracing::info;

use crate::error::{WorkerError, WorkerResult};
use crate::session::{ChatSession, InboundMessage};
use crate::settings::SettingsStore;

const NAME_PREFIX: &str = "name ";
const AUTHOR_PREFIX: &str = "author ";
const MODE_PREFIX: &str = "mode ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Welcome,
    SetPackName(String),
    SetAuthor(String),
    /// Require the caption keyword (`true`) or convert any media (`false`)
    SetMode(bool),
}

impl Command {
    /// Parse a message body. Keywords are case-insensitive; values keep the
    /// casing they were sent with.
    pub fn parse(body: &str) -> Option<Self> {
        let trimmed = body.trim();
        let lower = trimmed.to_lowercase();

        if lower == "hi" || lower == "hello" {
            return Some(Self::Welcome);
        }
        if let Some(value) = strip_prefix_ignore_case(trimmed, NAME_PREFIX) {
            return Some(Self::SetPackName(value.trim().to_string()));
        }
        if let Some(value) = strip_prefix_ignore_case(trimmed, AUTHOR_PREFIX) {
            return Some(Self::SetAuthor(value.trim().to_string()));
        }
        if let Some(value) = strip_prefix_ignore_case(trimmed, MODE_PREFIX) {
            let value = value.trim().to_lowercase();
            return Some(Self::SetMode(value == "on" || value == "true"));
        }
        None
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

pub fn welcome_text(credits: &Credits) -> String {
    format!(
        "👋 Welcome! I’m a *Sticker Bot*.\n\n\
         🟩 Add *square* (or *1:1*) to crop square.\n\
         🪄 Add *rbg* to remove background (images only).\n\n\
         ⚙️ *_Your current credits:_*\n\
         • Pack: *{}*\n\
         • Author: *{}*\n\n\
         ℹ️ *_Update with:_*\n\
         • Pack name: name *YOURPACK*\n\
         • Author name: author *YOURNAME*",
        credits.pack_name, credits.author_name
    )
}

pub struct CommandHandler {
    settings: Arc<dyn SettingsStore>,
}

impl CommandHandler {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    pub async fn handle(
        &self,
        session: &dyn ChatSession,
        message: &InboundMessage,
        command: Command,
    ) -> WorkerResult<()> {
        let user_id = message.user_id();

        let text = match command {
            Command::Welcome => welcome_text(&self.settings.credits_for(user_id).await?),
            Command::SetPackName(name) => {
                self.settings.set_user_credits(user_id, UserCredits::pack(name)).await?;
                let credits = self.settings.credits_for(user_id).await?;
                info!(user_id, pack = %credits.pack_name, "Pack name updated");
                format!("✅ Sticker pack name saved: *{}*", credits.pack_name)
            }
            Command::SetAuthor(author) => {
                self.settings
                    .set_user_credits(user_id, UserCredits::author(author))
                    .await?;
                let credits = self.settings.credits_for(user_id).await?;
                info!(user_id, author = %credits.author_name, "Author updated");
                format!("✅ Sticker author saved: *{}*", credits.author_name)
            }
            Command::SetMode(require_keyword) => self.set_mode(require_keyword).await?,
        };

        session
            .reply(message, &text)
            .await
            .map_err(|e| WorkerError::reply_failed(e.to_string()))
    }

    async fn set_mode(&self, require_keyword: bool) -> WorkerResult<String> {
        let current = self.settings.global_settings().await?;
        let label = GlobalSettings::mode_label(require_keyword);

        if current.require_caption_keyword == require_keyword {
            return Ok(format!("ℹ️ Mode is already set to *{label}*."));
        }

        self.settings
            .set_global_settings(GlobalSettings {
                require_caption_keyword: require_keyword,
                ..current
            })
            .await?;
        info!(require_keyword, "Bot mode updated");
        Ok(format!("✅ Bot mode saved: *{label}*"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::InMemorySettingsStore;
    use crate::testing::{text_message, FakeSession};

    fn handler() -> (CommandHandler, Arc<InMemorySettingsStore>) {
        let store = Arc::new(InMemorySettingsStore::new(GlobalSettings::with_defaults(
            "Pack", "Bot",
        )));
        (CommandHandler::new(store.clone()), store)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  Hello "), Some(Command::Welcome));
        assert_eq!(Command::parse("hi"), Some(Command::Welcome));
        assert_eq!(
            Command::parse("Name My Cool Pack"),
            Some(Command::SetPackName("My Cool Pack".into()))
        );
        assert_eq!(Command::parse("author  Zoë "), Some(Command::SetAuthor("Zoë".into())));
        assert_eq!(Command::parse("mode ON"), Some(Command::SetMode(true)));
        assert_eq!(Command::parse("mode true"), Some(Command::SetMode(true)));
        assert_eq!(Command::parse("mode off"), Some(Command::SetMode(false)));
        assert_eq!(Command::parse("mode maybe"), Some(Command::SetMode(false)));
    }

    #[test]
    fn test_parse_non_commands() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("hi there"), None);
        assert_eq!(Command::parse("name"), None);
        assert_eq!(Command::parse("sticker square"), None);
        assert_eq!(Command::parse("名前 x"), None);
    }

    #[tokio::test]
    async fn test_welcome_shows_credits() {
        let (handler, _) = handler();
        let session = FakeSession::default();

        handler
            .handle(&session, &text_message("m1", "hi"), Command::Welcome)
            .await
            .unwrap();

        let replies = session.replies().await;
        assert!(replies[0].contains("Pack: *Pack*"));
        assert!(replies[0].contains("Author: *Bot*"));
        assert!(replies[0].contains("*rbg*"));
    }

    #[tokio::test]
    async fn test_set_name_and_empty_reset() {
        let (handler, store) = handler();
        let session = FakeSession::default();
        let msg = text_message("m1", "name Mine");

        handler
            .handle(&session, &msg, Command::SetPackName("Mine".into()))
            .await
            .unwrap();
        assert_eq!(store.credits_for("111@c.us").await.unwrap().pack_name, "Mine");

        handler
            .handle(&session, &msg, Command::SetPackName(String::new()))
            .await
            .unwrap();
        assert_eq!(
            session.replies().await,
            vec![
                "✅ Sticker pack name saved: *Mine*".to_string(),
                "✅ Sticker pack name saved: *Pack*".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_author() {
        let (handler, store) = handler();
        let session = FakeSession::default();

        handler
            .handle(&session, &text_message("m1", "author Me"), Command::SetAuthor("Me".into()))
            .await
            .unwrap();

        assert_eq!(store.credits_for("111@c.us").await.unwrap(), Credits::new("Pack", "Me"));
        assert_eq!(session.replies().await, vec!["✅ Sticker author saved: *Me*".to_string()]);
    }

    #[tokio::test]
    async fn test_mode_toggle() {
        let (handler, store) = handler();
        let session = FakeSession::default();
        let msg = text_message("m1", "mode on");

        handler.handle(&session, &msg, Command::SetMode(false)).await.unwrap();
        handler.handle(&session, &msg, Command::SetMode(true)).await.unwrap();

        assert!(store.global_settings().await.unwrap().require_caption_keyword);
        assert_eq!(
            session.replies().await,
            vec![
                "ℹ️ Mode is already set to *Auto on any media*.".to_string(),
                "✅ Bot mode saved: *Caption must include \"sticker\"*".to_string(),
            ]
        );
    }
}
