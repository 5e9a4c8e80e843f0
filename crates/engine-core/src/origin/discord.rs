//! Discord guild export.
//!
//! A guild's members, text channels, threads and messages land in three
//! tables. Discord calls every message container a channel, threads
//! included, so threads share the channel table and their messages are
//! pulled like any other channel's.

use super::{Feature, Origin, Pipeline};
use crate::{bridge::PageRequest, error::PullError};
use async_trait::async_trait;
use lazy_static::lazy_static;
use model::{
    core::structure::TableStructure,
    transform::{filter::FilterKind, mapping::RichMap},
};
use tracing::info;

pub const USERS_TABLE: &str = "discord_users";
pub const CHANNELS_TABLE: &str = "discord_channels";
pub const MESSAGES_TABLE: &str = "discord_messages";

/// Page size for member and message listings.
const MEMBER_LIMIT: &str = "1000";
const MESSAGE_LIMIT: &str = "100";

lazy_static! {
    static ref USERS: TableStructure = TableStructure::from_tags(&[
        ("id", "varchar(100)"),
        ("username", "varchar(100)"),
        ("discriminator", "varchar(100)"),
        ("global_name", "varchar(100)"),
        ("email", "varchar(100)"),
        ("avatar", "varchar(100)"),
        ("bot", "tinyint"),
        ("verified", "tinyint"),
    ]);
    static ref CHANNELS: TableStructure = TableStructure::from_tags(&[
        ("id", "varchar(100)"),
        ("type", "int"),
        ("guild_id", "varchar(100)"),
        ("position", "varchar(100)"),
        ("name", "text"),
        ("topic", "text"),
        ("last_message_id", "varchar(100)"),
        ("parent_id", "varchar(100)"),
        ("message_count", "int"),
        // threads only
        ("owner_id", "varchar(100)"),
        ("member_count", "int"),
        ("thread_metadata", "text"),
    ]);
    static ref MESSAGES: TableStructure = TableStructure::from_tags(&[
        ("id", "varchar(100)"),
        ("channel_id", "varchar(100)"),
        ("content", "text"),
        ("timestamp", "int"),
        ("edited_timestamp", "int"),
        ("pinned", "tinyint"),
        ("type", "int"),
        ("referenced_message", "text"),
        ("message_reference", "text"),
        ("thread", "text"),
        ("author", "text"),
        ("poll", "text"),
        ("attachments", "text"),
        ("embeds", "text"),
        ("reactions", "text"),
        ("sticker_items", "text"),
        ("mentions", "text"),
        ("mention_roles", "text"),
        ("mention_channels", "text"),
    ]);
}

/// Members wrap the account in a `user` object.
fn member_fields() -> RichMap {
    RichMap::new().flatten(
        "user",
        &[
            ("id", "id"),
            ("username", "username"),
            ("discriminator", "discriminator"),
            ("global_name", "global_name"),
            ("avatar", "avatar"),
            ("bot", "bot"),
            ("email", "email"),
            ("verified", "verified"),
        ],
    )
}

/// Message times arrive as ISO 8601 and are stored as epoch seconds.
fn message_fields() -> RichMap {
    RichMap::new()
        .filtered("timestamp", "timestamp", FilterKind::DateToTimestamp)
        .filtered("edited_timestamp", "edited_timestamp", FilterKind::DateToTimestamp)
}

pub struct Discord;

impl Discord {
    async fn users(&self, pipeline: &mut Pipeline, guild_id: &str) -> Result<(), PullError> {
        let endpoint = format!("guilds/{guild_id}/members");
        pipeline
            .pull(
                PageRequest::new(&endpoint, USERS_TABLE, &USERS)
                    .query("limit", MEMBER_LIMIT)
                    .fields(member_fields()),
            )
            .await?;
        Ok(())
    }

    /// Top-level channels only; threads come from their own endpoints.
    async fn text_channels(&self, pipeline: &mut Pipeline, guild_id: &str) -> Result<(), PullError> {
        let endpoint = format!("guilds/{guild_id}/channels");
        pipeline
            .pull(PageRequest::new(&endpoint, CHANNELS_TABLE, &CHANNELS))
            .await?;
        Ok(())
    }

    async fn active_threads(&self, pipeline: &mut Pipeline, guild_id: &str) -> Result<(), PullError> {
        let endpoint = format!("guilds/{guild_id}/threads/active");
        pipeline
            .pull(PageRequest::new(&endpoint, CHANNELS_TABLE, &CHANNELS).response_key("threads"))
            .await?;
        Ok(())
    }

    /// Public archived threads are listed per parent channel.
    async fn archived_threads(&self, pipeline: &mut Pipeline, channel_ids: &[String]) -> Result<(), PullError> {
        for channel_id in channel_ids {
            let endpoint = format!("channels/{channel_id}/threads/archived/public");
            pipeline
                .pull(PageRequest::new(&endpoint, CHANNELS_TABLE, &CHANNELS).response_key("threads"))
                .await?;
        }
        Ok(())
    }

    /// Pages each channel backwards from its newest message until a page
    /// comes back empty.
    async fn messages(&self, pipeline: &mut Pipeline, channel_ids: &[String]) -> Result<(), PullError> {
        for channel_id in channel_ids {
            let endpoint = format!("channels/{channel_id}/messages");
            let mut before: Option<String> = None;
            let mut total = 0;

            loop {
                let mut request = PageRequest::new(&endpoint, MESSAGES_TABLE, &MESSAGES)
                    .query("limit", MESSAGE_LIMIT)
                    .fields(message_fields());
                if let Some(id) = &before {
                    request = request.query("before", id);
                }

                let cursor = pipeline.pull(request).await?.cursor("id");
                if cursor.is_exhausted() {
                    break;
                }
                total += cursor.rows;
                match cursor.last_id {
                    Some(id) if before.as_ref() != Some(&id) => before = Some(id),
                    // No usable cursor; another request would repeat this page.
                    _ => break,
                }
            }
            info!(channel = %channel_id, messages = total, "Channel messages pulled");
        }
        Ok(())
    }
}

#[async_trait]
impl Origin for Discord {
    fn name(&self) -> &'static str {
        "Discord"
    }

    fn features(&self) -> &'static [Feature] {
        &[Feature::Users, Feature::Channels, Feature::Threads, Feature::Messages]
    }

    async fn run(&self, pipeline: &mut Pipeline) -> Result<(), PullError> {
        let token = pipeline.settings().token()?.to_string();
        let guild_id = pipeline.settings().extra("guild_id")?.to_string();
        pipeline
            .client_mut()
            .set_header("Authorization", &format!("Bot {token}"));

        self.users(pipeline, &guild_id).await?;

        self.text_channels(pipeline, &guild_id).await?;
        // Read back before threads join the table.
        let channel_ids = pipeline.stored_ids(CHANNELS_TABLE, "id").await?;
        self.active_threads(pipeline, &guild_id).await?;
        self.archived_threads(pipeline, &channel_ids).await?;

        let channel_ids = pipeline.stored_ids(CHANNELS_TABLE, "id").await?;
        self.messages(pipeline, &channel_ids).await
    }
}
