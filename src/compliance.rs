//! GDPR compliance scans over every text channel of a guild: export a user's
//! footprint to a transcript, or erase their authored messages.
//!
//! Export qualification is deliberately broader than erase qualification:
//! messages that merely mention the target are exported for context, but only
//! messages the target authored are ever deleted.

use std::time::Duration;

use serenity::model::id::{GuildId, UserId};
use tracing::error;

use crate::bulk::{BulkDeleter, BulkStats, HISTORY_PAGE};
use crate::errors::HostError;
use crate::host::{ArchivedMessage, ChannelInfo, HostClient};
use crate::reply::ReplySink;

/// Artifacts must be strictly below this many bytes to be delivered inline.
pub const EXPORT_SIZE_LIMIT: usize = 8_000_000;

const RECORD_SEPARATOR: &str = "\n---------------------------------------\n";

pub fn qualifies_for_export(message: &ArchivedMessage, target: UserId) -> bool {
    message.author_id == target || message.mentions.contains(&target)
}

pub fn qualifies_for_erase(message: &ArchivedMessage, target: UserId) -> bool {
    message.author_id == target
}

/// One transcript record per qualifying message.
pub fn render_record(message: &ArchivedMessage, guild_name: &str, channel_name: &str) -> String {
    let mut out = format!(
        "Author: {}\nServer: {}\nChannel: {}\nMessage: {}",
        message.author_id.get(),
        guild_name,
        channel_name,
        message.content
    );
    if !message.attachment_urls.is_empty() {
        out.push_str("\nAttachments: ");
        out.push_str(&message.attachment_urls.join(", "));
    }
    out.push_str(RECORD_SEPARATOR);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportReport {
    pub bytes: usize,
    pub messages: usize,
    pub delivered: bool,
    pub failed_channels: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseReport {
    pub queued: usize,
    pub failed_channels: usize,
}

/// Stream every text channel's history and collect qualifying messages into
/// one transcript. A failing channel is reported and skipped; the scan keeps
/// going. Progress is reported by editing a single status message in place.
pub async fn export_user_data(
    host: &dyn HostClient,
    guild: GuildId,
    target: UserId,
    sink: &dyn ReplySink,
) -> Result<ExportReport, HostError> {
    if !host.user_exists(target).await? {
        sink.send(&format!("Could not find user with id {}", target.get()))
            .await
            .ok();
        return Ok(ExportReport {
            bytes: 0,
            messages: 0,
            delivered: false,
            failed_channels: 0,
        });
    }
    let guild_name = host.guild_name(guild).await?;
    let channels = host.text_channels(guild).await?;
    let status = sink.send("Compiling compliance data...").await?;

    let mut transcript = String::new();
    let mut messages = 0usize;
    let mut failed_channels = 0usize;
    for channel in &channels {
        sink.edit(status, &format!("Processing data for: #{}", channel.name))
            .await
            .ok();
        if let Err(e) =
            scan_channel(host, channel, &guild_name, target, &mut transcript, &mut messages).await
        {
            failed_channels += 1;
            error!(target: "compliance", channel = channel.id.get(), error = %e, "channel scan failed");
            sink.send(&format!("Exception while processing channel: #{}", channel.name))
                .await
                .ok();
        }
    }
    sink.edit(status, "Compliance data compiled!").await.ok();

    let bytes = transcript.len();
    let delivered = bytes < EXPORT_SIZE_LIMIT;
    if delivered {
        sink.send_file(
            "Data:",
            &format!("gdpr-{}.txt", target.get()),
            transcript.into_bytes(),
        )
        .await?;
    } else {
        sink.send(&format!("Data is too large ({bytes} bytes) to deliver inline."))
            .await
            .ok();
    }
    Ok(ExportReport {
        bytes,
        messages,
        delivered,
        failed_channels,
    })
}

async fn scan_channel(
    host: &dyn HostClient,
    channel: &ChannelInfo,
    guild_name: &str,
    target: UserId,
    transcript: &mut String,
    count: &mut usize,
) -> Result<(), HostError> {
    let mut cursor = None;
    loop {
        let page = host.messages_before(channel.id, cursor, HISTORY_PAGE).await?;
        let Some(last) = page.last() else {
            return Ok(());
        };
        cursor = Some(last.id);
        for message in &page {
            if qualifies_for_export(message, target) {
                // Past the delivery limit the transcript is withheld anyway,
                // so stop growing it and just keep counting.
                if transcript.len() < EXPORT_SIZE_LIMIT {
                    transcript.push_str(&render_record(message, guild_name, &channel.name));
                }
                *count += 1;
            }
        }
    }
}

/// Delete the target's authored messages in every text channel, via the bulk
/// engine. Per-channel failures are reported and do not stop the scan.
pub async fn erase_user_data(
    host: &dyn HostClient,
    guild: GuildId,
    target: UserId,
    sink: &dyn ReplySink,
    cooldown: Duration,
) -> Result<EraseReport, HostError> {
    if !host.user_exists(target).await? {
        sink.send(&format!("Could not find user with id {}", target.get()))
            .await
            .ok();
        return Ok(EraseReport {
            queued: 0,
            failed_channels: 0,
        });
    }
    let channels = host.text_channels(guild).await?;
    let status = sink
        .send(&format!(
            "Deleting messages sent by {} in compliance with GDPR.",
            target.get()
        ))
        .await?;

    let mut queued = 0usize;
    let mut failed_channels = 0usize;
    for channel in &channels {
        sink.edit(status, &format!("Processing data for: #{}", channel.name))
            .await
            .ok();
        match erase_channel(host, channel, target, cooldown).await {
            Ok(stats) => queued += stats.queued,
            Err(e) => {
                failed_channels += 1;
                error!(target: "compliance", channel = channel.id.get(), error = %e, "channel erase failed");
                sink.send(&format!("Exception while processing channel: #{}", channel.name))
                    .await
                    .ok();
            }
        }
    }
    sink.edit(status, &format!("Data for user {} deleted!", target.get()))
        .await
        .ok();
    Ok(EraseReport {
        queued,
        failed_channels,
    })
}

async fn erase_channel(
    host: &dyn HostClient,
    channel: &ChannelInfo,
    target: UserId,
    cooldown: Duration,
) -> Result<BulkStats, HostError> {
    let mut deleter = BulkDeleter::with_cooldown(host, channel.id, cooldown);
    let mut cursor = None;
    loop {
        let page = host.messages_before(channel.id, cursor, HISTORY_PAGE).await?;
        let Some(last) = page.last() else {
            break;
        };
        cursor = Some(last.id);
        for message in &page {
            if qualifies_for_erase(message, target) {
                deleter.push(message.id).await;
            }
        }
    }
    Ok(deleter.finish().await)
}
