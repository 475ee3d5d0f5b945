//! Audit-log embeds for message deletions and edits.

use serenity::builder::CreateEmbed;
use serenity::model::channel::Message;

const DELETE_COLOUR: u32 = 0xff0000;
const EDIT_COLOUR: u32 = 0xffff00;

/// Link previews resolving re-fire the edit event with identical content;
/// only real content changes are worth logging.
pub fn is_visible_edit(before: &str, after: &str) -> bool {
    before != after
}

struct Snapshot {
    author_name: String,
    author_id: u64,
    channel_id: u64,
    content: String,
    timestamp: String,
    attachments: Vec<String>,
}

fn snapshot(message: &Message) -> Snapshot {
    Snapshot {
        author_name: message.author.name.clone(),
        author_id: message.author.id.get(),
        channel_id: message.channel_id.get(),
        content: message.content.clone(),
        timestamp: message.timestamp.to_string(),
        attachments: message.attachments.iter().map(|a| a.proxy_url.clone()).collect(),
    }
}

fn edited_snapshot(message: &Message) -> Snapshot {
    let mut snap = snapshot(message);
    if let Some(edited) = message.edited_timestamp {
        snap.timestamp = edited.to_string();
    }
    snap
}

pub fn delete_log_embed(message: &Message) -> CreateEmbed {
    build_delete(&snapshot(message))
}

pub fn edit_log_embed(before: &Message, after: &Message) -> CreateEmbed {
    build_edit(&snapshot(before), &edited_snapshot(after))
}

fn build_delete(message: &Snapshot) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title("Message Deleted")
        .description(format!(
            "A message from {} was deleted from <#{}>",
            message.author_name, message.channel_id
        ))
        .colour(DELETE_COLOUR);
    let embed = context_fields(embed, message.author_id, message.channel_id);
    message_fields(embed, "Content", message)
}

fn build_edit(before: &Snapshot, after: &Snapshot) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title("Message Edited")
        .description(format!(
            "A message from {} was edited in <#{}>",
            before.author_name, before.channel_id
        ))
        .colour(EDIT_COLOUR);
    let embed = context_fields(embed, before.author_id, before.channel_id);
    let embed = message_fields(embed, "Original message", before);
    message_fields(embed, "Edited message", after)
}

fn context_fields(embed: CreateEmbed, author_id: u64, channel_id: u64) -> CreateEmbed {
    embed
        .field("User", format!("<@{author_id}>"), false)
        .field("ID", author_id.to_string(), false)
        .field("Channel", format!("<#{channel_id}>"), false)
}

fn message_fields(mut embed: CreateEmbed, name: &str, message: &Snapshot) -> CreateEmbed {
    // Embed fields reject empty values.
    let content = if message.content.is_empty() {
        "None"
    } else {
        message.content.as_str()
    };
    embed = embed
        .field(name, content, false)
        .field("Timestamp", message.timestamp.clone(), false);
    for attachment in &message.attachments {
        embed = embed.field("Attachment", attachment, false);
    }
    embed
}
