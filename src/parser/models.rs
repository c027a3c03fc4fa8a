use serde::Serialize;

/// Channel profile shown at the top of the preview page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub title: String,
    /// Handle without the leading `@`.
    pub username: String,
    pub link: String,
    pub about: String,
    pub subscribers: u64,
}

/// A single channel post.
///
/// Every field is optional; absent values are omitted from the JSON output
/// rather than serialized as `null` or `""`. Run [`Message::compact`] before
/// serializing so empty strings and lists are dropped too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    /// Markdown rendering of the message body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarded_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyTo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<Reaction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Replies>,
}

impl Message {
    /// Drop every field whose value is an empty string or an empty list.
    #[must_use]
    pub fn compact(self) -> Self {
        Self {
            id: non_empty(self.id),
            permalink: non_empty(self.permalink),
            author_name: non_empty(self.author_name),
            date: non_empty(self.date),
            views: self.views,
            text: non_empty(self.text),
            media: self.media,
            forwarded_from: non_empty(self.forwarded_from),
            reply_to: self.reply_to,
            reactions: self.reactions.filter(|r| !r.is_empty()),
            replies: self.replies,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Attached media, serialized as `{"type": "photo", "url": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Media {
    Photo { url: String },
    Video { url: String },
    Voice { url: String },
}

/// Preview of the message this post replies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplyTo {
    pub author_name: String,
    pub text: String,
    pub link: String,
}

/// Summary of the linked discussion thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replies {
    pub count: u64,
    pub link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaidReaction {
    #[serde(rename = "telegram_stars")]
    TelegramStars,
}

/// A reaction badge under a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reaction {
    Emoji {
        emoji: String,
        count: u64,
    },
    Paid {
        #[serde(rename = "type")]
        kind: PaidReaction,
        count: u64,
    },
}

impl Reaction {
    #[must_use]
    pub fn stars(count: u64) -> Self {
        Self::Paid {
            kind: PaidReaction::TelegramStars,
            count,
        }
    }
}

/// Channel profile plus its message window, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelPage {
    pub channel: Channel,
    pub messages: Vec<Message>,
}
