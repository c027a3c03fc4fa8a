//! Extraction of channel info and messages from a `t.me/s/<channel>` preview page.
//!
//! Every lookup is best effort: a missing node yields an absent field, never
//! an error. Only a failure to build the extraction machinery itself surfaces
//! as [`ParseError`].

mod markdown;
pub mod models;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

use crate::constants::MAX_MESSAGES;
use crate::normalize::{normalize_date, parse_count};

pub use markdown::to_markdown;
pub use models::{Channel, ChannelPage, Media, Message, Reaction, Replies, ReplyTo};

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: &'static str, message: String },
    #[error("invalid pattern: {0}")]
    Pattern(String),
}

/// Which optional sections to extract for each message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub include_reactions: bool,
    pub include_replies: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            include_reactions: true,
            include_replies: true,
        }
    }
}

/// Compiled selectors for the preview page layout.
struct Selectors {
    channel_title: Selector,
    channel_username: Selector,
    channel_about: Selector,
    channel_subscribers: Selector,

    message: Selector,
    permalink: Selector,
    permalink_anchor: Selector,
    owner_name: Selector,
    date: Selector,
    views: Selector,
    text: Selector,
    photo: Selector,
    video: Selector,
    voice: Selector,
    forwarded_from: Selector,

    reply: Selector,
    reply_author: Selector,
    reply_text: Selector,

    reaction: Selector,
    emoji: Selector,
    reaction_emoji: Selector,

    replies: Selector,
    reply_count: Selector,

    background_url: Regex,
    permalink_id: Regex,
}

fn selector(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector {
        selector: css,
        message: format!("{e:?}"),
    })
}

impl Selectors {
    fn compile() -> Result<Self, ParseError> {
        Ok(Self {
            channel_title: selector(".tgme_channel_info_header_title")?,
            channel_username: selector(".tgme_channel_info_header_username")?,
            channel_about: selector(".tgme_channel_info_description")?,
            channel_subscribers: selector(
                ".tgme_channel_info_counters .tgme_channel_info_counter:first-child .counter_value",
            )?,

            message: selector(".tgme_widget_message_wrap .tgme_widget_message")?,
            permalink: selector(".tgme_widget_message_footer .tgme_widget_message_date > a")?,
            permalink_anchor: selector(".tgme_widget_message_footer a.tgme_widget_message_date")?,
            owner_name: selector(".tgme_widget_message_author .tgme_widget_message_owner_name")?,
            date: selector(".tgme_widget_message_date time")?,
            views: selector(".tgme_widget_message_views")?,
            text: selector(".tgme_widget_message_text.js-message_text")?,
            photo: selector(".tgme_widget_message_photo_wrap")?,
            video: selector(".tgme_widget_message_video")?,
            voice: selector(".tgme_widget_message_voice")?,
            forwarded_from: selector(".tgme_widget_message_forwarded_from a")?,

            reply: selector(".tgme_widget_message_reply")?,
            reply_author: selector(".tgme_widget_message_author_name")?,
            reply_text: selector(".js-message_reply_text")?,

            reaction: selector(".tgme_widget_message_reactions .tgme_reaction")?,
            emoji: selector(".emoji")?,
            reaction_emoji: selector(".tgme_reaction_emoji")?,

            replies: selector(".tgme_widget_message_replies")?,
            reply_count: selector(".tgme_widget_message_reply_count")?,

            background_url: Regex::new(r"url\('?(.*?)'?\)")
                .map_err(|e| ParseError::Pattern(e.to_string()))?,
            permalink_id: Regex::new(r"/(\d+)$").map_err(|e| ParseError::Pattern(e.to_string()))?,
        })
    }
}

static SELECTORS: LazyLock<Result<Selectors, ParseError>> = LazyLock::new(Selectors::compile);

/// Parse a channel preview page into the channel profile and its most recent
/// messages.
///
/// At most [`MAX_MESSAGES`] messages are kept, the most recent ones. The
/// returned list is oldest first, so the most recent message is last. The page
/// may list its blocks newest first or in reading order; the direction is read
/// off the message ids, and newest first is assumed when the ids cannot tell.
///
/// # Errors
///
/// Returns [`ParseError`] only if the selectors cannot be compiled. Malformed
/// HTML is parsed leniently.
pub fn parse_channel_html(html: &str, options: ParseOptions) -> Result<ChannelPage, ParseError> {
    let selectors = SELECTORS.as_ref().map_err(Clone::clone)?;
    let document = Html::parse_document(html);

    let channel = extract_channel(&document, selectors);

    let mut messages: Vec<Message> = document
        .select(&selectors.message)
        .map(|element| extract_message(element, selectors, options))
        .collect();

    if is_oldest_first(&messages) {
        let excess = messages.len().saturating_sub(MAX_MESSAGES);
        messages.drain(..excess);
    } else {
        messages.truncate(MAX_MESSAGES);
        messages.reverse();
    }

    debug!(
        channel = %channel.username,
        messages = messages.len(),
        "Parsed channel page"
    );

    Ok(ChannelPage { channel, messages })
}

/// Whether the blocks run from oldest to newest, judged by the first and last
/// numeric message ids.
fn is_oldest_first(messages: &[Message]) -> bool {
    let mut ids = messages
        .iter()
        .filter_map(|m| m.id.as_deref().and_then(|id| id.parse::<u64>().ok()));
    match (ids.next(), ids.next_back()) {
        (Some(first), Some(last)) => first < last,
        _ => false,
    }
}

fn extract_channel(document: &Html, s: &Selectors) -> Channel {
    let root = document.root_element();
    let username_el = root.select(&s.channel_username).next();

    Channel {
        title: select_text(root, &s.channel_title).unwrap_or_default(),
        username: username_el
            .map(|el| element_text(el).replacen('@', "", 1))
            .unwrap_or_default(),
        link: username_el
            .and_then(|el| el.value().attr("href"))
            .unwrap_or_default()
            .to_string(),
        about: select_text(root, &s.channel_about).unwrap_or_default(),
        subscribers: parse_count(&select_text(root, &s.channel_subscribers).unwrap_or_default()),
    }
}

fn extract_message(element: ElementRef, s: &Selectors, options: ParseOptions) -> Message {
    // The link is either nested in the date element or carries the date class itself.
    let permalink = select_attr(element, &s.permalink, "href")
        .or_else(|| select_attr(element, &s.permalink_anchor, "href"));

    let id = permalink.as_deref().and_then(|link| {
        s.permalink_id
            .captures(link)
            .map(|caps| caps[1].to_string())
    });

    let date = select_attr(element, &s.date, "datetime").and_then(|raw| {
        normalize_date(&raw)
            .map_err(|e| debug!(error = %e, "Skipping unparseable message date"))
            .ok()
    });

    let text = element
        .select(&s.text)
        .next()
        .map(|el| to_markdown(&el.inner_html()));

    let forwarded_from = select_text(element, &s.forwarded_from);

    let reply_to = if options.include_replies {
        extract_reply_to(element, s)
    } else {
        None
    };

    let reactions = if options.include_reactions {
        Some(extract_reactions(element, s))
    } else {
        None
    };

    let replies = element.select(&s.replies).next().map(|el| Replies {
        count: parse_count(&select_text(el, &s.reply_count).unwrap_or_default()),
        link: el.value().attr("href").unwrap_or_default().to_string(),
    });

    Message {
        id,
        permalink,
        author_name: select_text(element, &s.owner_name),
        date,
        views: select_text(element, &s.views).map(|v| parse_count(&v)),
        text,
        media: extract_media(element, s),
        forwarded_from,
        reply_to,
        reactions,
        replies,
    }
    .compact()
}

/// Photo, then video, then voice; the first one found wins.
fn extract_media(element: ElementRef, s: &Selectors) -> Option<Media> {
    if let Some(photo) = element.select(&s.photo).next() {
        let style = photo.value().attr("style").unwrap_or_default();
        if let Some(caps) = s.background_url.captures(style) {
            return Some(Media::Photo {
                url: caps[1].to_string(),
            });
        }
    }

    if let Some(video) = element.select(&s.video).next() {
        return Some(Media::Video {
            url: video.value().attr("src").unwrap_or_default().to_string(),
        });
    }

    element.select(&s.voice).next().map(|voice| Media::Voice {
        url: voice.value().attr("src").unwrap_or_default().to_string(),
    })
}

fn extract_reply_to(element: ElementRef, s: &Selectors) -> Option<ReplyTo> {
    let reply = element.select(&s.reply).next()?;

    Some(ReplyTo {
        author_name: select_text(reply, &s.reply_author).unwrap_or_default(),
        text: select_text(reply, &s.reply_text).unwrap_or_default(),
        link: reply.value().attr("href").unwrap_or_default().to_string(),
    })
}

fn extract_reactions(element: ElementRef, s: &Selectors) -> Vec<Reaction> {
    element
        .select(&s.reaction)
        .filter_map(|badge| {
            // The count is the last direct text node; the emoji sits in a child element.
            let count_text = badge
                .children()
                .filter_map(|node| node.value().as_text())
                .map(|text| text.trim())
                .filter(|text| !text.is_empty())
                .next_back()
                .unwrap_or("0");
            let count = parse_count(count_text);

            if badge.value().classes().any(|c| c == "tgme_reaction_paid") {
                return Some(Reaction::stars(count));
            }

            select_text(badge, &s.emoji)
                .or_else(|| select_text(badge, &s.reaction_emoji))
                .map(|emoji| Reaction::Emoji { emoji, count })
        })
        .collect()
}

/// Trimmed text of the first match, or `None` if nothing matches or the text is blank.
fn select_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

fn select_attr(scope: ElementRef, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(message_html: &str) -> String {
        format!(
            r#"<html><body><section class="tgme_channel_history">
                <div class="tgme_widget_message_wrap">{message_html}</div>
            </section></body></html>"#
        )
    }

    fn parse_single(message_html: &str) -> Message {
        let page = parse_channel_html(&wrap(message_html), ParseOptions::default()).unwrap();
        assert_eq!(page.messages.len(), 1);
        page.messages.into_iter().next().unwrap()
    }

    fn with_id(id: &str) -> Message {
        Message {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_direction_from_ids() {
        assert!(is_oldest_first(&[with_id("7"), Message::default(), with_id("9")]));
        assert!(!is_oldest_first(&[with_id("9"), with_id("8"), with_id("7")]));
        // Not enough ids to decide
        assert!(!is_oldest_first(&[with_id("7")]));
        assert!(!is_oldest_first(&[Message::default(), Message::default()]));
    }

    #[test]
    fn test_permalink_id_and_date() {
        let message = parse_single(
            r#"<div class="tgme_widget_message">
                <div class="tgme_widget_message_footer">
                    <span class="tgme_widget_message_views">1.2K</span>
                    <span class="tgme_widget_message_date"><a href="https://t.me/durov/321"><time datetime="2024-03-01T08:00:00+00:00">08:00</time></a></span>
                </div>
            </div>"#,
        );

        assert_eq!(message.id.as_deref(), Some("321"));
        assert_eq!(message.permalink.as_deref(), Some("https://t.me/durov/321"));
        assert_eq!(message.date.as_deref(), Some("2024-03-01T08:00:00.000Z"));
        assert_eq!(message.views, Some(1200));
    }

    #[test]
    fn test_permalink_on_date_anchor() {
        let message = parse_single(
            r#"<div class="tgme_widget_message">
                <div class="tgme_widget_message_footer">
                    <a class="tgme_widget_message_date" href="https://t.me/durov/77"><time datetime="2024-03-01T08:00:00+00:00">08:00</time></a>
                </div>
            </div>"#,
        );

        assert_eq!(message.id.as_deref(), Some("77"));
        assert_eq!(message.date.as_deref(), Some("2024-03-01T08:00:00.000Z"));
    }

    #[test]
    fn test_missing_fields_are_absent() {
        let message = parse_single(r#"<div class="tgme_widget_message"></div>"#);
        assert_eq!(message, Message::default());

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_invalid_date_is_dropped() {
        let message = parse_single(
            r#"<div class="tgme_widget_message">
                <span class="tgme_widget_message_date"><a href="https://t.me/x/1"><time datetime="not a date"></time></a></span>
            </div>"#,
        );
        assert_eq!(message.date, None);
    }

    #[test]
    fn test_media_priority() {
        let message = parse_single(
            r#"<div class="tgme_widget_message">
                <a class="tgme_widget_message_photo_wrap" style="width:100%;background-image:url('https://cdn.example.com/p.jpg')"></a>
                <video class="tgme_widget_message_video" src="https://cdn.example.com/v.mp4"></video>
            </div>"#,
        );
        assert_eq!(
            message.media,
            Some(Media::Photo {
                url: "https://cdn.example.com/p.jpg".to_string()
            })
        );

        let message = parse_single(
            r#"<div class="tgme_widget_message">
                <a class="tgme_widget_message_photo_wrap" style="width:100%"></a>
                <audio class="tgme_widget_message_voice" src="https://cdn.example.com/a.ogg"></audio>
            </div>"#,
        );
        assert_eq!(
            message.media,
            Some(Media::Voice {
                url: "https://cdn.example.com/a.ogg".to_string()
            })
        );
    }

    #[test]
    fn test_reactions() {
        let message = parse_single(
            r#"<div class="tgme_widget_message">
                <div class="tgme_widget_message_reactions">
                    <span class="tgme_reaction"><i class="emoji"><b>👍</b></i>4.9K</span>
                    <span class="tgme_reaction tgme_reaction_paid"><i class="star"></i>15</span>
                    <span class="tgme_reaction"><i class="custom"></i>3</span>
                    <span class="tgme_reaction"><span class="tgme_reaction_emoji">🔥</span></span>
                </div>
            </div>"#,
        );

        assert_eq!(
            message.reactions,
            Some(vec![
                Reaction::Emoji {
                    emoji: "👍".to_string(),
                    count: 4900
                },
                Reaction::stars(15),
                Reaction::Emoji {
                    emoji: "🔥".to_string(),
                    count: 0
                },
            ])
        );
    }

    #[test]
    fn test_options_disable_sections() {
        let html = wrap(
            r#"<div class="tgme_widget_message">
                <a class="tgme_widget_message_reply" href="https://t.me/durov/10">
                    <div class="tgme_widget_message_author_name">Pavel</div>
                    <div class="tgme_widget_message_text js-message_reply_text">Earlier post</div>
                </a>
                <div class="tgme_widget_message_reactions">
                    <span class="tgme_reaction"><i class="emoji">❤</i>7</span>
                </div>
            </div>"#,
        );

        let page = parse_channel_html(&html, ParseOptions::default()).unwrap();
        let message = &page.messages[0];
        assert_eq!(
            message.reply_to,
            Some(ReplyTo {
                author_name: "Pavel".to_string(),
                text: "Earlier post".to_string(),
                link: "https://t.me/durov/10".to_string(),
            })
        );
        assert_eq!(message.reactions.as_ref().map(Vec::len), Some(1));
        // The reply preview's text must not be mistaken for the body
        assert_eq!(message.text, None);

        let page = parse_channel_html(
            &html,
            ParseOptions {
                include_reactions: false,
                include_replies: false,
            },
        )
        .unwrap();
        assert_eq!(page.messages[0].reply_to, None);
        assert_eq!(page.messages[0].reactions, None);
    }

    #[test]
    fn test_malformed_html_is_lenient() {
        let page = parse_channel_html(
            "<div class=\"tgme_channel_info_header_title\"><b>Half",
            ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(page.channel.title, "Half");
        assert!(page.messages.is_empty());
    }
}
