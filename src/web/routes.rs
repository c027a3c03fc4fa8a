use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tracing::info;

use super::AppState;
use crate::error::{pretty_json, ApiError};
use crate::parser::{parse_channel_html, Channel, ChannelPage, Message, ParseOptions};
use crate::selection::Selection;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/api", get(api))
}

/// Raw query parameters of `GET /api`. Empty values count as absent.
#[derive(Debug, Default)]
pub struct ApiParams {
    channel_id: Option<String>,
    message_index: Option<String>,
    range: Option<String>,
    include_reactions: Option<String>,
    include_replies: Option<String>,
}

impl ApiParams {
    /// Collect known keys from the decoded query pairs. A repeated key keeps
    /// its last value; unknown keys are ignored.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "channel_id" => &mut params.channel_id,
                "message_index" => &mut params.message_index,
                "range" => &mut params.range,
                "include_reactions" => &mut params.include_reactions,
                "include_replies" => &mut params.include_replies,
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }

    fn options(&self) -> ParseOptions {
        ParseOptions {
            include_reactions: flag(self.include_reactions.as_deref()),
            include_replies: flag(self.include_replies.as_deref()),
        }
    }
}

/// Flags default to on; when given, only the exact string `"true"` enables them.
fn flag(value: Option<&str>) -> bool {
    value.map_or(true, |v| v == "true")
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
struct ApiResponse {
    channel: Channel,
    messages: Vec<Message>,
}

async fn api(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let params = ApiParams::from_pairs(pairs);
    match handle_api(&state, &params).await {
        Ok(body) => pretty_json(StatusCode::OK, &body),
        Err(e) => e.into_response(),
    }
}

async fn handle_api(state: &AppState, params: &ApiParams) -> Result<ApiResponse, ApiError> {
    let selection = Selection::from_params(
        present(params.range.as_ref()),
        present(params.message_index.as_ref()),
    )?;

    let channel_id = present(params.channel_id.as_ref()).ok_or_else(|| {
        ApiError::Validation("Missing required parameter: channel_id".to_string())
    })?;

    let html = state.fetcher.fetch(channel_id).await?;
    let ChannelPage { channel, messages } = parse_channel_html(&html, params.options())?;

    info!(
        channel = %channel_id,
        retrieved = messages.len(),
        selection = ?selection,
        "Serving channel messages"
    );

    let messages = select_messages(messages, &selection)?;
    Ok(ApiResponse { channel, messages })
}

/// Pick the requested 1-based indices out of the oldest-first window.
///
/// Index 1 is the most recent message, i.e. the last element.
fn select_messages(
    messages: Vec<Message>,
    selection: &Selection,
) -> Result<Vec<Message>, ApiError> {
    match selection {
        Selection::All => Ok(messages),
        Selection::Indices(indices) => indices
            .iter()
            .map(|&index| {
                messages
                    .len()
                    .checked_sub(index)
                    .and_then(|position| messages.get(position))
                    .cloned()
                    .ok_or(ApiError::NotFoundInWindow { index })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<Message> {
        (1..=n)
            .map(|i| Message {
                id: Some(i.to_string()),
                ..Default::default()
            })
            .collect()
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().filter_map(|m| m.id.as_deref()).collect()
    }

    #[test]
    fn test_flag_defaults_to_true() {
        assert!(flag(None));
        assert!(flag(Some("true")));
        assert!(!flag(Some("false")));
        assert!(!flag(Some("TRUE")));
        assert!(!flag(Some("")));
    }

    #[test]
    fn test_select_all_keeps_order() {
        let selected = select_messages(numbered(3), &Selection::All).unwrap();
        assert_eq!(ids(&selected), ["1", "2", "3"]);
    }

    #[test]
    fn test_select_indices_in_requested_order() {
        // Oldest first: id 5 is the most recent message
        let selected = select_messages(numbered(5), &Selection::Indices(vec![1, 2, 3])).unwrap();
        assert_eq!(ids(&selected), ["5", "4", "3"]);

        let selected = select_messages(numbered(5), &Selection::Indices(vec![5])).unwrap();
        assert_eq!(ids(&selected), ["1"]);
    }

    #[test]
    fn test_select_beyond_window() {
        let err = select_messages(numbered(2), &Selection::Indices(vec![2, 3])).unwrap_err();
        assert!(matches!(err, ApiError::NotFoundInWindow { index: 3 }));
    }

    #[test]
    fn test_params_repeated_key_keeps_last() {
        let params = ApiParams::from_pairs(vec![
            ("channel_id".to_string(), "first".to_string()),
            ("utm_source".to_string(), "feed".to_string()),
            ("channel_id".to_string(), "durov".to_string()),
            ("include_replies".to_string(), "false".to_string()),
        ]);

        assert_eq!(params.channel_id.as_deref(), Some("durov"));
        assert_eq!(params.range, None);
        assert!(params.options().include_reactions);
        assert!(!params.options().include_replies);
    }

    #[test]
    fn test_present_filters_empty() {
        assert_eq!(present(Some(&String::new())), None);
        assert_eq!(present(Some(&"x".to_string())), Some("x"));
        assert_eq!(present(None), None);
    }
}
