pub mod session;

use serde::{de::IgnoredAny, Deserialize};

use crate::{gmail::session::AuthorizedSession, status::UnreadCounter, Error};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

/// Gmail search query for unread inbox messages.
pub const UNREAD_INBOX_QUERY: &str = "label:inbox is:unread";

/// The authenticated user.
const ME: &str = "me";

/// Response of `users.messages.list`. Gmail omits `messages` when nothing matches.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    #[serde(default)]
    pub messages: Vec<IgnoredAny>,
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub result_size_estimate: u32,
}

/// Google's JSON error envelope, `{"error": {"code": 403, "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Reduces an error response to one line, preferring Google's own message.
fn error_message(body: &str) -> String {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.to_string(),
    };
    message.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct Gmail<'a> {
    session: AuthorizedSession<'a>,
    api_base: String,
}

impl<'a> Gmail<'a> {
    pub fn new(session: AuthorizedSession<'a>) -> Self {
        Self::with_api_base(session, GMAIL_API_BASE)
    }

    pub fn with_api_base<S>(session: AuthorizedSession<'a>, api_base: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            session,
            api_base: api_base.into(),
        }
    }

    /// Fetches the first page of messages matching `query`.
    #[tracing::instrument(skip(self))]
    pub fn list_messages(&mut self, query: &str) -> Result<ListMessagesResponse, Error> {
        let url = format!(
            "{}/gmail/v1/users/{ME}/messages",
            self.api_base.trim_end_matches('/')
        );
        let response = self.session.get(&url, &[("q", query)])?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::debug!("Gmail error response: {body}");
            return Err(Error::Api {
                status,
                message: error_message(&body),
            });
        }

        let list: ListMessagesResponse = serde_json::from_slice(&response.bytes()?)?;
        if list.next_page_token.is_some() {
            tracing::debug!(
                "Only the first page was fetched, Gmail estimates {} results",
                list.result_size_estimate
            );
        }
        Ok(list)
    }
}

impl UnreadCounter for Gmail<'_> {
    fn count_unread(&mut self) -> Result<usize, Error> {
        Ok(self.list_messages(UNREAD_INBOX_QUERY)?.messages.len())
    }
}
