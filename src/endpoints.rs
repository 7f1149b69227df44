//! Well-known feed keys and the resources they are fetched from.

use crate::error::{FeedError, Result};
use crate::types::FeedKey;
use url::Url;

/// A feed whose resource URL can be derived from its key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedKind {
    /// Statuses quoting a status: `quotes:<statusId>`.
    Quotes { status_id: String },
    /// Public timeline of another instance: `remote:<host>` or
    /// `remote:media:<host>`.
    Remote { instance: String, only_media: bool },
    /// Account search from the chat composer: `chat-search:<query>`.
    ChatSearch { query: String },
}

impl FeedKind {
    /// Recognise a key. Unknown shapes yield `None`.
    pub fn parse(key: &FeedKey) -> Option<Self> {
        let (kind, rest) = key.as_str().split_once(':')?;
        if rest.is_empty() {
            return None;
        }

        match kind {
            "quotes" => Some(FeedKind::Quotes {
                status_id: rest.to_string(),
            }),
            "remote" => match rest.strip_prefix("media:") {
                Some(instance) if !instance.is_empty() => Some(FeedKind::Remote {
                    instance: instance.to_string(),
                    only_media: true,
                }),
                Some(_) => None,
                None => Some(FeedKind::Remote {
                    instance: rest.to_string(),
                    only_media: false,
                }),
            },
            "chat-search" => Some(FeedKind::ChatSearch {
                query: rest.to_string(),
            }),
            _ => None,
        }
    }

    pub fn key(&self) -> FeedKey {
        match self {
            FeedKind::Quotes { status_id } => FeedKey(format!("quotes:{}", status_id)),
            FeedKind::Remote {
                instance,
                only_media: true,
            } => FeedKey(format!("remote:media:{}", instance)),
            FeedKind::Remote { instance, .. } => FeedKey(format!("remote:{}", instance)),
            FeedKind::ChatSearch { query } => FeedKey(format!("chat-search:{}", query)),
        }
    }

    /// First-page URL under the API base. A path prefix on the base (e.g.
    /// `https://host/sub`) is kept; key components become single
    /// percent-encoded path segments or query values.
    pub fn resource_url(&self, api_base: &str) -> Result<String> {
        let base = Url::parse(api_base)
            .map_err(|e| FeedError::Config(format!("invalid api base {:?}: {}", api_base, e)))?;

        let mut url = match self {
            FeedKind::Quotes { status_id } => {
                if matches!(status_id.as_str(), "." | "..") {
                    return Err(FeedError::Config(format!("invalid status id {:?}", status_id)));
                }
                api_url(&base, &["api", "v1", "pleroma", "statuses", status_id.as_str(), "quotes"])?
            }
            FeedKind::Remote { .. } => api_url(&base, &["api", "v1", "timelines", "public"])?,
            FeedKind::ChatSearch { .. } => api_url(&base, &["api", "v1", "accounts", "search"])?,
        };

        match self {
            FeedKind::Quotes { .. } => {}
            FeedKind::Remote {
                instance,
                only_media,
            } => {
                let mut query = url.query_pairs_mut();
                query.append_pair("instance", instance);
                if *only_media {
                    query.append_pair("only_media", "true");
                }
            }
            FeedKind::ChatSearch { query } => {
                url.query_pairs_mut()
                    .append_pair("q", query)
                    .append_pair("resolve", "false")
                    .append_pair("followers", "true");
            }
        }

        Ok(url.into())
    }
}

/// `base` with `segments` appended to its path, query and fragment dropped.
fn api_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| FeedError::Config(format!("api base {} cannot hold a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl FeedKey {
    pub fn quotes(status_id: &str) -> Self {
        FeedKind::Quotes {
            status_id: status_id.to_string(),
        }
        .key()
    }

    pub fn remote(instance: &str, only_media: bool) -> Self {
        FeedKind::Remote {
            instance: instance.to_string(),
            only_media,
        }
        .key()
    }

    pub fn chat_search(query: &str) -> Self {
        FeedKind::ChatSearch {
            query: query.to_string(),
        }
        .key()
    }

    pub fn kind(&self) -> Option<FeedKind> {
        FeedKind::parse(self)
    }
}
