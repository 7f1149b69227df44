//! `Link` header parsing (RFC 8288 subset).

use crate::error::Result;
use crate::types::Cursor;
use url::Url;

/// One link from a `Link` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub uri: String,
    /// Relation types, lowercased. `rel="next prev"` yields two.
    pub rels: Vec<String>,
}

impl Link {
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels.iter().any(|r| r == rel)
    }
}

/// Parse a `Link` header value such as
/// `<https://a/x?max_id=1>; rel="next", <https://a/x?min_id=9>; rel="prev"`.
///
/// Malformed segments are skipped.
pub fn parse_link_header(header: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let mut rest = header;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            break;
        };
        let uri = after[..end].trim().to_string();
        let (params, remaining) = split_params(&after[end + 1..]);
        rest = remaining;

        let rels = params
            .split(';')
            .filter_map(|param| {
                let (name, value) = param.split_once('=')?;
                if name.trim().eq_ignore_ascii_case("rel") {
                    Some(value.trim().trim_matches('"').to_string())
                } else {
                    None
                }
            })
            .flat_map(|value| {
                value
                    .split_whitespace()
                    .map(|r| r.to_ascii_lowercase())
                    .collect::<Vec<_>>()
            })
            .collect();

        links.push(Link { uri, rels });
    }

    links
}

/// Split off the parameter section of one link: everything up to the first
/// comma outside quotes.
fn split_params(s: &str) -> (&str, &str) {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return (&s[..i], &s[i + 1..]),
            _ => {}
        }
    }
    (s, "")
}

/// Extract the `rel="next"` target as a cursor.
///
/// Relative targets are resolved against `request_url`. A missing header or
/// missing `next` link yields `None`; an unparseable target is an error.
pub fn next_cursor(header: Option<&str>, request_url: &str) -> Result<Option<Cursor>> {
    let Some(header) = header else {
        return Ok(None);
    };

    let Some(link) = parse_link_header(header)
        .into_iter()
        .find(|link| link.has_rel("next"))
    else {
        return Ok(None);
    };

    let resolved = match Url::parse(&link.uri) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(request_url)?.join(&link.uri)?,
        Err(e) => return Err(e.into()),
    };

    Ok(Some(Cursor(resolved.into())))
}
