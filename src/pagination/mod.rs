//! Cursor pagination.
//!
//! A feed is read newest-first. The first request goes to the feed's resource
//! URL; each response may carry a `Link` header whose `rel="next"` target is
//! kept as the feed's [`Cursor`](crate::Cursor) and requested by the next
//! expand. A response without a `next` link ends the feed.

mod links;
mod paginator;

pub use links::{next_cursor, parse_link_header, Link};
pub use paginator::{decode_page, CursorPaginator, Fetch, FetchTicket};
