use chrono::NaiveDateTime;
use tracing::{error, info, warn};
use url::Url;

use crate::html;
use crate::transport::Transport;

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";

/// One meeting directory on the file server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingFolder {
    /// Link target as it appears on the index page.
    pub href: String,
    pub modified: NaiveDateTime,
}

/// Fetch the meetings index and return folders newest first. Empty on any
/// transport failure.
pub async fn discover_folders<T: Transport>(
    transport: &T,
    index_url: &Url,
    prefix: &str,
) -> Vec<MeetingFolder> {
    info!(url = %index_url, "fetching meeting folders");
    let page = match transport.get_text(index_url).await {
        Ok(p) => p,
        Err(e) => {
            error!(url = %index_url, "error fetching index: {}", e);
            return Vec::new();
        }
    };

    let folders = parse_listing(&page, prefix);
    info!("found and sorted {} meeting folders", folders.len());
    folders
}

/// Parse a directory listing table. Rows whose first link is not a plain
/// `prefix*` folder link are ignored; rows with a bad timestamp are skipped.
pub fn parse_listing(page: &str, prefix: &str) -> Vec<MeetingFolder> {
    let mut folders = Vec::new();

    for row in html::rows(html::table_body(page)) {
        let Some(link) = html::first_anchor(row) else {
            continue;
        };
        if !link.text.starts_with(prefix) || link.has_class {
            continue;
        }
        let Some(href) = link.href.filter(|h| !h.is_empty()) else {
            continue;
        };

        let cells = html::cells(row);
        let Some(link_cell) = cells.iter().position(|c| html::first_anchor(c).is_some()) else {
            continue;
        };
        let Some(date_cell) = cells.get(link_cell + 1) else {
            continue;
        };

        let date_str = html::text_content(date_cell);
        match NaiveDateTime::parse_from_str(&date_str, TIMESTAMP_FORMAT) {
            Ok(modified) => folders.push(MeetingFolder { href, modified }),
            Err(_) => {
                warn!("could not parse date '{}' for folder {}", date_str, link.text);
            }
        }
    }

    // stable: equal timestamps keep listing order
    folders.sort_by(|a, b| b.modified.cmp(&a.modified));
    folders
}
