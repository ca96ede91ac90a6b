//! Page-count discovery from GitHub's `Link` header.
//!
//! GitHub Link headers look like:
//! `<https://api.github.com/user/1/starred?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
//!
//! Planning is total: anything unexpected degrades to a single page. Missing
//! an unreachable tail is preferable to failing the whole fetch.

use url::Url;

/// Pagination information extracted from a Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The last page number (from rel="last" link).
    pub last_page: Option<u32>,
}

impl LinkPagination {
    /// Total page count, defaulting to 1 when no usable `rel="last"` exists.
    pub fn total_pages(&self) -> u32 {
        match self.last_page {
            Some(last) if last >= 1 => last,
            _ => 1,
        }
    }
}

/// Parse the Link header to extract pagination info.
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment
                .strip_prefix('<')
                .and_then(|s| s.strip_suffix('>'))
            {
                url = Some(inner);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some("last")) = (url, rel)
            && let Some(page_num) = extract_page_from_url(url)
        {
            info.last_page = Some(page_num);
        }
    }

    info
}

/// Number of pages advertised by a Link header; 1 when absent or unusable.
pub fn total_pages(link_header: Option<&str>) -> u32 {
    link_header
        .map(|h| parse_link_header(h).total_pages())
        .unwrap_or(1)
}

/// Extract the `page` query parameter from a URL. Relative URLs are accepted.
fn extract_page_from_url(raw: &str) -> Option<u32> {
    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => Url::parse("http://localhost/").ok()?.join(raw).ok()?,
    };

    parsed
        .query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
}
