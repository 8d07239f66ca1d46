//! Feed document parsing.
//!
//! RSS 2.0, Atom and the other formats feed-rs understands are reduced to
//! a [`ParsedFeed`]. Text fields have HTML entities decoded once more after
//! XML decoding, since many feeds double-escape their titles.

use feed_rs::parser;

use super::types::{ParsedFeed, ParsedItem};
use crate::{GatorError, Result};

/// Longest entity name (between `&` and `;`) we try to decode.
const MAX_ENTITY_LEN: usize = 10;

/// Parse feed bytes into a [`ParsedFeed`].
///
/// Items keep their document order.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes)
        .map_err(|e| GatorError::Parse(format!("failed to parse feed: {e}")))?;

    let title = feed
        .title
        .map(|t| unescape_html(&t.content))
        .unwrap_or_default();
    let description = feed.description.map(|d| unescape_html(&d.content));
    let link = feed.links.first().map(|l| l.href.clone());

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry
                .title
                .map(|t| unescape_html(&t.content))
                .unwrap_or_default();
            let link = entry.links.first().map(|l| l.href.clone());
            let description = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .map(|d| unescape_html(&d));

            ParsedItem {
                title,
                link,
                description,
                published: entry.published.or(entry.updated),
            }
        })
        .collect();

    Ok(ParsedFeed {
        title,
        link,
        description,
        items,
    })
}

/// Decode HTML entities in text.
///
/// Handles the common named entities and decimal/hex numeric references.
/// Unknown or malformed entities are left as they are.
pub fn unescape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let decoded = after
            .char_indices()
            .take(MAX_ENTITY_LEN + 1)
            .find(|&(_, c)| c == ';')
            .and_then(|(end, _)| decode_entity(&after[..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                result.push(c);
                rest = &after[end + 1..];
            }
            None => {
                result.push('&');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "hellip" => Some('…'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "lsquo" => Some('‘'),
        "rsquo" => Some('’'),
        "ldquo" => Some('“'),
        "rdquo" => Some('”'),
        "copy" => Some('©'),
        "reg" => Some('®'),
        "trade" => Some('™'),
        _ => parse_numeric_entity(entity).and_then(char::from_u32),
    }
}

/// Parse a numeric entity body (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_unescape_named_entities() {
        assert_eq!(unescape_html("&amp;"), "&");
        assert_eq!(unescape_html("&lt;tag&gt;"), "<tag>");
        assert_eq!(unescape_html("&quot;quoted&quot;"), "\"quoted\"");
        assert_eq!(unescape_html("it&apos;s"), "it's");
    }

    #[test]
    fn test_unescape_numeric_entities() {
        assert_eq!(unescape_html("&#65;"), "A");
        assert_eq!(unescape_html("&#x41;"), "A");
        assert_eq!(unescape_html("&#x3042;"), "あ");
        assert_eq!(unescape_html("&#39;single&#39;"), "'single'");
    }

    #[test]
    fn test_unescape_keeps_unknown_and_bare_ampersands() {
        assert_eq!(unescape_html("Q&A"), "Q&A");
        assert_eq!(unescape_html("&bogus;"), "&bogus;");
        assert_eq!(unescape_html("rock & roll"), "rock & roll");
        assert_eq!(unescape_html("trailing &"), "trailing &");
        assert_eq!(unescape_html("&#xZZ;"), "&#xZZ;");
    }

    #[test]
    fn test_unescape_decodes_once() {
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_parse_numeric_entity() {
        assert_eq!(parse_numeric_entity("#65"), Some(65));
        assert_eq!(parse_numeric_entity("#x41"), Some(65));
        assert_eq!(parse_numeric_entity("#X41"), Some(65));
        assert_eq!(parse_numeric_entity("invalid"), None);
    }

    #[test]
    fn test_parse_feed_rss_double_escaped_title() {
        let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Tom &amp;amp; Jerry</title>
    <link>https://example.com</link>
    <description>Cats &amp;amp; mice</description>
    <item>
      <title>Hello &amp;amp; World</title>
      <link>https://example.com/1</link>
      <description>5 &amp;lt; 6</description>
      <pubDate>Mon, 06 Jan 2025 10:30:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

        let feed = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(feed.title, "Tom & Jerry");
        assert_eq!(feed.description.as_deref(), Some("Cats & mice"));
        assert!(feed.link.as_deref().unwrap().starts_with("https://example.com"));
        assert_eq!(feed.items.len(), 1);

        let item = &feed.items[0];
        assert_eq!(item.title, "Hello & World");
        assert_eq!(item.link.as_deref(), Some("https://example.com/1"));
        assert_eq!(item.description.as_deref(), Some("5 < 6"));
        assert_eq!(
            item.published,
            Some(Utc.with_ymd_and_hms(2025, 1, 6, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_feed_preserves_item_order() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Ordered</title>
    <item><title>third</title><link>https://example.com/3</link></item>
    <item><title>first</title><link>https://example.com/1</link></item>
    <item><title>second</title><link>https://example.com/2</link></item>
  </channel>
</rss>"#;

        let feed = parse_feed(rss.as_bytes()).unwrap();
        let titles: Vec<&str> = feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "first", "second"]);
    }

    #[test]
    fn test_parse_feed_bad_date_is_none() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Dates</title>
    <item>
      <title>Bad date</title>
      <link>https://example.com/bad</link>
      <pubDate>sometime last week</pubDate>
    </item>
  </channel>
</rss>"#;

        let feed = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(feed.items.len(), 1);
        assert!(feed.items[0].published.is_none());
    }

    #[test]
    fn test_parse_feed_atom() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <link href="https://example.com"/>
  <entry>
    <id>urn:uuid:1</id>
    <title>Atom Entry</title>
    <link href="https://example.com/entry"/>
    <summary>Entry summary</summary>
    <updated>2025-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

        let feed = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(feed.title, "Atom Feed");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title, "Atom Entry");
        assert_eq!(
            feed.items[0].link.as_deref(),
            Some("https://example.com/entry")
        );
        assert_eq!(
            feed.items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_feed_item_without_link() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <item><title>No link</title></item>
  </channel>
</rss>"#;

        let feed = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(feed.title, "");
        assert_eq!(feed.items.len(), 1);
        assert!(feed.items[0].link.is_none());
    }

    #[test]
    fn test_parse_feed_invalid() {
        let err = parse_feed(b"This is not XML").unwrap_err();
        assert!(matches!(err, GatorError::Parse(_)));

        let err = parse_feed(b"").unwrap_err();
        assert!(matches!(err, GatorError::Parse(_)));
    }
}
