//! RSS 2.0 feed state: parse leniently, merge purely, write deterministically.

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt::Display;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::error::FeedError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub description: String,
}

/// Channel metadata taken from configuration on every merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMeta {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    pub channel: ChannelMeta,
    pub last_build_date: String,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct RawRss {
    channel: RawChannel,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    language: Option<String>,
    #[serde(rename = "lastBuildDate")]
    last_build_date: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<RawGuid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGuid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// RFC-822 date as used by RSS `pubDate` / `lastBuildDate`.
pub fn rfc822(ts: DateTime<Utc>) -> Result<String, FeedError> {
    OffsetDateTime::from_unix_timestamp(ts.timestamp())
        .map_err(|e| FeedError::Date(e.to_string()))?
        .format(&Rfc2822)
        .map_err(|e| FeedError::Date(e.to_string()))
}

impl FeedDocument {
    /// Parse an existing feed. A malformed document yields an empty one.
    pub fn parse(xml: &str) -> Self {
        let raw: RawRss = match from_str(xml) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(target: "feed", error = %e, "existing feed unreadable, starting fresh");
                return Self::default();
            }
        };
        let ch = raw.channel;
        let entries: Vec<FeedEntry> = ch
            .item
            .into_iter()
            .map(|it| {
                let link = it.link.unwrap_or_default();
                FeedEntry {
                    guid: it.guid.map(|g| g.value).unwrap_or_else(|| link.clone()),
                    title: it.title.unwrap_or_default(),
                    link,
                    pub_date: it.pub_date.unwrap_or_default(),
                    description: it.description.unwrap_or_default(),
                }
            })
            .collect();
        Self {
            channel: ChannelMeta {
                title: ch.title.unwrap_or_default(),
                link: ch.link.unwrap_or_default(),
                description: ch.description.unwrap_or_default(),
                language: ch.language.unwrap_or_default(),
            },
            last_build_date: ch.last_build_date.unwrap_or_default(),
            entries: first_per_guid(entries),
        }
    }

    pub fn load(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(xml) => Self::parse(&xml),
            Err(_) => Self::default(),
        }
    }

    /// Replace any entry with the same GUID, put `entry` first and keep at
    /// most `max_items` entries. Repeated GUIDs keep their first occurrence.
    pub fn merge(
        &self,
        channel: ChannelMeta,
        entry: FeedEntry,
        last_build_date: String,
        max_items: usize,
    ) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.push(entry);
        entries.extend(self.entries.iter().cloned());
        let mut entries = first_per_guid(entries);
        entries.truncate(max_items.max(1));
        Self {
            channel,
            last_build_date,
            entries,
        }
    }

    pub fn to_xml(&self) -> Result<String, FeedError> {
        let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);

        ev(w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None))))?;
        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        ev(w.write_event(Event::Start(rss)))?;
        ev(w.write_event(Event::Start(BytesStart::new("channel"))))?;

        text_el(&mut w, "title", &self.channel.title)?;
        text_el(&mut w, "link", &self.channel.link)?;
        text_el(&mut w, "description", &self.channel.description)?;
        text_el(&mut w, "language", &self.channel.language)?;
        text_el(&mut w, "lastBuildDate", &self.last_build_date)?;

        for e in &self.entries {
            ev(w.write_event(Event::Start(BytesStart::new("item"))))?;
            text_el(&mut w, "title", &e.title)?;
            text_el(&mut w, "link", &e.link)?;
            let mut guid = BytesStart::new("guid");
            guid.push_attribute(("isPermaLink", "false"));
            ev(w.write_event(Event::Start(guid)))?;
            ev(w.write_event(Event::Text(BytesText::new(&e.guid))))?;
            ev(w.write_event(Event::End(BytesEnd::new("guid"))))?;
            text_el(&mut w, "pubDate", &e.pub_date)?;
            text_el(&mut w, "description", &e.description)?;
            ev(w.write_event(Event::End(BytesEnd::new("item"))))?;
        }

        ev(w.write_event(Event::End(BytesEnd::new("channel"))))?;
        ev(w.write_event(Event::End(BytesEnd::new("rss"))))?;

        let mut out = String::from_utf8(w.into_inner()).map_err(|e| FeedError::Xml(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }
}

fn ev<E: Display>(r: Result<(), E>) -> Result<(), FeedError> {
    r.map_err(|e| FeedError::Xml(e.to_string()))
}

fn text_el(w: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<(), FeedError> {
    if value.is_empty() {
        return ev(w.write_event(Event::Empty(BytesStart::new(name))));
    }
    ev(w.write_event(Event::Start(BytesStart::new(name))))?;
    ev(w.write_event(Event::Text(BytesText::new(value))))?;
    ev(w.write_event(Event::End(BytesEnd::new(name))))
}

fn first_per_guid(entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.guid.clone()))
        .collect()
}
