//! Video references: which video a position was reached in, and when.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SHORT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?youtu\.be/([A-Za-z0-9_-]+)/?(?:\?(.*))?$").unwrap()
});

static WATCH_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|m\.)?youtube\.com/watch\?(.+)$").unwrap()
});

static CHESS_GAME_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?chess\.com/game/").unwrap());

static HMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s?)?$").unwrap()
});

/// The video a game was played in, parsed from its base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSource {
    pub video_id: String,
    /// The `t=` start parameter of the base URL, 0 when absent.
    pub start_seconds: u32,
}

impl VideoSource {
    /// Parse a `youtu.be/<id>` or `youtube.com/watch?v=<id>` URL.
    pub fn parse(url: &str) -> Result<Self, String> {
        let url = url.trim();

        if CHESS_GAME_URL_RE.is_match(url) {
            return Err("chess.com game link is not a video".to_string());
        }

        let (video_id, query) = if let Some(cap) = SHORT_URL_RE.captures(url) {
            let id = cap[1].to_string();
            (id, cap.get(2).map(|m| m.as_str()).unwrap_or(""))
        } else if let Some(cap) = WATCH_URL_RE.captures(url) {
            let query = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let id = query_param(query, "v")
                .filter(|v| !v.is_empty())
                .ok_or_else(|| "watch URL has no v= parameter".to_string())?;
            (id.to_string(), query)
        } else {
            return Err("not a recognized video URL".to_string());
        };

        let start_seconds = match query_param(query, "t") {
            Some(t) => parse_start(t)?,
            None => 0,
        };

        Ok(Self {
            video_id,
            start_seconds,
        })
    }
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// `t=123`, `t=123s` or `t=1h2m3s`.
fn parse_start(t: &str) -> Result<u32, String> {
    let cap = HMS_RE
        .captures(t)
        .filter(|_| !t.is_empty())
        .ok_or_else(|| format!("invalid start time {t:?}"))?;
    let part = |i: usize| -> Result<u32, String> {
        match cap.get(i) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| format!("start time {t:?} is out of range")),
            None => Ok(0),
        }
    };
    let (hours, minutes, seconds) = (part(1)?, part(2)?, part(3)?);
    hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or_else(|| format!("start time {t:?} is out of range"))
}

/// One moment in one video where a position was reached.
///
/// Two references are the same reference when video id and offset match; the
/// originating game is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoReference {
    pub video_id: String,
    pub offset_seconds: u32,
    pub game_id: String,
}

impl VideoReference {
    pub fn dedup_key(&self) -> (String, u32) {
        (self.video_id.clone(), self.offset_seconds)
    }
}
