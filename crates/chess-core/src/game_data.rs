use serde::{Deserialize, Deserializer, Serialize};
use shakmaty::san::SanPlus;
use std::fmt;
use std::str::FromStr;

use crate::video::VideoSource;

/// Whether a player is the tracked subject or anyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Subject,
    Opponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// The side that plays the ply at `index` in a game from the standard start.
    pub fn of_ply(index: usize) -> Self {
        if index % 2 == 0 {
            Side::White
        } else {
            Side::Black
        }
    }
}

impl From<Side> for shakmaty::Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => shakmaty::Color::White,
            Side::Black => shakmaty::Color::Black,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub username: String,
    pub role: Role,
    pub color: Side,
}

/// Base budget plus per-move increment, both in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
    pub base_seconds: u32,
    pub increment_seconds: u32,
}

impl FromStr for TimeControl {
    type Err = String;

    /// Accepts `"900+10"` and bare `"600"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (base, inc) = match s.split_once('+') {
            Some((base, inc)) => (base, inc),
            None => (s, "0"),
        };
        let base_seconds = base
            .parse()
            .map_err(|_| format!("invalid base time {base:?}"))?;
        let increment_seconds = inc
            .parse()
            .map_err(|_| format!("invalid increment {inc:?}"))?;
        Ok(Self {
            base_seconds,
            increment_seconds,
        })
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.base_seconds, self.increment_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "1-0")]
    WhiteWins,
    #[serde(rename = "0-1")]
    BlackWins,
    #[serde(rename = "1/2-1/2")]
    Draw,
    #[serde(rename = "*")]
    Unknown,
}

impl FromStr for GameResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1-0" => Ok(GameResult::WhiteWins),
            "0-1" => Ok(GameResult::BlackWins),
            "1/2-1/2" | "½-½" => Ok(GameResult::Draw),
            "*" | "" => Ok(GameResult::Unknown),
            other => Err(format!("unknown result {other:?}")),
        }
    }
}

/// One half-move: the SAN as validated at ingestion plus the mover's clock after it.
#[derive(Debug, Clone)]
pub struct Ply {
    pub san: SanPlus,
    /// Seconds left on the mover's clock, `None` when the annotation was absent.
    pub clock_remaining: Option<f64>,
}

impl Ply {
    pub fn san_text(&self) -> String {
        self.san.to_string()
    }
}

/// A validated game. Immutable once built by the ingestor.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub id: String,
    pub white: Player,
    pub black: Player,
    pub time_control: TimeControl,
    pub result: GameResult,
    pub plies: Vec<Ply>,
    pub video: VideoSource,
}

impl GameRecord {
    pub fn player(&self, side: Side) -> &Player {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// Role of whoever moves at ply `index`.
    pub fn mover_role(&self, index: usize) -> Role {
        self.player(Side::of_ply(index)).role
    }

    pub fn players(&self) -> [&Player; 2] {
        [&self.white, &self.black]
    }
}

// ---------------------------------------------------------------------------
// Raw input records, as supplied by the data-acquisition step
// ---------------------------------------------------------------------------

/// A game record as it appears in a series file, before validation.
///
/// Exactly one of `plies` or `movetext` must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGame {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub players: Vec<RawPlayer>,
    #[serde(alias = "timeControl")]
    pub time_control: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(alias = "videoUrl", alias = "youtube_url")]
    pub video_url: String,
    #[serde(default)]
    pub plies: Option<Vec<RawPly>>,
    #[serde(default, alias = "pgn")]
    pub movetext: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlayer {
    pub username: String,
    #[serde(default)]
    pub role: Option<Role>,
    pub color: Side,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPly {
    #[serde(rename = "move")]
    pub san: String,
    #[serde(default, rename = "clockRemaining", alias = "clock_remaining")]
    pub clock_remaining: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_control_parse() {
        let tc: TimeControl = "900+10".parse().unwrap();
        assert_eq!(tc.base_seconds, 900);
        assert_eq!(tc.increment_seconds, 10);

        let bare: TimeControl = "600".parse().unwrap();
        assert_eq!(bare.increment_seconds, 0);
        assert_eq!(bare.to_string(), "600+0");
    }

    #[test]
    fn test_time_control_rejects_daily() {
        assert!("1/86400".parse::<TimeControl>().is_err());
        assert!("abc+1".parse::<TimeControl>().is_err());
    }

    #[test]
    fn test_result_parse() {
        assert_eq!("1-0".parse::<GameResult>(), Ok(GameResult::WhiteWins));
        assert_eq!("1/2-1/2".parse::<GameResult>(), Ok(GameResult::Draw));
        assert!("2-0".parse::<GameResult>().is_err());
    }

    #[test]
    fn test_side_of_ply() {
        assert_eq!(Side::of_ply(0), Side::White);
        assert_eq!(Side::of_ply(1), Side::Black);
        assert_eq!(Side::of_ply(6), Side::White);
    }

    #[test]
    fn test_raw_game_numeric_id() {
        let raw: RawGame = serde_json::from_str(
            r#"{"id": 12345, "players": [], "time_control": "180+2",
                "video_url": "https://youtu.be/abc", "plies": []}"#,
        )
        .unwrap();
        assert_eq!(raw.id, "12345");
        assert!(raw.movetext.is_none());
    }
}
