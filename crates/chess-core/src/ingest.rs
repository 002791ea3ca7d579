//! Game record ingestion: raw series-file records in, validated `GameRecord`s out.

use serde_json::Value as JsonValue;
use std::collections::HashSet;

use crate::error::ParseError;
use crate::game_data::{
    GameRecord, GameResult, Player, Ply, RawGame, RawPlayer, Role, Side, TimeControl,
};
use crate::pgn::{parse_clock_value, parse_movetext, parse_san};
use crate::video::VideoSource;

/// Validates raw records. Pure: no I/O, no shared state.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    /// Lowercased accounts of the subject, used when a player record has no role.
    subject_usernames: HashSet<String>,
}

impl Ingestor {
    pub fn new<I, S>(subject_usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            subject_usernames: subject_usernames
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Ingest an untyped JSON record, rejecting shapes that do not match `RawGame`.
    pub fn ingest_value(&self, value: JsonValue) -> Result<GameRecord, ParseError> {
        let id = match value.get("id") {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => "<unknown>".to_string(),
        };
        let raw: RawGame = serde_json::from_value(value)
            .map_err(|e| ParseError::new(&id, "record", e.to_string()))?;
        self.ingest(raw)
    }

    pub fn ingest(&self, raw: RawGame) -> Result<GameRecord, ParseError> {
        let id = raw.id;

        let time_control: TimeControl = raw
            .time_control
            .parse()
            .map_err(|reason| ParseError::new(&id, &raw.time_control, reason))?;

        let (white, black) = self.resolve_players(&id, &raw.players)?;

        let video = VideoSource::parse(&raw.video_url)
            .map_err(|reason| ParseError::new(&id, &raw.video_url, reason))?;

        let (plies, result_tag) = match (raw.plies, raw.movetext) {
            (Some(plies), None) => {
                let plies = plies
                    .into_iter()
                    .map(|p| -> Result<Ply, ParseError> {
                        let san = parse_san(&p.san)
                            .ok_or_else(|| ParseError::new(&id, &p.san, "not a SAN move"))?;
                        let clock_remaining = match p.clock_remaining.as_deref().map(str::trim) {
                            None | Some("") => None,
                            Some(value) => Some(
                                parse_clock_value(value)
                                    .map_err(|reason| ParseError::new(&id, value, reason))?,
                            ),
                        };
                        Ok(Ply {
                            san,
                            clock_remaining,
                        })
                    })
                    .collect::<Result<Vec<_>, ParseError>>()?;
                (plies, None)
            }
            (None, Some(text)) => {
                let parsed = parse_movetext(&text)
                    .map_err(|e| ParseError::new(&id, e.token, e.reason))?;
                let plies = parsed
                    .plies
                    .into_iter()
                    .map(|p| Ply {
                        san: p.san,
                        clock_remaining: p.clock,
                    })
                    .collect();
                (plies, parsed.result_tag)
            }
            (Some(_), Some(_)) => {
                return Err(ParseError::new(&id, "movetext", "record has both plies and movetext"));
            }
            (None, None) => {
                return Err(ParseError::new(&id, "plies", "record has neither plies nor movetext"));
            }
        };

        let result = match raw.result.or(result_tag) {
            Some(text) => text
                .parse()
                .map_err(|reason| ParseError::new(&id, &text, reason))?,
            None => GameResult::Unknown,
        };

        Ok(GameRecord {
            id,
            white,
            black,
            time_control,
            result,
            plies,
            video,
        })
    }

    fn resolve_players(
        &self,
        id: &str,
        players: &[RawPlayer],
    ) -> Result<(Player, Player), ParseError> {
        let mut white = None;
        let mut black = None;

        for raw in players {
            let role = self.resolve_role(id, raw)?;
            let player = Player {
                username: raw.username.clone(),
                role,
                color: raw.color,
            };
            let slot = match raw.color {
                Side::White => &mut white,
                Side::Black => &mut black,
            };
            if slot.is_some() {
                return Err(ParseError::new(id, &raw.username, "two players share a color"));
            }
            *slot = Some(player);
        }

        match (white, black) {
            (Some(w), Some(b)) => Ok((w, b)),
            (None, _) => Err(ParseError::new(id, "players", "no white player")),
            (_, None) => Err(ParseError::new(id, "players", "no black player")),
        }
    }

    fn resolve_role(&self, id: &str, raw: &RawPlayer) -> Result<Role, ParseError> {
        if let Some(role) = raw.role {
            return Ok(role);
        }
        if self.subject_usernames.is_empty() {
            return Err(ParseError::new(
                id,
                &raw.username,
                "player has no role and no subject usernames are configured",
            ));
        }
        if self.subject_usernames.contains(&raw.username.to_lowercase()) {
            Ok(Role::Subject)
        } else {
            Ok(Role::Opponent)
        }
    }
}
