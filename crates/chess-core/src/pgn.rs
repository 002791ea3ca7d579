//! Movetext reading on top of `pgn-reader`, keeping `[%clk]` comments.

use pgn_reader::{RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use regex::Regex;
use std::io::Cursor;
use std::ops::ControlFlow;
use std::sync::LazyLock;

static CLK_ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%clk\s+(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)\]").unwrap()
});

static CLOCK_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)$").unwrap());

/// One mainline move, with its clock comment if it had one.
#[derive(Debug, Clone, PartialEq)]
pub struct MovetextPly {
    pub san: SanPlus,
    pub clock: Option<f64>,
}

/// The mainline of one PGN game plus its `Result` tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMovetext {
    pub plies: Vec<MovetextPly>,
    pub result_tag: Option<String>,
}

/// Movetext failure: the token it choked on and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovetextError {
    pub token: String,
    pub reason: String,
}

impl MovetextError {
    fn new(token: &str, reason: impl Into<String>) -> Self {
        Self {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

/// Collects the mainline, attaching each clock comment to the move before it.
struct MainlineCollector;

impl Visitor for MainlineCollector {
    type Tags = Option<String>;
    type Movetext = ParsedMovetext;
    type Output = Result<ParsedMovetext, MovetextError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(None)
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        if name == b"Result" {
            let value = value.decode_utf8_lossy();
            if !value.is_empty() {
                *tags = Some(value.into_owned());
            }
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(ParsedMovetext {
            plies: Vec::new(),
            result_tag: tags,
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        movetext.plies.push(MovetextPly {
            san: san_plus,
            clock: None,
        });
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let text = String::from_utf8_lossy(comment.as_bytes());
        match parse_clock_annotation(&text) {
            Ok(Some(secs)) => {
                if let Some(last) = movetext.plies.last_mut() {
                    last.clock = Some(secs);
                }
            }
            Ok(None) => {}
            Err(reason) => {
                let token = format!("{{{}}}", text.trim());
                return ControlFlow::Break(Err(MovetextError::new(&token, reason)));
            }
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _movetext: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true)) // mainline only
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        Ok(movetext)
    }
}

/// Parse one PGN game (tags optional) into its mainline moves.
///
/// Variations, NAGs, comments without a clock and the result token are skipped.
pub fn parse_movetext(text: &str) -> Result<ParsedMovetext, MovetextError> {
    let mut reader = Reader::new(Cursor::new(text));
    match reader.read_game(&mut MainlineCollector) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => Err(MovetextError::new("movetext", "no game found")),
        Err(e) => Err(MovetextError::new("movetext", e.to_string())),
    }
}

/// Parse a single SAN token, ignoring trailing `!`/`?` annotation glyphs.
pub fn parse_san(token: &str) -> Option<SanPlus> {
    let san = token.trim().trim_end_matches(['!', '?']);
    if san.is_empty() {
        return None;
    }
    san.parse().ok()
}

/// Extract the clock from a comment body like `[%clk 0:03:01.9]`.
///
/// `Ok(None)` when the comment carries no clock, `Err` when it carries a broken one.
pub fn parse_clock_annotation(comment: &str) -> Result<Option<f64>, String> {
    if !comment.contains("[%clk") {
        return Ok(None);
    }
    let cap = CLK_ANNOTATION_RE
        .captures(comment)
        .ok_or_else(|| "malformed clock annotation".to_string())?;
    hms_to_seconds(&cap[1], &cap[2], &cap[3]).map(Some)
}

/// Parse a bare `H:MM:SS` (optionally fractional) clock reading.
pub fn parse_clock_value(value: &str) -> Result<f64, String> {
    let cap = CLOCK_VALUE_RE
        .captures(value.trim())
        .ok_or_else(|| format!("clock reading {value:?} is not H:MM:SS"))?;
    hms_to_seconds(&cap[1], &cap[2], &cap[3])
}

fn hms_to_seconds(h: &str, m: &str, s: &str) -> Result<f64, String> {
    let hours: f64 = h.parse().map_err(|_| "invalid hours".to_string())?;
    let minutes: f64 = m.parse().map_err(|_| "invalid minutes".to_string())?;
    let seconds: f64 = s.parse().map_err(|_| "invalid seconds".to_string())?;
    if minutes >= 60.0 || seconds >= 60.0 {
        return Err("minutes and seconds must be below 60".to_string());
    }
    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}
