//! Reason templates.
//!
//! Placeholders: `{segment}`, `{score}` (3 decimals) and `{confidence}`
//! (2 decimals). An absent score or confidence renders as `n/a`.
//! Literal braces are written `{{` and `}}`.

use std::fmt::Write;

#[derive(Clone, Debug, PartialEq)]
enum Piece {
    Text(String),
    Segment,
    Score,
    Confidence,
}

/// A parsed reason template.
#[derive(Clone, Debug, PartialEq)]
pub struct ReasonTemplate {
    pieces: Vec<Piece>,
}

impl ReasonTemplate {
    /// Parse a template, returning a description of the first problem found.
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(format!("unclosed placeholder '{{{name}'"));
                    }
                    let piece = match name.trim() {
                        "segment" => Piece::Segment,
                        "score" => Piece::Score,
                        "confidence" => Piece::Confidence,
                        other => return Err(format!("unknown placeholder '{{{other}}}'")),
                    };
                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    pieces.push(piece);
                }
                '}' => return Err("unmatched '}'".to_string()),
                other => text.push(other),
            }
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        Ok(Self { pieces })
    }

    pub fn render(&self, segment: &str, score: Option<f64>, confidence: Option<f64>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            // Writing to a String cannot fail.
            let _ = match piece {
                Piece::Text(t) => out.write_str(t),
                Piece::Segment => out.write_str(segment),
                Piece::Score => match score {
                    Some(s) => write!(out, "{s:.3}"),
                    None => out.write_str("n/a"),
                },
                Piece::Confidence => match confidence {
                    Some(c) => write!(out, "{c:.2}"),
                    None => out.write_str("n/a"),
                },
            };
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_placeholders() {
        let t = ReasonTemplate::parse("{segment}: delay {score} h (confidence {confidence})").unwrap();
        assert_eq!(
            t.render("SEVERE", Some(6.4567), Some(0.7)),
            "SEVERE: delay 6.457 h (confidence 0.70)"
        );
        assert_eq!(
            t.render("SEVERE", None, None),
            "SEVERE: delay n/a h (confidence n/a)"
        );
    }

    #[test]
    fn plain_text_and_escapes() {
        assert_eq!(ReasonTemplate::parse("On time").unwrap().render("X", None, None), "On time");
        assert_eq!(
            ReasonTemplate::parse("{{raw}} {score}").unwrap().render("X", Some(1.0), None),
            "{raw} 1.000"
        );
    }

    #[test]
    fn rejects_malformed() {
        assert!(ReasonTemplate::parse("{nope}").unwrap_err().contains("unknown placeholder"));
        assert!(ReasonTemplate::parse("{score").unwrap_err().contains("unclosed"));
        assert!(ReasonTemplate::parse("score}").unwrap_err().contains("unmatched"));
    }
}
