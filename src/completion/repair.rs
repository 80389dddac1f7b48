//! Structural repair of JSON emitted by a language model.
//!
//! All positions handled here are ASCII structural bytes, so slicing at them always lands on
//! a UTF-8 character boundary.

use std::collections::VecDeque;
use std::sync::OnceLock;

use regex::Regex;

/// Upper bound on how many element boundaries a truncated document is cut back to.
const MAX_CUT_BACKS: usize = 256;

fn trailing_ellipsis() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:\.{3,}|…+)\s*$").expect("static regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    /// Saw a backslash at this byte offset.
    Backslash(usize),
    /// Inside `\uXXXX` started at this offset, with hex digits still missing.
    Unicode(usize, u8),
}

/// Deepest nesting serde_json accepts; nothing opened past it can ever parse.
const MAX_DEPTH: usize = 127;

/// One open container. Frames form a tree so a boundary can name its whole stack by index.
#[derive(Debug, Clone, Copy)]
struct Frame {
    closer: u8,
    parent: Option<usize>,
}

/// A prefix length after which the document can be closed by unwinding from `top`.
#[derive(Debug, Clone, Copy)]
struct Boundary {
    end: usize,
    top: Option<usize>,
}

#[derive(Debug)]
struct Scan {
    frames: Vec<Frame>,
    top: Option<usize>,
    depth: usize,
    in_string: bool,
    escape: Escape,
    /// The latest `MAX_CUT_BACKS` boundaries, oldest first.
    boundaries: VecDeque<Boundary>,
    /// Byte offset just past the close of the outermost container, if it closed.
    closed_at: Option<usize>,
    /// Where scanning stopped (end of text, a mismatched closer, or the depth limit).
    scanned_to: usize,
}

impl Scan {
    fn mark(&mut self, end: usize) {
        if self.boundaries.len() == MAX_CUT_BACKS {
            self.boundaries.pop_front();
        }
        self.boundaries.push_back(Boundary { end, top: self.top });
    }
}

fn closers_from(frames: &[Frame], mut top: Option<usize>) -> String {
    let mut closers = String::new();
    while let Some(index) = top {
        let frame = frames[index];
        closers.push(frame.closer as char);
        top = frame.parent;
    }
    closers
}

/// Scans `text`, which must start at an opening brace or bracket. Linear in `text`.
fn scan(text: &str) -> Scan {
    let bytes = text.as_bytes();
    let mut scan = Scan {
        frames: Vec::new(),
        top: None,
        depth: 0,
        in_string: false,
        escape: Escape::None,
        boundaries: VecDeque::with_capacity(MAX_CUT_BACKS),
        closed_at: None,
        scanned_to: bytes.len(),
    };

    for (i, &b) in bytes.iter().enumerate() {
        if scan.in_string {
            scan.escape = match scan.escape {
                Escape::Backslash(start) if b == b'u' => Escape::Unicode(start, 4),
                Escape::Backslash(_) => Escape::None,
                Escape::Unicode(start, remaining) if b.is_ascii_hexdigit() => {
                    if remaining <= 1 {
                        Escape::None
                    } else {
                        Escape::Unicode(start, remaining - 1)
                    }
                }
                Escape::Unicode(_, _) => Escape::None,
                Escape::None => {
                    if b == b'\\' {
                        Escape::Backslash(i)
                    } else {
                        if b == b'"' {
                            scan.in_string = false;
                        }
                        Escape::None
                    }
                }
            };
            continue;
        }

        match b {
            b'"' => scan.in_string = true,
            b'{' | b'[' => {
                if scan.depth == MAX_DEPTH {
                    scan.scanned_to = i;
                    break;
                }
                scan.frames.push(Frame {
                    closer: if b == b'{' { b'}' } else { b']' },
                    parent: scan.top,
                });
                scan.top = Some(scan.frames.len() - 1);
                scan.depth += 1;
                scan.mark(i + 1);
            }
            b'}' | b']' => {
                let Some(index) = scan.top else {
                    scan.scanned_to = i;
                    break;
                };
                let frame = scan.frames[index];
                if frame.closer != b {
                    scan.scanned_to = i;
                    break;
                }
                scan.top = frame.parent;
                scan.depth -= 1;
                if scan.depth == 0 {
                    scan.closed_at = Some(i + 1);
                    scan.scanned_to = i + 1;
                    break;
                }
                scan.mark(i + 1);
            }
            b',' if scan.depth > 0 => scan.mark(i),
            _ => {}
        }
    }

    scan
}

/// The span from the first `{` to the brace that balances it.
pub fn matching_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let candidate = &text[start..];
    let end = scan(candidate).closed_at?;
    Some(&candidate[..end])
}

/// The span from the first `{` to the last `}`.
pub fn last_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Escapes raw control characters that appear inside string literals.
///
/// Returns `None` when the text contains nothing to escape.
pub fn escape_control_chars(text: &str) -> Option<String> {
    if !text.chars().any(|c| c.is_control()) {
        return None;
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut changed = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if (c as u32) < 0x20 {
                changed = true;
                match c {
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    other => out.push_str(&format!("\\u{:04x}", other as u32)),
                }
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }

    changed.then_some(out)
}

/// Closing strategies for a document cut off before its outermost container closed.
///
/// `text` must start at the opening `{`. The first candidate closes the text where it stops;
/// the rest cut back to successively earlier element boundaries. A balanced document yields
/// no candidates.
pub fn truncation_candidates(text: &str) -> impl Iterator<Item = String> + '_ {
    let text = match trailing_ellipsis().find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    };
    let scan = scan(text);
    let truncated = scan.closed_at.is_none() && scan.depth > 0;

    let close_as_is = truncated.then(|| {
        let mut cut = scan.scanned_to;
        if scan.in_string {
            match scan.escape {
                Escape::Backslash(start) | Escape::Unicode(start, _) => cut = start,
                Escape::None => {}
            }
        }
        let mut candidate = text[..cut].to_string();
        if scan.in_string {
            candidate.push('"');
        }
        close(candidate, &closers_from(&scan.frames, scan.top))
    });

    let Scan {
        frames, boundaries, ..
    } = scan;
    let cut_backs = if truncated { boundaries } else { VecDeque::new() };

    close_as_is.into_iter().chain(
        cut_backs
            .into_iter()
            .rev()
            .map(move |boundary| {
                close(
                    text[..boundary.end].to_string(),
                    &closers_from(&frames, boundary.top),
                )
            }),
    )
}

fn close(mut prefix: String, closers: &str) -> String {
    let trimmed_len = prefix.trim_end().len();
    prefix.truncate(trimmed_len);
    if prefix.ends_with(',') {
        prefix.pop();
    }
    prefix.push_str(closers);
    prefix
}

/// Pulls the string value of the first of `keys` out of JSON-looking text that otherwise
/// fails to parse.
pub fn salvage_string_field(text: &str, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| salvage_one(text, key))
}

fn salvage_one(text: &str, key: &str) -> Option<String> {
    let needle = format!("\"{}\"", key);
    let key_pos = text.find(&needle)?;
    let rest = text[key_pos + needle.len()..].trim_start();
    let rest = rest.strip_prefix(':')?.trim_start();
    let body = rest.strip_prefix('"')?;

    let mut end = body.len();
    let mut escaped = false;
    for (i, b) in body.bytes().enumerate() {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'"' {
            end = i;
            break;
        }
    }

    let content = &body[..end];
    let decoded = serde_json::from_str::<String>(&format!("\"{}\"", content))
        .unwrap_or_else(|_| content.replace("\\\"", "\"").replace("\\n", "\n"));
    let decoded = decoded.trim().to_string();
    (!decoded.is_empty()).then_some(decoded)
}
