//! Speech preparation: deterministic cleanup and chunking of the text handed
//! to a speech engine.
//!
//! Completion models sometimes answer in Markdown even when asked for plain
//! prose. A speech engine reads that markup aloud ("hash hash Results",
//! "asterisk asterisk"), so the rules below remove it before synthesis. The
//! text shown to the user is left untouched.
//!
//! ## Rule Order
//!
//! The outer fence is stripped first so the fenced lines then go through
//! the line-level rules like any other text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule in order.
///
/// 1. Strip an outer code fence wrapping the whole answer
/// 2. Normalise line endings (CRLF → LF)
/// 3. Drop heading markers and block-quote markers at line start
/// 4. Drop bold/italic/code emphasis markers, keep their content
/// 5. Drop Markdown list bullets
/// 6. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Collapse runs of blank lines and trim the ends
pub fn prepare_for_speech(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = strip_line_markers(&s);
    let s = strip_emphasis(&s);
    let s = strip_bullets(&s);
    let s = remove_invisible_chars(&s);
    collapse_blank_lines(&s).trim().to_string()
}

// ── Rule 1: Strip outer fence ────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Heading and quote markers ────────────────────────────────────────

static RE_LINE_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:#{1,6}|>+)[ \t]+").unwrap());

fn strip_line_markers(input: &str) -> String {
    RE_LINE_MARKERS.replace_all(input, "").to_string()
}

// ── Rule 4: Emphasis ─────────────────────────────────────────────────────────

// Markers must hug their content, so `2 * 3 * 4` stays arithmetic.
static RE_BOLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\*\*|__)([^\s*_](?:[^\n]*?[^\s*_])?)(\*\*|__)").unwrap()
});
static RE_ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*").unwrap());
static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());

fn strip_emphasis(input: &str) -> String {
    let s = RE_BOLD.replace_all(input, "$2");
    let s = RE_ITALIC.replace_all(&s, "$1");
    RE_INLINE_CODE.replace_all(&s, "$1").to_string()
}

// ── Rule 5: Bullets ──────────────────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").unwrap());

fn strip_bullets(input: &str) -> String {
    RE_BULLET.replace_all(input, "").to_string()
}

// ── Rule 6: Invisible characters ─────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'))
        .collect()
}

// ── Rule 7: Blank lines ──────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*)+").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Chunking ─────────────────────────────────────────────────────────────────

/// A clause: text up to punctuation followed by whitespace, or a line.
/// Punctuation inside a token (`3.14`, `1,000`, `e.g.x`) does not end one.
static RE_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)[^\n]+?(?:[.!?;:,]+(?:[ \t]|$)|$)").unwrap());

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Text that already fits is returned as one chunk, unchanged apart from
/// trimming. Otherwise clauses are packed greedily; a clause longer than the limit is split on
/// word boundaries, and a single word longer than the limit is cut hard.
/// Chunks consisting only of punctuation or whitespace are dropped.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let whole = text.trim();
    if !whole.chars().any(char::is_alphanumeric) {
        return Vec::new();
    }
    if whole.chars().count() <= max_chars {
        return vec![whole.to_string()];
    }

    let mut pieces: Vec<String> = Vec::new();

    for clause in RE_CLAUSE.find_iter(text) {
        let clause = clause.as_str().trim();
        if !clause.chars().any(char::is_alphanumeric) {
            continue;
        }
        if clause.chars().count() <= max_chars {
            pieces.push(clause.to_string());
        } else {
            pieces.extend(split_words(clause, max_chars));
        }
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for piece in pieces {
        if current.is_empty() {
            current = piece;
        } else if current.chars().count() + 1 + piece.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&piece);
        } else {
            chunks.push(std::mem::take(&mut current));
            current = piece;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_words(clause: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in clause.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_chars {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            out.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }
        if !current.is_empty() && current.chars().count() + 1 + word_len > max_chars {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
