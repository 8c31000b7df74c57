//! Post-processing: deterministic cleanup of model replies.
//!
//! Even when told not to, models wrap LaTeX in ` ```latex ... ``` ` fences and
//! sometimes emit the two characters `\` `n` where a line break was meant.
//! Fixing that here keeps the prompt focused on content, and each rule can be
//! tested without a provider.
//!
//! ## Rule Order
//!
//! 1. Normalise line endings (CRLF → LF)
//! 2. Strip fence markers (outer wrapper, then any stray leading/trailing one)
//! 3. Trim surrounding whitespace
//! 4. Turn literal `\n` escapes into real line breaks
//! 5. Trim again, since step 4 can expose new edge whitespace

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model reply.
pub fn clean_reply(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_fences(&s);
    let s = unescape_newlines(s.trim());
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip fence markers ──────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_+-]*[ \t]*\n(.*?)\n?```[ \t]*$").unwrap()
});

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*(\n|$)").unwrap());

static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\n)```[ \t]*$").unwrap());

fn strip_fences(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = RE_OUTER_FENCES.captures(trimmed) {
        return caps[1].to_string();
    }
    // Truncated replies keep the opening fence but lose the closing one.
    let s = RE_LEADING_FENCE.replace(trimmed, "");
    RE_TRAILING_FENCE.replace(&s, "").to_string()
}

// ── Rule 4: Literal "\n" → line break ────────────────────────────────────────
//
// LaTeX has control words that begin with the same two characters
// (`\noindent`, `\newpage`, `\neq`, ...). Those are kept. A backslash that is
// the second half of a `\\` forced break is not an escape either.

const N_CONTROL_WORDS: &[&str] = &[
    "nabla", "natural", "ne", "nearrow", "neg", "neq", "newcommand", "newcounter",
    "newenvironment", "newgeometry", "newlength", "newline", "newpage", "newtheorem",
    "nexists", "ngeq", "ngtr", "ni", "nleftarrow", "nleq", "nless", "nmid", "nobreak",
    "nocite", "noindent", "nolimits", "nonumber", "nopagebreak", "normalfont",
    "normalsize", "not", "notag", "notin", "nparallel", "nprec", "nrightarrow", "nsim",
    "nsubseteq", "nsucc", "nsupseteq", "nu", "numberwithin", "nvdash", "nwarrow",
];

fn unescape_newlines(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut run = 0usize; // consecutive backslashes immediately before `i`

    while i < bytes.len() {
        if bytes[i] == b'\\' && run % 2 == 0 && bytes.get(i + 1) == Some(&b'n') {
            let word_end = bytes[i + 1..]
                .iter()
                .position(|b| !b.is_ascii_alphabetic())
                .map_or(bytes.len(), |p| i + 1 + p);
            let word = &input[i + 1..word_end];
            if N_CONTROL_WORDS.contains(&word) {
                out.push_str(&input[i..word_end]);
                i = word_end;
            } else {
                out.push('\n');
                i += 2;
            }
            run = 0;
            continue;
        }

        run = if bytes[i] == b'\\' { run + 1 } else { 0 };
        let ch_len = input[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&input[i..i + ch_len]);
        i += ch_len;
    }

    out
}

// ── Tests ────────────────────────────────────────────────────────────────────
