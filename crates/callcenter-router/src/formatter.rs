//! Deterministic clean-up of generated text into short dash bullets.
//!
//! The steps run in a fixed order and every one of them is total:
//!
//! 1. drop the echoed prompt (everything up to the last assistant marker)
//! 2. rewrite stray bullet glyphs to `-` and split into trimmed lines
//! 3. keep only lines that start with `-` or `*`
//! 4. canonicalize the prefix to `-` and strip `1.` / `2)` numbering
//! 5. drop bullets containing a contradiction phrase
//! 6. cut long bullets at the last period inside the length limit
//! 7. drop bullets that are too short to say anything
//! 8. keep the first few survivors
//!
//! When too few bullets survive, the fixed fallback answer is returned
//! instead of anything the model wrote.

use callcenter_core::settings::FormatterSettings;

#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    rules: FormatterSettings,
    phrases: Vec<String>,
}

impl ResponseFormatter {
    pub fn new(rules: FormatterSettings) -> Self {
        let phrases = rules
            .contradiction_phrases
            .iter()
            .map(|p| p.to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { rules, phrases }
    }

    pub fn format(&self, raw: &str) -> String {
        let body = self.normalize_glyphs(self.strip_echo(raw));
        let bullets: Vec<String> = body
            .split('\n')
            .map(str::trim)
            .filter(|line| is_bullet(line))
            .map(canonical_bullet)
            .filter(|line| !self.contradicts(line))
            .map(|line| self.truncate(line))
            .map(|line| line.trim().to_string())
            .filter(|line| line.chars().count() > self.rules.min_bullet_chars)
            .take(self.rules.max_bullets)
            .collect();

        if bullets.len() < self.rules.min_bullets {
            tracing::debug!(survivors = bullets.len(), "model output too degenerate, using fallback answer");
            return self.fallback();
        }
        bullets.join("\n")
    }

    pub fn fallback(&self) -> String {
        self.rules.fallback.join("\n")
    }

    fn strip_echo<'a>(&self, raw: &'a str) -> &'a str {
        match raw.rfind(self.rules.role_marker.as_str()) {
            Some(at) => &raw[at + self.rules.role_marker.len()..],
            None => raw,
        }
    }

    fn normalize_glyphs(&self, text: &str) -> String {
        self.rules
            .bullet_glyphs
            .iter()
            .filter(|g| !g.is_empty())
            .fold(text.to_string(), |acc, glyph| acc.replace(glyph.as_str(), "-"))
    }

    fn contradicts(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
    }

    /// Cut at the last `.` within the limit; with no period there, cut hard
    /// at the limit.
    fn truncate(&self, line: String) -> String {
        let limit = self.rules.max_line_chars;
        let Some((cut, _)) = line.char_indices().nth(limit) else {
            return line;
        };
        let head = &line[..cut];
        match head.rfind('.') {
            Some(period) => head[..=period].to_string(),
            None => head.to_string(),
        }
    }
}

fn is_bullet(line: &str) -> bool {
    line.starts_with('-') || line.starts_with('*')
}

/// `* text` and `- 2. text` both become `- text`. A decimal such as
/// `- 1.5% rise` is not numbering and is left alone.
fn canonical_bullet(line: &str) -> String {
    let rest = &line[1..];
    let trimmed = rest.trim_start();
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        let after = &trimmed[digits..];
        let tail = match after.chars().next() {
            Some(')') => Some(&after[1..]),
            Some('.') if !after[1..].starts_with(|c: char| c.is_ascii_digit()) => Some(&after[1..]),
            _ => None,
        };
        if let Some(tail) = tail {
            return format!("-{tail}");
        }
    }
    format!("-{rest}")
}
