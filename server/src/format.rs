//! Canonical formatter – re-serializes decoded HTML through a
//! deterministic pretty-printer.
//!
//! Fixed configuration: 2-space indent, no tabs, 100-column soft wrap for
//! text runs, Unix line endings.  Whitespace is preserved inside
//! inline-level elements and the raw-text/whitespace-sensitive set
//! (script, style, textarea, pre); everywhere else runs of whitespace
//! collapse to single spaces.
//!
//! Formatting can fail on markup the scanner cannot make sense of
//! (unterminated tags or comments, pathological nesting).  Callers use
//! [`canonical_or_original`], which falls back to the input unchanged.

use anyhow::{bail, Result};
use tracing::warn;

const INDENT: &str = "  ";
const MAX_WIDTH: usize = 100;
const MAX_DEPTH: usize = 128;

/// Elements rendered inline, with interior whitespace preserved.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "em", "i", "kbd",
    "label", "mark", "q", "s", "small", "span", "strong", "sub", "sup", "u",
    "wbr",
];

/// Raw-text elements: content captured verbatim up to the closing tag.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea"];

/// Void elements never take a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Pretty-print `html`.  Deterministic for a given input.
pub fn canonical(html: &str) -> Result<String> {
    let mut printer = Printer::new();
    let mut scanner = Scanner::new(html);

    while let Some(token) = scanner.next_token()? {
        match token {
            Token::Text(text) => printer.text(text),
            Token::Comment(raw) | Token::Declaration(raw) => printer.standalone(raw),
            Token::Close(name, raw) => printer.close(&name, raw),
            Token::Open {
                name,
                raw,
                self_closing,
            } => {
                if RAW_TEXT_TAGS.contains(&name.as_str()) && !self_closing {
                    let (content, close_raw) = scanner.raw_text(&name)?;
                    printer.raw_element(raw, content, close_raw);
                } else {
                    printer.open(&name, raw, self_closing)?;
                }
            }
        }
    }

    Ok(printer.finish())
}

/// [`canonical`] with the documented fallback: on failure the decoded
/// input is returned unchanged and a warning is logged.  The boolean is
/// true when the fallback was taken.
pub fn canonical_or_original(html: &str) -> (String, bool) {
    match canonical(html) {
        Ok(formatted) => (formatted, false),
        Err(e) => {
            warn!("Canonical formatting failed, keeping original markup: {e}");
            (html.to_string(), true)
        }
    }
}

// ─── tokenizer ───────────────────────────────────────────────────────────

enum Token<'a> {
    Open {
        name: String,
        raw: &'a str,
        self_closing: bool,
    },
    Close(String, &'a str),
    Comment(&'a str),
    Declaration(&'a str),
    Text(&'a str),
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>> {
        let rest = self.rest();
        if rest.is_empty() {
            return Ok(None);
        }

        if !rest.starts_with('<') {
            let end = rest.find('<').unwrap_or(rest.len());
            let text = &rest[..end];
            self.pos += end;
            return Ok(Some(Token::Text(text)));
        }

        // A `<` not starting a name, comment or closer is literal text,
        // matching HTML5 tokenizer behavior.
        let tag_start = rest[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '!' || c == '/');
        if !tag_start {
            let end = rest[1..].find('<').map_or(rest.len(), |i| i + 1);
            let text = &rest[..end];
            self.pos += end;
            return Ok(Some(Token::Text(text)));
        }

        if rest.starts_with("<!--") {
            let Some(end) = rest.find("-->") else {
                bail!("unterminated comment");
            };
            let raw = &rest[..end + 3];
            self.pos += raw.len();
            return Ok(Some(Token::Comment(raw)));
        }

        if rest.starts_with("<!") {
            let Some(end) = self.find_tag_end(rest) else {
                bail!("unterminated declaration");
            };
            let raw = &rest[..=end];
            self.pos += raw.len();
            return Ok(Some(Token::Declaration(raw)));
        }

        let Some(end) = self.find_tag_end(rest) else {
            bail!("unterminated tag");
        };
        let raw = &rest[..=end];
        self.pos += raw.len();

        if let Some(stripped) = raw.strip_prefix("</") {
            let name = tag_name(stripped);
            return Ok(Some(Token::Close(name, raw)));
        }

        let name = tag_name(&raw[1..]);
        let self_closing =
            raw.ends_with("/>") || VOID_TAGS.contains(&name.as_str());
        Ok(Some(Token::Open {
            name,
            raw,
            self_closing,
        }))
    }

    /// Byte offset of the closing `>` of the tag at the start of `rest`,
    /// honouring quoted attribute values.
    fn find_tag_end(&self, rest: &str) -> Option<usize> {
        let mut quote: Option<char> = None;
        for (i, c) in rest.char_indices() {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None => match c {
                    '"' | '\'' => quote = Some(c),
                    '>' => return Some(i),
                    _ => {}
                },
            }
        }
        None
    }

    /// Capture verbatim content up to the closing tag of a raw-text
    /// element (`</script>` etc.), case-insensitive.
    fn raw_text(&mut self, name: &str) -> Result<(&'a str, &'a str)> {
        let rest = self.rest();
        let lower = rest.to_ascii_lowercase();
        let needle = format!("</{name}");
        let Some(start) = lower.find(&needle) else {
            bail!("unterminated <{name}> element");
        };
        let content = &rest[..start];
        let after = &rest[start..];
        let Some(end) = after.find('>') else {
            bail!("unterminated </{name}> tag");
        };
        let close_raw = &after[..=end];
        self.pos += start + close_raw.len();
        Ok((content, close_raw))
    }
}

/// Element name from the text just after `<` or `</`, lowercased.
fn tag_name(after_bracket: &str) -> String {
    after_bracket
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
        .collect::<String>()
        .to_ascii_lowercase()
}

// ─── printer ─────────────────────────────────────────────────────────────

struct Printer {
    out: String,
    line: String,
    depth: usize,
    /// Open inline ancestors; interior whitespace is preserved while > 0.
    inline_depth: usize,
    /// Open `<pre>` ancestors; everything flows raw while > 0.
    pre_depth: usize,
}

impl Printer {
    fn new() -> Self {
        Printer {
            out: String::new(),
            line: String::new(),
            depth: 0,
            inline_depth: 0,
            pre_depth: 0,
        }
    }

    fn indent(&self) -> String {
        INDENT.repeat(self.depth)
    }

    fn flush(&mut self) {
        if !self.line.is_empty() {
            self.out.push_str(&self.indent());
            self.out.push_str(self.line.trim_end());
            self.out.push('\n');
            self.line.clear();
        }
    }

    /// Append to the current line, wrapping at the soft limit when not in
    /// whitespace-preserving context.
    fn append(&mut self, piece: &str) {
        if self.inline_depth == 0
            && self.pre_depth == 0
            && !self.line.is_empty()
            && self.indent().len() + self.line.len() + piece.len() > MAX_WIDTH
        {
            self.flush();
        }
        if self.line.is_empty() {
            self.line.push_str(piece.trim_start());
        } else {
            self.line.push_str(piece);
        }
    }

    fn text(&mut self, text: &str) {
        if self.pre_depth > 0 {
            self.line.push_str(&unix_eol(text));
            return;
        }
        if self.inline_depth > 0 {
            self.append(&unix_eol(text));
            return;
        }
        // Normalize: collapse whitespace runs, wrap word by word.
        let mut words = text.split_whitespace().peekable();
        if words.peek().is_none() {
            return;
        }
        let leading_space = text.starts_with(char::is_whitespace);
        let mut first = true;
        for word in words {
            if first && !leading_space && !self.line.is_empty() {
                self.append(word);
            } else {
                self.append(&format!(" {word}"));
            }
            first = false;
        }
        if text.ends_with(char::is_whitespace) {
            self.line.push(' ');
        }
    }

    /// Comments and declarations sit on their own line at block level.
    fn standalone(&mut self, raw: &str) {
        if self.inline_depth > 0 || self.pre_depth > 0 {
            self.append(raw);
            return;
        }
        self.flush();
        self.append(&unix_eol(raw));
        self.flush();
    }

    fn open(&mut self, name: &str, raw: &str, self_closing: bool) -> Result<()> {
        if self.pre_depth > 0 {
            self.line.push_str(raw);
            if name == "pre" && !self_closing {
                self.pre_depth += 1;
            }
            return Ok(());
        }
        if INLINE_TAGS.contains(&name) {
            self.append(raw);
            if !self_closing {
                self.inline_depth += 1;
            }
            return Ok(());
        }
        if self.inline_depth > 0 {
            // Block element opened inside an unclosed inline element;
            // keep flowing rather than guessing at intent.
            self.append(raw);
            return Ok(());
        }

        self.flush();
        self.append(raw);
        if name == "pre" && !self_closing {
            self.pre_depth += 1;
            return Ok(());
        }
        self.flush();
        if !self_closing {
            self.depth += 1;
            if self.depth > MAX_DEPTH {
                bail!("element nesting exceeds {MAX_DEPTH} levels");
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &str, raw: &str) {
        if name == "pre" && self.pre_depth > 0 {
            self.pre_depth -= 1;
            self.line.push_str(raw);
            self.flush();
            return;
        }
        if self.pre_depth > 0 {
            self.line.push_str(raw);
            return;
        }
        if INLINE_TAGS.contains(&name) {
            self.append(raw);
            self.inline_depth = self.inline_depth.saturating_sub(1);
            return;
        }
        if self.inline_depth > 0 {
            self.append(raw);
            return;
        }
        self.flush();
        // Stray closers for never-opened elements are tolerated.
        self.depth = self.depth.saturating_sub(1);
        self.append(raw);
        self.flush();
    }

    fn raw_element(&mut self, open_raw: &str, content: &str, close_raw: &str) {
        self.flush();
        self.append(open_raw);
        let content = unix_eol(content);
        if content.trim().is_empty() {
            self.line.push_str(close_raw);
            self.flush();
            return;
        }
        self.flush();
        // Verbatim body, no re-indentation.
        self.out.push_str(content.trim_matches('\n'));
        self.out.push('\n');
        self.append(close_raw);
        self.flush();
    }

    fn finish(mut self) -> String {
        self.flush();
        self.out
    }
}

fn unix_eol(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_indentation() {
        let html = "<div><section><p>hi</p></section></div>";
        let formatted = canonical(html).unwrap();
        assert_eq!(
            formatted,
            "<div>\n  <section>\n    <p>\n      hi\n    </p>\n  </section>\n</div>\n"
        );
    }

    #[test]
    fn test_two_space_indent_no_tabs() {
        let html = "<div>\t<p>x</p>\t</div>";
        let formatted = canonical(html).unwrap();
        assert!(!formatted.contains('\t'));
        assert!(formatted.contains("\n  <p>"));
    }

    #[test]
    fn test_inline_whitespace_preserved() {
        let html = "<p><span>a  b</span></p>";
        let formatted = canonical(html).unwrap();
        assert!(formatted.contains("<span>a  b</span>"));
    }

    #[test]
    fn test_block_whitespace_collapsed() {
        let html = "<p>a \n  b</p>";
        let formatted = canonical(html).unwrap();
        assert!(formatted.contains("a b"));
    }

    #[test]
    fn test_void_elements_do_not_indent() {
        let html = "<div><br><img src=\"x.png\"></div>";
        let formatted = canonical(html).unwrap();
        assert_eq!(formatted, "<div>\n  <br>\n  <img src=\"x.png\">\n</div>\n");
    }

    #[test]
    fn test_script_content_verbatim() {
        let html = "<div><script>if (a < b) { go(); }</script></div>";
        let formatted = canonical(html).unwrap();
        assert!(formatted.contains("if (a < b) { go(); }"));
    }

    #[test]
    fn test_doctype_on_own_line() {
        let html = "<!DOCTYPE html><html><body></body></html>";
        let formatted = canonical(html).unwrap();
        assert!(formatted.starts_with("<!DOCTYPE html>\n"));
    }

    #[test]
    fn test_soft_wrap_long_text() {
        let word = "word ";
        let html = format!("<p>{}</p>", word.repeat(40));
        let formatted = canonical(&html).unwrap();
        let longest = formatted.lines().map(str::len).max().unwrap();
        assert!(longest <= MAX_WIDTH + word.len());
        assert!(formatted.lines().count() > 3);
    }

    #[test]
    fn test_bare_lt_in_text_is_literal() {
        let html = "<p>a < b</p>";
        let formatted = canonical(html).unwrap();
        assert_eq!(formatted, "<p>\n  a < b\n</p>\n");
    }

    #[test]
    fn test_bare_lt_does_not_drift_indentation() {
        let html = "<div><p>x < y</p><p>z</p></div>";
        let formatted = canonical(html).unwrap();
        assert_eq!(
            formatted,
            "<div>\n  <p>\n    x < y\n  </p>\n  <p>\n    z\n  </p>\n</div>\n"
        );
    }

    #[test]
    fn test_unix_line_endings() {
        let html = "<div>\r\n<p>a</p>\r\n</div>";
        let formatted = canonical(html).unwrap();
        assert!(!formatted.contains('\r'));
    }

    #[test]
    fn test_unterminated_tag_is_an_error() {
        assert!(canonical("<div class=\"open").is_err());
        assert!(canonical("<!-- never closed").is_err());
        assert!(canonical("<script>var x = 1;").is_err());
    }

    #[test]
    fn test_fallback_returns_input_unchanged() {
        let bad = "<div class=\"open";
        let (formatted, fell_back) = canonical_or_original(bad);
        assert!(fell_back);
        assert_eq!(formatted, bad);
    }

    #[test]
    fn test_deterministic() {
        let html = "<div><p>a</p><p>b</p></div>";
        assert_eq!(canonical(html).unwrap(), canonical(html).unwrap());
    }
}
