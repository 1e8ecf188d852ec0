// ── Identifier normalization ──
//
// Turns free-form names (device names, command names, counter keys) into
// identifiers the state store accepts. Every run of characters outside the
// store's allowed set collapses into a single `_`, `%` becomes `pct`, and
// hyphens and whitespace become `_`.

use std::sync::LazyLock;

use regex::Regex;

/// One run of characters outside the store's allowed set: Unicode
/// lowercase/uppercase letters (`Ll`, `Lu`), decimal digits (`Nd`) and a
/// fixed set of punctuation.
static FORBIDDEN_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{Ll}\p{Lu}\p{Nd}._\-/ :!#$%&()+=@^{}|~]+")
        .expect("forbidden-character pattern is valid")
});

/// Normalize a name into a store identifier, keeping `.` as the hierarchy
/// separator.
///
/// Total and idempotent: `to_id(&to_id(s)) == to_id(s)`.
pub fn to_id(name: &str) -> String {
    let collapsed = FORBIDDEN_RUN.replace_all(name, "_");
    let mut out = String::with_capacity(collapsed.len());

    for c in collapsed.chars() {
        match c {
            '%' => out.push_str("pct"),
            '-' | ' ' => out.push('_'),
            c => out.push(c),
        }
    }

    out
}

/// Normalize a single path segment derived from payload data.
///
/// Like [`to_id`], but `.` is also replaced so a payload key can never
/// introduce an extra hierarchy level.
pub fn to_segment(name: &str) -> String {
    to_id(name).replace('.', "_")
}

/// Join a parent id and a raw segment into a child id.
pub fn child_id(parent: &str, segment: &str) -> String {
    format!("{parent}.{}", to_segment(segment))
}

/// `true` when `text` is an unsigned integer or decimal (`^\d+(\.\d+)?$`).
pub fn is_numeric_text(text: &str) -> bool {
    fn all_digits(s: &str) -> bool {
        !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
    }

    match text.split_once('.') {
        Some((int, frac)) => all_digits(int) && all_digits(frac),
        None => all_digits(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_percent_hyphen_and_whitespace() {
        assert_eq!(to_id("CPU % used"), "CPU_pct_used");
        assert_eq!(to_id("srv-01"), "srv_01");
        assert_eq!(to_id("a\tb"), "a_b");
    }

    #[test]
    fn collapses_forbidden_runs() {
        assert_eq!(to_id("C:\\ used"), "C:__used");
        assert_eq!(to_id("a*?\"b"), "a_b");
        assert_eq!(to_id("x[0]"), "x_0_");
    }

    #[test]
    fn keeps_unicode_letters_and_dots() {
        assert_eq!(to_id("Küche.Server"), "Küche.Server");
        assert_eq!(to_id("ΣΩ.αβ"), "ΣΩ.αβ");
        assert_eq!(to_id("٣4"), "٣4");
    }

    #[test]
    fn letter_and_number_lookalikes_are_forbidden() {
        assert_eq!(to_segment("CPU²"), "CPU_");
        assert_eq!(to_segment("½load"), "_load");
        assert_eq!(to_segment("Ⓐdisk"), "_disk");
        assert_eq!(to_segment("ªx"), "_x");
        assert_eq!(to_segment("Ⅻ"), "_");
        assert_eq!(to_segment("日本語"), "_");
    }

    #[test]
    fn empty_input_yields_empty_id() {
        assert_eq!(to_id(""), "");
        assert_eq!(to_segment(""), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in [
            "CPU % used",
            "C:\\ used",
            "a - b",
            "x[0]*?",
            "total 5m",
            "%%--  ",
            "日本語",
        ] {
            let once = to_id(input);
            assert_eq!(to_id(&once), once, "to_id not idempotent for {input:?}");
            let seg = to_segment(input);
            assert_eq!(to_segment(&seg), seg, "to_segment not idempotent for {input:?}");
        }
    }

    #[test]
    fn output_has_no_forbidden_characters() {
        let out = to_segment("a-b c%d\\e*f.g\u{00a0}h²ⅻ");
        assert!(!FORBIDDEN_RUN.is_match(&out), "{out}");
        assert!(!out.contains(['-', '%', '.', ' ']));
        assert!(!out.chars().any(char::is_whitespace));
    }

    #[test]
    fn segments_never_add_hierarchy() {
        assert_eq!(to_segment("total.5m"), "total_5m");
        assert_eq!(child_id("srv.check_cpu.perf", "total 5m"), "srv.check_cpu.perf.total_5m");
    }

    #[test]
    fn numeric_text_pattern() {
        assert!(is_numeric_text("85"));
        assert!(is_numeric_text("0.5"));
        assert!(is_numeric_text("100.25"));
        assert!(!is_numeric_text(""));
        assert!(!is_numeric_text("-1"));
        assert!(!is_numeric_text("1."));
        assert!(!is_numeric_text(".5"));
        assert!(!is_numeric_text("1.2.3"));
        assert!(!is_numeric_text("85%"));
        assert!(!is_numeric_text("1e5"));
    }
}
