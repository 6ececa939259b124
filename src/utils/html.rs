// src/utils/html.rs

use std::collections::HashSet;

/// Strips all HTML from student-supplied free text before storage.
///
/// Profile and onboarding fields are rendered in the admin dashboard, so
/// this serves as a fail-safe against stored XSS. Unlike a whitelist clean,
/// no tags survive at all: these fields are plain text.
pub fn clean_text(input: &str) -> String {
    ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let cleaned = clean_text("hello <script>alert(1)</script>world");
        assert!(!cleaned.contains("<script>"));
        assert!(cleaned.contains("hello"));
    }

    #[test]
    fn strips_markup_but_keeps_text() {
        assert_eq!(clean_text("<b>bold</b> plans"), "bold plans");
    }
}
