use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()
});

pub fn test_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// First `width` characters of a note, for the one-line list view.
pub fn preview(content: &str, width: usize) -> String {
    let line = content.lines().next().unwrap_or_default();
    if line.chars().count() > width || line.len() < content.len() {
        let cut = line.chars().take(width).collect::<String>();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}
