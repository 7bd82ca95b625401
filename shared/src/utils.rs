use std::fmt::Display;

pub fn eq(value: impl Display) -> String {
    format!("eq.{value}")
}

/// Realtime equality filter, `column=eq.value`.
pub fn filter_eq(column: &str, value: impl Display) -> String {
    format!("{column}={}", eq(value))
}

pub fn order_desc(column: &str) -> String {
    format!("{column}.desc")
}
