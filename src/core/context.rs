//! Optional preamble prepended to the first user message.

use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;

use crate::api::ChatMessage;

/// Sentence describing `now`, e.g.
/// "Current Date is Friday, March 01, 2024, current time is 09:05:07."
pub fn describe_time<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Current Date is {}, current time is {}.",
        now.format("%A, %B %d, %Y"),
        now.format("%H:%M:%S")
    )
}

pub fn build_preamble<Tz>(user_name: Option<&str>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut parts = Vec::with_capacity(2);
    if let Some(name) = user_name.map(str::trim).filter(|name| !name.is_empty()) {
        parts.push(format!("User name is {name}."));
    }
    parts.push(describe_time(now));
    parts.join(" ")
}

/// Preamble for the current moment, on the clock of `timezone` when given
/// and the system's local clock otherwise.
pub fn current_preamble(user_name: Option<&str>, timezone: Option<Tz>) -> String {
    match timezone {
        Some(tz) => build_preamble(user_name, &Utc::now().with_timezone(&tz)),
        None => build_preamble(user_name, &Local::now()),
    }
}

/// Prefix the first message with `preamble`. An empty list is left alone.
pub fn inject_preamble(messages: &mut [ChatMessage], preamble: &str) {
    if let Some(first) = messages.first_mut() {
        first.content = format!("{preamble} {}", first.content);
    }
}
