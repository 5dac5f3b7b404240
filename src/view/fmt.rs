use chrono::{Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use std::borrow::Cow;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Zone used when printing stored (UTC) timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayZone {
    #[default]
    Utc,
    /// The host zone, honouring `TZ`.
    Local,
}

/// One typed column value, before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Int(i64),
    Text(&'a str),
    Time(NaiveDateTime),
    Duration(TimeDelta),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CellFormat {
    pub zone: DisplayZone,
}

impl CellFormat {
    /// Locale-invariant text for a cell. Text cells come back HTML-escaped.
    pub fn format(&self, cell: &Cell<'_>) -> String {
        match cell {
            Cell::Int(n) => n.to_string(),
            Cell::Text(s) => escape_html(s).into_owned(),
            Cell::Time(ts) => fmt_timestamp(*ts, self.zone),
            Cell::Duration(d) => fmt_duration(*d),
        }
    }
}

pub fn fmt_timestamp(ts: NaiveDateTime, zone: DisplayZone) -> String {
    match zone {
        DisplayZone::Utc => ts.format(TIMESTAMP_FORMAT).to_string(),
        DisplayZone::Local => Utc
            .from_utc_datetime(&ts)
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
    }
}

/// `HH:MM:SS`; hours keep counting past a day.
pub fn fmt_duration(d: TimeDelta) -> String {
    let total = d.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let secs = total.unsigned_abs();
    format!(
        "{sign}{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
