use askama::Result;
use chrono::{DateTime, FixedOffset, Utc};

// India Standard Time, UTC+05:30
const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

// Render a stored UTC timestamp in lab-local time.
// Used as `|ist` in the templates.
pub fn ist(dt: &DateTime<Utc>) -> Result<String> {
    Ok(to_ist(dt).format("%d %b %Y, %I:%M %p").to_string())
}

fn to_ist(dt: &DateTime<Utc>) -> DateTime<FixedOffset> {
    match FixedOffset::east_opt(IST_OFFSET_SECONDS) {
        Some(offset) => dt.with_timezone(&offset),
        None => dt.fixed_offset(),
    }
}
