use std::io::Cursor;

use chrono::{Datelike, Local};
use exif::{In, Reader, Tag, Value};

/// Capture date embedded in the image, as the `DD.MM.YY` display format the
/// front-end renders. `None` when the image has no usable EXIF block.
pub fn capture_date(bytes: &[u8]) -> Option<String> {
    let mut cursor = Cursor::new(bytes);
    let exif = Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))?;

    let ascii = match &field.value {
        Value::Ascii(values) if !values.is_empty() => &values[0],
        _ => return None,
    };
    let parsed = exif::DateTime::from_ascii(ascii).ok()?;
    Some(format!(
        "{:02}.{:02}.{:02}",
        parsed.day,
        parsed.month,
        parsed.year % 100
    ))
}

pub fn today_display_date() -> String {
    let now = Local::now();
    format!("{:02}.{:02}.{:02}", now.day(), now.month(), now.year() % 100)
}
