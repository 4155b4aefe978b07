//! CSV rendering of the record list.
//!
//! Quoting follows RFC 4180: a field containing a comma, a double quote or a
//! line break is wrapped in double quotes with inner quotes doubled.

use std::borrow::Cow;

use crate::error::{Error, Result};

use super::record::TabRecord;

/// Header row, without the line terminator.
pub const HEADER: &str = "Date,Category,Tags,Title,URL,ImageFilename,ImagePath";

/// Quotes `field` if it needs it.
#[must_use]
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Renders the header and one row per record, each line ending in `\n`.
#[must_use]
pub fn encode(records: &[TabRecord]) -> String {
    let mut output = String::with_capacity(HEADER.len() + 1 + records.len() * 128);
    output.push_str(HEADER);
    output.push('\n');

    for record in records {
        let date = record.date_string();
        let fields = [
            date.as_str(),
            &record.category,
            &record.tags,
            &record.title,
            &record.url,
            &record.image_filename,
            &record.image_path,
        ];

        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                output.push(',');
            }
            output.push_str(&escape_field(field));
        }
        output.push('\n');
    }

    output
}

/// Parses CSV text into rows of unescaped fields.
///
/// Accepts `\n` and `\r\n` line endings. A trailing line terminator does not
/// produce an empty row.
pub fn decode(text: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
            }
            '"' => return Err(Error::storage("Unexpected quote inside unquoted CSV field")),
            ',' => {
                row.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                field_started = false;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(Error::storage("Unterminated quoted CSV field"));
    }

    if field_started || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b\"c"), "\"a,b\"\"c\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_decode_quoted_field() {
        let rows = decode("\"a,b\"\"c\"\n").expect("decode");
        assert_eq!(rows, vec![vec!["a,b\"c".to_string()]]);
    }

    #[test]
    fn test_encode_records() {
        let record = TabRecord {
            date: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            category: "Research".to_string(),
            tags: "ai, news".to_string(),
            title: "Hello \"World\"".to_string(),
            url: "https://example.com/?a=1,2".to_string(),
            image_filename: "Hello.jpg".to_string(),
            image_path: "file:///d/SavedTabs/Hello.jpg".to_string(),
        };

        let csv = encode(&[record]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(HEADER));
        assert_eq!(
            lines.next(),
            Some(
                "2024-01-02T03:04:05.000Z,Research,\"ai, news\",\"Hello \"\"World\"\"\",\
                 \"https://example.com/?a=1,2\",Hello.jpg,file:///d/SavedTabs/Hello.jpg"
            )
        );
        assert!(csv.ends_with('\n'));

        let rows = decode(&csv).expect("decode");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][3], "Hello \"World\"");
        assert_eq!(rows[1].len(), 7);
    }

    #[test]
    fn test_encode_empty_list_is_header_only() {
        assert_eq!(encode(&[]), format!("{HEADER}\n"));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode("\"open").is_err());
        assert!(decode("a\"b").is_err());
    }

    #[test]
    fn test_decode_crlf_and_empty_fields() {
        let rows = decode("a,,c\r\n,\r\n").expect("decode");
        assert_eq!(rows[0], vec!["a", "", "c"]);
        assert_eq!(rows[1], vec!["", ""]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn escaped_fields_decode_to_their_input(fields in proptest::collection::vec(".{0,24}", 1..6)) {
            let line = fields
                .iter()
                .map(|f| escape_field(f).into_owned())
                .collect::<Vec<_>>()
                .join(",");

            let rows = decode(&format!("{line}\n")).expect("decode");
            prop_assert_eq!(rows.len(), 1);
            prop_assert_eq!(&rows[0], &fields);
        }
    }
}
