//! JSON output format.

use serde_json::{Map, Value, json};
use std::io::Write;
use volcurve_types::{Frame, TickTable};

use crate::{FormatError, Formatter, IndexKey};

/// JSON output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    /// JSON array (standard JSON).
    #[default]
    Array,
    /// Newline-delimited JSON (NDJSON/JSONL).
    Ndjson,
}

/// JSON formatter.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    /// Output style.
    style: JsonStyle,
    /// Whether to pretty-print (only for array style).
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter with default settings (array style).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            style: JsonStyle::Array,
            pretty: false,
        }
    }

    /// Creates a new NDJSON formatter.
    #[must_use]
    pub const fn ndjson() -> Self {
        Self {
            style: JsonStyle::Ndjson,
            pretty: false,
        }
    }

    /// Sets whether to pretty-print output (array style only).
    #[must_use]
    pub const fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the output style.
    #[must_use]
    pub const fn with_style(mut self, style: JsonStyle) -> Self {
        self.style = style;
        self
    }
}

impl JsonFormatter {
    fn write_records<W: Write>(&self, records: &[Value], mut writer: W) -> Result<(), FormatError> {
        match self.style {
            JsonStyle::Array => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut writer, records)?;
                } else {
                    serde_json::to_writer(&mut writer, records)?;
                }
                writeln!(writer)?;
            }
            JsonStyle::Ndjson => {
                for record in records {
                    serde_json::to_writer(&mut writer, record)?;
                    writeln!(writer)?;
                }
            }
        }
        Ok(())
    }
}

impl Formatter for JsonFormatter {
    fn write_frame<K: IndexKey, W: Write + Send>(
        &self,
        index_name: &str,
        frame: &Frame<K>,
        writer: W,
    ) -> Result<(), FormatError> {
        let names: Vec<&str> = frame.column_names().collect();
        let records: Vec<Value> = frame
            .rows()?
            .into_iter()
            .map(|(key, cells)| {
                let mut record = Map::with_capacity(names.len() + 1);
                record.insert(index_name.to_string(), Value::String(key.label()));
                for (name, cell) in names.iter().zip(cells) {
                    record.insert((*name).to_string(), cell.map_or(Value::Null, Value::from));
                }
                Value::Object(record)
            })
            .collect();
        self.write_records(&records, writer)
    }

    fn write_ticks<W: Write + Send>(
        &self,
        ticks: &TickTable,
        writer: W,
    ) -> Result<(), FormatError> {
        let records: Vec<Value> = ticks
            .rows()
            .map(|tick| {
                let mut record = json!({
                    "time": tick.time.label(),
                    "type": tick.event_type,
                    "value": tick.value,
                    "size": tick.size,
                });
                if ticks.condition_codes.is_some() {
                    record["conditionCodes"] = tick.condition_codes.map_or(Value::Null, Value::from);
                }
                record
            })
            .collect();
        self.write_records(&records, writer)
    }

    fn extension(&self) -> &str {
        match self.style {
            JsonStyle::Array => "json",
            JsonStyle::Ndjson => "ndjson",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, NaiveTime};
    use std::io::Cursor;
    use volcurve_types::{Column, TickRow};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn frame() -> Frame<NaiveTime> {
        Frame::from_columns(
            vec![t(9, 0), t(9, 5)],
            vec![
                Column::new("7203", vec![Some(0.25), Some(1.0)]),
                Column::new("6758", vec![None, Some(1.0)]),
            ],
        )
        .unwrap()
    }

    fn render(formatter: &JsonFormatter) -> String {
        let mut output = Cursor::new(Vec::new());
        formatter.write_frame("bucket", &frame(), &mut output).unwrap();
        String::from_utf8(output.into_inner()).unwrap()
    }

    #[test]
    fn test_json_array() {
        let result = render(&JsonFormatter::new());
        assert!(result.starts_with('['));
        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(
            parsed[0],
            json!({"bucket": "09:00:00", "7203": 0.25, "6758": null})
        );
        assert_eq!(parsed[1]["6758"], json!(1.0));
    }

    #[test]
    fn test_column_order_preserved() {
        let result = render(&JsonFormatter::new());
        let bucket = result.find("\"bucket\"").unwrap();
        let first = result.find("\"7203\"").unwrap();
        let second = result.find("\"6758\"").unwrap();
        assert!(bucket < first && first < second);
    }

    #[test]
    fn test_ndjson() {
        let result = render(&JsonFormatter::ndjson());
        let lines: Vec<_> = result.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('{'));
    }

    #[test]
    fn test_pretty_json() {
        let result = render(&JsonFormatter::new().with_pretty(true));
        assert!(result.contains('\n'));
        assert!(result.contains("  ")); // Indentation
    }

    #[test]
    fn test_ticks() {
        let mut table = TickTable::new(false);
        table.push(TickRow {
            time: NaiveDateTime::parse_from_str("2024-03-04T09:00:01", "%Y-%m-%dT%H:%M:%S").unwrap(),
            event_type: "TRADE".to_string(),
            value: 3650.0,
            size: 1200,
            condition_codes: None,
        });
        let mut output = Cursor::new(Vec::new());
        JsonFormatter::ndjson().write_ticks(&table, &mut output).unwrap();
        let parsed: Value = serde_json::from_slice(&output.into_inner()).unwrap();
        assert_eq!(
            parsed,
            json!({"time": "2024-03-04T09:00:01", "type": "TRADE", "value": 3650.0, "size": 1200})
        );
    }
}
