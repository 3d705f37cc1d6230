//! CSV output format.

use std::io::Write;
use volcurve_types::{Frame, TickTable};

use crate::{FormatError, Formatter, IndexKey};

/// CSV formatter.
///
/// Null cells are written as empty fields.
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    /// Field delimiter (default: comma).
    delimiter: char,
    /// Whether to include header row.
    include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvFormatter {
    /// Creates a new CSV formatter with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }

    /// Sets the field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether to include a header row.
    #[must_use]
    pub const fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Creates a tab-separated values (TSV) formatter.
    #[must_use]
    pub const fn tsv() -> Self {
        Self {
            delimiter: '\t',
            include_header: true,
        }
    }
}

impl CsvFormatter {
    fn cell(value: Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }
}

impl Formatter for CsvFormatter {
    fn write_frame<K: IndexKey, W: Write + Send>(
        &self,
        index_name: &str,
        frame: &Frame<K>,
        mut writer: W,
    ) -> Result<(), FormatError> {
        let d = self.delimiter;

        if self.include_header {
            write!(writer, "{index_name}")?;
            for name in frame.column_names() {
                write!(writer, "{d}{name}")?;
            }
            writeln!(writer)?;
        }

        for (key, cells) in frame.rows()? {
            write!(writer, "{}", key.label())?;
            for cell in cells {
                write!(writer, "{d}{}", Self::cell(cell))?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    fn write_ticks<W: Write + Send>(
        &self,
        ticks: &TickTable,
        mut writer: W,
    ) -> Result<(), FormatError> {
        let d = self.delimiter;
        let with_codes = ticks.condition_codes.is_some();

        if self.include_header {
            write!(writer, "time{d}type{d}value{d}size")?;
            if with_codes {
                write!(writer, "{d}conditionCodes")?;
            }
            writeln!(writer)?;
        }

        for tick in ticks.rows() {
            write!(
                writer,
                "{}{d}{}{d}{}{d}{}",
                tick.time.label(),
                tick.event_type,
                tick.value,
                tick.size
            )?;
            if with_codes {
                write!(writer, "{d}{}", tick.condition_codes.unwrap_or_default())?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    fn extension(&self) -> &str {
        "csv"
    }
}
