//! Display utilities and output formatting for the volcurve CLI.

#[cfg(not(feature = "parquet"))]
use anyhow::bail;
use anyhow::{Context, Result, ensure};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
#[cfg(feature = "parquet")]
use volcurve_lib::ParquetFormatter;
use volcurve_lib::{CsvFormatter, Formatter, Frame, IndexKey, JsonFormatter, OutputFormat, TickTable};

/// Output format for fetched data.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Csv,
    Json,
    Ndjson,
    Parquet,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => Self::Csv,
            Format::Json => Self::Json,
            Format::Ndjson => Self::Ndjson,
            Format::Parquet => Self::Parquet,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", OutputFormat::from(*self))
    }
}

/// Where and how tables are written.
#[derive(Debug)]
pub(crate) struct Output {
    format: Format,
    path: Option<PathBuf>,
    quiet: bool,
}

impl Output {
    pub(crate) const fn new(format: Format, path: Option<PathBuf>, quiet: bool) -> Self {
        Self {
            format,
            path,
            quiet,
        }
    }

    pub(crate) const fn quiet(&self) -> bool {
        self.quiet
    }

    /// Opens the destination for one table. With `part`, a file output gets
    /// the part name appended to its stem.
    fn open(&self, part: Option<&str>) -> Result<(Box<dyn Write + Send>, Option<PathBuf>)> {
        let Some(path) = &self.path else {
            ensure!(
                !OutputFormat::from(self.format).is_binary(),
                "{} output cannot be written to the terminal, pass --output",
                self.format
            );
            return Ok((Box::new(BufWriter::new(std::io::stdout())), None));
        };

        let path = part.map_or_else(|| path.clone(), |part| part_path(path, part));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok((Box::new(BufWriter::new(file)), Some(path)))
    }

    fn finish(&self, mut writer: Box<dyn Write + Send>, path: Option<PathBuf>) -> Result<()> {
        writer.flush()?;
        if let Some(path) = path
            && !self.quiet
        {
            eprintln!("Output written to: {}", path.display());
        }
        Ok(())
    }

    /// Write a table in the selected format.
    pub(crate) fn write_frame<K: IndexKey>(
        &self,
        part: Option<&str>,
        index_name: &str,
        frame: &Frame<K>,
    ) -> Result<()> {
        let (mut writer, path) = self.open(part)?;

        match self.format {
            Format::Csv => {
                let formatter = CsvFormatter::new();
                formatter.write_frame(index_name, frame, &mut writer)?;
            }
            Format::Json => {
                let formatter = JsonFormatter::new();
                formatter.write_frame(index_name, frame, &mut writer)?;
            }
            Format::Ndjson => {
                let formatter = JsonFormatter::ndjson();
                formatter.write_frame(index_name, frame, &mut writer)?;
            }
            Format::Parquet => {
                #[cfg(feature = "parquet")]
                {
                    let formatter = ParquetFormatter::new();
                    formatter.write_frame(index_name, frame, &mut writer)?;
                }
                #[cfg(not(feature = "parquet"))]
                {
                    bail!("Parquet support not compiled in");
                }
            }
        }

        self.finish(writer, path)
    }

    /// Write ticks in the selected format.
    pub(crate) fn write_ticks(&self, ticks: &TickTable) -> Result<()> {
        let (mut writer, path) = self.open(None)?;

        match self.format {
            Format::Csv => {
                let formatter = CsvFormatter::new();
                formatter.write_ticks(ticks, &mut writer)?;
            }
            Format::Json => {
                let formatter = JsonFormatter::new();
                formatter.write_ticks(ticks, &mut writer)?;
            }
            Format::Ndjson => {
                let formatter = JsonFormatter::ndjson();
                formatter.write_ticks(ticks, &mut writer)?;
            }
            Format::Parquet => {
                #[cfg(feature = "parquet")]
                {
                    let formatter = ParquetFormatter::new();
                    formatter.write_ticks(ticks, &mut writer)?;
                }
                #[cfg(not(feature = "parquet"))]
                {
                    bail!("Parquet support not compiled in");
                }
            }
        }

        self.finish(writer, path)
    }
}

/// Inserts `part` before the extension: `curve.csv` becomes `curve_adv.csv`.
pub(crate) fn part_path(path: &Path, part: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{part}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{part}"),
    };
    path.with_file_name(name)
}

/// Progress bar for a basket fetch; hidden in quiet mode.
pub(crate) fn basket_progress(quiet: bool, index: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} members ({percent}%) {msg}")
            .expect("Invalid progress template")
            .progress_chars("=>-"),
    );
    pb.set_message(format!("resolving {index}"));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use volcurve_lib::Column;

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("out/curve.csv"), "adv"),
            PathBuf::from("out/curve_adv.csv")
        );
        assert_eq!(part_path(Path::new("px"), "PX_LAST"), PathBuf::from("px_PX_LAST"));
    }

    #[test]
    fn test_parquet_to_terminal_is_refused() {
        let output = Output::new(Format::Parquet, None, true);
        let frame: Frame<NaiveDate> = Frame::default();
        assert!(output.write_frame(None, "date", &frame).is_err());
    }

    #[test]
    fn test_write_frame_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = Output::new(Format::Csv, Some(dir.path().join("px.csv")), true);
        let frame = Frame::from_columns(
            vec![NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()],
            vec![Column::new("7203 JP Equity", vec![Some(3650.0)])],
        )
        .unwrap();

        output.write_frame(Some("PX_LAST"), "date", &frame).unwrap();

        let written = std::fs::read_to_string(dir.path().join("px_PX_LAST.csv")).unwrap();
        assert_eq!(written, "date,7203 JP Equity\n2024-03-04,3650\n");
    }
}
