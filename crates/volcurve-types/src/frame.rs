//! Indexed column tables.
//!
//! [`Frame`] is the tabular shape every fetch resolves to: an ordered index
//! of keys (dates, timestamps or time-of-day buckets) and named `f64` columns
//! whose cells may be null. Index keys need not be unique.
//!
//! A frame is a thin typed view over a polars [`DataFrame`] whose first
//! column, [`INDEX_COLUMN`], holds the keys.

use std::marker::PhantomData;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use polars::prelude::{
    DataFrame, DataType, Expr, Int32Chunked, Int64Chunked, IntoLazy, IntoSeries, JoinArgs,
    JoinCoalesce, JoinType, LazyFrame, NULL, NamedFrom, PlSmallStr, SortMultipleOptions,
    TimeUnit, col, lit, when,
};

use crate::VolcurveError;

type PolarsSeries = polars::prelude::Series;

/// Name of the DataFrame column holding the index keys.
pub const INDEX_COLUMN: &str = "index";

/// Days between 0001-01-01 and 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Key type a [`Frame`] can be indexed by.
pub trait FrameKey: Ord + Clone {
    /// Encodes keys as a polars series.
    fn to_series(name: &str, keys: &[Self]) -> PolarsSeries;

    /// Decodes keys from a polars series.
    ///
    /// # Errors
    ///
    /// Returns an error if the series has the wrong type or holds a null.
    fn from_series(series: &PolarsSeries) -> Result<Vec<Self>, VolcurveError>;
}

fn non_null<T>(values: impl Iterator<Item = Option<T>>, kind: &str) -> Result<Vec<T>, VolcurveError> {
    values
        .map(|v| v.ok_or_else(|| VolcurveError::IndexKey(format!("null {kind}"))))
        .collect()
}

impl FrameKey for NaiveDate {
    fn to_series(name: &str, keys: &[Self]) -> PolarsSeries {
        let days = keys
            .iter()
            .map(|d| d.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
            .collect();
        Int32Chunked::from_vec(name.into(), days).into_date().into_series()
    }

    fn from_series(series: &PolarsSeries) -> Result<Vec<Self>, VolcurveError> {
        let dates = series.cast(&DataType::Date)?;
        let days = dates.to_physical_repr();
        let keys = days.i32()?.into_iter().map(|d| {
            d.map(|d| {
                d.checked_add(EPOCH_DAYS_FROM_CE)
                    .and_then(Self::from_num_days_from_ce_opt)
                    .ok_or_else(|| VolcurveError::IndexKey(format!("day {d}")))
            })
        });
        non_null(keys, "date")?.into_iter().collect()
    }
}

impl FrameKey for NaiveDateTime {
    fn to_series(name: &str, keys: &[Self]) -> PolarsSeries {
        let micros = keys.iter().map(|t| t.and_utc().timestamp_micros()).collect();
        Int64Chunked::from_vec(name.into(), micros)
            .into_datetime(TimeUnit::Microseconds, None)
            .into_series()
    }

    fn from_series(series: &PolarsSeries) -> Result<Vec<Self>, VolcurveError> {
        let stamps = series.cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
        let micros = stamps.to_physical_repr();
        let keys = micros.i64()?.into_iter().map(|us| {
            us.map(|us| {
                DateTime::from_timestamp_micros(us)
                    .map(|t| t.naive_utc())
                    .ok_or_else(|| VolcurveError::IndexKey(format!("timestamp {us}us")))
            })
        });
        non_null(keys, "timestamp")?.into_iter().collect()
    }
}

impl FrameKey for NaiveTime {
    fn to_series(name: &str, keys: &[Self]) -> PolarsSeries {
        let nanos = keys
            .iter()
            .map(|t| i64::from(t.num_seconds_from_midnight()) * NANOS_PER_SECOND + i64::from(t.nanosecond()))
            .collect();
        Int64Chunked::from_vec(name.into(), nanos).into_time().into_series()
    }

    fn from_series(series: &PolarsSeries) -> Result<Vec<Self>, VolcurveError> {
        let times = series.cast(&DataType::Time)?;
        let nanos = times.to_physical_repr();
        let keys = nanos.i64()?.into_iter().map(|ns| {
            ns.map(|ns| {
                let secs = u32::try_from(ns.div_euclid(NANOS_PER_SECOND)).ok();
                let frac = u32::try_from(ns.rem_euclid(NANOS_PER_SECOND)).ok();
                secs.zip(frac)
                    .and_then(|(secs, frac)| Self::from_num_seconds_from_midnight_opt(secs, frac))
                    .ok_or_else(|| VolcurveError::IndexKey(format!("time {ns}ns")))
            })
        });
        non_null(keys, "time")?.into_iter().collect()
    }
}

impl FrameKey for String {
    fn to_series(name: &str, keys: &[Self]) -> PolarsSeries {
        PolarsSeries::new(name.into(), keys)
    }

    fn from_series(series: &PolarsSeries) -> Result<Vec<Self>, VolcurveError> {
        non_null(series.str()?.into_iter().map(|s| s.map(str::to_string)), "label")
    }
}

/// A named column of nullable values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column label.
    pub name: String,
    /// One cell per index entry.
    pub values: Vec<Option<f64>>,
}

impl Column {
    /// Creates a new column.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    fn into_series(self) -> PolarsSeries {
        PolarsSeries::new(self.name.into(), self.values)
    }
}

fn float_values(series: &PolarsSeries) -> Result<Vec<Option<f64>>, VolcurveError> {
    Ok(series.cast(&DataType::Float64)?.f64()?.into_iter().collect())
}

/// Table keyed by an ordered index with named nullable `f64` columns.
#[derive(Debug, Clone)]
pub struct Frame<K> {
    df: DataFrame,
    key: PhantomData<K>,
}

impl<K> PartialEq for Frame<K> {
    fn eq(&self, other: &Self) -> bool {
        self.df.equals_missing(&other.df)
    }
}

impl<K: FrameKey> Default for Frame<K> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<K: FrameKey> Frame<K> {
    /// Creates a frame with the given index and no columns.
    #[must_use]
    pub fn new(index: Vec<K>) -> Self {
        Self {
            df: K::to_series(INDEX_COLUMN, &index).into_frame(),
            key: PhantomData,
        }
    }

    /// Creates a frame from an index and a list of columns.
    ///
    /// # Errors
    ///
    /// Returns an error if a column's length differs from the index length or
    /// a column name repeats.
    pub fn from_columns(index: Vec<K>, columns: Vec<Column>) -> Result<Self, VolcurveError> {
        let mut frame = Self::new(index);
        for column in columns {
            frame.push_column(column.name, column.values)?;
        }
        Ok(frame)
    }

    /// Wraps a DataFrame holding an [`INDEX_COLUMN`] of `K` keys.
    ///
    /// The index is moved to the front and every other column is cast to
    /// `Float64`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index column is missing, holds nulls or has
    /// the wrong type, or a column cannot be cast to `Float64`.
    pub fn from_dataframe(mut df: DataFrame) -> Result<Self, VolcurveError> {
        let index = df
            .column(INDEX_COLUMN)
            .map_err(|_| VolcurveError::UnknownColumn(INDEX_COLUMN.to_string()))?;
        K::from_series(index.as_materialized_series())?;

        let names: Vec<PlSmallStr> = df.get_column_names().into_iter().cloned().collect();
        for name in names.iter().filter(|n| n.as_str() != INDEX_COLUMN) {
            let values = df.column(name)?.cast(&DataType::Float64)?;
            df.with_column(values)?;
        }
        if df.get_column_index(INDEX_COLUMN) != Some(0) {
            let order = std::iter::once(PlSmallStr::from(INDEX_COLUMN))
                .chain(names.into_iter().filter(|n| n.as_str() != INDEX_COLUMN));
            df = df.select(order)?;
        }

        Ok(Self {
            df,
            key: PhantomData,
        })
    }

    /// Appends a column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column length differs from the index length or
    /// the name is already used.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), VolcurveError> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(VolcurveError::ColumnLength {
                name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        if name == INDEX_COLUMN || self.has_column(&name) {
            return Err(VolcurveError::DuplicateColumn(name));
        }
        self.df.with_column(Column::new(name, values).into_series())?;
        Ok(())
    }

    /// Returns the index keys.
    ///
    /// # Errors
    ///
    /// Returns an error if a key cannot be decoded.
    pub fn index(&self) -> Result<Vec<K>, VolcurveError> {
        K::from_series(self.index_series()?)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Returns true if the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Returns the column labels in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.df
            .get_columns()
            .iter()
            .map(|c| c.name().as_str())
            .filter(|name| *name != INDEX_COLUMN)
    }

    /// Returns the columns in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be read as `f64`.
    pub fn columns(&self) -> Result<Vec<Column>, VolcurveError> {
        self.column_names()
            .map(|name| {
                let series = self.df.column(name)?.as_materialized_series();
                Ok(Column::new(name, float_values(series)?))
            })
            .collect()
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        if name == INDEX_COLUMN {
            return None;
        }
        let column = self.df.column(name).ok()?;
        float_values(column.as_materialized_series()).ok()
    }

    /// Returns the cell at `row` in column `name`.
    #[must_use]
    pub fn get(&self, row: usize, name: &str) -> Option<f64> {
        if row >= self.len() || name == INDEX_COLUMN {
            return None;
        }
        let column = self.df.column(name).ok()?;
        column.as_materialized_series().f64().ok()?.get(row)
    }

    /// Renames a column.
    ///
    /// # Errors
    ///
    /// Returns an error if `from` does not exist or `to` is already used by
    /// another column.
    pub fn rename_column(&mut self, from: &str, to: impl Into<String>) -> Result<(), VolcurveError> {
        let to = to.into();
        if from == INDEX_COLUMN || !self.has_column(from) {
            return Err(VolcurveError::UnknownColumn(from.to_string()));
        }
        if from != to && (to == INDEX_COLUMN || self.has_column(&to)) {
            return Err(VolcurveError::DuplicateColumn(to));
        }
        self.df.rename(from, to.into())?;
        Ok(())
    }

    /// Projects the given columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::UnknownColumn`] for a name that does not exist.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, VolcurveError> {
        if let Some(missing) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| *name == INDEX_COLUMN || !self.has_column(name))
        {
            return Err(VolcurveError::UnknownColumn(missing.to_string()));
        }
        let df = self
            .df
            .select(std::iter::once(INDEX_COLUMN).chain(names.iter().map(AsRef::as_ref)))?;
        Ok(Self {
            df,
            key: PhantomData,
        })
    }

    /// Full-joins two frames on their index.
    ///
    /// The result index is the sorted union of both indexes. Rows sharing a
    /// key are paired as a cross product; keys present on one side only get
    /// null cells for the other side's columns.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::DuplicateColumn`] if both frames carry a
    /// column with the same name.
    pub fn outer_join(&self, other: &Self) -> Result<Self, VolcurveError> {
        if let Some(dup) = other.column_names().find(|name| self.has_column(name)) {
            return Err(VolcurveError::DuplicateColumn(dup.to_string()));
        }

        let joined = self
            .lazy()
            .join(
                other.lazy(),
                [col(INDEX_COLUMN)],
                [col(INDEX_COLUMN)],
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
            )
            .sort([INDEX_COLUMN], SortMultipleOptions::default().with_maintain_order(true))
            .collect()?;
        Self::from_dataframe(joined)
    }

    /// Groups rows by a key derived from the index and sums each column.
    ///
    /// `key` is evaluated against the frame, so it may refer to
    /// [`INDEX_COLUMN`]. A group with no non-null cell in a column stays null
    /// for that column. The result index is sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` cannot be evaluated or does not produce `G`
    /// keys.
    pub fn group_sum_by<G: FrameKey>(&self, key: Expr) -> Result<Frame<G>, VolcurveError> {
        let sums: Vec<Expr> = self
            .column_names()
            .map(|name| {
                when(col(name).count().gt(lit(0)))
                    .then(col(name).sum())
                    .otherwise(lit(NULL).cast(DataType::Float64))
                    .alias(name)
            })
            .collect();

        let grouped = self
            .lazy()
            .with_column(key.alias(INDEX_COLUMN))
            .group_by_stable([col(INDEX_COLUMN)])
            .agg(sums)
            .sort([INDEX_COLUMN], SortMultipleOptions::default().with_maintain_order(true))
            .collect()?;
        Frame::from_dataframe(grouped)
    }

    /// Returns the rows as `(key, cells)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or a column cannot be decoded.
    pub fn rows(&self) -> Result<Vec<(K, Vec<Option<f64>>)>, VolcurveError> {
        let columns = self.columns()?;
        Ok(self
            .index()?
            .into_iter()
            .enumerate()
            .map(|(i, key)| (key, columns.iter().map(|c| c.values[i]).collect()))
            .collect())
    }

    /// Returns a lazy query over the frame, index included.
    #[must_use]
    pub fn lazy(&self) -> LazyFrame {
        self.df.clone().lazy()
    }

    fn index_series(&self) -> Result<&PolarsSeries, VolcurveError> {
        Ok(self.df.column(INDEX_COLUMN)?.as_materialized_series())
    }

    fn has_column(&self, name: &str) -> bool {
        self.df.get_column_index(name).is_some()
    }
}

/// Ordered mapping from a label to a value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    entries: Vec<(String, f64)>,
}

impl Series {
    /// Creates a series from labelled values.
    #[must_use]
    pub const fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    /// Looks up a value by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    /// Iterates over `(label, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), *v))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the series is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts to a label-indexed frame with a single column.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::DuplicateColumn`] if `column` is the reserved
    /// index name.
    pub fn to_frame(&self, column: &str) -> Result<Frame<String>, VolcurveError> {
        Frame::from_columns(
            self.entries.iter().map(|(l, _)| l.clone()).collect(),
            vec![Column::new(
                column,
                self.entries.iter().map(|(_, v)| Some(*v)).collect(),
            )],
        )
    }
}
