//! Volume-curve math over a wide table of per-security volumes.

use chrono::{NaiveDateTime, NaiveTime};
use polars::prelude::{DataType, Expr, FillNullStrategy, InterpolationMethod, NULL, col, lit};
use std::collections::HashMap;
use std::num::NonZeroU32;
use tracing::warn;
use volcurve_types::{Frame, FrameKey, INDEX_COLUMN, Series, VolcurveError};

/// Intraday volume profile of a basket.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeCurve {
    /// Average daily volume per security.
    pub adv: Series,
    /// Average volume per time-of-day bucket.
    pub average: Frame<NaiveTime>,
    /// Cumulative fraction of daily volume per bucket.
    pub cumulative: Frame<NaiveTime>,
}

/// Shortens column labels to their first `width` characters.
///
/// Labels whose prefix would collide with another column keep their full
/// text, and the collision is logged.
///
/// # Errors
///
/// Returns [`VolcurveError::DuplicateColumn`] if a shortened label equals an
/// unshortened one.
pub fn shorten_labels<K: FrameKey>(frame: &Frame<K>, width: usize) -> Result<Frame<K>, VolcurveError> {
    let prefix = |name: &str| -> String { name.chars().take(width).collect() };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in frame.column_names() {
        *counts.entry(prefix(name)).or_default() += 1;
    }

    let mut shortened = frame.clone();
    for name in frame.column_names() {
        let short = prefix(name);
        if counts[&short] > 1 {
            warn!(label = %short, column = name, "label prefix collides, keeping full identifier");
            continue;
        }
        shortened.rename_column(name, short)?;
    }
    Ok(shortened)
}

/// Fills gaps in a column expression.
///
/// Interior gaps are linearly interpolated by position, trailing gaps carry
/// the last value forward and leading gaps take the first value. A column
/// with no values stays null.
#[must_use]
pub fn fill_gaps(values: Expr) -> Expr {
    values
        .interpolate(InterpolationMethod::Linear)
        .fill_null_with_strategy(FillNullStrategy::Forward(None))
        .fill_null_with_strategy(FillNullStrategy::Backward(None))
}

/// Builds the volume curve from a timestamp-indexed table holding one volume
/// column per security.
///
/// Volumes are summed per time-of-day bucket. The average table divides those
/// sums by `business_days`; the cumulative table is the running share of
/// each column's total, and stays null for a column with no volume. Gaps in
/// both tables are filled with [`fill_gaps`].
///
/// # Errors
///
/// Returns [`VolcurveError::Table`] if a query over the table fails.
pub fn build_curve(wide: &Frame<NaiveDateTime>, business_days: NonZeroU32) -> Result<VolumeCurve, VolcurveError> {
    let days = f64::from(business_days.get());
    let sums: Frame<NaiveTime> = wide.group_sum_by(col(INDEX_COLUMN).dt().time())?;
    let names: Vec<String> = sums.column_names().map(str::to_string).collect();

    let totals_df = sums
        .lazy()
        .select(names.iter().map(|name| col(name.as_str()).sum()).collect::<Vec<_>>())
        .collect()?;
    let mut totals = Vec::with_capacity(names.len());
    for name in &names {
        let total = totals_df
            .column(name)?
            .as_materialized_series()
            .f64()?
            .get(0)
            .unwrap_or(0.0);
        totals.push((name.clone(), total));
    }

    let adv = Series::new(
        totals
            .iter()
            .map(|(name, total)| (name.clone(), total / days))
            .collect(),
    );

    let average = sums
        .lazy()
        .with_columns(
            names
                .iter()
                .map(|name| fill_gaps(col(name.as_str()) / lit(days)).alias(name.as_str()))
                .collect::<Vec<_>>(),
        )
        .collect()?;

    let cumulative = sums
        .lazy()
        .with_columns(
            totals
                .iter()
                .map(|(name, total)| {
                    let share = if *total == 0.0 {
                        lit(NULL).cast(DataType::Float64)
                    } else {
                        fill_gaps((col(name.as_str()) / lit(*total)).cum_sum(false))
                    };
                    share.alias(name.as_str())
                })
                .collect::<Vec<_>>(),
        )
        .collect()?;

    Ok(VolumeCurve {
        adv,
        average: Frame::from_dataframe(average)?,
        cumulative: Frame::from_dataframe(cumulative)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polars::df;
    use polars::prelude::IntoLazy;
    use volcurve_types::{Column, parse_datetime};

    fn at(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn days(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn filled(values: &[Option<f64>]) -> Vec<Option<f64>> {
        let df = df!("v" => values).unwrap();
        let out = df.lazy().select([fill_gaps(col("v"))]).collect().unwrap();
        out.column("v")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    fn wide() -> Frame<NaiveDateTime> {
        Frame::from_columns(
            vec![
                at("2024-03-04T09:00:00"),
                at("2024-03-04T09:05:00"),
                at("2024-03-04T09:10:00"),
                at("2024-03-05T09:00:00"),
                at("2024-03-05T09:05:00"),
                at("2024-03-05T09:10:00"),
            ],
            vec![
                Column::new(
                    "7203 JP Equity",
                    vec![Some(100.0), Some(50.0), Some(50.0), Some(300.0), Some(150.0), Some(150.0)],
                ),
                Column::new(
                    "6758 JP Equity",
                    vec![Some(10.0), None, Some(30.0), Some(30.0), None, Some(30.0)],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fill_gaps() {
        assert_eq!(
            filled(&[None, Some(1.0), None, None, Some(4.0), None]),
            vec![Some(1.0), Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(4.0)]
        );
        assert_eq!(filled(&[None, None]), vec![None, None]);
    }

    #[test]
    fn test_shorten_labels() {
        let shortened = shorten_labels(&wide(), 4).unwrap();
        assert_eq!(shortened.column_names().collect::<Vec<_>>(), vec!["7203", "6758"]);
    }

    #[test]
    fn test_shorten_labels_collision_keeps_full_ids() {
        let frame = Frame::from_columns(
            vec![t(9, 0)],
            vec![
                Column::new("7203 JP Equity", vec![Some(1.0)]),
                Column::new("7203 JT Equity", vec![Some(2.0)]),
                Column::new("6758 JP Equity", vec![Some(3.0)]),
            ],
        )
        .unwrap();
        let shortened = shorten_labels(&frame, 4).unwrap();
        assert_eq!(
            shortened.column_names().collect::<Vec<_>>(),
            vec!["7203 JP Equity", "7203 JT Equity", "6758"]
        );
    }

    #[test]
    fn test_build_curve_average_and_adv() {
        let curve = build_curve(&wide(), days(2)).unwrap();

        assert_eq!(curve.average.index().unwrap(), vec![t(9, 0), t(9, 5), t(9, 10)]);
        assert_relative_eq!(curve.adv.get("7203 JP Equity").unwrap(), 400.0);
        assert_relative_eq!(curve.adv.get("6758 JP Equity").unwrap(), 50.0);
        assert_relative_eq!(curve.average.get(0, "7203 JP Equity").unwrap(), 200.0);

        // 09:05 has no 6758 volume on either day; interpolated between 20 and 30.
        assert_relative_eq!(curve.average.get(1, "6758 JP Equity").unwrap(), 25.0);
    }

    #[test]
    fn test_cumulative_is_monotone_and_ends_at_one() {
        let curve = build_curve(&wide(), days(2)).unwrap();
        for column in curve.cumulative.columns().unwrap() {
            let values: Vec<f64> = column.values.iter().map(|v| v.unwrap()).collect();
            assert!(values.windows(2).all(|w| w[0] <= w[1]), "{} not monotone", column.name);
            assert_relative_eq!(*values.last().unwrap(), 1.0);
        }
        assert_relative_eq!(curve.cumulative.get(0, "7203 JP Equity").unwrap(), 0.5);
    }

    #[test]
    fn test_single_day_adv_is_raw_volume() {
        let frame = Frame::from_columns(
            vec![at("2024-03-04T09:00:00"), at("2024-03-04T09:05:00")],
            vec![Column::new("7203", vec![Some(1200.0), Some(800.0)])],
        )
        .unwrap();
        let curve = build_curve(&frame, days(1)).unwrap();
        assert_relative_eq!(curve.adv.get("7203").unwrap(), 2000.0);
        assert_eq!(curve.average.column("7203").unwrap(), vec![Some(1200.0), Some(800.0)]);
    }

    #[test]
    fn test_zero_volume_column_stays_null() {
        let frame = Frame::from_columns(
            vec![at("2024-03-04T09:00:00")],
            vec![Column::new("9984", vec![Some(0.0)])],
        )
        .unwrap();
        let curve = build_curve(&frame, days(1)).unwrap();
        assert_eq!(curve.cumulative.column("9984").unwrap(), vec![None]);
        assert_eq!(curve.cumulative.index().unwrap(), vec![t(9, 0)]);
    }
}
