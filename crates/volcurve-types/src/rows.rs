//! Typed response rows and their column accumulators.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Column, Frame, VolcurveError};

/// Bar column labels, in output order.
pub mod bar_columns {
    /// Opening price.
    pub const OPEN: &str = "OPEN";
    /// Highest price.
    pub const HIGH: &str = "HIGH";
    /// Lowest price.
    pub const LOW: &str = "LOW";
    /// Closing price.
    pub const CLOSE: &str = "CLOSE";
    /// Number of events in the bar.
    pub const NUM_EVENTS: &str = "numEvents";
    /// Traded volume.
    pub const VOLUME: &str = "VOLUME";
    /// Traded value.
    pub const VALUE: &str = "VALUE";

    /// All bar columns.
    pub const ALL: [&str; 7] = [OPEN, HIGH, LOW, CLOSE, NUM_EVENTS, VOLUME, VALUE];
}

/// A single intraday tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRow {
    /// Event time (local wall clock).
    pub time: NaiveDateTime,
    /// Event type reported by the gateway (e.g., "TRADE").
    pub event_type: String,
    /// Price.
    pub value: f64,
    /// Size.
    pub size: i64,
    /// Condition codes, when requested and present.
    pub condition_codes: Option<String>,
}

/// A single intraday bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarRow {
    /// Bar start time (local wall clock).
    pub time: NaiveDateTime,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Number of events in the bar.
    pub num_events: i64,
    /// Traded volume.
    pub volume: i64,
    /// Traded value.
    pub value: f64,
}

/// Column-oriented tick accumulator and table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickTable {
    /// Event times.
    pub index: Vec<NaiveDateTime>,
    /// Sizes.
    pub size: Vec<i64>,
    /// Prices.
    pub price: Vec<f64>,
    /// Event types.
    pub event_type: Vec<String>,
    /// Condition codes; populated only when requested.
    pub condition_codes: Option<Vec<Option<String>>>,
}

impl TickTable {
    /// Creates an empty table, optionally tracking condition codes.
    #[must_use]
    pub const fn new(with_condition_codes: bool) -> Self {
        Self {
            index: Vec::new(),
            size: Vec::new(),
            price: Vec::new(),
            event_type: Vec::new(),
            condition_codes: if with_condition_codes {
                Some(Vec::new())
            } else {
                None
            },
        }
    }

    /// Appends a row.
    pub fn push(&mut self, row: TickRow) {
        self.index.push(row.time);
        self.size.push(row.size);
        self.price.push(row.value);
        self.event_type.push(row.event_type);
        if let Some(codes) = self.condition_codes.as_mut() {
            codes.push(row.condition_codes);
        }
    }

    /// Returns the number of ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the table has no ticks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates over rows.
    pub fn rows(&self) -> impl Iterator<Item = TickRow> + '_ {
        (0..self.len()).map(|i| TickRow {
            time: self.index[i],
            event_type: self.event_type[i].clone(),
            value: self.price[i],
            size: self.size[i],
            condition_codes: self
                .condition_codes
                .as_ref()
                .and_then(|codes| codes[i].clone()),
        })
    }
}

/// Column-oriented bar accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarColumns {
    index: Vec<NaiveDateTime>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    num_events: Vec<i64>,
    volume: Vec<i64>,
    value: Vec<f64>,
}

impl BarColumns {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bar.
    pub fn push(&mut self, bar: BarRow) {
        self.index.push(bar.time);
        self.open.push(bar.open);
        self.high.push(bar.high);
        self.low.push(bar.low);
        self.close.push(bar.close);
        self.num_events.push(bar.num_events);
        self.volume.push(bar.volume);
        self.value.push(bar.value);
    }

    /// Returns the number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no bars were accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Assembles the bars into a timestamp-indexed frame.
    ///
    /// # Errors
    ///
    /// Only fails if the accumulator's columns were built inconsistently.
    pub fn into_frame(self) -> Result<Frame<NaiveDateTime>, VolcurveError> {
        let floats = |v: Vec<f64>| -> Vec<Option<f64>> { v.into_iter().map(Some).collect() };
        #[allow(clippy::cast_precision_loss)]
        let ints =
            |v: Vec<i64>| -> Vec<Option<f64>> { v.into_iter().map(|x| Some(x as f64)).collect() };

        Frame::from_columns(
            self.index,
            vec![
                Column::new(bar_columns::OPEN, floats(self.open)),
                Column::new(bar_columns::HIGH, floats(self.high)),
                Column::new(bar_columns::LOW, floats(self.low)),
                Column::new(bar_columns::CLOSE, floats(self.close)),
                Column::new(bar_columns::NUM_EVENTS, ints(self.num_events)),
                Column::new(bar_columns::VOLUME, ints(self.volume)),
                Column::new(bar_columns::VALUE, floats(self.value)),
            ],
        )
    }
}
