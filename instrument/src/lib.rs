//! Captures structured auction trace events into column tables.
//!
//! Every `tracing` event becomes one row in the table named after its target; each
//! event field becomes a column. Columns appear as fields are first seen, and rows
//! that lack a field get that column's default value.
//!
//! # Usage
//!
//! ```ignore
//! // In auction code:
//! tracing::info!(target: "auction_tick", tick, combined_size);
//!
//! // In a test:
//! let (trade, trace) = instrument::capture(|| auction.run(&market, &tree));
//! let ticks = trace.table("auction_tick").unwrap().to_dataframe()?;
//! ```

use std::cell::RefCell;
use std::collections::HashMap;

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

// === VALUES AND COLUMNS ===

#[derive(Debug, Clone, PartialEq)]
pub enum TraceValue {
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraceColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TraceColumn {
    /// A column shaped for `value`, holding `rows` defaults.
    fn defaults_for(value: &TraceValue, rows: usize) -> Self {
        match value {
            TraceValue::U64(_) => TraceColumn::U64(vec![0; rows]),
            TraceValue::I64(_) => TraceColumn::I64(vec![0; rows]),
            TraceValue::F64(_) => TraceColumn::F64(vec![0.0; rows]),
            TraceValue::Bool(_) => TraceColumn::Bool(vec![false; rows]),
            TraceValue::Str(_) => TraceColumn::Str(vec![String::new(); rows]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TraceColumn::U64(v) => v.len(),
            TraceColumn::I64(v) => v.len(),
            TraceColumn::F64(v) => v.len(),
            TraceColumn::Bool(v) => v.len(),
            TraceColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `value`, converting integers into a float column. Returns false on a type
    /// mismatch, leaving the row to be padded.
    fn push(&mut self, value: TraceValue) -> bool {
        match (self, value) {
            (TraceColumn::U64(v), TraceValue::U64(x)) => v.push(x),
            (TraceColumn::I64(v), TraceValue::I64(x)) => v.push(x),
            (TraceColumn::F64(v), TraceValue::F64(x)) => v.push(x),
            (TraceColumn::F64(v), TraceValue::U64(x)) => v.push(x as f64),
            (TraceColumn::F64(v), TraceValue::I64(x)) => v.push(x as f64),
            (TraceColumn::Bool(v), TraceValue::Bool(x)) => v.push(x),
            (TraceColumn::Str(v), TraceValue::Str(x)) => v.push(x),
            _ => return false,
        }
        true
    }

    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        match self {
            TraceColumn::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TraceColumn::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TraceColumn::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            TraceColumn::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            TraceColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }

    fn to_column(&self, name: &str) -> Column {
        match self {
            TraceColumn::U64(v) => Column::new(name.into(), v),
            TraceColumn::I64(v) => Column::new(name.into(), v),
            TraceColumn::F64(v) => Column::new(name.into(), v),
            TraceColumn::Bool(v) => Column::new(name.into(), v),
            TraceColumn::Str(v) => Column::new(name.into(), v),
        }
    }
}

// === TABLES ===

/// Rows recorded under one tracing target.
#[derive(Debug, Clone, Default)]
pub struct TraceTable {
    pub columns: HashMap<String, TraceColumn>,
    pub row_count: usize,
}

impl TraceTable {
    /// Append one row; columns missing from `fields` are padded with defaults.
    pub fn push_row(&mut self, fields: impl IntoIterator<Item = (String, TraceValue)>) {
        let rows = self.row_count;
        for (name, value) in fields {
            let column = self
                .columns
                .entry(name)
                .or_insert_with(|| TraceColumn::defaults_for(&value, rows));
            if column.len() == rows {
                column.push(value);
            }
        }
        self.row_count += 1;
        for column in self.columns.values_mut() {
            column.pad_to(self.row_count);
        }
    }

    pub fn u64_column(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            TraceColumn::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn f64_column(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            TraceColumn::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn str_column(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            TraceColumn::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut names: Vec<&String> = self.columns.keys().collect();
        names.sort();
        DataFrame::new(
            names
                .into_iter()
                .map(|name| self.columns[name].to_column(name))
                .collect(),
        )
    }
}

/// All tables captured so far, keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    pub tables: HashMap<String, TraceTable>,
}

impl TraceLog {
    pub fn table(&self, target: &str) -> Option<&TraceTable> {
        self.tables.get(target)
    }

    /// Rows recorded under `target`, zero if it never fired.
    pub fn row_count(&self, target: &str) -> usize {
        self.table(target).map_or(0, |t| t.row_count)
    }

    pub fn to_dataframes(&self) -> HashMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

thread_local! {
    static TRACE: RefCell<TraceLog> = RefCell::default();
}

// === SUBSCRIBER ===

#[derive(Default)]
struct FieldCollector {
    fields: Vec<(String, TraceValue)>,
}

impl FieldCollector {
    fn add(&mut self, field: &Field, value: TraceValue) {
        self.fields.push((field.name().to_string(), value));
    }
}

impl Visit for FieldCollector {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.add(field, TraceValue::U64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.add(field, TraceValue::I64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.add(field, TraceValue::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.add(field, TraceValue::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.add(field, TraceValue::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.add(field, TraceValue::Str(format!("{:?}", value)));
    }
}

/// Subscriber that appends every info-or-higher event to the thread-local [`TraceLog`].
/// Spans are ignored.
pub struct TraceSubscriber;

impl Subscriber for TraceSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);
        let target = event.metadata().target().to_string();
        TRACE.with(|t| {
            t.borrow_mut()
                .tables
                .entry(target)
                .or_default()
                .push_row(collector.fields);
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install [`TraceSubscriber`] as the global default. Later calls are no-ops.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(TraceSubscriber);
}

/// Take everything recorded on this thread.
pub fn drain() -> TraceLog {
    TRACE.with(|t| std::mem::take(&mut *t.borrow_mut()))
}

pub fn clear() {
    TRACE.with(|t| *t.borrow_mut() = TraceLog::default());
}

pub fn drain_to_dataframes() -> HashMap<String, DataFrame> {
    drain().to_dataframes()
}

/// Run `f` with [`TraceSubscriber`] as the thread's default and return what it traced.
/// Anything recorded earlier on this thread is discarded.
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, TraceLog) {
    clear();
    let result = tracing::subscriber::with_default(TraceSubscriber, f);
    (result, drain())
}
