//! Assembly of report records from a top-level listing and its enrichment.
//!
//! Every top-level item yields exactly one record. Secondary data that failed
//! or came back empty is carried as [`Enrichment::Failed`] / [`Enrichment::Empty`]
//! so the report writer can still emit the row.

use crate::batch::BatchResult;
use crate::error::ItemFailure;

/// Secondary data attached to one top-level item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment<R> {
    Found(R),
    /// The secondary call succeeded but returned nothing.
    Empty,
    /// The secondary call failed; the note is meant for a report's notes column.
    Failed(String),
}

impl<R> Enrichment<R> {
    pub fn from_result<E: std::fmt::Display>(result: Result<R, ItemFailure<E>>) -> Self {
        match result {
            Ok(r) => Self::Found(r),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    pub fn found(&self) -> Option<&R> {
        match self {
            Self::Found(r) => Some(r),
            _ => None,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Failed(note) => Some(note),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(R) -> U) -> Enrichment<U> {
        match self {
            Self::Found(r) => Enrichment::Found(f(r)),
            Self::Empty => Enrichment::Empty,
            Self::Failed(note) => Enrichment::Failed(note),
        }
    }

    /// The found value, or `R::default()` for empty and failed items.
    pub fn unwrap_or_default(self) -> R
    where
        R: Default,
    {
        match self {
            Self::Found(r) => r,
            _ => R::default(),
        }
    }
}

impl<T> Enrichment<Vec<T>> {
    /// Treat an empty list as [`Enrichment::Empty`].
    pub fn or_empty(self) -> Self {
        match self {
            Self::Found(v) if v.is_empty() => Self::Empty,
            other => other,
        }
    }
}

/// Build one record per item of `result`, in input order.
pub fn assemble<W, R, E, Rec>(
    result: BatchResult<W, R, E>,
    mut build: impl FnMut(W, Enrichment<R>) -> Rec,
) -> Vec<Rec>
where
    E: std::fmt::Display,
{
    result
        .into_outcomes()
        .into_iter()
        .map(|o| build(o.item, Enrichment::from_result(o.result)))
        .collect()
}
