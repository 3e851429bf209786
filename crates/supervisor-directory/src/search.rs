//! Derived view computation.
//!
//! The view is recomputed from scratch on every change: a case-insensitive
//! substring filter over name, title, specialisation and email, followed by a
//! stable sort on name.

use std::cmp::Ordering;
use std::sync::Arc;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::Supervisor;

/// Check if a record matches the search term.
///
/// An empty term matches every record.
#[must_use]
pub fn matches(record: &Supervisor, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }

    let needle = term.to_lowercase();
    let contains = |field: &str| field.to_lowercase().contains(&needle);

    contains(record.name.as_str())
        || contains(record.title.as_str())
        || record.specialisation.as_deref().is_some_and(contains)
        || contains(record.email.as_str())
}

/// Compare two names for display order.
///
/// Names compare on their letters first, ignoring accents and case, so
/// `Ángela` sorts with the `A`s. Ties break on accents (unaccented first) and
/// then on case (lowercase first at the first differing character), which is
/// how the usual collation tables order them.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| folded(a).cmp(folded(b)))
        .then_with(|| compare_case(a, b))
}

fn base_letters(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
}

fn folded(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd().flat_map(char::to_lowercase)
}

fn compare_case(a: &str, b: &str) -> Ordering {
    for (x, y) in a.nfd().zip(b.nfd()) {
        if x == y {
            continue;
        }
        match (x.is_lowercase(), y.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    Ordering::Equal
}

/// Filter records by `term` and sort them by name.
///
/// The sort is stable, so records with equal names keep source order.
#[must_use]
pub fn filter_and_sort(records: &[Arc<Supervisor>], term: &str) -> Vec<Arc<Supervisor>> {
    let mut view: Vec<Arc<Supervisor>> = records
        .iter()
        .filter(|record| matches(record, term))
        .cloned()
        .collect();
    view.sort_by(|a, b| compare_names(&a.name, &b.name));
    view
}
