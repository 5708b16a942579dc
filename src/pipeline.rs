//! Filter, sort and paginate over a row mapping.
//!
//! A row mapping is a vector of indices into the catalog. None of the functions here
//! copy records or touch any state, the model owns the mapping and decides when to
//! recompute it.

use std::cmp::Ordering;
use std::ops::Range;

use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed, CollatorPreferences};
use rayon::prelude::*;
use tracing::warn;

use crate::domain::{Record, SortKey};

/// Catalog indices of all records whose name, location or industry contains `term`,
/// ignoring case. The result keeps catalog order.
pub fn filter(catalog: &[Record], term: &str) -> Vec<usize> {
    let token = term.to_lowercase();
    if token.is_empty() {
        return (0..catalog.len()).collect();
    }
    catalog
        .par_iter()
        .enumerate()
        .filter(|(_, record)| matches(record, &token))
        .map(|(idx, _)| idx)
        .collect()
}

fn matches(record: &Record, token: &str) -> bool {
    record.name.to_lowercase().contains(token)
        || record.location.to_lowercase().contains(token)
        || record.industry.to_lowercase().contains(token)
}

/// Stable ascending sort of `rows` by the given field. `SortKey::None` keeps the
/// current order.
pub fn sort(catalog: &[Record], rows: &[usize], key: SortKey) -> Vec<usize> {
    let mut sorted = rows.to_vec();
    let field: fn(&Record) -> &str = match key {
        SortKey::None => return sorted,
        SortKey::Name => |r| r.name.as_str(),
        SortKey::Industry => |r| r.industry.as_str(),
    };
    let order = LocaleOrder::root();
    sorted.sort_by(|&a, &b| order.cmp(field(&catalog[a]), field(&catalog[b])));
    sorted
}

/// Unicode collation with the root locale at tertiary strength: accents and case
/// only decide between otherwise equal strings, lowercase first.
pub struct LocaleOrder {
    collator: Option<CollatorBorrowed<'static>>,
}

impl LocaleOrder {
    pub fn root() -> Self {
        let collator =
            match Collator::try_new(CollatorPreferences::default(), CollatorOptions::default()) {
                Ok(collator) => Some(collator),
                Err(e) => {
                    warn!("No collation data, sorting by code point: {e}");
                    None
                }
            };
        Self { collator }
    }

    pub fn cmp(&self, a: &str, b: &str) -> Ordering {
        match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => a.cmp(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub current: usize,
    pub total: usize,
    pub window: Range<usize>,
}

impl Page {
    pub fn has_previous(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total
    }
}

pub fn total_pages(nrows: usize, page_size: usize) -> usize {
    std::cmp::max(1, nrows.div_ceil(page_size))
}

pub fn clamp_page(page: usize, total: usize) -> usize {
    page.clamp(1, std::cmp::max(1, total))
}

/// Clamps `page` and returns the slice range of the rows shown on it.
pub fn paginate(nrows: usize, page: usize, page_size: usize) -> Page {
    let total = total_pages(nrows, page_size);
    let current = clamp_page(page, total);
    let begin = std::cmp::min((current - 1) * page_size, nrows);
    let end = std::cmp::min(begin + page_size, nrows);
    Page {
        current,
        total,
        window: begin..end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Record> {
        vec![
            Record::new("1", "Acme", "NY", "Tech"),
            Record::new("2", "Ball Co", "LA", "Retail"),
            Record::new("3", "Cadence", "NY", "Tech"),
        ]
    }

    fn names(catalog: &[Record], rows: &[usize]) -> Vec<String> {
        rows.iter().map(|&r| catalog[r].name.clone()).collect()
    }

    #[test]
    fn empty_term_matches_everything() {
        let c = catalog();
        assert_eq!(filter(&c, ""), vec![0, 1, 2]);
    }

    #[test]
    fn filter_is_case_insensitive_on_every_field() {
        let c = catalog();
        assert_eq!(names(&c, &filter(&c, "ny")), vec!["Acme", "Cadence"]);
        assert_eq!(names(&c, &filter(&c, "BALL")), vec!["Ball Co"]);
        assert_eq!(names(&c, &filter(&c, "reta")), vec!["Ball Co"]);
        assert!(filter(&c, "nowhere").is_empty());
    }

    #[test]
    fn filter_agrees_with_its_definition() {
        let c = catalog();
        for term in ["a", "C", "tech", "o", " ", "e", "xyz"] {
            let t = term.to_lowercase();
            let expected: Vec<usize> = c
                .iter()
                .enumerate()
                .filter(|(_, r)| {
                    r.name.to_lowercase().contains(&t)
                        || r.location.to_lowercase().contains(&t)
                        || r.industry.to_lowercase().contains(&t)
                })
                .map(|(i, _)| i)
                .collect();
            assert_eq!(filter(&c, term), expected, "term {term:?}");
        }
    }

    #[test]
    fn filter_is_idempotent() {
        let c = catalog();
        let once = filter(&c, "tech");
        let subset: Vec<Record> = once.iter().map(|&i| c[i].clone()).collect();
        let twice: Vec<usize> = filter(&subset, "tech").iter().map(|&i| once[i]).collect();
        assert_eq!(once, twice);
        assert_eq!(filter(&c, "tech"), once);
    }

    #[test]
    fn sort_none_keeps_order() {
        let c = catalog();
        assert_eq!(sort(&c, &[2, 0, 1], SortKey::None), vec![2, 0, 1]);
    }

    #[test]
    fn sort_by_industry_is_stable() {
        let c = catalog();
        let rows = sort(&c, &[0, 1, 2], SortKey::Industry);
        assert_eq!(names(&c, &rows), vec!["Ball Co", "Acme", "Cadence"]);

        let rows = sort(&c, &[2, 1, 0], SortKey::Industry);
        assert_eq!(names(&c, &rows), vec!["Ball Co", "Cadence", "Acme"]);
    }

    #[test]
    fn sort_by_name_is_a_permutation() {
        let c = vec![
            Record::new("1", "zeta", "", ""),
            Record::new("2", "Alpha", "", ""),
            Record::new("3", "beta", "", ""),
            Record::new("4", "Alpha", "x", ""),
        ];
        let rows = sort(&c, &[0, 1, 2, 3], SortKey::Name);
        assert_eq!(rows, vec![1, 3, 2, 0]);
        let mut check = rows.clone();
        check.sort_unstable();
        assert_eq!(check, vec![0, 1, 2, 3]);
    }

    #[test]
    fn locale_order_ignores_case_first() {
        let order = LocaleOrder::root();
        assert_eq!(order.cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(order.cmp("Zoo", "apple"), Ordering::Greater);
        assert_eq!(order.cmp("acme", "Acme"), Ordering::Less);
        assert_eq!(order.cmp("Acme", "Acme"), Ordering::Equal);
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let c: Vec<Record> = ["Zeta", "Émile", "Apex", "@Home", "3M", "émile"]
            .iter()
            .enumerate()
            .map(|(i, name)| Record::new(i.to_string(), *name, "", ""))
            .collect();
        let rows = sort(&c, &[0, 1, 2, 3, 4, 5], SortKey::Name);
        assert_eq!(
            names(&c, &rows),
            vec!["@Home", "3M", "Apex", "émile", "Émile", "Zeta"]
        );
    }

    #[test]
    fn total_pages_never_below_one() {
        assert_eq!(total_pages(0, 5), 1);
        assert_eq!(total_pages(5, 5), 1);
        assert_eq!(total_pages(6, 5), 2);
        assert_eq!(total_pages(12, 5), 3);
    }

    #[test]
    fn paginate_clamps_and_bounds_window() {
        for nrows in 0..23 {
            let total = total_pages(nrows, 5);
            for page in 0..10 {
                let p = paginate(nrows, page, 5);
                assert!(p.current >= 1 && p.current <= total);
                assert!(p.window.len() <= 5);
                assert!(p.window.end <= nrows);
            }
        }
        let p = paginate(12, 3, 5);
        assert_eq!(p.window, 10..12);
        assert!(p.has_previous());
        assert!(!p.has_next());

        let p = paginate(0, 1, 5);
        assert_eq!(p.window, 0..0);
        assert!(!p.has_previous() && !p.has_next());
    }
}
