//! Ordering and windowing for list endpoints.
//!
//! Items are sorted ascending by the requested key with the numeric id as a
//! tie breaker, so a descending listing is the exact reverse of the ascending one.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::errors::ServiceError;

/// A comparable projection of one sort column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Time(DateTime<Utc>),
}

/// Implemented by list items that can be ordered by a named key.
pub trait Sortable {
    /// Keys accepted in `orderby`.
    const SORT_KEYS: &'static [&'static str];
    /// Key used when `orderby` is absent or unknown.
    const DEFAULT_KEY: &'static str;

    fn sort_value(&self, key: &str) -> SortValue;
    fn tie_breaker(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Validated pagination and sort parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub order_by: Option<String>,
    pub sort_order: SortOrder,
    pub limit: Option<usize>,
    /// Number of items skipped.
    pub offset: usize,
}

fn parse_positive(name: &str, raw: &str) -> Result<usize, ServiceError> {
    let v: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ServiceError::BadRequest(format!("{name} must be an integer")))?;
    if v < 1 {
        return Err(ServiceError::BadRequest(format!("{name} must be a positive integer")));
    }
    usize::try_from(v).map_err(|_| ServiceError::BadRequest(format!("{name} is out of range")))
}

impl PageRequest {
    /// Parse raw query values. Malformed numbers reject the request instead of clamping.
    pub fn parse(
        order_by: Option<&str>,
        sort_order: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
        page: Option<&str>,
    ) -> Result<Self, ServiceError> {
        let sort_order = match sort_order.map(|s| s.trim().to_ascii_lowercase()) {
            None => SortOrder::Asc,
            Some(s) if s == "asc" => SortOrder::Asc,
            Some(s) if s == "desc" => SortOrder::Desc,
            Some(s) => return Err(ServiceError::BadRequest(format!("sortOrder must be 'asc' or 'desc', got '{s}'"))),
        };
        let limit = limit.map(|l| parse_positive("limit", l)).transpose()?;

        let from_offset = offset.map(|o| parse_positive("offset", o)).transpose()?;
        let from_page = page.map(|p| parse_positive("page", p)).transpose()?;
        if (from_offset.is_some() || from_page.is_some()) && limit.is_none() {
            return Err(ServiceError::BadRequest("offset and page require limit".into()));
        }
        let page_offset = match (from_page, limit) {
            (Some(p), Some(l)) => Some(
                (p - 1)
                    .checked_mul(l)
                    .ok_or_else(|| ServiceError::BadRequest("page is out of range".into()))?,
            ),
            _ => None,
        };
        let offset = match (from_offset, page_offset) {
            (Some(o), Some(p)) if o != p => {
                return Err(ServiceError::BadRequest("offset and page select different windows".into()))
            }
            (Some(o), _) => o,
            (None, Some(p)) => p,
            (None, None) => 0,
        };

        Ok(Self {
            order_by: order_by.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            sort_order,
            limit,
            offset,
        })
    }

    fn effective_key<T: Sortable>(&self) -> &str {
        match self.order_by.as_deref() {
            Some(k) if T::SORT_KEYS.contains(&k) => k,
            Some(k) => {
                warn!(orderby = %k, fallback = T::DEFAULT_KEY, "unknown orderby key");
                T::DEFAULT_KEY
            }
            None => T::DEFAULT_KEY,
        }
    }

    /// Sort, then cut the requested window out of `items`.
    pub fn apply<T: Sortable>(&self, mut items: Vec<T>) -> Vec<T> {
        let key = self.effective_key::<T>().to_string();
        items.sort_by_cached_key(|it| (it.sort_value(&key), it.tie_breaker()));
        if self.sort_order == SortOrder::Desc {
            items.reverse();
        }
        let window = items.into_iter().skip(self.offset);
        match self.limit {
            Some(l) => window.take(l).collect(),
            None => window.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row { id: i32, name: &'static str }

    impl Sortable for Row {
        const SORT_KEYS: &'static [&'static str] = &["id", "name"];
        const DEFAULT_KEY: &'static str = "name";

        fn sort_value(&self, key: &str) -> SortValue {
            match key {
                "id" => SortValue::Int(self.id.into()),
                _ => SortValue::Text(self.name.to_string()),
            }
        }

        fn tie_breaker(&self) -> i64 { self.id.into() }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 3, name: "b" },
            Row { id: 1, name: "c" },
            Row { id: 2, name: "a" },
            Row { id: 4, name: "b" },
        ]
    }

    fn ids(rows: &[Row]) -> Vec<i32> { rows.iter().map(|r| r.id).collect() }

    #[test]
    fn desc_is_exact_reverse_of_asc_even_with_ties() {
        let asc = PageRequest::parse(Some("name"), None, None, None, None).unwrap().apply(rows());
        let mut desc = PageRequest::parse(Some("name"), Some("DESC"), None, None, None).unwrap().apply(rows());
        desc.reverse();
        assert_eq!(ids(&asc), vec![2, 3, 4, 1]);
        assert_eq!(asc, desc);
    }

    #[test]
    fn offset_and_page_select_same_window() {
        let by_offset = PageRequest::parse(Some("id"), None, Some("1"), Some("1"), None).unwrap();
        let by_page = PageRequest::parse(Some("id"), None, Some("1"), None, Some("2")).unwrap();
        assert_eq!(by_offset, by_page);
        assert_eq!(ids(&by_offset.apply(rows())), vec![2]);
        let both = PageRequest::parse(Some("id"), None, Some("2"), Some("2"), Some("2")).unwrap();
        assert_eq!(ids(&both.apply(rows())), vec![3, 4]);
    }

    #[test]
    fn malformed_parameters_are_rejected() {
        let bad: Vec<(Option<&str>, Option<&str>, Option<&str>, Option<&str>)> = vec![
            (None, Some("-2"), None, None),
            (None, Some("0"), None, None),
            (None, Some("ten"), None, None),
            (None, Some("1"), Some("0"), None),
            (None, Some("1"), None, Some("0")),
            (None, None, Some("1"), None),
            (None, None, None, Some("1")),
            (None, Some("1"), Some("3"), Some("2")),
            (Some("sideways"), None, None, None),
        ];
        for (order, limit, offset, page) in bad {
            let res = PageRequest::parse(None, order, limit, offset, page);
            assert!(matches!(res, Err(ServiceError::BadRequest(_))), "{order:?} {limit:?} {offset:?} {page:?}");
        }
    }

    #[test]
    fn unknown_orderby_falls_back_to_default_key() {
        let req = PageRequest::parse(Some("nope"), None, None, None, None).unwrap();
        assert_eq!(ids(&req.apply(rows())), vec![2, 3, 4, 1]);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let req = PageRequest::parse(None, None, Some("5"), None, Some("3")).unwrap();
        assert!(req.apply(rows()).is_empty());
    }
}
