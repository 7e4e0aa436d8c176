//! Listing parameters: pagination, sort whitelisting and response metadata.

use std::collections::HashMap;

use serde::Serialize;
use shelf_kernel::Validator;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_SORT: &str = "id";

/// Sort keys a client may request. A leading `-` means descending.
pub const SORT_SAFELIST: &[&str] = &[
    "id", "title", "pages", "rating", "-id", "-title", "-pages", "-rating",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Title,
    Pages,
    Rating,
}

impl SortColumn {
    /// Column name as it appears in SQL. Only these literals ever reach a query.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Pages => "pages",
            Self::Rating => "rating",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A sort key resolved through the safelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Resolve `requested` against `safelist`; `None` if it is not listed or
    /// names no known column.
    pub fn resolve(requested: &str, safelist: &[&str]) -> Option<Self> {
        if !safelist.contains(&requested) {
            return None;
        }

        let (direction, key) = match requested.strip_prefix('-') {
            Some(key) => (SortDirection::Desc, key),
            None => (SortDirection::Asc, requested),
        };

        let column = match key {
            "id" => SortColumn::Id,
            "title" => SortColumn::Title,
            "pages" => SortColumn::Pages,
            "rating" => SortColumn::Rating,
            _ => return None,
        };

        Some(Self { column, direction })
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            column: SortColumn::Id,
            direction: SortDirection::Asc,
        }
    }
}

/// Validated pagination and ordering for one list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: SortOrder,
}

impl Filters {
    pub const fn limit(&self) -> i64 {
        self.page_size
    }

    pub const fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortOrder::default(),
        }
    }
}

/// Pagination summary returned next to a page of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

impl Metadata {
    /// Derive the summary; no matching records means an all-zero summary.
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 || page_size <= 0 {
            return Self::default();
        }

        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

/// Search criteria plus paging for the list endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListBooks {
    pub title: String,
    pub genres: Vec<String>,
    pub filters: Filters,
}

/// Read the list query string, recording every problem in `v`.
///
/// Returns `None` when anything failed; the caller must not touch the store then.
pub fn read_list_query(qs: &HashMap<String, String>, v: &mut Validator) -> Option<ListBooks> {
    let title = read_string(qs, "title", "");
    let genres = read_csv(qs, "genres");
    let page = read_int(qs, "page", DEFAULT_PAGE, v);
    let page_size = read_int(qs, "page_size", DEFAULT_PAGE_SIZE, v);
    let sort = read_string(qs, "sort", DEFAULT_SORT);

    validate_filters(v, page, page_size, &sort);
    let resolved = SortOrder::resolve(&sort, SORT_SAFELIST);

    match (v.valid(), resolved) {
        (true, Some(sort)) => Some(ListBooks {
            title,
            genres,
            filters: Filters {
                page,
                page_size,
                sort,
            },
        }),
        _ => None,
    }
}

/// Bounds checks for the raw paging values and sort key.
pub fn validate_filters(v: &mut Validator, page: i64, page_size: i64, sort: &str) {
    v.check(page > 0, "page", "must be greater than zero");
    v.check(page <= MAX_PAGE, "page", "must be a maximum of 10 million");
    v.check(page_size > 0, "page_size", "must be greater than zero");
    v.check(page_size <= MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");
    v.check(
        shelf_kernel::validator::permitted_value(sort, SORT_SAFELIST),
        "sort",
        "invalid sort value",
    );
}

fn read_string(qs: &HashMap<String, String>, key: &str, default: &str) -> String {
    match qs.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => default.to_string(),
    }
}

fn read_csv(qs: &HashMap<String, String>, key: &str) -> Vec<String> {
    match qs.get(key) {
        Some(value) if !value.is_empty() => value.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn read_int(qs: &HashMap<String, String>, key: &str, default: i64, v: &mut Validator) -> i64 {
    match qs.get(key) {
        Some(value) if !value.is_empty() => match value.parse::<i64>() {
            Ok(parsed) => parsed,
            Err(_) => {
                v.add_error(key, "must be an integer value");
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resolves_safelisted_keys() {
        assert_eq!(
            SortOrder::resolve("-rating", SORT_SAFELIST),
            Some(SortOrder {
                column: SortColumn::Rating,
                direction: SortDirection::Desc,
            })
        );
        assert_eq!(
            SortOrder::resolve("title", SORT_SAFELIST),
            Some(SortOrder {
                column: SortColumn::Title,
                direction: SortDirection::Asc,
            })
        );
    }

    #[test]
    fn rejects_keys_outside_safelist() {
        assert_eq!(SortOrder::resolve("bogus", SORT_SAFELIST), None);
        assert_eq!(SortOrder::resolve("id; DROP TABLE books", SORT_SAFELIST), None);
        // Listed in a caller's safelist but naming no column.
        assert_eq!(SortOrder::resolve("-authors", &["-authors"]), None);
        // A real column the caller did not allow.
        assert_eq!(SortOrder::resolve("pages", &["id"]), None);
    }

    #[test]
    fn offset_follows_page_math() {
        let filters = Filters {
            page: 3,
            page_size: 20,
            sort: SortOrder::default(),
        };
        assert_eq!(filters.limit(), 20);
        assert_eq!(filters.offset(), 40);
        assert_eq!(Filters::default().offset(), 0);
    }

    #[test]
    fn metadata_rounds_last_page_up() {
        assert_eq!(
            Metadata::calculate(41, 2, 20),
            Metadata {
                current_page: 2,
                page_size: 20,
                first_page: 1,
                last_page: 3,
                total_records: 41,
            }
        );
        assert_eq!(Metadata::calculate(40, 1, 20).last_page, 2);
    }

    #[test]
    fn metadata_is_zero_without_records() {
        assert_eq!(Metadata::calculate(0, 4, 20), Metadata::default());
    }

    #[test]
    fn defaults_apply_to_empty_query() {
        let mut v = Validator::new();
        let list = read_list_query(&HashMap::new(), &mut v).unwrap();
        assert!(v.valid());
        assert_eq!(list, ListBooks::default());
    }

    #[test]
    fn reads_all_parameters() {
        let mut v = Validator::new();
        let list = read_list_query(
            &query(&[
                ("title", "dune"),
                ("genres", "scifi,classic"),
                ("page", "2"),
                ("page_size", "5"),
                ("sort", "-pages"),
            ]),
            &mut v,
        )
        .unwrap();

        assert_eq!(list.title, "dune");
        assert_eq!(list.genres, vec!["scifi", "classic"]);
        assert_eq!(list.filters.page, 2);
        assert_eq!(list.filters.page_size, 5);
        assert_eq!(list.filters.sort.column, SortColumn::Pages);
        assert_eq!(list.filters.sort.direction, SortDirection::Desc);
    }

    #[test]
    fn bogus_sort_is_a_validation_error() {
        let mut v = Validator::new();
        assert!(read_list_query(&query(&[("sort", "bogus")]), &mut v).is_none());
        assert_eq!(v.errors()["sort"], "invalid sort value");
    }

    #[test]
    fn out_of_range_paging_is_reported() {
        let mut v = Validator::new();
        let parsed = read_list_query(
            &query(&[("page", "0"), ("page_size", "101")]),
            &mut v,
        );
        assert!(parsed.is_none());

        let errors = v.errors();
        assert_eq!(errors["page"], "must be greater than zero");
        assert_eq!(errors["page_size"], "must be a maximum of 100");
    }

    #[test]
    fn page_above_ten_million_is_reported() {
        let mut v = Validator::new();
        assert!(read_list_query(&query(&[("page", "10000001")]), &mut v).is_none());
        assert_eq!(v.errors()["page"], "must be a maximum of 10 million");

        let mut v = Validator::new();
        assert!(read_list_query(&query(&[("page", "10000000")]), &mut v).is_some());
    }

    #[test]
    fn non_numeric_page_is_reported() {
        let mut v = Validator::new();
        assert!(read_list_query(&query(&[("page", "two")]), &mut v).is_none());
        assert_eq!(v.errors()["page"], "must be an integer value");
    }
}
