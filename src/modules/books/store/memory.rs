use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{BookStore, StoreError, INITIAL_VERSION};
use crate::modules::books::filters::{Filters, Metadata, SortColumn, SortDirection, SortOrder};
use crate::modules::books::models::Book;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Book>,
}

/// Process-local book table with the same contract as the PostgreSQL store.
#[derive(Default)]
pub struct InMemoryBookStore {
    table: RwLock<Table>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lowercased alphanumeric words, the unit full-text matching works on.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// A query without any word matches nothing, like an empty tsquery.
fn title_matches(title: &str, query: &str) -> bool {
    let wanted: Vec<String> = tokens(query).collect();
    if wanted.is_empty() {
        return false;
    }
    let words: Vec<String> = tokens(title).collect();
    wanted.iter().all(|word| words.contains(word))
}

fn has_genres(book: &Book, genres: &[String]) -> bool {
    genres.iter().all(|genre| book.genres.contains(genre))
}

fn compare(a: &Book, b: &Book, sort: SortOrder) -> Ordering {
    let primary = match sort.column {
        SortColumn::Id => a.id.cmp(&b.id),
        SortColumn::Title => a.title.cmp(&b.title),
        SortColumn::Pages => a.pages.cmp(&b.pages),
        SortColumn::Rating => a.rating.total_cmp(&b.rating),
    };
    let primary = match sort.direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn insert(&self, book: &mut Book) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        table.next_id += 1;

        book.id = table.next_id;
        book.created_at = Some(OffsetDateTime::now_utc());
        book.version = INITIAL_VERSION;

        table.rows.insert(book.id, book.clone());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Book, StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        let table = self.table.read().await;
        table.rows.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update(&self, book: &mut Book) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let Some(stored) = table.rows.get_mut(&book.id) else {
            return Err(StoreError::EditConflict);
        };
        if stored.version != book.version {
            return Err(StoreError::EditConflict);
        }

        let created_at = stored.created_at;
        *stored = Book {
            created_at,
            version: book.version + 1,
            ..book.clone()
        };
        book.version = stored.version;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        let mut table = self.table.write().await;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn get_all(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Book>, Metadata), StoreError> {
        let table = self.table.read().await;

        let mut matching: Vec<&Book> = table
            .rows
            .values()
            .filter(|book| title.is_empty() || title_matches(&book.title, title))
            .filter(|book| has_genres(book, genres))
            .collect();
        matching.sort_by(|a, b| compare(a, b, filters.sort));

        let total_records = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(filters.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(filters.limit()).unwrap_or(0);

        let page: Vec<Book> = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        // Past the last page nothing comes back, so no total either.
        let total_records = if page.is_empty() { 0 } else { total_records };

        Ok((
            page,
            Metadata::calculate(total_records, filters.page, filters.page_size),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::filters::SORT_SAFELIST;
    use crate::modules::books::models::tests::dune;
    use crate::modules::books::pages::Pages;

    fn book(title: &str, genres: &[&str], pages: i32, rating: f64) -> Book {
        Book {
            title: title.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            pages: Pages(pages),
            rating,
            ..dune()
        }
    }

    async fn seeded() -> InMemoryBookStore {
        let store = InMemoryBookStore::new();
        for mut b in [
            book("Dune", &["scifi", "classic"], 412, 4.8),
            book("Dune Messiah", &["scifi"], 256, 4.1),
            book("Emma", &["classic", "romance"], 474, 4.1),
            book("The Hobbit", &["fantasy", "classic"], 310, 4.7),
        ] {
            store.insert(&mut b).await.unwrap();
        }
        store
    }

    fn sorted(key: &str) -> Filters {
        Filters {
            sort: SortOrder::resolve(key, SORT_SAFELIST).unwrap(),
            ..Filters::default()
        }
    }

    fn titles(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.title.as_str()).collect()
    }

    #[tokio::test]
    async fn insert_assigns_id_and_initial_version() {
        let store = InMemoryBookStore::new();
        let mut first = dune();
        let mut second = dune();
        store.insert(&mut first).await.unwrap();
        store.insert(&mut second).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.version, INITIAL_VERSION);
        assert!(first.created_at.is_some());
        assert_eq!(store.get(1).await.unwrap(), first);
    }

    #[tokio::test]
    async fn get_rejects_missing_and_non_positive_ids() {
        let store = seeded().await;
        assert!(matches!(store.get(0).await, Err(StoreError::NotFound)));
        assert!(matches!(store.get(-1).await, Err(StoreError::NotFound)));
        assert!(matches!(store.get(99).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let store = seeded().await;
        let mut book = store.get(1).await.unwrap();
        book.title = "Dune (40th anniversary)".to_string();

        store.update(&mut book).await.unwrap();
        assert_eq!(book.version, 2);

        let stored = store.get(1).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.title, "Dune (40th anniversary)");
    }

    #[tokio::test]
    async fn stale_version_is_an_edit_conflict() {
        let store = seeded().await;
        let mut winner = store.get(1).await.unwrap();
        let mut loser = winner.clone();

        winner.rating = 5.0;
        store.update(&mut winner).await.unwrap();

        loser.rating = 1.0;
        assert!(matches!(
            store.update(&mut loser).await,
            Err(StoreError::EditConflict)
        ));
        assert_eq!(loser.version, 1);

        let stored = store.get(1).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.rating, 5.0);
    }

    #[tokio::test]
    async fn update_of_deleted_row_conflicts() {
        let store = seeded().await;
        let mut book = store.get(2).await.unwrap();
        store.delete(2).await.unwrap();
        assert!(matches!(
            store.update(&mut book).await,
            Err(StoreError::EditConflict)
        ));
    }

    #[tokio::test]
    async fn delete_is_terminal() {
        let store = seeded().await;
        store.delete(3).await.unwrap();
        assert!(matches!(store.get(3).await, Err(StoreError::NotFound)));
        assert!(matches!(store.delete(3).await, Err(StoreError::NotFound)));
        assert!(matches!(store.delete(0).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn unfiltered_listing_returns_everything_in_order() {
        let store = seeded().await;
        let (books, metadata) = store.get_all("", &[], &sorted("-rating")).await.unwrap();

        // Emma and Dune Messiah tie on 4.1; id breaks the tie.
        assert_eq!(titles(&books), vec!["Dune", "The Hobbit", "Dune Messiah", "Emma"]);
        assert_eq!(metadata.total_records, 4);
        assert_eq!(metadata.last_page, 1);
    }

    #[tokio::test]
    async fn title_search_matches_whole_words() {
        let store = seeded().await;
        let (books, metadata) = store.get_all("dune", &[], &sorted("id")).await.unwrap();
        assert_eq!(titles(&books), vec!["Dune", "Dune Messiah"]);
        assert_eq!(metadata.total_records, 2);

        let (books, _) = store.get_all("messiah DUNE", &[], &sorted("id")).await.unwrap();
        assert_eq!(titles(&books), vec!["Dune Messiah"]);

        let (books, _) = store.get_all("Dun", &[], &sorted("id")).await.unwrap();
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn title_without_words_matches_nothing() {
        let store = seeded().await;
        let (books, metadata) = store.get_all("!!!", &[], &sorted("id")).await.unwrap();
        assert!(books.is_empty());
        assert_eq!(metadata, Metadata::default());
    }

    #[tokio::test]
    async fn genre_filter_requires_every_requested_genre() {
        let store = seeded().await;
        let wanted = vec!["classic".to_string(), "scifi".to_string()];
        let (books, _) = store.get_all("", &wanted, &sorted("id")).await.unwrap();
        assert_eq!(titles(&books), vec!["Dune"]);

        let wanted = vec!["classic".to_string()];
        let (books, _) = store.get_all("", &wanted, &sorted("-pages")).await.unwrap();
        assert_eq!(titles(&books), vec!["Emma", "Dune", "The Hobbit"]);
    }

    #[tokio::test]
    async fn pages_through_results_with_filtered_total() {
        let store = seeded().await;
        let filters = Filters {
            page: 2,
            page_size: 3,
            ..sorted("title")
        };
        let (books, metadata) = store.get_all("", &[], &filters).await.unwrap();

        assert_eq!(titles(&books), vec!["The Hobbit"]);
        assert_eq!(
            metadata,
            Metadata {
                current_page: 2,
                page_size: 3,
                first_page: 1,
                last_page: 2,
                total_records: 4,
            }
        );
    }

    #[tokio::test]
    async fn no_matches_yield_zero_metadata() {
        let store = seeded().await;
        let (books, metadata) = store.get_all("silmarillion", &[], &sorted("id")).await.unwrap();
        assert!(books.is_empty());
        assert_eq!(metadata, Metadata::default());
    }
}
