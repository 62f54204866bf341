//! Client-side filtering, sorting and pagination of article lists.
//!
//! [`shape`] is pure: it never mutates the input, never fails, and returns
//! borrowed views in display order.

mod collate;

pub use collate::collate;

use serde::{Deserialize, Serialize};

use crate::models::{ArticleSummary, Id};

/// Sort orders offered by listing pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    TitleAsc,
    TitleDesc,
    AuthorAsc,
    AuthorDesc,
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SortBy::Newest => "newest",
            SortBy::Oldest => "oldest",
            SortBy::TitleAsc => "title_asc",
            SortBy::TitleDesc => "title_desc",
            SortBy::AuthorAsc => "author_asc",
            SortBy::AuthorDesc => "author_desc",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "newest" => Ok(SortBy::Newest),
            "oldest" => Ok(SortBy::Oldest),
            "title_asc" => Ok(SortBy::TitleAsc),
            "title_desc" => Ok(SortBy::TitleDesc),
            "author_asc" => Ok(SortBy::AuthorAsc),
            "author_desc" => Ok(SortBy::AuthorDesc),
            _ => Err(format!("Unknown sort order: {}", s)),
        }
    }
}

/// Filter and sort state of a list view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleFilter {
    pub search: Option<String>,
    pub category_id: Option<Id>,
    pub tag_id: Option<Id>,
    #[serde(default)]
    pub sort_by: SortBy,
}

/// One page of a shaped list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapedPage<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub total_pages: usize,
    /// Requested page after clamping
    pub page: usize,
    pub page_size: usize,
}

impl<T> ShapedPage<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ShapedPage<U> {
        ShapedPage {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            total_pages: self.total_pages,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Filter, sort and slice `items` into the requested page.
///
/// Steps run in a fixed order: title search, category, tag, stable sort,
/// then pagination. Pages are 1-based and clamped into range; a page size of
/// zero is treated as one.
pub fn shape<'a>(
    items: &'a [ArticleSummary],
    filter: &ArticleFilter,
    page: usize,
    page_size: usize,
) -> ShapedPage<&'a ArticleSummary> {
    let page_size = page_size.max(1);

    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut filtered: Vec<&ArticleSummary> = items
        .iter()
        .filter(|a| match &needle {
            Some(n) => a.title.to_lowercase().contains(n.as_str()),
            None => true,
        })
        .filter(|a| match &filter.category_id {
            Some(id) => a.in_category(id),
            None => true,
        })
        .filter(|a| match &filter.tag_id {
            Some(id) => a.has_tag(id),
            None => true,
        })
        .collect();

    sort_articles(&mut filtered, filter.sort_by);

    let total_count = filtered.len();
    let total_pages = total_count.div_ceil(page_size);
    let page = page.clamp(1, total_pages.max(1));

    let start = (page - 1) * page_size;
    let items = filtered.into_iter().skip(start).take(page_size).collect();

    ShapedPage {
        items,
        total_count,
        total_pages,
        page,
        page_size,
    }
}

/// Stable sort so equal keys keep their incoming order
fn sort_articles(items: &mut [&ArticleSummary], sort_by: SortBy) {
    match sort_by {
        SortBy::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortBy::Oldest => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortBy::TitleAsc => items.sort_by(|a, b| collate(&a.title, &b.title)),
        SortBy::TitleDesc => items.sort_by(|a, b| collate(&b.title, &a.title)),
        SortBy::AuthorAsc => {
            items.sort_by(|a, b| collate(&a.author.full_name(), &b.author.full_name()))
        }
        SortBy::AuthorDesc => {
            items.sort_by(|a, b| collate(&b.author.full_name(), &a.author.full_name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleStatus, Author, NamedRef};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn article(n: i64, title: &str) -> ArticleSummary {
        ArticleSummary {
            id: Id::Number(n),
            title: title.to_string(),
            excerpt: String::new(),
            author: Author::default(),
            category: None,
            tags: Vec::new(),
            status: ArticleStatus::Published,
            created_at: base_time() + Duration::hours(n),
            updated_at: base_time() + Duration::hours(n),
        }
    }

    fn numbered(count: i64) -> Vec<ArticleSummary> {
        (0..count).map(|n| article(n, &format!("Story {n}"))).collect()
    }

    fn ids(page: &ShapedPage<&ArticleSummary>) -> Vec<String> {
        page.items.iter().map(|a| a.id.to_string()).collect()
    }

    fn titles(page: &ShapedPage<&ArticleSummary>) -> Vec<String> {
        page.items.iter().map(|a| a.title.clone()).collect()
    }

    fn oldest_first() -> ArticleFilter {
        ArticleFilter {
            sort_by: SortBy::Oldest,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input() {
        let page = shape(&[], &ArticleFilter::default(), 1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_pagination_slices() {
        let items = numbered(25);
        let filter = oldest_first();

        let first = shape(&items, &filter, 1, 10);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_count, 25);
        assert_eq!(ids(&first), (0..10).map(|n| n.to_string()).collect::<Vec<_>>());
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last = shape(&items, &filter, 3, 10);
        assert_eq!(ids(&last), (20..25).map(|n| n.to_string()).collect::<Vec<_>>());
        assert!(!last.has_next());
    }

    #[test]
    fn test_page_is_clamped() {
        let items = numbered(25);
        let filter = oldest_first();

        let low = shape(&items, &filter, 0, 10);
        assert_eq!(low.page, 1);
        assert_eq!(ids(&low)[0], "0");

        let high = shape(&items, &filter, 99, 10);
        assert_eq!(high.page, 3);
        assert_eq!(high.items.len(), 5);
    }

    #[test]
    fn test_zero_page_size_is_one() {
        let items = numbered(3);
        let page = shape(&items, &oldest_first(), 2, 0);
        assert_eq!(page.page_size, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(ids(&page), vec!["1"]);
    }

    #[test]
    fn test_newest_is_default_order() {
        let items = numbered(3);
        let page = shape(&items, &ArticleFilter::default(), 1, 10);
        assert_eq!(ids(&page), vec!["2", "1", "0"]);
    }

    #[test]
    fn test_search_is_case_insensitive_on_title() {
        let items = vec![
            article(1, "City Council Votes"),
            article(2, "Weather"),
            article(3, "council budget"),
        ];
        let filter = ArticleFilter {
            search: Some("  COUNCIL ".to_string()),
            sort_by: SortBy::Oldest,
            ..Default::default()
        };
        let page = shape(&items, &filter, 1, 10);
        assert_eq!(ids(&page), vec!["1", "3"]);

        let blank = ArticleFilter {
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(shape(&items, &blank, 1, 10).total_count, 3);
    }

    #[test]
    fn test_category_matches_number_and_string_ids() {
        let mut a = article(1, "A");
        a.category = Some(NamedRef {
            id: Id::Number(3),
            name: "Politics".to_string(),
        });
        let mut b = article(2, "B");
        b.category = Some(NamedRef {
            id: Id::Text("3".to_string()),
            name: "Politics".to_string(),
        });
        let mut c = article(3, "C");
        c.category = Some(NamedRef {
            id: Id::Number(4),
            name: "Sport".to_string(),
        });
        let d = article(4, "D");

        let items = vec![a, b, c, d];
        let filter = ArticleFilter {
            category_id: Some(Id::Number(3)),
            sort_by: SortBy::Oldest,
            ..Default::default()
        };
        assert_eq!(ids(&shape(&items, &filter, 1, 10)), vec!["1", "2"]);
    }

    #[test]
    fn test_tag_filter() {
        let mut a = article(1, "A");
        a.tags = vec![
            NamedRef {
                id: Id::Number(7),
                name: "local".to_string(),
            },
            NamedRef {
                id: Id::Text("9".to_string()),
                name: "council".to_string(),
            },
        ];
        let b = article(2, "B");
        let items = vec![a, b];

        let filter = ArticleFilter {
            tag_id: Some(Id::from("9")),
            ..Default::default()
        };
        assert_eq!(ids(&shape(&items, &filter, 1, 10)), vec!["1"]);
    }

    #[test]
    fn test_title_sort_is_case_insensitive() {
        let items = vec![
            article(1, "Banana"),
            article(2, "apple"),
            article(3, "Cherry"),
        ];
        let asc = ArticleFilter {
            sort_by: SortBy::TitleAsc,
            ..Default::default()
        };
        assert_eq!(titles(&shape(&items, &asc, 1, 10)), vec!["apple", "Banana", "Cherry"]);

        let desc = ArticleFilter {
            sort_by: SortBy::TitleDesc,
            ..Default::default()
        };
        assert_eq!(titles(&shape(&items, &desc, 1, 10)), vec!["Cherry", "Banana", "apple"]);
    }

    #[test]
    fn test_author_sort_uses_trimmed_full_name() {
        let mut a = article(1, "A");
        a.author.first_name = "zoe".to_string();
        let mut b = article(2, "B");
        b.author.first_name = " ".to_string();
        b.author.last_name = "Adams".to_string();
        let mut c = article(3, "C");
        c.author.first_name = "Mia".to_string();
        c.author.last_name = "Berg".to_string();

        let items = vec![a, b, c];
        let filter = ArticleFilter {
            sort_by: SortBy::AuthorAsc,
            ..Default::default()
        };
        assert_eq!(ids(&shape(&items, &filter, 1, 10)), vec!["2", "3", "1"]);

        let filter = ArticleFilter {
            sort_by: SortBy::AuthorDesc,
            ..Default::default()
        };
        assert_eq!(ids(&shape(&items, &filter, 1, 10)), vec!["1", "3", "2"]);
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let mut items = vec![article(1, "Same"), article(2, "same"), article(3, "Same")];
        for a in &mut items {
            a.created_at = base_time();
        }
        let newest = shape(&items, &ArticleFilter::default(), 1, 10);
        assert_eq!(ids(&newest), vec!["1", "2", "3"]);

        let items = vec![article(1, "Same"), article(2, "Same")];
        let by_title = ArticleFilter {
            sort_by: SortBy::TitleDesc,
            ..Default::default()
        };
        assert_eq!(ids(&shape(&items, &by_title, 1, 10)), vec!["1", "2"]);
    }

    #[test]
    fn test_input_is_untouched() {
        let items = numbered(5);
        let before = items.clone();
        let _ = shape(&items, &ArticleFilter::default(), 1, 2);
        assert_eq!(items, before);
    }

    #[test]
    fn test_sort_by_parse() {
        assert_eq!("title-asc".parse::<SortBy>(), Ok(SortBy::TitleAsc));
        assert_eq!("NEWEST".parse::<SortBy>(), Ok(SortBy::Newest));
        assert!("random".parse::<SortBy>().is_err());
        assert_eq!(SortBy::AuthorDesc.to_string(), "author_desc");
    }
}
