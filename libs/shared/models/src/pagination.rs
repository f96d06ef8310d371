use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// `page`/`limit` query parameters shared by every list endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    /// `limit=20&offset=40` fragment for a PostgREST path.
    pub fn to_range_params(&self) -> String {
        format!("limit={}&offset={}", self.limit(), self.offset())
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: None, limit: None }
    }
}

/// List envelope: the items plus the pagination metadata the clients render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, query: &PageQuery) -> Self {
        let limit = query.limit();
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Self {
            items,
            total,
            page: query.page(),
            limit,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let q = PageQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 20);
        assert_eq!(q.offset(), 0);
        assert_eq!(q.to_range_params(), "limit=20&offset=0");
    }

    #[test]
    fn limit_is_clamped_and_offset_follows_page() {
        let q = PageQuery { page: Some(3), limit: Some(500) };
        assert_eq!(q.limit(), MAX_LIMIT);
        assert_eq!(q.offset(), 200);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let q = PageQuery { page: Some(0), limit: Some(-5) };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 20);
    }

    #[test]
    fn envelope_reports_total_pages() {
        let q = PageQuery { page: Some(1), limit: Some(20) };
        let page = Paginated::new(vec![1, 2, 3], 57, &q);
        assert_eq!(page.total, 57);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 3);
    }
}
