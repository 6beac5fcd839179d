use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// One window of an ordered result set.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    pub fn from_all(all: Vec<T>, p: Pagination) -> Self {
        let total = all.len();
        let items = all.into_iter().skip(p.offset).take(p.limit).collect();
        Self {
            items,
            total,
            limit: p.limit,
            offset: p.offset,
        }
    }
}
