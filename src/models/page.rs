/// Tasks shown per list page.
pub const PAGE_SIZE: u32 = 10;

/// Which page a client asked for through the `page` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(u32),
    Last,
}

impl PageRequest {
    /// Parse the raw query value. Missing or blank means the first page;
    /// anything other than a positive integer or `last` is rejected.
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") => Ok(PageRequest::Number(1)),
            Some("last") => Ok(PageRequest::Last),
            Some(value) => match value.parse::<u32>() {
                Ok(n) if n >= 1 => Ok(PageRequest::Number(n)),
                Ok(_) => Err("That page number is less than 1".to_string()),
                Err(_) => Err(format!("invalid page: {value}")),
            },
        }
    }

    /// Resolve against the page count, `None` when out of range.
    pub fn resolve(self, num_pages: u32) -> Option<u32> {
        match self {
            PageRequest::Last => Some(num_pages),
            PageRequest::Number(n) if n <= num_pages => Some(n),
            PageRequest::Number(_) => None,
        }
    }
}

/// Number of pages needed for `total` rows. An empty set still has one
/// (empty) page.
pub fn page_count(total: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    let pages = total.div_ceil(per_page).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// One page of a larger result set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> u32 {
        self.number + 1
    }

    pub fn previous_number(&self) -> u32 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}
