/// One logical recurring download stream: the exact tag filter and sort key
/// used in the query. Compared case-sensitively, no normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySignature {
    pub tags: String,
    pub sort: String,
}

impl QuerySignature {
    pub fn new(tags: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            tags: tags.into(),
            sort: sort.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One page request against the listing API.
#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub signature: QuerySignature,
    pub limit: usize,
    pub offset: u64,
    pub order: SortOrder,
    pub license: Option<String>,
}
