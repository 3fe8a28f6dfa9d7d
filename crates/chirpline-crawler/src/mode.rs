//! Search and fetch mode enums

/// Which kind of search a credential performs - each has its own rate window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Keyword query search
    Keyword,
    /// User timeline search
    User,
}

impl SearchMode {
    /// Parse CLI/config string into enum
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "keyword" => Some(Self::Keyword),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// API endpoint path for this mode
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Keyword => "/search/tweets.json",
            Self::User => "/statuses/user_timeline.json",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Keyword => "keyword",
            Self::User => "user",
        })
    }
}

/// How the next fetch for a key is parameterized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    /// First fetch ever for the key: no boundary filters
    New,
    /// Backward pagination: walk below the most recent page
    Paging,
    /// Steady-state forward poll above the known ceiling
    Update,
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::Paging => "paging",
            Self::Update => "update",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_valid() {
        assert_eq!(SearchMode::from_name("keyword"), Some(SearchMode::Keyword));
        assert_eq!(SearchMode::from_name("user"), Some(SearchMode::User));
    }

    #[test]
    fn from_name_invalid() {
        assert_eq!(SearchMode::from_name("Keyword"), None);
        assert_eq!(SearchMode::from_name(""), None);
    }

    #[test]
    fn endpoints_differ() {
        assert_ne!(SearchMode::Keyword.endpoint(), SearchMode::User.endpoint());
    }
}
