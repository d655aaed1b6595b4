//! Collection and index layout of the durable store

use std::fmt;

/// A named record collection, backed by one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Stories,
    Users,
    OfflineActions,
    Subscriptions,
    Settings,
    CachedResponses,
}

impl Collection {
    pub const ALL: [Self; 6] = [
        Self::Stories,
        Self::Users,
        Self::OfflineActions,
        Self::Subscriptions,
        Self::Settings,
        Self::CachedResponses,
    ];

    /// Backing table name
    pub const fn table(self) -> &'static str {
        match self {
            Self::Stories => "stories",
            Self::Users => "users",
            Self::OfflineActions => "offline_actions",
            Self::Subscriptions => "subscriptions",
            Self::Settings => "settings",
            Self::CachedResponses => "cached_responses",
        }
    }

    /// Secondary indices declared for this collection
    pub const fn indices(self) -> &'static [Index] {
        match self {
            Self::Stories => &[Index::CreatedAt, Index::AuthorId],
            Self::OfflineActions => &[Index::Timestamp, Index::Synced],
            Self::CachedResponses => &[Index::CachedAt],
            Self::Users | Self::Subscriptions | Self::Settings => &[],
        }
    }

    /// Whether primary keys are generated by the store
    pub const fn auto_increment(self) -> bool {
        matches!(self, Self::OfflineActions)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A secondary index on one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    CreatedAt,
    AuthorId,
    Timestamp,
    Synced,
    CachedAt,
}

impl Index {
    /// Backing column name
    pub const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::AuthorId => "author_id",
            Self::Timestamp => "timestamp",
            Self::Synced => "synced",
            Self::CachedAt => "cached_at",
        }
    }

    pub const fn collection(self) -> Collection {
        match self {
            Self::CreatedAt | Self::AuthorId => Collection::Stories,
            Self::Timestamp | Self::Synced => Collection::OfflineActions,
            Self::CachedAt => Collection::CachedResponses,
        }
    }
}
