use std::fmt;

/// Dashboard tabs, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Sessions,
    ActiveSql,
    TableStats,
    SqlQuery,
    Performance,
    Storage,
    Resources,
}

impl Tab {
    pub const ALL: [Tab; 8] = [
        Tab::Overview,
        Tab::Sessions,
        Tab::ActiveSql,
        Tab::TableStats,
        Tab::SqlQuery,
        Tab::Performance,
        Tab::Storage,
        Tab::Resources,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Sessions => "sessions",
            Tab::ActiveSql => "activesql",
            Tab::TableStats => "tablestats",
            Tab::SqlQuery => "sqlquery",
            Tab::Performance => "performance",
            Tab::Storage => "storage",
            Tab::Resources => "resources",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Sessions => "Sessions",
            Tab::ActiveSql => "Active SQL",
            Tab::TableStats => "Table Stats",
            Tab::SqlQuery => "SQL Query",
            Tab::Performance => "Performance",
            Tab::Storage => "Storage",
            Tab::Resources => "System Resources",
        }
    }

    pub fn from_id(id: &str) -> Option<Tab> {
        Tab::ALL.into_iter().find(|tab| tab.id() == id)
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    /// Tab for a 1-based number key.
    pub fn from_number(n: usize) -> Option<Tab> {
        n.checked_sub(1).and_then(|i| Tab::ALL.get(i).copied())
    }

    pub fn next(self) -> Tab {
        Tab::ALL
            .get((self.index() + 1) % Tab::ALL.len())
            .copied()
            .unwrap_or(Tab::Overview)
    }
}

/// Row limit for the active-SQL view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlLimit {
    Rows(u32),
    All,
}

impl SqlLimit {
    /// Value the collector understands as "no limit".
    pub const ALL_SENTINEL: u32 = 999_999;

    pub const CHOICES: [SqlLimit; 7] = [
        SqlLimit::Rows(10),
        SqlLimit::Rows(25),
        SqlLimit::Rows(50),
        SqlLimit::Rows(100),
        SqlLimit::Rows(200),
        SqlLimit::Rows(500),
        SqlLimit::All,
    ];

    pub fn value(self) -> u32 {
        match self {
            SqlLimit::Rows(n) => n,
            SqlLimit::All => Self::ALL_SENTINEL,
        }
    }

    /// Parse one of the offered choices: a listed number, `all` or the
    /// sentinel itself.
    pub fn parse(value: &str) -> Option<SqlLimit> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Some(SqlLimit::All);
        }
        let n: u32 = value.parse().ok()?;
        Self::CHOICES.into_iter().find(|c| c.value() == n)
    }

    fn position(self) -> usize {
        Self::CHOICES.iter().position(|c| *c == self).unwrap_or(0)
    }

    /// Next larger choice, saturating at `All`.
    pub fn larger(self) -> SqlLimit {
        Self::CHOICES
            .get(self.position() + 1)
            .copied()
            .unwrap_or(SqlLimit::All)
    }

    /// Next smaller choice, saturating at the smallest.
    pub fn smaller(self) -> SqlLimit {
        self.position()
            .checked_sub(1)
            .and_then(|i| Self::CHOICES.get(i).copied())
            .unwrap_or(self)
    }
}

impl Default for SqlLimit {
    fn default() -> Self {
        SqlLimit::Rows(50)
    }
}

impl fmt::Display for SqlLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlLimit::Rows(n) => write!(f, "{n}"),
            SqlLimit::All => f.write_str("ALL"),
        }
    }
}

/// Per-session view configuration. Never persisted, never stored in a
/// snapshot.
///
/// Changing the tab is plain state replacement. Changing the row limit
/// reports whether it changed so the caller can ask for a new metrics
/// fetch; the view itself never fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub tab: Tab,
    pub sql_limit: SqlLimit,
}

impl ViewState {
    pub fn new(tab: Tab, sql_limit: SqlLimit) -> Self {
        Self { tab, sql_limit }
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// Returns `true` when the limit actually changed.
    pub fn set_sql_limit(&mut self, limit: SqlLimit) -> bool {
        let changed = self.sql_limit != limit;
        self.sql_limit = limit;
        changed
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(Tab::Overview, SqlLimit::default())
    }
}
