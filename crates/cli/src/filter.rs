use tablemap::{KeyFilter, KeyRange};

/// Key predicates shared by the `query` and `delete` commands.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct FilterArgs {
    /// Exact partition key
    #[arg(long, short = 'p', conflicts_with_all = ["partition_from", "partition_to"])]
    pub partition: Option<String>,

    /// Lowest partition key, inclusive
    #[arg(long)]
    pub partition_from: Option<String>,

    /// Highest partition key, inclusive
    #[arg(long)]
    pub partition_to: Option<String>,

    /// Exact row key
    #[arg(long, short = 'r', conflicts_with_all = ["row_from", "row_to"])]
    pub row: Option<String>,

    /// Lowest row key, inclusive
    #[arg(long)]
    pub row_from: Option<String>,

    /// Highest row key, inclusive
    #[arg(long)]
    pub row_to: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> KeyFilter {
        KeyFilter {
            partition: range(&self.partition, &self.partition_from, &self.partition_to),
            row: range(&self.row, &self.row_from, &self.row_to),
        }
    }
}

fn range(exact: &Option<String>, lower: &Option<String>, upper: &Option<String>) -> KeyRange {
    match exact {
        Some(key) => KeyRange::exact(key.clone()),
        None => KeyRange {
            lower: lower.clone(),
            upper: upper.clone(),
        },
    }
}
