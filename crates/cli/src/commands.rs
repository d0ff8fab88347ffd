use clap::Subcommand;
use model::pagination::sort::SortSpec;

#[derive(Subcommand)]
pub enum Commands {
    /// Print the discovered field descriptors of one table or collection
    Discover {
        /// Connection string; the scheme selects the backend
        #[arg(long)]
        url: String,

        #[arg(long, help = "Table or collection name")]
        table: String,

        #[arg(long, help = "Documents sampled when inferring a collection's fields")]
        sample_size: Option<usize>,
    },
    /// List one page of a configured resource as `{data, total}`
    List {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Resource id from the config file")]
        resource: String,

        #[arg(long, help = "Filter as JSON: one spec or an array of specs")]
        filter: Option<String>,

        #[arg(long, help = "Sort key as `field` or `field:desc`; repeatable")]
        sort: Vec<SortSpec>,

        #[arg(long)]
        limit: Option<u64>,

        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Fetch one record by primary key
    Get {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Resource id from the config file")]
        resource: String,

        #[arg(long)]
        id: String,
    },
    /// Print the bounds of the resource's `min_max_columns`
    Bounds {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Resource id from the config file")]
        resource: String,
    },
    /// Check that a connection string opens
    Ping {
        #[arg(long)]
        url: String,
    },
}
