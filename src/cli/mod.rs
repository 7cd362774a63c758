use clap::{Parser, Subcommand};

mod errors;
mod handlers;
mod types;
mod validation;

pub use handlers::*;
pub use types::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start furnish as a service.
    Daemon {},

    /// Search the catalog and rank results for you
    Search {
        query: String,

        /// Number of results to request
        #[clap(short = 'n', long)]
        max_results: Option<usize>,

        /// Keep backend order (scores are still shown)
        #[clap(long, default_value = "false")]
        raw: bool,
    },

    /// Record that a result of a past search was opened
    Click {
        /// History entry id
        entry: String,

        /// Product id
        product: String,
    },

    /// Rank a JSON array of products read from stdin
    Rank {},

    /// Query, filter and category suggestions
    Suggest {
        #[clap(default_value = "")]
        partial: String,
    },

    /// Summary of your activity and preferences
    Insights {},

    /// Manage preferences
    Prefs {
        #[clap(subcommand)]
        action: PrefsArgs,
    },

    /// Manage the wishlist
    Wishlist {
        #[clap(subcommand)]
        action: WishlistArgs,
    },

    /// Manage the comparison list
    Compare {
        #[clap(subcommand)]
        action: CompareArgs,
    },

    /// Print search history, newest first
    History {
        #[clap(short, long)]
        limit: Option<usize>,
    },

    /// Export all personalization data as JSON
    Export {
        /// Output file. Printed to stdout when omitted.
        path: Option<String>,
    },

    /// Import data produced by `export`
    Import { path: String },

    /// Delete all personalization data
    Clear {
        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Check the search backend
    Health {},

    /// Dataset statistics from the search backend
    Analytics {},

    /// Catalog labels known to the search backend
    Catalog {
        #[clap(subcommand)]
        list: CatalogArgs,
    },
}
