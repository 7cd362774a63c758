use clap::{Args as ClapArgs, Subcommand};
use furnish::preferences::{BudgetTier, Theme};

/// A product given inline or piped on stdin as JSON.
#[derive(ClapArgs, Debug, Clone)]
pub struct ProductArgs {
    /// Product JSON. Read from stdin when omitted.
    #[clap(long)]
    pub json: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PrefsArgs {
    /// Print stored preferences
    Show {},
    /// Update preferences. Only the given fields change.
    Set {
        /// Lowest acceptable price
        #[clap(long)]
        price_min: Option<f64>,

        /// Highest acceptable price
        #[clap(long)]
        price_max: Option<f64>,

        /// Comma separated categories
        #[clap(long)]
        categories: Option<String>,

        /// Comma separated brands
        #[clap(long)]
        brands: Option<String>,

        /// Comma separated materials
        #[clap(long)]
        materials: Option<String>,

        /// Comma separated colors
        #[clap(long)]
        colors: Option<String>,

        /// Comma separated styles
        #[clap(long)]
        styles: Option<String>,

        #[clap(long, value_enum)]
        budget: Option<BudgetTier>,

        /// Comma separated priorities, most important first
        #[clap(long)]
        priorities: Option<String>,

        #[clap(long)]
        notifications: Option<bool>,

        #[clap(long, value_enum)]
        theme: Option<Theme>,

        /// Match categories and brands against the backend catalog
        #[clap(long, default_value = "false")]
        check: bool,
    },
    /// Restore default preferences
    Reset {},
}

#[derive(Subcommand, Debug, Clone)]
pub enum WishlistArgs {
    /// Save a product
    Add {
        #[clap(flatten)]
        product: ProductArgs,
    },
    /// Remove a saved product
    Remove { id: String },
    /// Attach a note to a saved product
    Note { id: String, notes: String },
    /// Print every saved product
    List {},
    /// Print the most recently saved products
    Recent {
        #[clap(short = 'n', long, default_value = "5")]
        limit: usize,
    },
    /// Print saved products whose category contains the given text
    Category { category: String },
    /// Remove all saved products
    Clear {},
}

#[derive(Subcommand, Debug, Clone)]
pub enum CompareArgs {
    /// Add a product to the comparison (at most 4)
    Add {
        #[clap(flatten)]
        product: ProductArgs,
    },
    /// Remove a product from the comparison
    Remove { id: String },
    /// Print compared products
    List {},
    /// Print the feature by product table
    Matrix {},
    /// Suggest a search for products like the compared ones
    Similar {},
    /// Empty the comparison
    Clear {},
}

#[derive(Subcommand, Debug, Clone)]
pub enum CatalogArgs {
    /// Categories with their product counts
    Categories {},
    /// Brands with their product counts
    Brands {},
}
