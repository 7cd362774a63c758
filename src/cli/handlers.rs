use std::io::Read;

use furnish::{
    backend::CatalogLabels,
    config::Config,
    engine::PersonalizationEngine,
    preferences::{PriceRange, PreferencesUpdate},
    product::{Product, ProductId},
    service::{validate_search, SearchOpts, ShopService},
};
use inquire::error::InquireResult;
use serde::Serialize;

use super::{
    errors::{CliError, CliResult},
    types::{CatalogArgs, CompareArgs, PrefsArgs, ProductArgs, WishlistArgs},
    validation,
};

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_stdin() -> CliResult<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_product(args: ProductArgs) -> CliResult<Product> {
    let raw = match args.json {
        Some(json) => json,
        None => read_stdin()?,
    };

    let product: Product = serde_json::from_str(&raw)?;
    if product.id.as_str().is_empty() {
        return Err(CliError::validation("id", "Product id cannot be empty"));
    }
    Ok(product)
}

pub fn handle_search(
    service: &mut ShopService,
    config: &Config,
    query: String,
    max_results: Option<usize>,
    raw: bool,
) -> CliResult<()> {
    let max_results = max_results.unwrap_or(config.max_results);
    validate_search(&query, Some(max_results))?;

    let opts = SearchOpts {
        max_results: Some(max_results),
        personalize_filters: config.personalize_search,
        raw,
    };

    let results = service.search(&query, opts)?;
    print_json(&results)
}

pub fn handle_click(engine: &mut PersonalizationEngine, entry: String, product: String) -> CliResult<()> {
    let recorded = engine
        .search_context_mut()
        .record_click(&entry.as_str().into(), ProductId::from(product))?;

    if !recorded {
        return Err(CliError::not_found(format!("no history entry {entry}")));
    }
    println!("click recorded");
    Ok(())
}

pub fn handle_rank(engine: &PersonalizationEngine, mut input: impl Read) -> CliResult<()> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;

    let products: Vec<Product> = serde_json::from_str(&raw)?;
    print_json(&engine.rank(products))
}

pub fn handle_suggest(engine: &PersonalizationEngine, partial: String) -> CliResult<()> {
    print_json(&engine.smart_suggestions(&partial))
}

pub fn handle_insights(engine: &PersonalizationEngine) -> CliResult<()> {
    print_json(&engine.insights())
}

/// Replaces each label with its catalog spelling, refusing labels the
/// catalog does not list.
fn match_catalog(field: &str, labels: Vec<String>, catalog: &CatalogLabels) -> CliResult<Vec<String>> {
    let (known, unknown): (Vec<_>, Vec<_>) = labels
        .into_iter()
        .partition(|label| catalog.find(label).is_some());

    if !unknown.is_empty() {
        return Err(CliError::validation(
            field,
            format!("not in the catalog: {}", unknown.join(", ")),
        ));
    }

    Ok(known
        .iter()
        .filter_map(|label| catalog.find(label))
        .map(str::to_string)
        .collect())
}

pub fn handle_prefs(service: &mut ShopService, action: PrefsArgs) -> CliResult<()> {
    match action {
        PrefsArgs::Show {} => print_json(service.engine().preferences().get()),
        PrefsArgs::Reset {} => {
            let store = service.engine_mut().preferences_mut();
            store.reset()?;
            print_json(store.get())
        }
        PrefsArgs::Set {
            price_min,
            price_max,
            categories,
            brands,
            materials,
            colors,
            styles,
            budget,
            priorities,
            notifications,
            theme,
            check,
        } => {
            let price_range = match (price_min, price_max) {
                (None, None) => None,
                (min, max) => {
                    let current = service.engine().preferences().get().price_range;
                    let range = PriceRange {
                        min: min.unwrap_or(current.min),
                        max: max.unwrap_or(current.max),
                    };
                    validation::validate_price_range(range.min, range.max)?;
                    Some(range)
                }
            };

            let labels = |field: &str, value: Option<String>| -> CliResult<Option<Vec<String>>> {
                match value {
                    Some(value) => {
                        let list = validation::parse_list(&value);
                        validation::validate_labels(field, &list)?;
                        Ok(Some(list))
                    }
                    None => Ok(None),
                }
            };

            let mut categories = labels("categories", categories)?;
            let mut brands = labels("brands", brands)?;
            if check {
                if let Some(list) = categories.take() {
                    categories = Some(match_catalog("categories", list, &service.categories()?)?);
                }
                if let Some(list) = brands.take() {
                    brands = Some(match_catalog("brands", list, &service.brands()?)?);
                }
            }

            let update = PreferencesUpdate {
                price_range,
                categories,
                brands,
                materials: labels("materials", materials)?,
                colors: labels("colors", colors)?,
                styles: labels("styles", styles)?,
                budget,
                priorities: labels("priorities", priorities)?,
                notifications,
                theme,
            };

            if update.is_empty() {
                println!("This update request does nothing");
                return Ok(());
            }

            let prefs = service.engine_mut().preferences_mut().update(update)?;
            print_json(prefs)
        }
    }
}

pub fn handle_wishlist(engine: &mut PersonalizationEngine, action: WishlistArgs) -> CliResult<()> {
    let wishlist = engine.wishlist_mut();

    match action {
        WishlistArgs::Add { product } => {
            let product = read_product(product)?;
            if wishlist.add(&product)? {
                println!("{} added to wishlist", product.id);
            } else {
                println!("{} is already in the wishlist", product.id);
            }
            Ok(())
        }
        WishlistArgs::Remove { id } => {
            if !wishlist.remove(&ProductId::from(id.clone()))? {
                return Err(CliError::not_found(format!("{id} is not in the wishlist")));
            }
            println!("{id} removed from wishlist");
            Ok(())
        }
        WishlistArgs::Note { id, notes } => {
            if !wishlist.set_note(&ProductId::from(id.clone()), &notes)? {
                return Err(CliError::not_found(format!("{id} is not in the wishlist")));
            }
            println!("note saved");
            Ok(())
        }
        WishlistArgs::List {} => print_json(wishlist.list()),
        WishlistArgs::Recent { limit } => print_json(&wishlist.recent(limit)),
        WishlistArgs::Category { category } => print_json(&wishlist.by_category(&category)),
        WishlistArgs::Clear {} => {
            let count = wishlist.len();
            wishlist.clear()?;
            println!("{count} items removed");
            Ok(())
        }
    }
}

pub fn handle_compare(engine: &mut PersonalizationEngine, action: CompareArgs) -> CliResult<()> {
    let comparison = engine.comparison_mut();

    match action {
        CompareArgs::Add { product } => {
            let product = read_product(product)?;
            let outcome = comparison.add(&product);
            print_json(&outcome)
        }
        CompareArgs::Remove { id } => {
            if !comparison.remove(&ProductId::from(id.clone()))? {
                return Err(CliError::not_found(format!("{id} is not being compared")));
            }
            println!("{id} removed from comparison");
            Ok(())
        }
        CompareArgs::List {} => print_json(comparison.list()),
        CompareArgs::Matrix {} => match comparison.matrix() {
            Some(matrix) => print_json(&matrix),
            None => {
                println!("Add at least 2 products to compare");
                Ok(())
            }
        },
        CompareArgs::Similar {} => match comparison.suggest_similar() {
            Some(similar) => print_json(&similar),
            None => {
                println!("Comparison is empty");
                Ok(())
            }
        },
        CompareArgs::Clear {} => {
            comparison.clear()?;
            println!("comparison cleared");
            Ok(())
        }
    }
}

pub fn handle_history(engine: &PersonalizationEngine, limit: Option<usize>) -> CliResult<()> {
    let history = engine.search_context().history();
    let limit = limit.unwrap_or(history.len());
    print_json(&history[..limit.min(history.len())])
}

pub fn handle_export(engine: &PersonalizationEngine, path: Option<String>) -> CliResult<()> {
    let blob = engine.export_json()?;

    match path {
        Some(path) => {
            std::fs::write(&path, blob)?;
            println!("exported to {path}");
        }
        None => println!("{blob}"),
    }
    Ok(())
}

pub fn handle_import(engine: &mut PersonalizationEngine, path: String) -> CliResult<()> {
    let blob = std::fs::read_to_string(&path)?;
    let report = engine.import_all(&blob);

    if !report.success {
        return Err(CliError::invalid_input(report.message));
    }
    println!("{}", report.message);
    Ok(())
}

pub fn handle_clear(engine: &mut PersonalizationEngine, yes: bool) -> CliResult<()> {
    if !yes {
        match inquire::prompt_confirmation(
            "This removes preferences, history, wishlist and comparison. Are you sure?",
        ) {
            InquireResult::Ok(true) => {}
            InquireResult::Ok(false) => return Err(CliError::UserCancelled),
            InquireResult::Err(err) => {
                return Err(CliError::invalid_input(format!("An error occurred: {err}")))
            }
        }
    }

    engine.clear_all()?;
    println!("all personalization data removed");
    Ok(())
}

pub fn handle_health(service: &ShopService) -> CliResult<()> {
    print_json(&service.health()?)
}

pub fn handle_analytics(service: &ShopService) -> CliResult<()> {
    print_json(&service.analytics()?)
}

pub fn handle_catalog(service: &ShopService, list: CatalogArgs) -> CliResult<()> {
    let labels = match list {
        CatalogArgs::Categories {} => service.categories()?,
        CatalogArgs::Brands {} => service.brands()?,
    };
    print_json(&labels)
}
