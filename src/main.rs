use clap::Parser;
use furnish::{factory::AppFactory, web};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Command;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = cli::Args::parse();

    let paths = AppFactory::get_paths()?;
    let config = AppFactory::create_config(&paths)?;
    let mut service = AppFactory::create_service(&paths, &config)?;

    match args.command {
        Command::Daemon {} => {
            web::start_daemon(service, config)?;
        }
        Command::Search {
            query,
            max_results,
            raw,
        } => cli::handle_search(&mut service, &config, query, max_results, raw)?,
        Command::Click { entry, product } => {
            cli::handle_click(service.engine_mut(), entry, product)?
        }
        Command::Rank {} => cli::handle_rank(service.engine(), std::io::stdin())?,
        Command::Suggest { partial } => cli::handle_suggest(service.engine(), partial)?,
        Command::Insights {} => cli::handle_insights(service.engine())?,
        Command::Prefs { action } => cli::handle_prefs(&mut service, action)?,
        Command::Wishlist { action } => cli::handle_wishlist(service.engine_mut(), action)?,
        Command::Compare { action } => cli::handle_compare(service.engine_mut(), action)?,
        Command::History { limit } => cli::handle_history(service.engine(), limit)?,
        Command::Export { path } => cli::handle_export(service.engine(), path)?,
        Command::Import { path } => cli::handle_import(service.engine_mut(), path)?,
        Command::Clear { yes } => cli::handle_clear(service.engine_mut(), yes)?,
        Command::Health {} => cli::handle_health(&service)?,
        Command::Analytics {} => cli::handle_analytics(&service)?,
        Command::Catalog { list } => cli::handle_catalog(&service, list)?,
    }

    Ok(())
}
