use std::path::PathBuf;
use std::sync::Arc;

use facet::Facet;
use figue as args;
use hookscope_cache::{Db, ResponseCache};
use hookscope_runtime::{Mesh, SystemClock, Topology};
use hookscope_search::{Console, TextConsole};
use hookscope_types::SearchPattern;
use tracing::info;

mod config;

use config::Config;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    #[facet(args::subcommand)]
    command: Command,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum Command {
    /// Floods a query through the contexts described by a topology file.
    Search {
        #[facet(args::named)]
        topology: String,
        #[facet(args::named)]
        pattern: String,
        #[facet(args::named, default)]
        field: Option<String>,
        #[facet(args::named, default)]
        regex: bool,
        #[facet(args::named, default)]
        by_name: bool,
        /// Context the query originates from; the first listed by default.
        #[facet(args::named, default)]
        from: Option<String>,
    },
    /// Lists cached script rewrites with their age.
    CacheList,
    CacheDrop {
        #[facet(args::named)]
        url: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("hookscope")
                .description("Search recorded variable observations across page, frame and worker contexts")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();
    let cli = args::Driver::new(figue_config)
        .run()
        .into_result()
        .map_err(|e| e.to_string())?;
    let config = Config::from_env()?;

    match cli.value.command {
        Command::Search {
            topology,
            pattern,
            field,
            regex,
            by_name,
            from,
        } => {
            let pattern = if regex {
                SearchPattern::regex(pattern)
            } else {
                SearchPattern::literal(pattern)
            };
            let field = query_field(field, by_name)?;
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| format!("failed to build tokio runtime: {e}"))?
                .block_on(run_search(&config, PathBuf::from(topology), pattern, field, from))
        }
        Command::CacheList => run_cache_list(&config),
        Command::CacheDrop { url } => run_cache_drop(&config, &url),
    }
}

/// Field to search: `--by-name` is shorthand for `--field name`, so naming
/// both is refused.
fn query_field(field: Option<String>, by_name: bool) -> Result<Option<String>, String> {
    match (field, by_name) {
        (Some(field), true) => Err(format!("--by-name conflicts with --field {field}")),
        (None, true) => Ok(Some("name".to_string())),
        (field, false) => Ok(field),
    }
}

async fn run_search(
    config: &Config,
    topology_path: PathBuf,
    pattern: SearchPattern,
    field: Option<String>,
    from: Option<String>,
) -> Result<(), String> {
    let json = std::fs::read_to_string(&topology_path)
        .map_err(|e| format!("read {}: {e}", topology_path.display()))?;
    let topology = Topology::from_json(&json).map_err(|e| e.to_string())?;
    let origin_name = from
        .or_else(|| topology.contexts.first().map(|entry| entry.name.clone()))
        .ok_or_else(|| format!("{} lists no contexts", topology_path.display()))?;

    let mesh = Mesh::new(config.policy.clone(), Arc::new(SystemClock));
    let color = config.color;
    let contexts = mesh
        .build(&topology, |_| {
            Arc::new(TextConsole::stdout(color)) as Arc<dyn Console>
        })
        .map_err(|e| e.to_string())?;
    let origin = contexts
        .get(&origin_name)
        .ok_or_else(|| format!("no context named {origin_name:?}"))?;

    let uid = origin
        .search_by_message(pattern, field.as_deref())
        .map_err(|e| e.to_string())?;
    info!(%uid, origin = %origin_name, "query started");

    mesh.settle().await;
    let processed: u64 = contexts.values().map(|c| c.processed_queries()).sum();
    info!(%uid, processed, "flood settled");
    mesh.shutdown().await;
    Ok(())
}

fn open_cache(config: &Config) -> Result<ResponseCache, String> {
    let db = Db::new(config.cache_db.clone());
    ResponseCache::open(db, config.cache_max_age)
        .map_err(|e| format!("failed to open cache at {:?}: {e}", config.cache_db))
}

fn run_cache_list(config: &Config) -> Result<(), String> {
    let cache = open_cache(config)?;
    let entries = cache.entries().map_err(|e| e.to_string())?;
    for (url, age) in entries {
        let state = if age < config.cache_max_age {
            "valid"
        } else {
            "stale"
        };
        println!("{url}\t{}s\t{state}", age.as_secs());
    }
    Ok(())
}

fn run_cache_drop(config: &Config, url: &str) -> Result<(), String> {
    let cache = open_cache(config)?;
    if cache.remove_file(url).map_err(|e| e.to_string())? {
        println!("dropped {url}");
        Ok(())
    } else {
        Err(format!("no cached entry for {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_name_selects_the_name_field() {
        assert_eq!(query_field(None, true), Ok(Some("name".to_string())));
        assert_eq!(query_field(None, false), Ok(None));
        assert_eq!(
            query_field(Some("type".to_string()), false),
            Ok(Some("type".to_string()))
        );
    }

    #[test]
    fn by_name_and_field_together_are_refused() {
        let err = query_field(Some("value".to_string()), true).expect_err("flags conflict");
        assert!(err.contains("--field value"), "{err}");
    }
}
