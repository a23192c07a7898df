//! JavaScript dependency resolver (jsdeps)

use anyhow::Context;
use clap::{Parser, Subcommand};
use jsdeps::{ModuleMap, PatternName, Resolver, ResolverConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsdeps")]
#[command(about = "Resolve dependencies between JavaScript modules", long_about = None)]
#[command(version)]
struct Cli {
    /// Root directory to scan; repeatable, added to those of --config
    #[arg(short, long = "root", global = true)]
    roots: Vec<PathBuf>,

    /// Configuration file (jsdeps.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Regular expression of paths to skip
    #[arg(short, long, global = true)]
    exclude: Option<String>,

    /// Declaration style: namespace or amd
    #[arg(short, long, global = true)]
    pattern: Option<PatternName>,

    /// Keep the declaration cache in memory
    #[arg(long, global = true)]
    memory_cache: bool,

    /// Parse files concurrently
    #[arg(long = "async", global = true)]
    concurrent: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every module with its resolved dependencies
    Resolve {
        /// Only print entry files
        #[arg(long)]
        entries: bool,
    },
    /// Print the file providing a symbol and its dependencies
    Which {
        /// Symbol name, e.g. app.main
        symbol: String,
    },
    /// Write the deps.js manifest
    Deps {
        /// Output path (default: temp directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Drop the declaration cache
    ClearCache,
}

/// Log filter from `RUST_LOG` directives, falling back to `info`
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    if let Commands::Deps { output } = &cli.command {
        config.write_deps_js = true;
        if let Some(output) = output {
            config.deps_js_path = Some(output.clone());
        }
    }

    let mut resolver = Resolver::new(config).context("Failed to create resolver")?;
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Resolve { entries } => {
            let modules = resolve(&mut resolver, entries, cli.concurrent)?;
            print_modules(&modules, &cwd);
        }
        Commands::Which { symbol } => {
            resolve(&mut resolver, false, cli.concurrent)?;
            let module = resolver
                .registry()
                .lookup_filename(&symbol)
                .and_then(|filename| resolver.modules().get(filename))
                .with_context(|| format!("No file provides '{}'", symbol))?;
            println!("{}", display(module.filename(), &cwd));
            for dependency in module.dependencies().unwrap_or_default() {
                println!("  {}", display(dependency, &cwd));
            }
        }
        Commands::Deps { .. } => {
            let modules = resolve(&mut resolver, false, cli.concurrent)?;
            println!(
                "Wrote {} modules to {}",
                modules.len(),
                resolver.deps_js_path().display()
            );
        }
        Commands::ClearCache => {
            resolver
                .cache_controller()
                .clear()
                .context("Failed to clear cache")?;
            println!("Cache cleared");
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<ResolverConfig> {
    let mut config = match &cli.config {
        Some(path) => ResolverConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ResolverConfig::default(),
    };

    config.roots.extend(cli.roots.iter().cloned());
    if config.roots.is_empty() {
        config.roots.push(PathBuf::from("."));
    }
    if let Some(exclude) = &cli.exclude {
        config.excludes = Some(exclude.clone());
    }
    if let Some(pattern) = cli.pattern {
        config.pattern = pattern;
    }
    if cli.memory_cache {
        config.memory_cache = true;
    }
    Ok(config)
}

fn resolve(resolver: &mut Resolver, entries: bool, concurrent: bool) -> anyhow::Result<ModuleMap> {
    let modules = if concurrent {
        tokio::runtime::Runtime::new()?.block_on(resolver.resolve(entries))?
    } else {
        resolver.resolve_sync(entries)?
    };
    Ok(modules)
}

fn print_modules(modules: &ModuleMap, cwd: &Path) {
    for (filename, module) in modules {
        println!("{}", display(filename, cwd));
        for dependency in module.dependencies().unwrap_or_default() {
            println!("  {}", display(dependency, cwd));
        }
    }
}

fn display(path: &Path, cwd: &Path) -> String {
    jsdeps::path::to_slash(&jsdeps::path::relative_to(path, cwd))
}
