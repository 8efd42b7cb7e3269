use clap::Parser;
use ragshelf::{
    DataDir,
    IndexStore,
    SnapshotStore,
    cli::{BuildArgs, Cli, Command, QueryArgs},
    error,
    ingestion,
    mcp,
    search,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("RAGSHELF_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Build(args) => cmd_build(&data_dir, &args)?,
        Command::Query(args) => cmd_query(&data_dir, &args)?,
        Command::List => cmd_list(&data_dir),
        Command::Mcp(args) => mcp::run_mcp(data_dir, args.allowed_root())?,
        Command::Completions(_) => {}
    }

    Ok(())
}

fn cmd_build(data_dir: &DataDir, args: &BuildArgs) -> error::Result<()> {
    let root = std::path::absolute(&args.directory)?;
    let outcome = ingestion::build_collection(&root, &args.chunking())?;
    let summary = outcome.summary(&args.name);

    let snapshot = SnapshotStore::new(data_dir);
    let mut store = IndexStore::from_collections(snapshot.load());
    store.replace(&args.name, outcome.fragments);
    snapshot.try_save(store.collections())?;

    println!("{summary}");
    Ok(())
}

fn cmd_query(data_dir: &DataDir, args: &QueryArgs) -> error::Result<()> {
    let snapshot = SnapshotStore::new(data_dir);
    let mut store = IndexStore::from_collections(snapshot.load());
    let was_legacy = store
        .collections()
        .get(&args.name)
        .is_some_and(|c| c.is_legacy());

    let hits = search::execute_search(&mut store, &args.params())?;
    if was_legacy {
        snapshot.save(store.collections());
    }

    if args.json {
        println!("{}", search::format_json(&hits, &args.query, &args.name)?);
    } else {
        println!("{}", search::format_hits(&hits, &args.query, &args.name));
    }
    Ok(())
}

fn cmd_list(data_dir: &DataDir) {
    let store = IndexStore::from_collections(SnapshotStore::new(data_dir).load());
    let names = store.names();

    if names.is_empty() {
        println!("No indexes available.");
    } else {
        for name in &names {
            println!("{name}");
        }
    }
}
