use anyhow::{ensure, Context};
use mimalloc::MiMalloc;
use scry_magic::MagicDatabase;

mod identify;
mod menu;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn setup_logger(verbosity: usize) {
    let level = match verbosity {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn main() -> anyhow::Result<()> {
    let args: menu::Scry = argp::parse_args_or_exit(argp::DEFAULT);
    setup_logger(args.verbose);

    ensure!(!args.files.is_empty(), "no files to identify (try --help)");

    let database_path = args.magic.as_deref().unwrap_or(menu::DEFAULT_DATABASE);
    let database = MagicDatabase::load(database_path)
        .with_context(|| format!("unable to load magic database {database_path}"))?;
    if database.is_empty() {
        log::warn!("magic database {database_path} contains no usable signatures");
    }

    let options = identify::Options {
        special: args.special,
        dereference: args.dereference,
        mime: args.mime,
    };
    for path in &args.files {
        println!("{}", identify::identify_file(path, &database, options));
    }

    Ok(())
}
