/// imgsync command-line entry point for native builds
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// The library is driven by its host on wasm; there is no binary there
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::error::Error;
    use std::io::{BufRead, Write};
    use std::path::{Path, PathBuf};

    use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

    use imgsync::codec;
    use imgsync::config::EngineConfig;
    use imgsync::engine::ImageSyncEngine;
    use imgsync::store::JsonFileStore;
    use imgsync::view::Route;

    type CliResult<T> = Result<T, Box<dyn Error>>;

    fn command() -> Command {
        Command::new("imgsync")
            .about("Stage images and keep them in sync with a record store")
            .arg(
                Arg::new("config")
                    .long("config")
                    .value_parser(value_parser!(PathBuf))
                    .global(true)
                    .help("Configuration file (defaults to the user config directory)"),
            )
            .arg(
                Arg::new("store")
                    .long("store")
                    .value_parser(value_parser!(PathBuf))
                    .global(true)
                    .help("JSON store file (overrides the configured store path)"),
            )
            .arg(
                Arg::new("key")
                    .long("key")
                    .short('k')
                    .required(true)
                    .global(true)
                    .help("Grouping key the images belong to"),
            )
            .arg(
                Arg::new("yes")
                    .long("yes")
                    .short('y')
                    .action(ArgAction::SetTrue)
                    .global(true)
                    .help("Answer yes to every confirmation"),
            )
            .subcommand_required(true)
            .subcommand(Command::new("list").about("List stored images for the key"))
            .subcommand(
                Command::new("add")
                    .about("Stage image files and save them to the store")
                    .arg(
                        Arg::new("files")
                            .required(true)
                            .num_args(1..)
                            .value_parser(value_parser!(PathBuf)),
                    )
                    .arg(
                        Arg::new("note")
                            .long("note")
                            .help("Note attached to every added image"),
                    ),
            )
            .subcommand(
                Command::new("stage")
                    .about("Stage image files and print the host outputs without saving")
                    .arg(
                        Arg::new("files")
                            .required(true)
                            .num_args(1..)
                            .value_parser(value_parser!(PathBuf)),
                    ),
            )
            .subcommand(
                Command::new("note")
                    .about("Replace the note of a stored image")
                    .arg(index_arg())
                    .arg(Arg::new("text").required(true)),
            )
            .subcommand(
                Command::new("delete")
                    .about("Delete a stored image")
                    .arg(index_arg()),
            )
            .subcommand(Command::new("clear").about("Delete every stored image for the key"))
            .subcommand(
                Command::new("export")
                    .about("Write a stored image to a file")
                    .arg(index_arg())
                    .arg(
                        Arg::new("out")
                            .required(true)
                            .value_parser(value_parser!(PathBuf)),
                    ),
            )
    }

    fn index_arg() -> Arg {
        Arg::new("index")
            .required(true)
            .value_parser(value_parser!(usize))
            .help("Position shown by `list`, starting at 1")
    }

    /// Asks on the terminal; anything other than `y`/`yes` declines.
    fn ask(message: &str) -> bool {
        print!("{} [y/N] ", message);
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    fn load_config(matches: &ArgMatches) -> CliResult<EngineConfig> {
        match matches.get_one::<PathBuf>("config") {
            Some(path) => Ok(EngineConfig::load_from_path(path)?),
            None => Ok(EngineConfig::load_from_default_path().unwrap_or_default()),
        }
    }

    fn store_path(matches: &ArgMatches, config: &EngineConfig) -> CliResult<PathBuf> {
        matches
            .get_one::<PathBuf>("store")
            .cloned()
            .or_else(|| config.store_path.clone())
            .or_else(EngineConfig::default_store_path)
            .ok_or_else(|| "no store path given and no data directory available".into())
    }

    fn read_files(matches: &ArgMatches) -> CliResult<Vec<imgsync::ImageFile>> {
        let mut files = Vec::new();
        if let Some(paths) = matches.get_many::<PathBuf>("files") {
            for path in paths {
                files.push(codec::read_file(path)?);
            }
        }
        Ok(files)
    }

    fn route_at(engine: &ImageSyncEngine<JsonFileStore>, index: usize) -> CliResult<Route> {
        index
            .checked_sub(1)
            .and_then(|i| engine.view().route(i))
            .ok_or_else(|| format!("no image at position {}", index).into())
    }

    fn report(engine: &ImageSyncEngine<JsonFileStore>) {
        if let Some(status) = engine.status() {
            println!("{}", status.text);
        }
    }

    fn print_list(engine: &ImageSyncEngine<JsonFileStore>) {
        let view = engine.view();
        println!("{}", view.breakdown());
        for (i, item) in view.items().iter().enumerate() {
            let state = if item.is_saved() { "saved" } else { "new" };
            let size = item.size_label().unwrap_or_default();
            println!("{:>3}. {} [{}] {}", i + 1, item.name(), state, size);
            if !item.note().is_empty() {
                println!("     {}", item.note());
            }
        }
    }

    fn write_export(bytes: &[u8], out: &Path) -> CliResult<()> {
        std::fs::write(out, bytes)?;
        println!("Wrote {} to {}", codec::format_file_size(bytes.len()), out.display());
        Ok(())
    }

    pub fn run() -> CliResult<()> {
        let matches = command().get_matches();
        let config = load_config(&matches)?;

        env_logger::Builder::new()
            .filter_level(config.log_level.to_level_filter())
            .parse_default_env()
            .init();

        let store = JsonFileStore::open(store_path(&matches, &config)?)?;
        let auto_confirm = matches.get_flag("yes");
        let confirm = move |message: &str| auto_confirm || ask(message);
        let mut engine = ImageSyncEngine::new(store, confirm, config);

        let key = matches.get_one::<String>("key").cloned().unwrap_or_default();
        pollster::block_on(engine.set_key(key))?;

        match matches.subcommand() {
            Some(("list", _)) => print_list(&engine),
            Some(("add", args)) => {
                let added = engine.add_files(read_files(args)?)?;
                if let Some(note) = args.get_one::<String>("note") {
                    for ordinal in 0..added {
                        engine.set_pending_note(ordinal, note.clone());
                    }
                }
                pollster::block_on(engine.save_all())?;
                report(&engine);
            }
            Some(("stage", args)) => {
                pollster::block_on(engine.add_images(read_files(args)?))?;
                println!("{}", serde_json::to_string_pretty(&engine.outputs())?);
            }
            Some(("note", args)) => {
                let index = args.get_one::<usize>("index").copied().unwrap_or_default();
                let text = args.get_one::<String>("text").cloned().unwrap_or_default();
                let route = route_at(&engine, index)?;
                pollster::block_on(engine.edit_note(&route, &text))?;
                println!("Note updated");
            }
            Some(("delete", args)) => {
                let index = args.get_one::<usize>("index").copied().unwrap_or_default();
                let route = route_at(&engine, index)?;
                pollster::block_on(engine.remove(&route))?;
                report(&engine);
            }
            Some(("clear", _)) => {
                pollster::block_on(engine.clear_all())?;
                report(&engine);
            }
            Some(("export", args)) => {
                let index = args.get_one::<usize>("index").copied().unwrap_or_default();
                let Route::Persisted(id) = route_at(&engine, index)? else {
                    return Err("only stored images can be exported".into());
                };
                let bytes = pollster::block_on(engine.fetch_image(&id))?.to_vec();
                if let Some(out) = args.get_one::<PathBuf>("out") {
                    write_export(&bytes, out)?;
                }
            }
            _ => return Err("unknown command".into()),
        }
        Ok(())
    }

}
