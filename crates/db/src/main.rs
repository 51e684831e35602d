//! `jsondb` — inspect and edit a sorted JSON record store from the shell.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use db::{connect, CollectionOptions, ConnectOptions, Connection, Record, RootObject};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jsondb", about = "Sorted JSON record store")]
struct Cli {
    /// Path to a TOML store config.
    #[arg(short, long, conflicts_with = "file")]
    config: Option<PathBuf>,

    /// Path to the JSON database file.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Pretty-print the file on save.
    #[arg(long)]
    beautify: bool,

    /// Milliseconds to wait before each write.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Root object (JSON) used when the file is missing or unparsable.
    #[arg(long)]
    init: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the names stored in the root object.
    Collections,
    /// Print every record, one JSON object per line.
    List(Target),
    /// Print the record with the key of the given JSON object.
    Get(TargetRecord),
    /// Insert a record; prints whether it was inserted.
    Insert(TargetRecord),
    /// Merge fields into an existing record; prints whether it was found.
    Update(TargetRecord),
    /// Remove the record with the given key; prints whether it was found.
    Remove(TargetRecord),
    /// Remove every record; prints the count.
    Clear(Target),
}

#[derive(Args, Debug)]
struct Target {
    /// Collection name.
    name: String,

    /// Key field of the collection.
    #[arg(short, long, default_value = "id")]
    key: String,
}

#[derive(Args, Debug)]
struct TargetRecord {
    #[command(flatten)]
    target: Target,

    /// Record as a JSON object, e.g. '{"id": 1}'.
    record: String,
}

impl Cli {
    fn connect_options(&self) -> Result<ConnectOptions> {
        let mut options = match (&self.config, &self.file) {
            (Some(path), _) => {
                let config = store::load_from_file(path)
                    .with_context(|| format!("loading config {}", path.display()))?;
                ConnectOptions::from_config(&config)
            }
            (None, Some(file)) => ConnectOptions::new(file),
            (None, None) => bail!("either --config or --file is required"),
        };

        if self.beautify {
            options = options.beautify(true);
        }
        if let Some(ms) = self.delay_ms {
            options = options.delay(Duration::from_millis(ms));
        }
        if let Some(init) = &self.init {
            let init: RootObject = match serde_json::from_str::<Value>(init).context("parsing --init")? {
                Value::Object(map) => map,
                _ => bail!("--init must be a JSON object"),
            };
            options = options.init(init);
        }
        Ok(options)
    }
}

fn parse_record(text: &str) -> Result<Record> {
    match serde_json::from_str::<Value>(text).context("parsing record")? {
        Value::Object(record) => Ok(record),
        _ => bail!("record must be a JSON object"),
    }
}

fn open(conn: &Connection, target: &Target) -> Result<db::Collection> {
    Ok(conn.collection(CollectionOptions::new(&target.name, &target.key))?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let conn = connect(cli.connect_options()?).await?;

    match cli.command {
        Command::Collections => {
            for name in conn.collection_names() {
                println!("{name}");
            }
        }
        Command::List(target) => {
            for record in &open(&conn, &target)? {
                println!("{}", Value::Object(record));
            }
        }
        Command::Get(args) => {
            let c = open(&conn, &args.target)?;
            match c.find(&parse_record(&args.record)?)? {
                Some(record) => println!("{}", Value::Object(record)),
                None => bail!("no record with that key in `{}`", args.target.name),
            }
        }
        Command::Insert(args) => {
            let c = open(&conn, &args.target)?;
            println!("{}", c.insert(parse_record(&args.record)?).await?);
        }
        Command::Update(args) => {
            let c = open(&conn, &args.target)?;
            println!("{}", c.update(parse_record(&args.record)?).await?);
        }
        Command::Remove(args) => {
            let c = open(&conn, &args.target)?;
            println!("{}", c.remove(&parse_record(&args.record)?).await?);
        }
        Command::Clear(target) => {
            println!("{}", open(&conn, &target)?.remove_all().await?);
        }
    }
    Ok(())
}
