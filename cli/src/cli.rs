use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "shapeql")]
/// Shapeql GraphQL schema generator and LDP resolver
pub struct Args {
    /// Write the logs as JSON lines instead of human readable text
    ///
    /// The log level is set with the RUST_LOG environment variable and defaults to "warn".
    #[arg(long, global = true)]
    pub json_logs: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the GraphQL schema generated from SHACL shapes
    Schema {
        /// File(s) holding the SHACL node shapes
        ///
        /// The format is guessed from the file extension, Turtle being the most common.
        #[arg(short, long, num_args = 1.., required = true, value_hint = ValueHint::FilePath)]
        shapes: Vec<PathBuf>,
        /// Base IRI of the shape files
        #[arg(long, value_hint = ValueHint::Url)]
        base: Option<String>,
    },
    /// Execute a GraphQL operation against LDP resources and print the JSON response
    ///
    /// The resources are fetched over HTTP unless --fixture or --container is given,
    /// in which case an in-memory store seeded with the fixtures is used.
    Query {
        /// File(s) holding the SHACL node shapes
        #[arg(short, long, num_args = 1.., required = true, value_hint = ValueHint::FilePath)]
        shapes: Vec<PathBuf>,
        /// Base IRI of the shape files
        #[arg(long, value_hint = ValueHint::Url)]
        base: Option<String>,
        /// JSON configuration file with the class targets and the HTTP client options
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
        /// File holding the GraphQL operation
        ///
        /// If no file is given, stdin is used.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        query: Option<PathBuf>,
        /// Name of the operation to execute if the document holds several
        #[arg(long)]
        operation_name: Option<String>,
        /// Variables of the operation as a JSON object
        #[arg(long)]
        variables: Option<String>,
        /// Seed the in-memory store with a Turtle document, given as URL=FILE
        #[arg(long, value_parser = parse_fixture)]
        fixture: Vec<(String, PathBuf)>,
        /// Declare a container of the in-memory store
        #[arg(long, value_hint = ValueHint::Url)]
        container: Vec<String>,
    },
}

fn parse_fixture(value: &str) -> std::result::Result<(String, PathBuf), String> {
    let (url, file) = value
        .split_once('=')
        .ok_or_else(|| format!("expecting URL=FILE, found {value}"))?;
    if url.is_empty() || file.is_empty() {
        return Err(format!("expecting URL=FILE, found {value}"));
    }
    Ok((url.to_owned(), PathBuf::from(file)))
}
