use crate::cli::{Args, Command};
use anyhow::{Context, bail};
use async_graphql::{Request, Variables};
use clap::Parser;
use oxrdf::Triple;
use oxrdfio::{RdfFormat, RdfParser};
use shapeql::{
    Config, LdpClient, MemoryLdpClient, Resolver, SchemaDefinition, SchemaGenerator, ShapeContext,
    build_schema,
};
use std::fs::{self, File};
use std::io::{BufReader, Read, Write, stdin, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);
    match args.command {
        Command::Schema { shapes, base } => {
            let definition = generate(&shapes, base.as_deref())?;
            let mut stdout = stdout().lock();
            write!(stdout, "{definition}")?;
            stdout.flush()?;
            Ok(())
        }
        Command::Query {
            shapes,
            base,
            config,
            query,
            operation_name,
            variables,
            fixture,
            container,
        } => {
            let definition = generate(&shapes, base.as_deref())?;
            let config = if let Some(config) = config {
                Config::from_path(&config).with_context(|| {
                    format!("Failed to load the configuration {}", config.display())
                })?
            } else {
                Config::default()
            };
            let client: Arc<dyn LdpClient> = if fixture.is_empty() && container.is_empty() {
                Arc::new(config.http_client()?)
            } else {
                Arc::new(memory_store(&fixture, &container)?)
            };
            let resolver = Resolver::new(
                Arc::new(definition),
                client,
                Arc::new(config.target_resolver()?),
            );
            let schema = build_schema(Arc::new(resolver))?;

            let document = if let Some(query) = query {
                fs::read_to_string(&query)
                    .with_context(|| format!("Failed to read the query file {}", query.display()))?
            } else {
                let mut document = String::new();
                stdin().lock().read_to_string(&mut document)?;
                document
            };
            let mut request = Request::new(document);
            if let Some(variables) = variables {
                let variables = serde_json::from_str(&variables)
                    .context("The variables must be a JSON object")?;
                request = request.variables(Variables::from_json(variables));
            }
            if let Some(operation_name) = operation_name {
                request = request.operation_name(operation_name);
            }
            let response = schema.execute(request).await;

            let mut stdout = stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &response)?;
            writeln!(stdout)?;
            stdout.flush()?;
            if !response.errors.is_empty() {
                bail!("The operation failed with {} error(s)", response.errors.len());
            }
            Ok(())
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn generate(shapes: &[PathBuf], base: Option<&str>) -> anyhow::Result<SchemaDefinition> {
    let mut triples = Vec::new();
    for file in shapes {
        let mut parser = RdfParser::from_format(rdf_format_from_path(file)?).rename_blank_nodes();
        if let Some(base) = base {
            parser = parser
                .with_base_iri(base)
                .with_context(|| format!("Invalid base IRI {base}"))?;
        }
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
        );
        for quad in parser.for_reader(reader) {
            let quad = quad.with_context(|| format!("Failed to parse {}", file.display()))?;
            triples.push(Triple::from(quad));
        }
        debug!("Loaded the shapes of {}", file.display());
    }
    let context = ShapeContext::new(triples).context("Invalid shape declarations")?;
    info!("Compiled {} shape(s)", context.shapes().len());
    Ok(SchemaGenerator::new(context).generate()?)
}

fn memory_store(
    fixtures: &[(String, PathBuf)],
    containers: &[String],
) -> anyhow::Result<MemoryLdpClient> {
    let store = MemoryLdpClient::new();
    for container in containers {
        store.add_container(container.as_str());
    }
    for (url, file) in fixtures {
        let turtle = fs::read_to_string(file)
            .with_context(|| format!("Failed to read the fixture {}", file.display()))?;
        store
            .load_turtle(url, &turtle)
            .with_context(|| format!("Failed to load the fixture {} as {url}", file.display()))?;
    }
    Ok(store)
}

fn rdf_format_from_path(path: &Path) -> anyhow::Result<RdfFormat> {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        bail!(
            "The path {} has no extension to guess a file format from",
            path.display()
        )
    };
    RdfFormat::from_extension(extension)
        .with_context(|| format!("The file extension '{extension}' is unknown"))
}
