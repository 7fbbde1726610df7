//! cos-access command line
//!
//! Thin front end over [`cos_access::cos::CosSession`]: every bucket-scoped
//! command locates the bucket's region first and talks to that endpoint.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cos_access::cos::{CosSession, CosUrl, PutOptions, ServiceCredential};
use cos_access::settings::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cos-access", version, about = "Region-aware object storage client")]
struct Cli {
    /// Service credential JSON file (overrides settings)
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// Settings file (defaults to the platform config folder)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Endpoint used for bucket listing (overrides settings)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Endpoint directory URL (overrides settings and credential)
    #[arg(long, global = true)]
    directory_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List buckets with their location constraints
    Buckets {
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Show the region and endpoint serving a bucket
    Locate { bucket: String },
    /// Create a bucket
    Mb {
        bucket: String,
        /// Location constraint, e.g. us-south-standard
        #[arg(long)]
        location: Option<String>,
    },
    /// List objects in a bucket
    Ls {
        bucket: String,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = 1000)]
        max_keys: i32,
        /// Follow continuation tokens until the listing is complete
        #[arg(long)]
        all: bool,
    },
    /// Upload a file to cos://bucket/key
    Put {
        target: String,
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
        /// User metadata as key=value, repeatable
        #[arg(long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },
    /// Download cos://bucket/key
    Get {
        target: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show metadata of cos://bucket/key
    Head { target: String },
    /// Delete cos://bucket/key
    Rm { target: String },
    /// Save the global options to the settings file
    Config,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

fn object_target(target: &str) -> Result<CosUrl> {
    match CosUrl::parse(target) {
        Some(url) if !url.key.is_empty() => Ok(url),
        _ => bail!("expected cos://bucket/key, got '{}'", target),
    }
}

/// Global flags take precedence over the settings file
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(path) = &cli.credentials {
        settings.credentials_path = Some(path.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        settings.default_endpoint = endpoint.clone();
    }
    if let Some(url) = &cli.directory_url {
        settings.directory_url = Some(url.clone());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    apply_overrides(&mut settings, &cli);

    if let Command::Config = cli.command {
        match &cli.settings {
            Some(path) => settings.save_to(path)?,
            None => settings.save()?,
        }
        println!("settings saved");
        return Ok(());
    }

    let credentials_path = settings
        .credentials_path
        .clone()
        .context("No service credential file given (use --credentials or set credentials_path)")?;
    let credential = ServiceCredential::from_file(&credentials_path)?;

    let session = CosSession::connect(&settings, &credential)
        .await
        .context("Failed to start storage session")?;

    run(&session, cli.command).await
}

async fn run(session: &CosSession, command: Command) -> Result<()> {
    match command {
        Command::Buckets { prefix } => {
            for bucket in session.list_buckets(&prefix).await? {
                println!("{}\t{}", bucket.name, bucket.location_constraint);
            }
        }
        Command::Locate { bucket } => {
            let location = session.locate(&bucket).await?;
            println!("bucket:   {}", location.bucket.name);
            println!("region:   {}", location.region);
            println!("endpoint: {}", location.endpoint);
        }
        Command::Mb { bucket, location } => {
            session.create_bucket(&bucket, location.as_deref()).await?;
            println!("created {}", bucket);
        }
        Command::Ls {
            bucket,
            prefix,
            max_keys,
            all,
        } => {
            let client = session.client_for(&bucket).await?;
            let mut token: Option<String> = None;
            loop {
                let page = client
                    .list_objects(&bucket, prefix.as_deref(), token.as_deref(), max_keys)
                    .await?;
                for object in &page.objects {
                    println!("{:>12}  {}", object.size_string(), object.key);
                }
                match page.next_token {
                    Some(next) if all && page.is_truncated => token = Some(next),
                    _ => break,
                }
            }
        }
        Command::Put {
            target,
            file,
            content_type,
            metadata,
        } => {
            let url = object_target(&target)?;
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {:?}", file))?;
            let options = PutOptions {
                content_type,
                metadata: metadata.into_iter().collect(),
            };
            session.put_object(&url.bucket, &url.key, data, &options).await?;
            println!("uploaded {}", url);
        }
        Command::Get { target, output } => {
            let url = object_target(&target)?;
            let data = session.get_object(&url.bucket, &url.key).await?;
            match output {
                Some(path) => tokio::fs::write(&path, &data)
                    .await
                    .with_context(|| format!("Failed to write {:?}", path))?,
                None => {
                    use std::io::Write;
                    std::io::stdout().write_all(&data)?;
                }
            }
        }
        Command::Head { target } => {
            let url = object_target(&target)?;
            match session.head_object(&url.bucket, &url.key).await? {
                Some(info) => {
                    println!("key:           {}", info.key);
                    println!("size:          {}", info.size);
                    println!("content-type:  {}", info.content_type.unwrap_or_default());
                    println!("etag:          {}", info.etag.unwrap_or_default());
                    if let Some(modified) = info.last_modified {
                        println!("last-modified: {}", modified.to_rfc3339());
                    }
                    let mut metadata: Vec<_> = info.metadata.into_iter().collect();
                    metadata.sort();
                    for (k, v) in metadata {
                        println!("meta {}: {}", k, v);
                    }
                }
                None => bail!("{} not found", url),
            }
        }
        Command::Rm { target } => {
            let url = object_target(&target)?;
            session.delete_object(&url.bucket, &url.key).await?;
            println!("deleted {}", url);
        }
        Command::Config => bail!("config does not use a storage session"),
    }

    Ok(())
}
