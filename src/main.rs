use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flickrview::config::{Settings, DEFAULT_ENDPOINT, DEFAULT_PER_PAGE};
use flickrview::fetcher::{decode_image, FlickrClient, PhotoService};
use flickrview::models::{SearchQuery, SearchResult};
use flickrview::viewer;

#[derive(Parser)]
#[command(name = "flickrview")]
#[command(about = "Search Flickr by tag and browse the photos in your terminal", long_about = None)]
struct Cli {
    #[command(flatten)]
    flickr: FlickrArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FlickrArgs {
    /// Flickr API key
    #[arg(long, global = true, env = "FLICKR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// REST endpoint to query
    #[arg(long, global = true, env = "FLICKR_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Photos requested per search
    #[arg(long, global = true, env = "FLICKR_PER_PAGE", default_value_t = DEFAULT_PER_PAGE)]
    per_page: u32,
}

impl FlickrArgs {
    fn client(self) -> Result<FlickrClient> {
        let settings = Settings::new(self.api_key, self.endpoint, self.per_page)?;
        FlickrClient::new(settings).context("Failed to build HTTP client")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one search and print the results
    Search {
        tags: String,
        #[arg(long)]
        json: bool,
    },
    /// Open the interactive browser
    Browse {
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// Download a photo to disk
    Save {
        #[arg(short, long)]
        url: String,
        #[arg(short, long)]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search { tags, json } => {
            let client = cli.flickr.client()?;
            let query = SearchQuery::new(tags);
            let photos = client
                .search(&query)
                .await
                .context("Unable to get results from Flickr")?;
            let result = SearchResult::new(query, photos);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if result.is_empty() {
                println!("No matches");
            } else {
                println!("Found {} photos:", result.len());
                for photo in &result.photos {
                    println!("  - {}  {}", photo.image_url(), photo.title);
                }
            }
        }
        Commands::Browse { tags } => {
            let client: Arc<dyn PhotoService> = Arc::new(cli.flickr.client()?);
            viewer::run_viewer(client, tags).await?;
        }
        Commands::Save { url, output } => {
            let settings = Settings::with_endpoint("", DEFAULT_ENDPOINT);
            let client = FlickrClient::new(settings)?;
            let bytes = client
                .fetch_bytes(&url)
                .await
                .with_context(|| format!("Failed to download {}", url))?;

            // Refuse to save anything that is not a readable image
            let image = decode_image(bytes.clone()).await?;

            let path = shellexpand::tilde(&output).to_string();
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path))?;
            println!("Saved {}x{} image to {}", image.width(), image.height(), path);
        }
    }

    Ok(())
}
