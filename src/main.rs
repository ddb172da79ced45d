use blog_tools::config::{self, FailurePolicy, ToolsConfig};
use blog_tools::geocode::NominatimGeocoder;
use blog_tools::hike::{HikeImporter, import_hikes};
use blog_tools::http::HttpClient;
use blog_tools::import::import_posts;
use blog_tools::map::{HttpTileProvider, MapStyle, StaticMap, TileProvider};
use blog_tools::output;
use blog_tools::store::{BucketStore, DirectoryStore, ObjectStore, PostSource};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "blog-tools")]
#[command(about = "Import hikes and Micropub posts into a static blog")]
#[command(long_about = "\
Import hikes and Micropub posts into a static blog

  hikes   GPX tracks → route map PNG + hike record with start/end places
  posts   Micropub h-entry JSON (directory or public bucket) → Hugo posts

Output layout:

  hikes/
  ├── 2024-05-01T10:00:00Z_map.png
  └── 2024-05-01T10:00:00Z_hike.json
  2024/
  ├── _index.md
  └── 05/
      ├── _index.md
      └── 01/
          ├── _index.md
          └── abc123/index.md

Logging goes to stderr; set RUST_LOG=debug for request-level detail.

Run 'blog-tools gen-config' to generate a documented blog-tools.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "blog-tools.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render maps and hike records from GPX tracks
    Hikes {
        /// Directory walked for .gpx files [config: hikes.input_dir]
        #[arg(long)]
        input: Option<PathBuf>,
        /// Directory for maps and records [config: hikes.output_dir]
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip or abort on a failing file [config: hikes.on_error]
        #[arg(long, value_enum)]
        on_error: Option<FailurePolicy>,
    },
    /// Import Micropub posts into the content tree
    Posts {
        /// Directory or http(s):// bucket endpoint [config: posts.source]
        #[arg(long)]
        source: Option<String>,
        /// Root of the content tree [config: posts.output_dir]
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip or abort on a failing post [config: posts.on_error]
        #[arg(long, value_enum)]
        on_error: Option<FailurePolicy>,
    },
    /// Print a stock blog-tools.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Hikes {
            input,
            output,
            on_error,
        } => {
            let config = config::load_config(&cli.config)?;
            let input = input.unwrap_or_else(|| PathBuf::from(&config.hikes.input_dir));
            let output = output.unwrap_or_else(|| PathBuf::from(&config.hikes.output_dir));
            let policy = on_error.unwrap_or(config.hikes.on_error);
            run_hikes(&config, &input, &output, policy)?;
        }
        Command::Posts {
            source,
            output,
            on_error,
        } => {
            let config = config::load_config(&cli.config)?;
            let source = PostSource::parse(source.as_deref().unwrap_or(&config.posts.source));
            let output = output.unwrap_or_else(|| PathBuf::from(&config.posts.output_dir));
            let policy = on_error.unwrap_or(config.posts.on_error);
            run_posts(&config, &source, &output, policy)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_hikes(
    config: &ToolsConfig,
    input_dir: &Path,
    output_dir: &Path,
    policy: FailurePolicy,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpClient::new(&config.http);
    let map_config = &config.hikes.map;
    let tiles = (!map_config.tile_url.trim().is_empty())
        .then(|| HttpTileProvider::new(map_config.tile_url.as_str(), &client));
    let map = StaticMap::new(
        MapStyle::from_config(map_config)?,
        tiles.as_ref().map(|t| t as &dyn TileProvider),
    );
    let geocoder = NominatimGeocoder::new(&config.hikes.geocoder, &client)?;
    let importer = HikeImporter::new(map, &geocoder, config.hikes.min_moving_speed);

    let summary = import_hikes(&importer, input_dir, output_dir, policy)?;
    output::print_hike_output(&summary, input_dir, output_dir);
    Ok(())
}

fn run_posts(
    config: &ToolsConfig,
    source: &PostSource,
    output_root: &Path,
    policy: FailurePolicy,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpClient::new(&config.http);
    let store: Box<dyn ObjectStore + '_> = match source {
        PostSource::Directory(dir) => Box::new(DirectoryStore::new(dir)),
        PostSource::Bucket(endpoint) => Box::new(BucketStore::new(endpoint, &client)?),
    };
    tracing::info!(?source, output = %output_root.display(), "importing posts");

    let summary = import_posts(store.as_ref(), output_root, policy)?;
    output::print_post_output(&summary, output_root);
    Ok(())
}
