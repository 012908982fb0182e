use clap::{Parser, Subcommand};
use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use telepress::config::{self, TelepressConfig};
use telepress::output::{self, ConsoleObserver};
use telepress::publish::{self, ConfiguredPublisher, PublishError};
use telepress::server::{self, ConfigBackend};

#[derive(Parser)]
#[command(name = "telepress")]
#[command(about = "Publish text, images and zipped galleries to Telegraph")]
#[command(long_about = "\
Publish text, images and zipped galleries to Telegraph

Long texts are split into pages that link to each other. Images are
uploaded to the configured image host (compressed first when too large)
and shown on a page. A .zip of images becomes a paged gallery.

Supported inputs:
  .txt .md .markdown .rst .text   text (Markdown is detected automatically)
  .jpg .jpeg .png .gif .webp .bmp single image
  .zip                            gallery of the images inside

Run 'telepress gen-config' to generate a documented config file, or
'telepress serve' to expose the same pipeline as an HTTP API.")]
#[command(version)]
struct Cli {
    /// Config file (default: $TELEPRESS_CONFIG, ~/.telepress.toml,
    /// ~/.config/telepress.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by commands that publish text.
#[derive(clap::Args, Clone)]
struct TitleArgs {
    /// Page title (default: file name without extension)
    #[arg(short, long)]
    title: Option<String>,

    /// Publish again even if the same content was published before
    #[arg(long)]
    no_dedup: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Publish a text file, an image, or a zip of images
    Publish {
        file: PathBuf,
        #[command(flatten)]
        args: TitleArgs,
    },
    /// Publish text read from a file or stdin
    Text {
        /// Text file; reads stdin when omitted or "-"
        file: Option<PathBuf>,
        #[command(flatten)]
        args: TitleArgs,
    },
    /// Publish a gallery of images that are already hosted
    GalleryUrls {
        #[arg(short, long)]
        title: String,
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Serve the publishing API over HTTP
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref())?;
    let url = match cli.command {
        Command::Publish { file, args } => {
            if !file.exists() {
                return Err(PublishError::NotFound(file).into());
            }
            let publisher = cli_publisher(&config, publish::uses_images(&file), args.no_dedup)?;
            publisher.publish(&file, args.title.as_deref())?
        }
        Command::Text { file, args } => {
            let (content, default_title) = read_text(file.as_deref())?;
            let title = args.title.unwrap_or(default_title);
            let publisher = cli_publisher(&config, false, args.no_dedup)?;
            publisher.publish_text(&content, &title)?
        }
        Command::GalleryUrls { title, urls } => {
            let publisher = cli_publisher(&config, false, true)?;
            publisher.publish_image_urls(&urls, &title)?
        }
        Command::Serve { host, port } => {
            let addr = SocketAddr::new(host, port);
            println!("Serving telepress API at http://{addr}");
            server::serve(addr, Arc::new(ConfigBackend::new(config)))?;
            return Ok(());
        }
        Command::GenConfig => return Ok(()),
    };

    println!("{}", output::format_success(&url));
    Ok(())
}

fn cli_publisher(
    config: &TelepressConfig,
    with_images: bool,
    no_dedup: bool,
) -> Result<ConfiguredPublisher, Box<dyn Error>> {
    let publisher = ConfiguredPublisher::from_config(config, None, with_images, !no_dedup)?;
    Ok(publisher.with_observer(Box::new(ConsoleObserver)))
}

/// Text and a fallback title from a file, or from stdin.
fn read_text(file: Option<&Path>) -> Result<(String, String), Box<dyn Error>> {
    match file.filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            if !path.exists() {
                return Err(PublishError::NotFound(path.to_path_buf()).into());
            }
            let bytes = std::fs::read(path)?;
            let content = String::from_utf8(bytes).map_err(|_| {
                PublishError::Validation(format!("{} is not UTF-8 text", path.display()))
            })?;
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Untitled".to_string());
            Ok((content, title))
        }
        None => Ok((std::io::read_to_string(std::io::stdin())?, "Untitled".to_string())),
    }
}
