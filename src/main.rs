use bgfix::pipeline::{InputSource, LogProgress, OUTPUT_FILE_NAME, Outcome, Pipeline};
use bgfix::{config, output, web};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bgfix")]
#[command(about = "Remove the background from PNG and JPEG images")]
#[command(long_about = "\
Remove the background from PNG and JPEG images

Upload an image in the browser (bgfix serve) or point the CLI at a file
(bgfix fix photo.jpg). Images larger than the configured bounding size are
scaled down first; the result is saved as a PNG with a transparent
background.

Settings are read from config.toml in the --config directory when present:

  [limits]   max_file_size, max_image_size
  [cache]    max_entries, max_bytes
  [removal]  tolerance
  [server]   host, port

Run 'bgfix gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml (and relative default images)
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Remove the background of one image and save the result as PNG
    Fix(FixArgs),
    /// Start the web UI
    Serve(ServeArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct FixArgs {
    /// Image to process; defaults to the first existing configured default image
    input: Option<PathBuf>,

    /// Where to write the processed PNG
    #[arg(long, short, default_value = OUTPUT_FILE_NAME)]
    output: PathBuf,
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Fix(args) => {
            let config = config::load_config(&cli.config)?;
            let pipeline = Pipeline::from_config(&config);
            let source = match args.input {
                Some(path) => InputSource::File(path),
                None => InputSource::Defaults(config.resolve_default_images(&cli.config)),
            };
            let outcome = pipeline.run(source, &mut LogProgress);
            match &outcome {
                Outcome::Completed(presentation) => {
                    std::fs::write(&args.output, presentation.png())?;
                    output::print_outcome(&outcome, Some(&args.output));
                }
                Outcome::AwaitingInput => output::print_outcome(&outcome, None),
                Outcome::Failed(_) => {
                    output::print_outcome(&outcome, None);
                    std::process::exit(1);
                }
            }
        }
        Command::Serve(args) => {
            let mut config = config::load_config(&cli.config)?;
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            config.validate()?;

            let state = web::AppState::from_config(&config, &cli.config);
            let pipeline = state.pipeline().clone();
            let addr = config.server.bind_address();
            println!("==> Serving on http://{}", addr);

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::serve(state, &addr))?;
            output::print_cache_stats(&pipeline.cache().stats());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean for command output.
fn init_tracing(debug: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
