use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use certgen::app::CertificateApp;
use certgen::template::FormInput;
use certgen::GeneratorConfig;

/// Render a certificate and export it as a printable page and/or PNG
#[derive(Parser, Debug)]
#[command(name = "certgen", version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// completion, achievement, participation or appreciation
    #[arg(long, default_value = "completion")]
    category: String,

    /// Recipient's name
    #[arg(long)]
    name: String,

    /// Course or event name
    #[arg(long, default_value = "")]
    subject: String,

    /// Date as YYYY-MM-DD
    #[arg(long, default_value = "")]
    date: String,

    #[arg(long, default_value = "")]
    grade: String,

    /// Replaces the category's standard description
    #[arg(long, default_value = "")]
    description: String,

    /// Directory or URL that image paths resolve against
    #[arg(long)]
    assets: Option<String>,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Write the printable HTML page
    #[arg(long)]
    html: bool,

    /// Export a PNG
    #[arg(long)]
    png: bool,

    /// Oversampling factor for the PNG
    #[arg(long)]
    scale: Option<u32>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .context("failed to initialise logging")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(scale) = cli.scale {
        config.export.scale = scale;
    }
    if cli.assets.is_some() {
        config.export.asset_base = cli.assets.clone();
    }
    config.validate()?;

    let mut app = CertificateApp::headless(config, &cli.out);
    app.select_category(&cli.category);
    let name = app.normalize_name(&cli.name);
    app.submit(FormInput {
        recipient_name: name,
        subject_name: cli.subject,
        date: cli.date,
        grade: cli.grade,
        description: cli.description,
    });

    // With neither flag, produce both.
    let (html, png) = if cli.html || cli.png { (cli.html, cli.png) } else { (true, true) };

    if html {
        app.print().context("writing printable page")?;
        println!("{}", cli.out.join("certificate.html").display());
    }
    if png {
        let receipt = app.export_png().await.context("exporting PNG")?;
        println!("{}", receipt.location);
    }
    Ok(())
}
