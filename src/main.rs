use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use trocr::{Config, Mode};

#[derive(Parser, Debug)]
#[command(
    name = "trocr",
    version,
    about = "Recognize text on an image and draw it back translated, accented or outlined"
)]
#[command(group(ArgGroup::new("mode").args(["lang", "accent", "target", "outline", "read"])))]
struct Cli {
    /// Image to process
    image: PathBuf,

    /// Translate into this language code (e.g. de, pt-br)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Apply an accent, optionally with severity (e.g. reversed[3])
    #[arg(short = 'a', long = "accent")]
    accent: Option<String>,

    /// Language code or accent, whichever matches
    #[arg(short = 't', long = "to")]
    target: Option<String>,

    /// Only draw detected text boxes, optionally in this color (#rrggbb)
    #[arg(long = "outline", num_args = 0..=1, default_missing_value = "")]
    outline: Option<String>,

    /// Print the recognized text and exit
    #[arg(long = "read")]
    read: bool,

    /// Where to write the PNG (default: <image>.trocr.png)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// API key (overrides settings and GOOGLE_API_KEY)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.read {
            return Mode::Read;
        }
        if let Some(color) = self.outline.as_deref() {
            let color = Some(color.trim()).filter(|color| !color.is_empty());
            return Mode::Outline(color.map(str::to_string));
        }
        if let Some(lang) = self.lang.clone() {
            return Mode::Lang(lang);
        }
        if let Some(accent) = self.accent.clone() {
            return Mode::Accent(accent);
        }
        Mode::Target(self.target.clone().unwrap_or_else(|| "en".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    trocr::logging::init(cli.verbose)?;

    let config = Config {
        mode: cli.mode(),
        image: cli.image,
        output: cli.output,
        key: cli.key,
        settings_path: cli.read_settings,
    };

    match trocr::run(config).await {
        Ok(output) => {
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_user_facing() => {
            eprintln!("{}", err);
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}
