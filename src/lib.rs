use anyhow::{Context, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub mod compose;
pub mod error;
pub mod font;
pub mod gateway;
pub mod geometry;
pub mod logging;
pub mod pipeline;
pub mod settings;
#[cfg(test)]
mod test_util;
pub mod transform;
pub mod vision;

pub use compose::{ComposeOptions, Composer, RenderMode};
pub use error::{Result, TrocrError};
pub use gateway::{Clock, GatewayConfig, PendingRecognition, RecognitionGateway, TokioClock};
pub use pipeline::{Pipeline, Rendered};
pub use transform::{AccentRegistry, LineTransform, TextTranslator};
pub use vision::Recognizer;

/// What the CLI was asked to do with the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Print the recognized text.
    Read,
    /// Translate into a language code.
    Lang(String),
    /// Apply an accent, `name[severity]`.
    Accent(String),
    /// Language code or accent, whichever matches.
    Target(String),
    /// Draw the detected boxes, optionally in the given color.
    Outline(Option<String>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub image: PathBuf,
    pub mode: Mode,
    pub output: Option<PathBuf>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
}

pub async fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let image = std::fs::read(&config.image)
        .with_context(|| format!("failed to read image: {}", config.image.display()))?;

    let key = settings
        .vision_key(config.key.as_deref())
        .ok_or_else(|| anyhow!("no API key found (checked --key, [vision] api_key, GOOGLE_API_KEY)"))?;
    let mut recognizer = vision::GoogleVision::new(key);
    if let Some(endpoint) = settings.vision_endpoint.as_deref() {
        recognizer = recognizer.with_endpoint(endpoint);
    }
    let gateway = RecognitionGateway::start(
        Arc::new(recognizer),
        settings.gateway_config(),
        Arc::new(TokioClock),
    );

    let font = match config.mode {
        Mode::Lang(_) | Mode::Accent(_) | Mode::Target(_) => load_font(&settings)?,
        Mode::Read | Mode::Outline(_) => font::OverlayFont::empty(),
    };
    let composer = Composer::new(
        font,
        ComposeOptions {
            field_cap: settings.field_cap,
            blur_radius: settings.blur_radius,
            ..ComposeOptions::default()
        },
    );
    let mut pipeline = Pipeline::new(gateway, composer).with_padding(settings.padding);
    if let Some(key) = settings.translate_key(config.key.as_deref()) {
        let mut translator = transform::GoogleTranslate::new(key);
        if let Some(endpoint) = settings.translate_endpoint.as_deref() {
            translator = translator.with_endpoint(endpoint);
        }
        pipeline = pipeline.with_translator(Arc::new(translator));
    }

    let accents = AccentRegistry::with_builtins();
    let rendered = match &config.mode {
        Mode::Read => return pipeline.read_text(image).await,
        Mode::Outline(color) => {
            let color = color.as_deref().unwrap_or(&settings.outline_color);
            let color = compose::parse_color(color)?;
            pipeline.outline(image, color).await?
        }
        Mode::Lang(language) => {
            let transform = LineTransform::Translate {
                language: language.trim().to_lowercase(),
            };
            pipeline.retext(image, &transform).await?
        }
        Mode::Accent(accent) => {
            let transform = LineTransform::Accent(accents.parse(accent)?);
            pipeline.retext(image, &transform).await?
        }
        Mode::Target(target) => {
            let transform = transform::parse_target(target, &accents)?;
            pipeline.retext(image, &transform).await?
        }
    };

    let output = config
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&config.image));
    std::fs::write(&output, &rendered.png)
        .with_context(|| format!("failed to write image: {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(rendered.stats)
}

// Overlay modes cannot draw without a face, so a missing font fails the run
// before the image is sent anywhere.
fn load_font(settings: &settings::Settings) -> anyhow::Result<font::OverlayFont> {
    let font = font::resolve_overlay_font(
        settings.overlay_font_path.as_deref().map(Path::new),
        settings.overlay_font_family.as_deref(),
        font::fallback_families(),
    )
    .with_context(|| "failed to load overlay font (set [overlay] font_path in settings)")?;
    info!("drawing text with {}", font.family());
    Ok(font)
}

/// `photo.jpg` becomes `photo.trocr.png` next to the source.
pub fn default_output_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("image");
    image.with_file_name(format!("{}.trocr.png", stem))
}
