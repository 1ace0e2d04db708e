use anyhow::{Context, anyhow};
use image::ImageReader;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info};

use crate::compose::{Composer, Composition, RenderMode};
use crate::error::{Result, TrocrError};
use crate::gateway::RecognitionGateway;
use crate::geometry::{DEFAULT_PADDING, ImageSize, Reconstruction, TextField, reconstruct, split_lines};
use crate::transform::{LineTransform, TextTranslator, is_changed};
use crate::vision::{Annotations, parse_response};

const NOTHING_TRANSLATED: &str = "could not translate anything on image";
const NOTHING_OUTLINED: &str = "No drawable textboxes";
const NOTHING_RENDERED: &str = "could not draw any text on image, check the overlay font";

/// Encoded PNG plus the human readable run summary.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub png: Vec<u8>,
    pub stats: String,
}

/// Wires recognition, reconstruction, line rewriting and composition for a
/// single image. Cheap to share; every call is independent apart from the
/// gateway queue.
#[derive(Clone)]
pub struct Pipeline {
    gateway: RecognitionGateway,
    translator: Option<Arc<dyn TextTranslator>>,
    composer: Arc<Composer>,
    padding: i32,
}

impl Pipeline {
    pub fn new(gateway: RecognitionGateway, composer: Composer) -> Self {
        Self {
            gateway,
            translator: None,
            composer: Arc::new(composer),
            padding: DEFAULT_PADDING,
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn TextTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_padding(mut self, padding: i32) -> Self {
        self.padding = padding.max(0);
        self
    }

    pub fn gateway(&self) -> &RecognitionGateway {
        &self.gateway
    }

    /// Full recognized text of the image.
    pub async fn read_text(&self, image: Vec<u8>) -> Result<String> {
        let annotations = self.annotate(image).await?;
        if annotations.full_text.trim().is_empty() {
            return Err(TrocrError::NoTextDetected);
        }
        Ok(annotations.full_text)
    }

    /// Replaces every recognized line that `transform` changes.
    pub async fn retext(&self, image: Vec<u8>, transform: &LineTransform) -> Result<Rendered> {
        let size = image_size(&image)?;
        let annotations = self.annotate(image.clone()).await?;
        let lines = split_lines(&annotations.full_text);
        let reconstruction = reconstruct(&lines, &annotations.words, size, self.padding);

        let replacements = transform
            .apply(&lines, self.translator.as_deref())
            .await?;
        let fields = select_changed(&lines, replacements, reconstruction.fields);
        if fields.is_empty() {
            return Err(TrocrError::NothingDrawable(NOTHING_TRANSLATED.to_string()));
        }

        let kept = fields.len();
        let composition = self.compose(image, fields, RenderMode::Overlay).await?;
        if composition.drawn == 0 {
            return Err(TrocrError::NothingDrawable(NOTHING_RENDERED.to_string()));
        }
        let mut notes = reconstruction.notes;
        if composition.drawn < kept {
            notes.push(format!(
                "{} of {} lines could not be drawn",
                kept - composition.drawn,
                kept
            ));
        }
        let stats = format_stats(&notes, reconstruction.consumed_words, kept);
        Ok(Rendered {
            png: composition.png,
            stats,
        })
    }

    /// Draws the padded box of every reconstructed line.
    pub async fn outline(&self, image: Vec<u8>, color: [u8; 4]) -> Result<Rendered> {
        let size = image_size(&image)?;
        let annotations = self.annotate(image.clone()).await?;
        let lines = split_lines(&annotations.full_text);
        let Reconstruction {
            fields,
            consumed_words,
            notes,
        } = reconstruct(&lines, &annotations.words, size, self.padding);

        let fields: Vec<TextField> = fields
            .into_iter()
            .filter(TextField::is_initialized)
            .collect();
        if fields.is_empty() {
            return Err(TrocrError::NothingDrawable(NOTHING_OUTLINED.to_string()));
        }

        let stats = format_stats(&notes, consumed_words, fields.len());
        let composition = self
            .compose(image, fields, RenderMode::Outline { color })
            .await?;
        Ok(Rendered {
            png: composition.png,
            stats,
        })
    }

    async fn annotate(&self, image: Vec<u8>) -> Result<Annotations> {
        let pending = self.gateway.submit(image)?;
        if let Some(wait) = pending.estimated_wait() {
            info!(
                "queued at position {}, please wait ~{}s",
                pending.position(),
                wait.as_secs()
            );
        }
        let response = pending.resolve().await?;
        parse_response(response)
    }

    async fn compose(
        &self,
        image: Vec<u8>,
        fields: Vec<TextField>,
        mode: RenderMode,
    ) -> Result<Composition> {
        let composer = self.composer.clone();
        let composition =
            tokio::task::spawn_blocking(move || composer.compose(&image, &fields, mode))
                .await
                .map_err(|err| anyhow!("composition task failed: {}", err))??;
        debug!("composed image with {} drawn fields", composition.drawn);
        Ok(composition)
    }
}

fn select_changed(
    lines: &[&str],
    replacements: Vec<String>,
    fields: Vec<TextField>,
) -> Vec<TextField> {
    lines
        .iter()
        .zip(replacements)
        .zip(fields)
        .filter_map(|((original, replacement), mut field)| {
            if !field.is_initialized() || !is_changed(original, &replacement) {
                return None;
            }
            field.text = replacement;
            Some(field)
        })
        .collect()
}

/// `Words: N\nLines: M`, followed by any reconstruction notes.
pub fn format_stats(notes: &[String], consumed_words: usize, kept_fields: usize) -> String {
    let mut stats = format!("Words: {}\nLines: {}", consumed_words, kept_fields);
    if !notes.is_empty() {
        stats.push_str("\nNotes: ");
        for note in notes {
            stats.push_str(note);
            stats.push('\n');
        }
    }
    stats
}

/// Reads only the image header.
fn image_size(image: &[u8]) -> Result<ImageSize> {
    let (width, height) = ImageReader::new(Cursor::new(image))
        .with_guessed_format()
        .with_context(|| "failed to read image header")?
        .into_dimensions()
        .with_context(|| "failed to read image dimensions")?;
    Ok(ImageSize::new(width, height))
}
