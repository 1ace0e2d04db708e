use anyhow::anyhow;
use std::future::Future;
use std::pin::Pin;

use crate::error::{Result, TrocrError};

mod accent;
mod google;

pub use accent::{Accent, AccentRegistry, AccentSpec, MAX_SEVERITY, MIN_SEVERITY, Reversed};
pub use google::{DEFAULT_ENDPOINT as TRANSLATE_ENDPOINT, GoogleTranslate};

pub type TranslateFuture = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

/// Translation backend. The source language is detected by the backend.
pub trait TextTranslator: Send + Sync {
    fn translate(&self, text: String, target_language: &str) -> TranslateFuture;
}

/// How recognized lines are rewritten before being drawn back.
#[derive(Debug, Clone)]
pub enum LineTransform {
    Translate { language: String },
    Accent(AccentSpec),
}

impl LineTransform {
    /// Returns exactly one replacement per input line, in order.
    pub async fn apply(
        &self,
        lines: &[&str],
        translator: Option<&dyn TextTranslator>,
    ) -> Result<Vec<String>> {
        match self {
            LineTransform::Translate { language } => {
                let translator =
                    translator.ok_or_else(|| anyhow!("no translator is configured"))?;
                translate_lines(lines, language, translator).await
            }
            LineTransform::Accent(spec) => Ok(accent_lines(lines, spec)),
        }
    }
}

/// Whether a replacement differs from its line once case is ignored. Lines
/// that come back unchanged are not redrawn.
pub fn is_changed(original: &str, replacement: &str) -> bool {
    fold_case(original) != fold_case(replacement)
}

// Unicode lowercase plus the caseless expansions lowercase misses, so
// "STRASSE" and "straße" compare equal.
fn fold_case(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .fold(String::with_capacity(text.len()), |mut folded, ch| {
            match ch {
                'ß' | 'ẞ' => folded.push_str("ss"),
                'ς' => folded.push('σ'),
                'ſ' => folded.push('s'),
                _ => folded.push(ch),
            }
            folded
        })
}

async fn translate_lines(
    lines: &[&str],
    language: &str,
    translator: &dyn TextTranslator,
) -> Result<Vec<String>> {
    let translated = translator.translate(lines.join("\n"), language).await?;
    let translated: Vec<String> = translated.split('\n').map(str::to_string).collect();
    if translated.len() != lines.len() {
        return Err(TrocrError::LineCountMismatch {
            expected: lines.len(),
            actual: translated.len(),
        });
    }
    Ok(translated)
}

// Each line is transformed on its own; fields map 1:1 to lines.
fn accent_lines(lines: &[&str], spec: &AccentSpec) -> Vec<String> {
    lines
        .iter()
        .map(|line| spec.apply(line).replace('\n', " "))
        .collect()
}

/// A `--lang`/`--accent` style argument resolved to a transform. Registered
/// accents win over language codes, so short accent names stay reachable.
pub fn parse_target(argument: &str, accents: &AccentRegistry) -> anyhow::Result<LineTransform> {
    let accent = match accents.parse(argument) {
        Ok(spec) => return Ok(LineTransform::Accent(spec)),
        Err(err) => err,
    };
    if is_language_code(argument) {
        return Ok(LineTransform::Translate {
            language: argument.trim().to_lowercase(),
        });
    }
    Err(anyhow!(
        "'{}' is neither a language code nor an accent ({})",
        argument,
        accent
    ))
}

fn is_language_code(argument: &str) -> bool {
    let argument = argument.trim();
    let (base, suffix) = match argument.split_once('-') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (argument, None),
    };
    let base_ok = (2..=3).contains(&base.len()) && base.chars().all(|ch| ch.is_ascii_alphabetic());
    let suffix_ok = suffix
        .map(|suffix| {
            (2..=4).contains(&suffix.len()) && suffix.chars().all(|ch| ch.is_ascii_alphanumeric())
        })
        .unwrap_or(true);
    base_ok && suffix_ok
}
