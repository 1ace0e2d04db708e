use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

/// Font used to draw replacement text.
#[derive(Clone)]
pub struct OverlayFont {
    db: Arc<fontdb::Database>,
    family: String,
}

impl std::fmt::Debug for OverlayFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayFont")
            .field("family", &self.family)
            .field("faces", &self.db.len())
            .finish()
    }
}

impl OverlayFont {
    /// A font set with no faces. Text drawn with it renders nothing.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
            family: "sans-serif".to_string(),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub(crate) fn database(&self) -> Arc<fontdb::Database> {
        self.db.clone()
    }
}

#[cfg(target_os = "macos")]
pub fn fallback_families() -> &'static [&'static str] {
    &["DejaVu Sans", "Helvetica", "sans-serif"]
}

#[cfg(target_os = "windows")]
pub fn fallback_families() -> &'static [&'static str] {
    &["DejaVu Sans", "Arial", "sans-serif"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn fallback_families() -> &'static [&'static str] {
    &["DejaVu Sans", "NotoSans", "sans-serif"]
}

pub fn resolve_overlay_font(
    font_path: Option<&Path>,
    font_family: Option<&str>,
    fallback: &[&str],
) -> Result<OverlayFont> {
    if let Some(path) = font_path {
        return load_font_file(path);
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    if let Some(family) = font_family {
        let family = find_family(&db, family)?;
        return Ok(OverlayFont {
            db: Arc::new(db),
            family,
        });
    }

    for candidate in fallback {
        if let Ok(family) = find_family(&db, candidate) {
            return Ok(OverlayFont {
                db: Arc::new(db),
                family,
            });
        }
    }

    Err(anyhow!("no fallback fonts found"))
}

fn load_font_file(path: &Path) -> Result<OverlayFont> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    let family = family_from_data(&data)
        .ok_or_else(|| anyhow!("failed to parse font: {}", path.display()))?;
    let mut db = fontdb::Database::new();
    db.load_font_data(data);
    Ok(OverlayFont {
        db: Arc::new(db),
        family,
    })
}

fn find_family(db: &fontdb::Database, family: &str) -> Result<String> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let resolved = db
        .with_face_data(id, |data, index| family_from_face(data, index))
        .flatten()
        .unwrap_or_else(|| family.to_string());
    Ok(resolved)
}

fn family_from_data(data: &[u8]) -> Option<String> {
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    (0..count).find_map(|index| family_from_face(data, index))
}

fn family_from_face(data: &[u8], index: u32) -> Option<String> {
    let face = Face::parse(data, index).ok()?;
    extract_family_name(&face)
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
