use std::path::Path;
use std::sync::Mutex;

use crate::font::{OverlayFont, fallback_families, resolve_overlay_font};

// Guards every test that touches the process environment.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Runs `func` with the given variables set (`Some`) or removed (`None`),
/// restoring the previous values afterwards.
pub(crate) fn with_env<F, R>(vars: &[(&str, Option<&str>)], func: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(name, _)| (name.to_string(), std::env::var(name).ok()))
        .collect();
    for (name, value) in vars {
        set_or_remove(name, *value);
    }
    let result = func();
    for (name, value) in &saved {
        set_or_remove(name, value.as_deref());
    }
    result
}

fn set_or_remove(name: &str, value: Option<&str>) {
    // SAFETY: callers hold ENV_MUTEX for the whole read-modify-restore cycle.
    match value {
        Some(value) => unsafe { std::env::set_var(name, value) },
        None => unsafe { std::env::remove_var(name) },
    }
}

/// Fresh `HOME` with no `GOOGLE_API_KEY`, so settings layers and key lookup
/// only see what the test writes.
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&Path) -> R,
{
    let dir = tempfile::tempdir().expect("tempdir");
    let home = dir.path().to_string_lossy().into_owned();
    with_env(
        &[("HOME", Some(home.as_str())), ("GOOGLE_API_KEY", None)],
        || func(dir.path()),
    )
}

/// An installed overlay face, or `None` on machines without one of the
/// fallback families. Draw tests skip themselves in that case.
pub(crate) fn system_font() -> Option<OverlayFont> {
    match resolve_overlay_font(None, None, fallback_families()) {
        Ok(font) => Some(font),
        Err(err) => {
            eprintln!("skipping draw assertions: {}", err);
            None
        }
    }
}
