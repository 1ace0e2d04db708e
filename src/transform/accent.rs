use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const MIN_SEVERITY: u32 = 1;
pub const MAX_SEVERITY: u32 = 10;

/// Text transform applied to one line at a time.
pub trait Accent: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, text: &str, severity: u32) -> String;
}

/// An accent together with the severity it is applied at.
#[derive(Clone)]
pub struct AccentSpec {
    pub accent: Arc<dyn Accent>,
    pub severity: u32,
}

impl fmt::Debug for AccentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccentSpec")
            .field("accent", &self.accent.name())
            .field("severity", &self.severity)
            .finish()
    }
}

impl AccentSpec {
    pub fn apply(&self, text: &str) -> String {
        self.accent.apply(text, self.severity)
    }
}

/// `txet sesreveR`
#[derive(Debug, Clone, Copy, Default)]
pub struct Reversed;

impl Accent for Reversed {
    fn name(&self) -> &str {
        "reversed"
    }

    fn apply(&self, text: &str, _severity: u32) -> String {
        text.chars().rev().collect()
    }
}

#[derive(Clone, Default)]
pub struct AccentRegistry {
    accents: BTreeMap<String, Arc<dyn Accent>>,
}

impl AccentRegistry {
    pub fn with_builtins() -> Self {
        Self::default().register(Arc::new(Reversed))
    }

    pub fn register(mut self, accent: Arc<dyn Accent>) -> Self {
        self.accents
            .insert(normalize_name(accent.name()), accent);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.accents.keys().map(String::as_str)
    }

    /// Parses `name` or `name[severity]`. Severity defaults to 1.
    pub fn parse(&self, argument: &str) -> Result<AccentSpec> {
        let argument = argument.trim();
        let (name, severity) = match argument.strip_suffix(']') {
            Some(head) => {
                let (name, severity) = head
                    .rsplit_once('[')
                    .ok_or_else(|| anyhow!("malformed accent '{}'", argument))?;
                let severity = severity
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| anyhow!("{}: severity must be integer", name.trim()))?;
                (name, severity)
            }
            None => (argument, MIN_SEVERITY),
        };
        let name = normalize_name(name);

        let accent = self
            .accents
            .get(&name)
            .cloned()
            .ok_or_else(|| anyhow!("not a valid accent: {}", name))?;
        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&severity) {
            return Err(anyhow!(
                "{}: severity must be between {} and {}",
                name,
                MIN_SEVERITY,
                MAX_SEVERITY
            ));
        }
        Ok(AccentSpec { accent, severity })
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().replace(' ', "_").to_lowercase()
}
