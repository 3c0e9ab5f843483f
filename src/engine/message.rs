//! Rotating bid messages.

use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;

/// Token replaced by the listing title in every template.
pub const TITLE_PLACEHOLDER: &str = "$title";

/// Message used when no template is available.
pub fn fallback_message(title: &str) -> String {
    format!(
        "Bonjour,\n\nNous pouvons intervenir immédiatement sur votre projet {}.\nCordialement,\nVotre équipe",
        title
    )
}

/// Pick one template uniformly at random and fill in the title.
pub fn compose<R: Rng + ?Sized>(title: &str, templates: &[String], rng: &mut R) -> String {
    match templates.choose(rng) {
        Some(template) => template.replace(TITLE_PLACEHOLDER, title),
        None => fallback_message(title),
    }
}

/// Read every `*.txt` file in `dir` as a template, ordered by file name.
///
/// A missing directory yields no templates; callers then fall back to
/// [`fallback_message`].
pub fn load_templates(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "message directory unavailable");
            return Vec::new();
        }
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();
    paths.sort();

    let mut templates = Vec::with_capacity(paths.len());
    for path in paths {
        match std::fs::read_to_string(&path) {
            Ok(content) => templates.push(content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable template");
            }
        }
    }
    tracing::debug!(dir = %dir.display(), count = templates.len(), "templates loaded");
    templates
}
