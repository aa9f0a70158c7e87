//! Title to slug conversion and collision resolution.
//!
//! Suffixes follow the pattern existing posts were stored with: the base slug
//! first, then `base-2`, `base-3`, and so on.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::repo::PostRepository;

pub const MAX_SLUG_PROBES: usize = 1000;

#[derive(Debug, Error)]
pub enum SlugError {
    #[error("slug source must contain at least one letter or digit")]
    Empty,
    #[error("no free slug for '{base}' after {probes} candidates")]
    Exhausted { base: String, probes: usize },
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

/// Normalizes free text into a URL-safe slug.
pub fn normalize(seed: &str) -> String {
    lazy_static! {
        static ref NON_AUTHORIZED: Regex = Regex::new(r"[^a-z0-9\-_]").unwrap();
        static ref MULTIPLE_DASHES: Regex = Regex::new(r"-+").unwrap();
    }

    let mut substituted = String::with_capacity(seed.len());
    for c in seed.trim().chars() {
        match c {
            '"' | '\'' | '\u{2019}' => {}
            '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' => substituted.push('-'),
            '&' => substituted.push_str("and"),
            '@' => substituted.push_str("at"),
            _ => substituted.push(c),
        }
    }

    let ascii = deunicode::deunicode_with_tofu(&substituted, "-").to_lowercase();
    let dashed = NON_AUTHORIZED.replace_all(&ascii, "-");
    let collapsed = MULTIPLE_DASHES.replace_all(&dashed, "-");
    collapsed.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Probes the post collection for the first free slug derived from a seed.
#[derive(Clone)]
pub struct SlugAllocator {
    posts: Arc<dyn PostRepository>,
    max_probes: usize,
}

impl SlugAllocator {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self {
            posts,
            max_probes: MAX_SLUG_PROBES,
        }
    }

    #[cfg(test)]
    pub fn with_max_probes(mut self, max_probes: usize) -> Self {
        self.max_probes = max_probes.max(1);
        self
    }

    /// Returns a slug no other post holds. A post listed in `exclude` may keep
    /// the slug it already owns.
    pub async fn allocate(&self, seed: &str, exclude: Option<Uuid>) -> Result<String, SlugError> {
        let base = normalize(seed);
        if base.is_empty() {
            return Err(SlugError::Empty);
        }

        let mut index = 1;
        let mut candidate = base.clone();
        loop {
            match self.posts.find_by_slug(&candidate).await? {
                None => return Ok(candidate),
                Some(owner) if Some(owner.uuid) == exclude => return Ok(candidate),
                Some(_) => {}
            }

            if index >= self.max_probes {
                return Err(SlugError::Exhausted {
                    base,
                    probes: index,
                });
            }
            debug!(slug = %candidate, "slug taken");
            index += 1;
            candidate = format!("{base}-{index}");
        }
    }
}
