use std::env;

use crate::{
  error::{HeapError, HeapResult},
  search::SearchMode,
};

/// Environment variable selecting the search mode (`first-fit`/`next-fit`).
pub const SEARCH_MODE_ENV: &str = "BRKHEAP_SEARCH_MODE";

/// Environment variable capping the bytes a heap may obtain from its source.
pub const LIMIT_ENV: &str = "BRKHEAP_LIMIT";

/// Construction-time heap settings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  pub search_mode: SearchMode,
  /// Upper bound on bytes obtained from the source, headers included.
  /// Growth past it fails with out-of-memory without touching the source.
  pub limit: Option<usize>,
}

impl HeapConfig {
  pub fn new(
    search_mode: SearchMode,
  ) -> Self {
    Self {
      search_mode,
      limit: None,
    }
  }

  pub fn with_limit(
    mut self,
    limit: usize,
  ) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Reads [`SEARCH_MODE_ENV`] and [`LIMIT_ENV`]. Unset variables keep
  /// their defaults; malformed ones are an error.
  pub fn from_env() -> HeapResult<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  fn from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
  ) -> HeapResult<Self> {
    let mut config = Self::default();

    if let Some(mode) = lookup(SEARCH_MODE_ENV) {
      config.search_mode = mode.parse()?;
    }

    if let Some(limit) = lookup(LIMIT_ENV) {
      let limit = limit
        .trim()
        .parse::<usize>()
        .map_err(|e| HeapError::Config(format!("{LIMIT_ENV}={limit:?}: {e}")))?;
      config.limit = Some(limit);
    }

    Ok(config)
  }
}
