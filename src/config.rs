//! Configuration for [`GintHash`](crate::GintHash).

/// Default level ceiling.
///
/// A level 24 directory with bucket capacity 3 takes roughly 640 MB on
/// 32-bit targets and about twice that on 64-bit ones.
pub const DEFAULT_MAX_LEVEL: u32 = 24;

/// Tuning knobs for the extendible gint table
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub(crate) max_level: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

impl Config {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level ceiling.
    ///
    /// The directory may grow to any level strictly below `level`. Levels
    /// of 1 or less leave no usable level, so table creation fails.
    /// Values beyond what a directory index can address are clamped to
    /// `usize::BITS - 1`.
    #[must_use]
    pub fn max_level(mut self, level: u32) -> Self {
        self.max_level = level.min(usize::BITS - 1);
        self
    }

    /// Returns the level ceiling.
    pub fn get_max_level(&self) -> u32 {
        self.max_level
    }
}
