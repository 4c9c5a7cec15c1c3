use serde::Deserialize;

/// Tuning knobs for the pushdown rewrites. The defaults match the
/// behavior the planner expects; the struct exists so embedders can
/// disable individual rewrites when a storage backend cannot honor them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CombinerSettings {
    /// Rewrite `col ~~ 'pattern'` and `prefix(col, s)` into range
    /// filters on the pattern prefix.
    pub rewrite_like_patterns: bool,

    /// Rewrite `col IN (consecutive integers)` into a `>= min AND <= max`
    /// filter pair.
    pub rewrite_in_lists: bool,

    /// IN lists longer than this are never considered for the
    /// consecutive rewrite.
    pub max_in_list_values: usize,
}

impl Default for CombinerSettings {
    fn default() -> Self {
        CombinerSettings {
            rewrite_like_patterns: true,
            rewrite_in_lists: true,
            max_in_list_values: 64,
        }
    }
}
