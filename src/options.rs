#[derive(Debug, Clone)]
pub struct Options {
    pub indent_size: usize,
    pub indent_char: String,
    /// Iteration ceiling for the full-pipeline constant folder.
    pub max_fold_passes: usize,
    /// Iteration ceiling for the standalone flat folder.
    pub flat_fold_passes: usize,
    /// Decoder function name used when neither heuristic finds one.
    pub decoder_fallback: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            indent_size: 4,
            indent_char: " ".to_string(),
            max_fold_passes: 150,
            flat_fold_passes: 50,
            decoder_fallback: "m".to_string(),
        }
    }
}
