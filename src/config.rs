use crate::splitter::Grammar;

/// Runtime settings of an [`Interpreter`](crate::Interpreter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How strictly operator usage is checked.
    pub grammar: Grammar,
    /// Print the greeting on start and the farewell on exit.
    pub banner: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grammar: Grammar::Lenient,
            banner: true,
        }
    }
}
