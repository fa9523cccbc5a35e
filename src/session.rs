use crate::env::Environment;
use crate::jobs::JobTable;
use std::collections::BTreeMap;

/// State owned by one interactive session and shared with the built-ins.
///
/// The execution engine itself only ever borrows the environment and the
/// job table from here.
#[derive(Debug, Default)]
pub struct Session {
    pub env: Environment,
    /// Every non-blank line entered, oldest first.
    pub history: Vec<String>,
    /// Alias name to replacement text, applied to the first word of each stage.
    pub aliases: BTreeMap<String, String>,
    pub jobs: JobTable,
}

impl Session {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            history: Vec::new(),
            aliases: BTreeMap::new(),
            jobs: JobTable::default(),
        }
    }

    /// `user:dir$ `, where `dir` is the last component of the working directory.
    pub fn prompt(&self) -> String {
        let user = self
            .env
            .get_var("USER")
            .filter(|user| !user.is_empty())
            .unwrap_or_else(|| "user".to_string());
        let dir = self
            .env
            .current_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        format!("{user}:{dir}$ ")
    }
}
