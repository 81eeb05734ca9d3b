use std::path::PathBuf;

const WATCH_FLAG: &str = "watch=";
const FLAG_PREFIX: char = '-';

/// What to run and what to watch, resolved once from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfiguration {
    pub watch_target: Option<String>,
    pub script_path: Option<PathBuf>,
}

impl RunConfiguration {
    /// Interpret run arguments (program name excluded).
    ///
    /// `watch=<name>` sets the watch target, splitting on the first `=` only;
    /// the last occurrence wins and an empty name means no target. The first
    /// argument that is not flag-like becomes the script path and later ones
    /// are ignored, as are unknown flags. Never fails.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            if let Some(name) = arg.strip_prefix(WATCH_FLAG) {
                config.watch_target = (!name.is_empty()).then(|| name.to_string());
            } else if config.script_path.is_none() && !arg.starts_with(FLAG_PREFIX) {
                config.script_path = Some(PathBuf::from(arg));
            } else {
                tracing::debug!(arg, "ignoring run argument");
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_arguments() {
        let config = RunConfiguration::from_args(Vec::<String>::new());
        assert_eq!(config, RunConfiguration::default());
    }

    #[rstest]
    #[case(&["watch=y", "script.txt"])]
    #[case(&["script.txt", "watch=y"])]
    fn order_independent(#[case] args: &[&str]) {
        let config = RunConfiguration::from_args(args);
        assert_eq!(config.watch_target.as_deref(), Some("y"));
        assert_eq!(config.script_path, Some(PathBuf::from("script.txt")));
    }

    #[test]
    fn watch_splits_on_first_equals_only() {
        let config = RunConfiguration::from_args(["watch=a=b"]);
        assert_eq!(config.watch_target.as_deref(), Some("a=b"));
    }

    #[test]
    fn last_watch_wins() {
        let config = RunConfiguration::from_args(["watch=a", "watch=b"]);
        assert_eq!(config.watch_target.as_deref(), Some("b"));
    }

    #[test]
    fn empty_watch_name_means_no_target() {
        let config = RunConfiguration::from_args(["watch=a", "watch="]);
        assert_eq!(config.watch_target, None);
    }

    #[test]
    fn first_positional_is_the_script() {
        let config = RunConfiguration::from_args(["first.ql", "second.ql"]);
        assert_eq!(config.script_path, Some(PathBuf::from("first.ql")));
    }

    #[test]
    fn unknown_flags_are_ignored() {
        let config = RunConfiguration::from_args(["-v", "--fast", "main.ql", "-x"]);
        assert_eq!(config.script_path, Some(PathBuf::from("main.ql")));
        assert_eq!(config.watch_target, None);
    }

    #[test]
    fn watch_flag_is_never_the_script() {
        let config = RunConfiguration::from_args(["watch=x"]);
        assert_eq!(config.script_path, None);
    }
}
