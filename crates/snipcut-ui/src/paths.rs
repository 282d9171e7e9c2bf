// src/paths.rs
// Where snipcut looks for config.json.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// An explicit path from the command line wins even if it does not exist, so
/// the load error names the file the user asked for. Otherwise the first
/// existing `config.json` next to the executable, then in the working
/// directory.
pub fn find_config(arg: Option<PathBuf>) -> Option<PathBuf> {
    let exe_dir = std::env::current_exe().ok()
        .and_then(|p| p.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();
    resolve_config(arg, exe_dir.as_deref(), cwd.as_deref())
}

fn resolve_config(arg: Option<PathBuf>, exe_dir: Option<&Path>, cwd: Option<&Path>) -> Option<PathBuf> {
    if arg.is_some() {
        return arg;
    }
    [exe_dir, cwd]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_argument_wins() {
        let got = resolve_config(Some("/etc/snip.json".into()), None, None);
        assert_eq!(got, Some(PathBuf::from("/etc/snip.json")));
    }

    #[test]
    fn exe_dir_before_cwd() {
        let exe = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        std::fs::write(exe.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        std::fs::write(cwd.path().join(CONFIG_FILE_NAME), "{}").unwrap();

        let got = resolve_config(None, Some(exe.path()), Some(cwd.path()));
        assert_eq!(got, Some(exe.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn falls_back_to_cwd_then_none() {
        let exe = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        assert_eq!(resolve_config(None, Some(exe.path()), Some(cwd.path())), None);

        std::fs::write(cwd.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        let got = resolve_config(None, Some(exe.path()), Some(cwd.path()));
        assert_eq!(got, Some(cwd.path().join(CONFIG_FILE_NAME)));
    }
}
