use std::path::{Path, PathBuf};

/// Selector entry that switches to free-form path entry
pub const NEW_KUBECONFIG_ENTRY: &str = "+ Enter new kubeconfig path...";

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// `$KUBECONFIG` (first entry) or `~/.kube/config`
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    if let Some(value) = std::env::var_os("KUBECONFIG") {
        if let Some(first) = std::env::split_paths(&value).find(|p| !p.as_os_str().is_empty()) {
            return Some(first);
        }
    }
    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}

/// Kubeconfig candidates: the new-path entry, the default kubeconfig and any
/// other `config*` file in `~/.kube`
pub fn discover_kubeconfigs() -> Vec<String> {
    let kube_dir = dirs::home_dir().map(|home| home.join(".kube"));
    discover_in(kube_dir.as_deref(), default_kubeconfig_path())
}

fn discover_in(kube_dir: Option<&Path>, default: Option<PathBuf>) -> Vec<String> {
    let mut candidates = vec![NEW_KUBECONFIG_ENTRY.to_string()];
    if let Some(default) = &default {
        candidates.push(default.display().to_string());
    }

    let Some(dir) = kube_dir else {
        return candidates;
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return candidates;
    };

    let mut extra: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("config"))
        .map(|entry| entry.path())
        .filter(|path| Some(path) != default.as_ref())
        .map(|path| path.display().to_string())
        .collect();
    extra.sort();
    candidates.extend(extra);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_lists_config_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config"), "").unwrap();
        std::fs::write(dir.path().join("config-staging"), "").unwrap();
        std::fs::write(dir.path().join("kubectx"), "").unwrap();
        std::fs::create_dir(dir.path().join("cache")).unwrap();

        let default = dir.path().join("config");
        let found = discover_in(Some(dir.path()), Some(default.clone()));

        assert_eq!(
            found,
            vec![
                NEW_KUBECONFIG_ENTRY.to_string(),
                default.display().to_string(),
                dir.path().join("config-staging").display().to_string(),
            ]
        );
    }

    #[test]
    fn test_discover_without_kube_dir() {
        let found = discover_in(None, None);
        assert_eq!(found, vec![NEW_KUBECONFIG_ENTRY.to_string()]);
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/etc/kube/config"), PathBuf::from("/etc/kube/config"));
    }
}
