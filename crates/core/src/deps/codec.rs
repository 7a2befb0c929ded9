//! Naming of scratch directories for extracted dependency archives

use std::path::Path;

/// Turns a dependency location into a directory name under the scratch root.
///
/// With hashing enabled the name is the MD5 of the location's absolute path,
/// which keeps it short on filesystems with path-length limits. Otherwise the
/// path is made relative to the local repository and any drive prefix is
/// dropped, which is readable but can get long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCodec {
    hash_paths: bool,
    repository: Option<String>,
}

impl PathCodec {
    pub fn hashed() -> Self {
        Self {
            hash_paths: true,
            repository: None,
        }
    }

    pub fn truncating(repository: Option<&Path>) -> Self {
        Self {
            hash_paths: false,
            repository: repository.map(normalized_repository),
        }
    }

    pub fn new(hash_paths: bool, repository: Option<&Path>) -> Self {
        if hash_paths {
            Self::hashed()
        } else {
            Self::truncating(repository)
        }
    }

    pub fn encode(&self, location: &Path) -> String {
        let absolute = std::path::absolute(location).unwrap_or_else(|_| location.to_path_buf());
        let path = absolute.to_string_lossy();

        if self.hash_paths {
            return format!("{:x}", md5::compute(path.as_bytes()));
        }

        self.truncate(&path)
    }

    fn truncate(&self, raw: &str) -> String {
        let mut path = raw.replace('\\', "/");

        if let Some(repository) = &self.repository {
            if let Some(index) = path.find(repository.as_str()) {
                path = path[index + repository.len()..].to_string();
            }
        }

        // C:/ style prefixes left over after the repository strip
        if let Some(colon) = path.find(':') {
            path = path.get(colon + 2..).unwrap_or_default().to_string();
        }

        path.trim_start_matches('/').to_string()
    }
}

impl Default for PathCodec {
    fn default() -> Self {
        Self::hashed()
    }
}

/// Absolute with `/` separators and a trailing `/`, matching how `encode` sees locations
fn normalized_repository(repository: &Path) -> String {
    let raw = repository.to_string_lossy();
    let mut base = if has_drive_prefix(&raw) {
        raw.replace('\\', "/")
    } else {
        std::path::absolute(repository)
            .unwrap_or_else(|_| repository.to_path_buf())
            .to_string_lossy()
            .replace('\\', "/")
    };
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_hashed_name_is_stable_md5_hex() {
        let codec = PathCodec::hashed();
        let location = PathBuf::from("/home/dev/.m2/repository/com/acme/api/1.0/api-1.0.jar");

        let first = codec.encode(&location);
        let second = codec.encode(&location);

        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(
            first,
            format!("{:x}", md5::compute(location.to_string_lossy().as_bytes()))
        );
    }

    #[test]
    fn test_hashed_names_differ_per_location() {
        let codec = PathCodec::hashed();
        let a = codec.encode(Path::new("/repo/a-1.0.jar"));
        let b = codec.encode(Path::new("/repo/b-1.0.jar"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_truncation_strips_repository_prefix() {
        let codec = PathCodec::truncating(Some(Path::new("/home/dev/.m2/repository")));
        let name = codec.encode(Path::new(
            "/home/dev/.m2/repository/com/acme/api/1.0/api-1.0.jar",
        ));
        assert_eq!(name, "com/acme/api/1.0/api-1.0.jar");
    }

    #[test]
    fn test_truncation_strips_drive_letter() {
        let codec = PathCodec::truncating(Some(Path::new("D:\\m2\\repository")));
        assert_eq!(
            codec.truncate("C:\\libs\\vendor\\api.jar"),
            "libs/vendor/api.jar"
        );
        assert_eq!(
            codec.truncate("D:\\m2\\repository\\com\\acme\\api.jar"),
            "com/acme/api.jar"
        );
    }

    #[test]
    fn test_truncation_without_repository_keeps_path() {
        let codec = PathCodec::truncating(None);
        assert_eq!(codec.truncate("/opt/deps/api.jar"), "opt/deps/api.jar");
    }

    #[test]
    fn test_relative_repository_matches_relative_location() {
        let codec = PathCodec::truncating(Some(Path::new("build/repo")));
        let name = codec.encode(Path::new("build/repo/com/acme/api/1.0/api-1.0.jar"));
        assert_eq!(name, "com/acme/api/1.0/api-1.0.jar");
    }
}
