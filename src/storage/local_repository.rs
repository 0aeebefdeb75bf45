//! Maven-layout local repository as a descriptor source

use std::path::{Path, PathBuf};

use crate::domain::ComponentId;
use crate::maven::{DescriptorFile, DescriptorSource, FetchError};

/// Reads `<root>/<group path>/<artifact>/<version>/<artifact>-<version>.pom`
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the descriptor of `id` lives in this repository
    pub fn descriptor_path(&self, id: &ComponentId) -> PathBuf {
        self.root
            .join(id.repository_path())
            .join(format!("{}-{}.pom", id.artifact(), id.version()))
    }
}

impl DescriptorSource for LocalRepository {
    fn fetch(&self, id: &ComponentId) -> Result<DescriptorFile, FetchError> {
        let path = self.descriptor_path(id);
        if !path.is_file() {
            tracing::debug!(component = %id, path = %path.display(), "Descriptor not in local repository");
            return Err(FetchError::NotFound(id.clone()));
        }
        DescriptorFile::read(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maven::parse_pom;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn descriptor_path_layout() {
        let repo = LocalRepository::new("/repo");
        let id = ComponentId::new("org.apache.commons", "commons-lang3", "3.14.0");
        assert_eq!(
            repo.descriptor_path(&id),
            PathBuf::from("/repo/org/apache/commons/commons-lang3/3.14.0/commons-lang3-3.14.0.pom")
        );
    }

    #[test]
    fn fetches_existing_descriptor() {
        let dir = TempDir::new().unwrap();
        let repo = LocalRepository::new(dir.path());
        let id = ComponentId::new("g.h", "a", "1");

        let path = repo.descriptor_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<project/>").unwrap();

        let file = repo.fetch(&id).unwrap();
        assert_eq!(file.contents(), "<project/>");
        assert_eq!(file.origin(), path.display().to_string());
    }

    #[test]
    fn fetches_latin1_descriptor() {
        let dir = TempDir::new().unwrap();
        let repo = LocalRepository::new(dir.path());
        let id = ComponentId::new("org.legacy", "old", "1.0");

        let path = repo.descriptor_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut pom = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n".to_vec();
        pom.extend_from_slice(b"<project><groupId>org.legacy</groupId><artifactId>old</artifactId>");
        pom.extend_from_slice(b"<version>1.0</version><developers><developer>");
        pom.extend_from_slice(b"<name>Ren\xE9 M\xFCller</name></developer></developers></project>");
        fs::write(&path, pom).unwrap();

        let file = repo.fetch(&id).unwrap();
        let descriptor = parse_pom(file.contents()).unwrap();
        assert_eq!(
            descriptor.developers[0].name.as_deref(),
            Some("Ren\u{e9} M\u{fc}ller")
        );
    }

    #[test]
    fn missing_descriptor_is_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = LocalRepository::new(dir.path());
        let id = ComponentId::new("g", "a", "1");
        assert!(matches!(repo.fetch(&id), Err(FetchError::NotFound(missing)) if missing == id));
    }
}
