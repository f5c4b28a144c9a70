//! Directory producer
//!
//! Primary producer serving `<root>/<package path>/<Name>.java` files.
//! Nested types are claimed through their top-level file.

use crate::features::source_producer::ports::{
    ProduceError, ProducerKind, SourceProducer, TypeLookup,
};
use crate::shared::models::Fqn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXTENSION: &str = "java";

pub struct DirectorySourceProducer {
    name: String,
    root: PathBuf,
}

impl DirectorySourceProducer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            name: format!("dir:{}", root.display()),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, fqn: &Fqn) -> PathBuf {
        let mut path = self.root.clone();
        for segment in fqn.as_str().split('.') {
            path.push(segment);
        }
        path.set_extension(EXTENSION);
        path
    }

    /// Innermost prefix of `fqn` backed by a file
    fn top_level_of(&self, fqn: &Fqn) -> Option<Fqn> {
        let mut candidate = Some(fqn.clone());
        while let Some(name) = candidate {
            if self.path_for(&name).is_file() {
                return Some(name);
            }
            candidate = name.parent();
        }
        None
    }

    fn fqn_for(&self, file: &Path) -> Option<Fqn> {
        if file.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            return None;
        }
        let relative = file.strip_prefix(&self.root).ok()?.with_extension("");
        let segments: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Fqn::parse(&segments.join("."))
    }
}

impl SourceProducer for DirectorySourceProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProducerKind {
        ProducerKind::Primary
    }

    fn is_type(&self, fqn: &Fqn) -> bool {
        self.top_level_of(fqn).is_some()
    }

    fn is_top_level_type(&self, fqn: &Fqn) -> bool {
        self.path_for(fqn).is_file()
    }

    fn find_files_for_type(&self, fqn: &Fqn) -> Vec<PathBuf> {
        self.top_level_of(fqn)
            .map(|top| vec![self.path_for(&top)])
            .unwrap_or_default()
    }

    fn produce(
        &self,
        fqn: &Fqn,
        _prior: Option<&str>,
        _lookup: &dyn TypeLookup,
    ) -> Result<String, ProduceError> {
        let path = self.path_for(fqn);
        std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProduceError::NotFound(fqn.clone())
            } else {
                ProduceError::Io { path, source }
            }
        })
    }

    fn types_for_file(&self, file: &Path) -> Vec<Fqn> {
        self.fqn_for(file).into_iter().collect()
    }

    fn all_type_names(&self) -> Vec<Fqn> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| self.fqn_for(entry.path()))
            .filter(|fqn| !matches!(fqn.simple_name(), "module-info" | "package-info"))
            .collect()
    }
}
