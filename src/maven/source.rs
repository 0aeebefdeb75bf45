//! Descriptor sources
//!
//! A [`DescriptorSource`] fetches the descriptor file of a component by
//! identity. It is the only way the resolver reaches a package store, so
//! tests can hand it in-memory fixtures.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::domain::ComponentId;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Descriptor for {0} not found")]
    NotFound(ComponentId),

    #[error("Failed to read descriptor {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Descriptor {path} is not valid {encoding}")]
    Decode { path: PathBuf, encoding: &'static str },
}

/// Contents of one descriptor file, with where it came from
#[derive(Clone, PartialEq, Eq)]
pub struct DescriptorFile {
    origin: String,
    contents: Arc<str>,
}

impl DescriptorFile {
    /// An in-memory descriptor; `origin` is only used in messages
    pub fn new(origin: impl Into<String>, contents: impl Into<Arc<str>>) -> Self {
        Self {
            origin: origin.into(),
            contents: contents.into(),
        }
    }

    /// Reads a descriptor from disk, decoding it per its byte-order mark or
    /// XML declaration (UTF-8 when neither is present)
    pub fn read(path: &Path) -> Result<Self, FetchError> {
        let bytes = std::fs::read(path).map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let contents = decode_xml(&bytes).map_err(|encoding| FetchError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        })?;
        Ok(Self::new(path.display().to_string(), contents))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }
}

impl fmt::Debug for DescriptorFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorFile")
            .field("origin", &self.origin)
            .field("len", &self.contents.len())
            .finish()
    }
}

/// Decodes an XML document, failing with the encoding that rejected it
fn decode_xml(bytes: &[u8]) -> Result<String, &'static Encoding> {
    let (encoding, bom_len) = Encoding::for_bom(bytes)
        .unwrap_or_else(|| (declared_encoding(bytes).unwrap_or(UTF_8), 0));

    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        return Err(encoding);
    }
    Ok(text.into_owned())
}

/// The `encoding` of the XML declaration, if the document starts with one.
///
/// The declaration was readable as ASCII, so encodings that are not
/// ASCII-compatible (UTF-16 without a BOM) are ignored.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let Ok(Event::Decl(decl)) = reader.read_event_into(&mut buf) else {
        return None;
    };
    let label = decl.encoding()?.ok()?;
    Encoding::for_label(&label).filter(|encoding| encoding.is_ascii_compatible())
}

/// Fetches descriptor files by component identity
pub trait DescriptorSource: Sync {
    fn fetch(&self, id: &ComponentId) -> Result<DescriptorFile, FetchError>;
}

impl<F> DescriptorSource for F
where
    F: Fn(&ComponentId) -> Result<DescriptorFile, FetchError> + Sync,
{
    fn fetch(&self, id: &ComponentId) -> Result<DescriptorFile, FetchError> {
        self(id)
    }
}

/// In-memory descriptors keyed by identity
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: HashMap<ComponentId, DescriptorFile>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ComponentId, xml: impl Into<Arc<str>>) {
        let file = DescriptorFile::new(format!("memory:{}", id), xml);
        self.files.insert(id, file);
    }

    pub fn with(mut self, id: ComponentId, xml: impl Into<Arc<str>>) -> Self {
        self.insert(id, xml);
        self
    }
}

impl DescriptorSource for MemorySource {
    fn fetch(&self, id: &ComponentId) -> Result<DescriptorFile, FetchError> {
        self.files
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(id.clone()))
    }
}

/// Memoizes another source by identity.
///
/// Concurrent misses for the same identity may fetch twice; the first
/// insert wins and later callers get that copy.
pub struct CachingSource<S> {
    inner: S,
    cache: Mutex<HashMap<ComponentId, DescriptorFile>>,
}

impl<S: DescriptorSource> CachingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: DescriptorSource> DescriptorSource for CachingSource<S> {
    fn fetch(&self, id: &ComponentId) -> Result<DescriptorFile, FetchError> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(file) = cache.get(id) {
                return Ok(file.clone());
            }
        }

        // Fetch outside the lock so slow stores don't serialize workers
        let file = self.inner.fetch(id)?;

        match self.cache.lock() {
            Ok(mut cache) => Ok(cache.entry(id.clone()).or_insert(file).clone()),
            Err(_) => Ok(file),
        }
    }
}
