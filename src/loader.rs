//! Retrieval of raw schema text by locator.
//!
//! The builder never touches the filesystem or the network itself; it asks a
//! [`SchemaLoader`](trait.SchemaLoader.html) for the text behind a locator.
//! Loaders report a missing schema as `Ok(None)` and reserve `Err` for real
//! failures. Nothing here retries or caches.

use failure::{format_err, Error};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Fetches raw schema text for a locator (a URI or a path).
pub trait SchemaLoader {
    fn load_schema(&self, locator: &str) -> Result<Option<String>, Error>;
}

impl<'a, L: SchemaLoader + ?Sized> SchemaLoader for &'a L {
    fn load_schema(&self, locator: &str) -> Result<Option<String>, Error> {
        (**self).load_schema(locator)
    }
}

impl<L: SchemaLoader + ?Sized> SchemaLoader for Box<L> {
    fn load_schema(&self, locator: &str) -> Result<Option<String>, Error> {
        (**self).load_schema(locator)
    }
}

/// Reads schemas from local files. Locators are paths or `file:` URLs.
///
/// A file that cannot be read is reported as absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl SchemaLoader for FileLoader {
    fn load_schema(&self, locator: &str) -> Result<Option<String>, Error> {
        let path = match Url::parse(locator) {
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => path,
                Err(_) => return Ok(None),
            },
            // Single letters are Windows drive prefixes, not schemes.
            Ok(url) if url.scheme().len() > 1 => return Ok(None),
            _ => PathBuf::from(locator),
        };

        Ok(fs::read_to_string(path).ok())
    }
}

/// Serves schemas from an in-memory table of locator to text.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    documents: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.documents.insert(locator.into(), text.into());
        self
    }
}

impl SchemaLoader for MemoryLoader {
    fn load_schema(&self, locator: &str) -> Result<Option<String>, Error> {
        Ok(self.documents.get(locator).cloned())
    }
}

/// Retrieves a remote schema. Plugged into an [`AutoLoader`](struct.AutoLoader.html).
pub trait Fetcher {
    fn fetch(&self, uri: &Url) -> Result<String, Error>;
}

impl<F> Fetcher for F
where
    F: Fn(&Url) -> Result<String, Error>,
{
    fn fetch(&self, uri: &Url) -> Result<String, Error> {
        self(uri)
    }
}

/// Maps schema URIs below a base URI onto files below a local directory, and
/// hands every other URI to a [`Fetcher`](trait.Fetcher.html).
///
/// Given a base of `http://example.com/schemas/` and a root of
/// `/var/schemas`, `http://example.com/schemas/foo/bar` is read from
/// `/var/schemas/foo/bar.json`. A `.json` extension is appended when the last
/// path segment has none.
pub struct AutoLoader {
    base_uri: Url,
    schema_root: PathBuf,
    uri_map: HashMap<String, PathBuf>,
    fetcher: Option<Box<dyn Fetcher>>,
}

impl AutoLoader {
    pub fn new(base_uri: &str, schema_root: impl Into<PathBuf>) -> Result<Self, Error> {
        let mut base_uri = Url::parse(base_uri)?;
        if !base_uri.path().ends_with('/') {
            let path = format!("{}/", base_uri.path());
            base_uri.set_path(&path);
        }

        Ok(AutoLoader {
            base_uri,
            schema_root: schema_root.into(),
            uri_map: HashMap::new(),
            fetcher: None,
        })
    }

    /// Use `fetcher` for URIs outside of the base.
    pub fn with_fetcher<F: Fetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Serve `uri` from `path`, wherever either of them lives.
    pub fn map_uri_to_file(&mut self, uri: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.uri_map.insert(uri.into(), path.into());
        self
    }

    /// The local file for `uri`, if `uri` lies below the base URI.
    fn local_path(&self, uri: &Url) -> Option<PathBuf> {
        if uri.host_str() != self.base_uri.host_str() {
            return None;
        }

        let sub_path = uri.path().strip_prefix(self.base_uri.path())?;
        let file_name = sub_path.rsplit('/').next().unwrap_or_default();

        let mut path = self.schema_root.clone();
        path.extend(sub_path.split('/').filter(|segment| !segment.is_empty()));
        if !file_name.contains('.') {
            path.set_extension("json");
        }

        Some(path)
    }

    fn read_local(path: &Path) -> Option<String> {
        fs::read_to_string(path).ok()
    }
}

impl SchemaLoader for AutoLoader {
    fn load_schema(&self, locator: &str) -> Result<Option<String>, Error> {
        if let Some(path) = self.uri_map.get(locator) {
            debug!(locator, path = %path.display(), "loading mapped schema");
            return fs::read_to_string(path).map(Some).map_err(Error::from);
        }

        let uri = self.base_uri.join(locator)?;
        if let Some(path) = self.local_path(&uri) {
            debug!(locator, path = %path.display(), "loading local schema");
            return Ok(Self::read_local(&path));
        }

        match &self.fetcher {
            Some(fetcher) => {
                debug!(%uri, "fetching remote schema");
                fetcher.fetch(&uri).map(Some)
            }
            None => Err(format_err!(
                "cannot retrieve {}: no fetcher has been configured",
                uri
            )),
        }
    }
}
