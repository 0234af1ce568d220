/// Path resolution - maps client file references onto the audio directory
use crate::error::{Result, ServerError};
use std::path::{Path, PathBuf};

/// Resolves client references to files inside one directory and builds
/// the public URLs those files are served under
#[derive(Debug, Clone)]
pub struct PathResolver {
    audio_dir: PathBuf,
    public_base_url: String,
}

impl PathResolver {
    pub fn new(audio_dir: PathBuf, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            audio_dir,
            public_base_url,
        }
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Resolve a URL or bare file name to a path inside the audio directory
    ///
    /// Only the last `/` segment is used, so a client can send back the URL
    /// it was given. Query strings and fragments are ignored.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ServerError::BadRequest(
                "File path is missing in the request.".to_string(),
            ));
        }

        let without_query = reference
            .split(['?', '#'])
            .next()
            .unwrap_or(reference);
        let name = without_query
            .rsplit('/')
            .next()
            .unwrap_or(without_query);

        if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
            return Err(ServerError::BadRequest(format!(
                "Invalid file reference: {}",
                reference
            )));
        }

        let path = self.audio_dir.join(name);
        tracing::debug!("Resolved {} to {}", reference, path.display());
        Ok(path)
    }

    /// Public URL for a file inside the audio directory
    pub fn public_url(&self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ServerError::Internal(format!("No usable file name in {}", path.display()))
            })?;
        Ok(format!("{}/{}", self.public_base_url, name))
    }
}
