use std::path::{Path, PathBuf};

use axum::Router;
use tower_http::services::ServeDir;

/// Local-disk store used for theme assets, which never live in the remote
/// container. Injected by the host when it builds a [`crate::MediaServer`].
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Router serving files under the root; unknown paths get 404
    pub fn router(&self) -> Router {
        Router::new().fallback_service(ServeDir::new(&self.root))
    }
}
