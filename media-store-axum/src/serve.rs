use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{stream, StreamExt, TryStreamExt};
use media_store::{OpenedBlob, StorageAdapter, DEFAULT_CONTENT_TYPE};

use crate::{LocalFileStore, ServeError};

/// Per-mount serving options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeOptions {
    /// Theme downloads are served from local disk, never from the remote store
    pub is_theme: bool,
}

impl ServeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme() -> Self {
        Self { is_theme: true }
    }
}

/// Builds request handlers that stream stored media back to clients.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use media_store::{AzureBlobStore, StorageConfig};
/// use media_store_axum::{LocalFileStore, MediaServer, ServeOptions};
///
/// let store = Arc::new(AzureBlobStore::new(StorageConfig::from_env()));
/// let server = MediaServer::new(store).with_local_fallback(LocalFileStore::new("content/themes"));
///
/// let router = axum::Router::new()
///     .nest("/content/images", server.serve(ServeOptions::new()))
///     .nest("/content/themes", server.serve(ServeOptions::theme()));
/// ```
pub struct MediaServer<S: ?Sized> {
    store: Arc<S>,
    local: Option<LocalFileStore>,
}

impl<S: ?Sized> Clone for MediaServer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            local: self.local.clone(),
        }
    }
}

impl<S> MediaServer<S>
where
    S: StorageAdapter + ?Sized + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store, local: None }
    }

    /// Local store used for theme requests. Without one they answer 404.
    pub fn with_local_fallback(mut self, local: LocalFileStore) -> Self {
        self.local = Some(local);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Router for one mount point. Request paths map to blob names with the
    /// leading `/` removed.
    pub fn serve(&self, options: ServeOptions) -> Router {
        if options.is_theme {
            return match &self.local {
                Some(local) => local.router(),
                None => Router::new().fallback(|| async { StatusCode::NOT_FOUND }),
            };
        }

        if let Err(err) = self.store.check_ready() {
            let reason = err.to_string();
            return Router::new().fallback(move || {
                let reason = reason.clone();
                async move {
                    tracing::error!(error = %reason, "media store is not ready");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            });
        }

        let store = Arc::clone(&self.store);
        Router::new()
            .route(
                "/{*path}",
                get(move |path: Result<Path<String>, PathRejection>| {
                    let store = Arc::clone(&store);
                    async move {
                        match path {
                            Ok(Path(path)) => serve_blob(store.as_ref(), &path).await,
                            // Names that do not decode to UTF-8 cannot exist remotely.
                            Err(rejection) => {
                                tracing::debug!(error = %rejection, "undecodable media path");
                                Ok(StatusCode::NOT_FOUND.into_response())
                            }
                        }
                    }
                }),
            )
            .fallback(|| async { StatusCode::NOT_FOUND })
    }
}

/// Open `path` and stream it. Errors up to and including the first body
/// chunk still become a 404/500 response; later ones abort the body.
///
/// The body is read from the blob version the properties describe, so
/// `Content-Length` matches it; a blob replaced in between fails with 500.
pub async fn serve_blob<S>(store: &S, path: &str) -> Result<Response, ServeError>
where
    S: StorageAdapter + ?Sized,
{
    let name = path.trim_start_matches('/');
    let OpenedBlob { properties, stream: mut content } = store.open(name).await?;

    let first = content.next().await.transpose()?;

    let blob = name.to_string();
    let body = stream::iter(first.map(Ok))
        .chain(content)
        .inspect_err(move |err| {
            tracing::error!(blob = %blob, error = %err, "blob stream failed mid-response");
        });

    let content_type = HeaderValue::from_str(&properties.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut response = Response::new(Body::from_stream(body));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(properties.content_length));

    Ok(response)
}
