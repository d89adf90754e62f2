//! [`LdpClient`] implementation on top of HTTP.

use crate::error::TransportError;
use crate::graph::TripleStore;
use crate::transport::{LdpClient, Patch, ResourceKind};
use crate::vocab::ldp;
use async_trait::async_trait;
use oxhttp::model::header::{ACCEPT, CONTENT_TYPE, HeaderName, LINK};
use oxhttp::model::{Body, Method, Request, Response};
use oxrdf::Triple;
use oxrdfio::{RdfFormat, RdfParser};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const ACCEPT_RDF: &str = "text/turtle, application/n-triples;q=0.9";
const TURTLE: &str = "text/turtle";

/// An [`LdpClient`] talking to a Solid or LDP server.
///
/// Requests are blocking and run on the blocking thread pool of the tokio runtime.
#[derive(Clone)]
pub struct HttpLdpClient {
    client: Arc<oxhttp::Client>,
}

impl HttpLdpClient {
    pub fn new(
        timeout: Option<Duration>,
        redirection_limit: usize,
    ) -> Result<Self, TransportError> {
        let mut client = oxhttp::Client::new()
            .with_redirection_limit(redirection_limit)
            .with_user_agent(concat!("shapeql/", env!("CARGO_PKG_VERSION")))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        if let Some(timeout) = timeout {
            client = client.with_global_timeout(timeout);
        }
        Ok(Self {
            client: Arc::new(client),
        })
    }

    async fn run<T: Send + 'static>(
        &self,
        task: impl FnOnce(&oxhttp::Client) -> Result<T, TransportError> + Send + 'static,
    ) -> Result<T, TransportError> {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || task(&client))
            .await
            .map_err(|e| TransportError::Task(e.to_string()))?
    }
}

fn send(
    client: &oxhttp::Client,
    method: Method,
    url: &str,
    headers: &[(HeaderName, &'static str)],
    body: Vec<u8>,
) -> Result<Response<Body>, TransportError> {
    debug!("{method} {url}");
    let mut request = Request::builder().method(method).uri(url);
    for (name, value) in headers {
        request = request.header(name, *value);
    }
    let request = request
        .body(body)
        .map_err(|e| TransportError::invalid_url(url, e))?;
    let response = client.request(request)?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::http(
            url,
            status.as_u16(),
            response.into_body().to_string()?,
        ));
    }
    Ok(response)
}

fn is_container(response: &Response<Body>, url: &str) -> bool {
    let typed_container = response
        .headers()
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|link| {
            link.contains("rel=\"type\"")
                && (link.contains(&format!("<{}>", ldp::CONTAINER.as_str()))
                    || link.contains(&format!("<{}>", ldp::BASIC_CONTAINER.as_str())))
        });
    typed_container || url.ends_with('/')
}

fn parse_graph(response: Response<Body>, url: &str) -> Result<TripleStore, TransportError> {
    let format = match response.headers().get(CONTENT_TYPE) {
        Some(content_type) => {
            let content_type = content_type
                .to_str()
                .map_err(|e| TransportError::parse(url, e))?;
            let media_type = content_type.split(';').next().unwrap_or(content_type).trim();
            RdfFormat::from_media_type(media_type).ok_or_else(|| {
                TransportError::parse(url, format!("unsupported content type {content_type}"))
            })?
        }
        None => RdfFormat::Turtle,
    };
    RdfParser::from_format(format)
        .with_base_iri(url)
        .map_err(|e| TransportError::invalid_url(url, e))?
        .for_reader(response.into_body())
        .map(|quad| {
            quad.map(|q| Triple::new(q.subject, q.predicate, q.object))
                .map_err(|e| TransportError::parse(url, e))
        })
        .collect()
}

#[async_trait]
impl LdpClient for HttpLdpClient {
    async fn fetch_resource_kind(&self, url: &str) -> Result<ResourceKind, TransportError> {
        let url = url.to_owned();
        self.run(move |client| {
            let response = send(client, Method::HEAD, &url, &[], Vec::new())?;
            Ok(if is_container(&response, &url) {
                ResourceKind::Container
            } else {
                ResourceKind::Document
            })
        })
        .await
    }

    async fn download_graph(&self, url: &str) -> Result<TripleStore, TransportError> {
        let url = url.to_owned();
        self.run(move |client| {
            let response = send(client, Method::GET, &url, &[(ACCEPT, ACCEPT_RDF)], Vec::new())?;
            parse_graph(response, &url)
        })
        .await
    }

    async fn patch(&self, url: &str, patch: &Patch) -> Result<(), TransportError> {
        let url = url.to_owned();
        let body = patch.to_n3().into_bytes();
        self.run(move |client| {
            send(
                client,
                Method::PATCH,
                &url,
                &[(CONTENT_TYPE, Patch::CONTENT_TYPE)],
                body,
            )?;
            Ok(())
        })
        .await
    }

    async fn put(&self, url: &str, graph: &TripleStore) -> Result<(), TransportError> {
        let url = url.to_owned();
        // N-Triples is a subset of Turtle
        let body = graph.to_string().into_bytes();
        self.run(move |client| {
            send(client, Method::PUT, &url, &[(CONTENT_TYPE, TURTLE)], body)?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, url: &str) -> Result<(), TransportError> {
        let url = url.to_owned();
        self.run(move |client| {
            send(client, Method::DELETE, &url, &[], Vec::new())?;
            Ok(())
        })
        .await
    }
}
