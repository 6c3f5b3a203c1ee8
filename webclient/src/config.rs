use shared::socket::TRANSPORT_QUERY;
use thiserror::Error;
use url::Url;

pub const BACKEND_URL: &str = dotenv_codegen::dotenv!("BACKEND_URL");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("backend url is not valid: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("backend url must be http or https, got `{0}`")]
    UnsupportedScheme(String),
}

/// Every backend address the client talks to, derived from one base url.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    base: Url,
    socket: Url,
}

impl Endpoints {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(BACKEND_URL)
    }

    pub fn new(base: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base)?;
        let socket_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };

        let mut endpoints = Endpoints {
            socket: base.clone(),
            base,
        };
        let mut socket = endpoints.at("/socket.io/");
        socket
            .set_scheme(socket_scheme)
            .map_err(|_| ConfigError::UnsupportedScheme(socket_scheme.to_string()))?;
        socket.set_query(Some(TRANSPORT_QUERY));
        endpoints.socket = socket;

        Ok(endpoints)
    }

    fn at(&self, path: &str) -> Url {
        let prefix = self.base.path().trim_end_matches('/');
        let mut url = self.base.clone();
        url.set_path(&format!("{}{}", prefix, path));
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    pub fn register(&self) -> String {
        self.at("/api/user/register").into()
    }

    pub fn queue(&self) -> String {
        self.at("/api/queue").into()
    }

    pub fn queue_entry(&self, index: usize) -> String {
        self.at(&format!("/api/queue/{}", index)).into()
    }

    pub fn search(&self, query: &str) -> String {
        let mut url = self.at("/api/search");
        url.query_pairs_mut().append_pair("query", query);
        url.into()
    }

    pub fn radio_status(&self) -> String {
        self.at("/api/radio/status").into()
    }

    pub fn stream(&self) -> String {
        self.at("/api/radio/stream").into()
    }

    pub fn socket(&self) -> String {
        self.socket.as_str().to_string()
    }
}
