/// S3-compatible endpoint configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// `host:port` of the object store; a leading `:` means localhost
    pub endpoint: String,
    /// Bucket holding every object this client touches
    pub bucket: String,
    /// Region reported to the SDK (MinIO ignores it)
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Use https instead of http
    pub use_ssl: bool,
    /// Whether to use path-style URLs (MinIO requires true)
    pub path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: ":9000".to_string(),
            bucket: "images".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            use_ssl: false,
            path_style: true,
        }
    }
}

impl S3Config {
    /// Full endpoint URL handed to the SDK
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            return self.endpoint.clone();
        }

        let scheme = if self.use_ssl { "https" } else { "http" };
        let host = if self.endpoint.starts_with(':') {
            format!("localhost{}", self.endpoint)
        } else {
            self.endpoint.clone()
        };

        format!("{}://{}", scheme, host)
    }
}
