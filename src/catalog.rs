use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::info;

use crate::domain::Species;
use crate::error::PipelineError;

pub const CATALOG_FILE: &str = "speciesList.txt";

pub trait CatalogClient: Send + Sync {
    fn fetch_catalog(&self) -> Result<String, PipelineError>;
}

#[derive(Clone)]
pub struct HttpCatalogClient {
    client: Client,
    index_url: String,
}

impl HttpCatalogClient {
    pub fn new(index_url: &str) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("range-etl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PipelineError::CatalogHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| PipelineError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            index_url: index_url.trim_end_matches('/').to_string(),
        })
    }
}

impl CatalogClient for HttpCatalogClient {
    fn fetch_catalog(&self) -> Result<String, PipelineError> {
        let url = format!("{}/{CATALOG_FILE}", self.index_url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| PipelineError::CatalogHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "catalog request failed".to_string());
            return Err(PipelineError::CatalogStatus { status, message });
        }
        response
            .text()
            .map_err(|err| PipelineError::CatalogHttp(err.to_string()))
    }
}

pub fn parse_catalog(text: &str) -> Result<Vec<Species>, PipelineError> {
    let mut species = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            return Err(PipelineError::CatalogRow {
                line: index + 1,
                found: fields.len(),
            });
        }
        species.push(Species {
            slug: fields[0].parse()?,
            common_name: fields[1].trim().to_string(),
            scientific_name: fields[2].trim().to_string(),
            provenance: fields[3].trim().to_string(),
        });
    }
    info!(count = species.len(), "resolved species catalog");
    Ok(species)
}
