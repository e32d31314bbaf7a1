use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::SpeciesSlug;
use crate::error::PipelineError;

pub const GROUP_MARKER: &str = "thumbnail-file-group";
pub const FILE_LIST_MARKER: &str = "thumbnail-file-group-02";
pub const UNAVAILABLE_TEXT: &str = "Image not available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioGroup {
    pub name: String,
    pub available: bool,
    pub archive_href: Option<String>,
}

pub trait SpeciesSite: Send + Sync {
    fn fetch_index(&self, slug: &SpeciesSlug) -> Result<String, PipelineError>;
    fn download_archive(&self, href: &str, destination: &Path) -> Result<(), PipelineError>;
}

#[derive(Clone)]
pub struct HttpSpeciesSite {
    client: Client,
    base_url: String,
    index_url: String,
}

impl HttpSpeciesSite {
    pub fn new(base_url: &str, index_url: &str) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("range-etl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PipelineError::SiteHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| PipelineError::SiteHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index_url: index_url.trim_end_matches('/').to_string(),
        })
    }

    fn resolve_href(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        format!("{}/{}", self.base_url, href.trim_start_matches('/'))
    }
}

impl SpeciesSite for HttpSpeciesSite {
    fn fetch_index(&self, slug: &SpeciesSlug) -> Result<String, PipelineError> {
        let url = format!("{}/{}", self.index_url, slug.as_str());
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| PipelineError::SiteHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "index request failed".to_string());
            return Err(PipelineError::SiteStatus { status, message });
        }
        response
            .text()
            .map_err(|err| PipelineError::SiteHttp(err.to_string()))
    }

    fn download_archive(&self, href: &str, destination: &Path) -> Result<(), PipelineError> {
        let url = self.resolve_href(href);
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| PipelineError::SiteHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "archive request failed".to_string());
            return Err(PipelineError::SiteStatus { status, message });
        }
        let parent = destination
            .parent()
            .ok_or_else(|| PipelineError::Filesystem("invalid archive destination".to_string()))?;
        fs::create_dir_all(parent).map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("range-etl-archive")
            .tempfile_in(parent)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| PipelineError::SiteHttp(err.to_string()))?;
        temp.persist(destination)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

pub fn parse_scenario_groups(html: &str) -> Vec<ScenarioGroup> {
    // class token followed by a quote or another class; "-02" never matches
    let group = Regex::new(&format!(r#"{GROUP_MARKER}["\s]"#)).unwrap();
    let heading = Regex::new(r"(?s)<h4[^>]*>(.*?)</h4>").unwrap();
    let item = Regex::new(r"(?s)<li[^>]*>.*?</li>").unwrap();
    let href = Regex::new(r#"href="([^"]+)""#).unwrap();

    let starts: Vec<usize> = group.find_iter(html).map(|found| found.start()).collect();
    let mut groups = Vec::new();
    for (index, &start) in starts.iter().enumerate() {
        let end = starts.get(index + 1).copied().unwrap_or(html.len());
        let chunk = &html[start..end];
        let Some(name) = heading
            .captures(chunk)
            .map(|caps| caps[1].trim().to_string())
            .filter(|name| !name.is_empty())
        else {
            continue;
        };
        let available = !chunk.contains(UNAVAILABLE_TEXT);
        let archive_href = chunk.find(FILE_LIST_MARKER).and_then(|index| {
            let list = &chunk[index..];
            item.find_iter(list)
                .nth(1)
                .and_then(|entry| href.captures(entry.as_str()))
                .map(|caps| caps[1].to_string())
        });
        groups.push(ScenarioGroup {
            name,
            available,
            archive_href,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_HTML: &str = r#"
        <div class="thumbnail-file-group">
          <h4>current</h4>
          <img src="/climate/species/thumbs/current.png"/>
          <ul class="thumbnail-file-group-02">
            <li><a href="/climate/species/img/current.png">image</a></li>
            <li><a href="/climate/species/zip/current.zip">archive</a></li>
          </ul>
        </div>
        <div class="thumbnail-file-group">
          <h4>rcp45</h4>
          <p>Image not available</p>
        </div>
    "#;

    #[test]
    fn parse_groups_with_archive_links() {
        let groups = parse_scenario_groups(INDEX_HTML);
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].name, "current");
        assert!(groups[0].available);
        assert_eq!(
            groups[0].archive_href.as_deref(),
            Some("/climate/species/zip/current.zip")
        );

        assert_eq!(groups[1].name, "rcp45");
        assert!(!groups[1].available);
        assert_eq!(groups[1].archive_href, None);
    }

    #[test]
    fn parse_groups_with_extra_classes() {
        let html = r#"
            <div class="thumbnail-file-group clearfix">
              <h4>current</h4>
              <ul class="thumbnail-file-group-02 list-unstyled">
                <li><a href="/img/current.png">image</a></li>
                <li><a href="/zip/current.zip">archive</a></li>
              </ul>
            </div>
        "#;
        let groups = parse_scenario_groups(html);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "current");
        assert_eq!(groups[0].archive_href.as_deref(), Some("/zip/current.zip"));
    }

    #[test]
    fn parse_groups_empty_page() {
        assert!(parse_scenario_groups("<html><body></body></html>").is_empty());
    }
}
