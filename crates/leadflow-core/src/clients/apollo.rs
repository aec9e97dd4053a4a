//! Apollo.io organization search client

use crate::config::ApolloConfig;
use crate::constants::{APOLLO_MAX_PER_PAGE, APOLLO_SEARCH_PATH};
use crate::error::{LeadflowError, Result};
use crate::services::keywords::extract_keywords;
use async_trait::async_trait;
use leadflow_types::{Lead, LeadSource, LeadStatus};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

/// Company-size buckets and their upstream employee-range strings
const SIZE_RANGES: &[(&str, &str)] = &[
    ("1-10", "1,10"),
    ("11-50", "11,50"),
    ("51-200", "51,200"),
    ("201-500", "201,500"),
    ("501-1000", "501,1000"),
    ("1001-5000", "1001,5000"),
    ("5001-10000", "5001,10000"),
    ("10001+", "10001,"),
];

const UNKNOWN_COMPANY: &str = "Unknown Company";
const UNKNOWN: &str = "Unknown";
const NO_DESCRIPTION: &str = "No description available";

/// Facets accepted by a lead search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadSearchFilters {
    pub query: String,
    #[serde(default)]
    pub company_sizes: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// Body of `POST /api/v1/organizations/search`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApolloSearchRequest {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_num_employees_ranges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_locations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApolloSearchResponse {
    #[serde(default)]
    pub organizations: Vec<ApolloOrganization>,
    #[serde(default)]
    pub pagination: ApolloPagination,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApolloPagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_entries: u64,
    #[serde(default)]
    pub total_pages: u32,
}

/// Upstream organization record; every field may be missing or null
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApolloOrganization {
    pub id: Option<String>,
    pub name: Option<String>,
    pub website_url: Option<String>,
    pub primary_domain: Option<String>,
    pub linkedin_url: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub estimated_num_employees: Option<u64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub short_description: Option<String>,
}

/// One page of mapped leads
#[derive(Debug, Clone, Serialize)]
pub struct LeadSearchPage {
    pub leads: Vec<Lead>,
    pub page: u32,
    pub per_page: u32,
    pub total_entries: u64,
    pub total_pages: u32,
}

/// Anything that can turn search filters into leads
#[async_trait]
pub trait LeadSearchProvider: Send + Sync {
    async fn search(&self, filters: &LeadSearchFilters) -> Result<LeadSearchPage>;
}

/// Upstream range string for a size bucket, `None` for unknown buckets
pub fn employee_range_for_bucket(bucket: &str) -> Option<&'static str> {
    let bucket = bucket.trim();
    SIZE_RANGES
        .iter()
        .find(|(name, _)| *name == bucket)
        .map(|(_, range)| *range)
}

/// Size bucket for an employee head count
pub fn bucket_for_employee_count(count: u64) -> &'static str {
    match count {
        0..=10 => "1-10",
        11..=50 => "11-50",
        51..=200 => "51-200",
        201..=500 => "201-500",
        501..=1000 => "501-1000",
        1001..=5000 => "1001-5000",
        5001..=10000 => "5001-10000",
        _ => "10001+",
    }
}

/// Map filters to the upstream payload. Unrecognized size buckets are dropped.
pub fn build_search_request(filters: &LeadSearchFilters, default_per_page: u32) -> ApolloSearchRequest {
    let query = filters.query.trim();
    let q_organization_name = if query.is_empty() {
        None
    } else {
        Some(extract_keywords(query))
    };

    let ranges: Vec<String> = filters
        .company_sizes
        .iter()
        .filter_map(|bucket| employee_range_for_bucket(bucket))
        .map(str::to_string)
        .collect();

    let locations: Vec<String> = filters
        .locations
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    ApolloSearchRequest {
        page: filters.page.unwrap_or(1).max(1),
        per_page: filters
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, APOLLO_MAX_PER_PAGE),
        q_organization_name,
        organization_num_employees_ranges: (!ranges.is_empty()).then_some(ranges),
        organization_locations: (!locations.is_empty()).then_some(locations),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Map an upstream organization to a new lead, filling gaps with fixed literals
pub fn map_organization(org: &ApolloOrganization) -> Lead {
    let website = non_empty(&org.website_url)
        .or_else(|| non_empty(&org.primary_domain).map(|d| format!("https://{}", d)));

    let location_parts: Vec<String> = [&org.city, &org.state, &org.country]
        .into_iter()
        .filter_map(non_empty)
        .collect();
    let location = if location_parts.is_empty() {
        UNKNOWN.to_string()
    } else {
        location_parts.join(", ")
    };

    Lead {
        external_id: non_empty(&org.id),
        company_name: non_empty(&org.name).unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
        website,
        industry: non_empty(&org.industry).unwrap_or_else(|| UNKNOWN.to_string()),
        company_size: org
            .estimated_num_employees
            .map(|n| bucket_for_employee_count(n).to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        location,
        description: non_empty(&org.short_description).unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        contact_name: None,
        contact_title: None,
        contact_email: None,
        contact_phone: non_empty(&org.phone),
        contact_linkedin: non_empty(&org.linkedin_url),
        status: LeadStatus::New,
        source: LeadSource::Apollo,
        score: None,
    }
}

pub struct ApolloClient {
    config: ApolloConfig,
    http_client: HttpClient,
}

impl ApolloClient {
    /// Fails with a configuration error when no API key is set
    pub fn new(config: ApolloConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LeadflowError::Config("Apollo API key is required".to_string()));
        }

        let http_client = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LeadflowError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Raw organization search; non-2xx responses are returned as errors without retry
    pub async fn search_organizations(&self, request: &ApolloSearchRequest) -> Result<ApolloSearchResponse> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), APOLLO_SEARCH_PATH);

        log::debug!("Apollo search request to {}: {:?}", url, request);

        let response = self
            .http_client
            .post(&url)
            .header("X-Api-Key", &self.config.api_key)
            .header("Cache-Control", "no-cache")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Apollo search failed with status {}: {}", status, body);
            return Err(LeadflowError::Upstream {
                service: "Apollo",
                status,
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LeadSearchProvider for ApolloClient {
    async fn search(&self, filters: &LeadSearchFilters) -> Result<LeadSearchPage> {
        let request = build_search_request(filters, self.config.per_page);
        let response = self.search_organizations(&request).await?;

        let leads: Vec<Lead> = response.organizations.iter().map(map_organization).collect();
        log::info!(
            "Apollo search returned {} leads (page {} of {})",
            leads.len(),
            response.pagination.page,
            response.pagination.total_pages
        );

        Ok(LeadSearchPage {
            leads,
            page: if response.pagination.page == 0 { request.page } else { response.pagination.page },
            per_page: if response.pagination.per_page == 0 { request.per_page } else { response.pagination.per_page },
            total_entries: response.pagination.total_entries,
            total_pages: response.pagination.total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str) -> ApolloConfig {
        ApolloConfig {
            api_key: api_key.to_string(),
            ..ApolloConfig::default()
        }
    }

    #[test]
    fn test_client_requires_api_key() {
        let err = ApolloClient::new(config("  ")).err().unwrap();
        assert!(matches!(err, LeadflowError::Config(_)));
        assert!(ApolloClient::new(config("key")).is_ok());
    }

    #[test]
    fn test_size_bucket_lookup() {
        assert_eq!(employee_range_for_bucket("51-200"), Some("51,200"));
        assert_eq!(employee_range_for_bucket(" 10001+ "), Some("10001,"));
        assert_eq!(employee_range_for_bucket("huge"), None);
        assert_eq!(bucket_for_employee_count(120), "51-200");
        assert_eq!(bucket_for_employee_count(50_000), "10001+");
    }

    #[test]
    fn test_build_search_request() {
        let filters = LeadSearchFilters {
            query: "companies that need automation".to_string(),
            company_sizes: vec!["51-200".to_string(), "bogus".to_string()],
            locations: vec!["Berlin, Germany".to_string(), "  ".to_string()],
            page: Some(2),
            per_page: Some(500),
        };

        let request = build_search_request(&filters, 25);
        assert_eq!(request.page, 2);
        assert_eq!(request.per_page, 100);
        assert_eq!(request.q_organization_name.as_deref(), Some("automation"));
        assert_eq!(request.organization_num_employees_ranges, Some(vec!["51,200".to_string()]));
        assert_eq!(request.organization_locations, Some(vec!["Berlin, Germany".to_string()]));
    }

    #[test]
    fn test_build_search_request_omits_empty_facets() {
        let filters = LeadSearchFilters {
            company_sizes: vec!["unknown".to_string()],
            ..LeadSearchFilters::default()
        };

        let request = build_search_request(&filters, 25);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"page": 1, "per_page": 25}));
    }

    #[test]
    fn test_map_organization_fallbacks() {
        let lead = map_organization(&ApolloOrganization::default());
        assert_eq!(lead.company_name, "Unknown Company");
        assert_eq!(lead.industry, "Unknown");
        assert_eq!(lead.company_size, "Unknown");
        assert_eq!(lead.location, "Unknown");
        assert_eq!(lead.description, "No description available");
        assert_eq!(lead.website, None);
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.source, LeadSource::Apollo);
    }

    #[test]
    fn test_map_organization_full_record() {
        let org: ApolloOrganization = serde_json::from_value(serde_json::json!({
            "id": "5f2a",
            "name": "Acme Robotics",
            "website_url": null,
            "primary_domain": "acme.io",
            "industry": "machinery",
            "estimated_num_employees": 140,
            "city": "Munich",
            "state": "",
            "country": "Germany",
            "short_description": "Industrial automation",
            "phone": "+49 89 123",
            "linkedin_url": "https://linkedin.com/company/acme",
            "unrelated_field": 1
        }))
        .unwrap();

        let lead = map_organization(&org);
        assert_eq!(lead.external_id.as_deref(), Some("5f2a"));
        assert_eq!(lead.company_name, "Acme Robotics");
        assert_eq!(lead.website.as_deref(), Some("https://acme.io"));
        assert_eq!(lead.company_size, "51-200");
        assert_eq!(lead.location, "Munich, Germany");
        assert_eq!(lead.contact_phone.as_deref(), Some("+49 89 123"));
    }
}
