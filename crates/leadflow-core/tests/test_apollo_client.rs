//! Apollo client against a local one-shot HTTP server

use leadflow_core::clients::{ApolloClient, LeadSearchFilters, LeadSearchProvider};
use leadflow_core::config::ApolloConfig;
use leadflow_core::LeadflowError;
use leadflow_types::{LeadSource, LeadStatus};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.expect("read failed");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve exactly one response and hand back the raw request text
async fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("no local addr");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept failed");
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.expect("write failed");
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{}", addr), handle)
}

fn client(base_url: String) -> ApolloClient {
    ApolloClient::new(ApolloConfig {
        api_key: "test-api-key".to_string(),
        base_url,
        per_page: 25,
        timeout_secs: 5,
    })
    .expect("client should build")
}

#[tokio::test]
async fn test_search_maps_organizations() {
    let body = serde_json::json!({
        "organizations": [
            {
                "id": "org_1",
                "name": "Acme Automation",
                "website_url": "https://acme.example",
                "industry": "Industrial Automation",
                "estimated_num_employees": 120,
                "city": "Berlin",
                "country": "Germany",
                "short_description": "Robots for warehouses",
                "phone": "+49 30 1234567"
            },
            {
                "id": "org_2",
                "name": null,
                "primary_domain": "nameless.example"
            }
        ],
        "pagination": { "page": 2, "per_page": 10, "total_entries": 42, "total_pages": 5 }
    })
    .to_string();

    let (base_url, server) = serve_once("200 OK", body).await;
    let filters = LeadSearchFilters {
        query: "companies that need automation".to_string(),
        company_sizes: vec!["51-200".to_string(), "bogus".to_string()],
        locations: vec!["Germany".to_string()],
        page: Some(2),
        per_page: Some(10),
    };

    let page = client(base_url).search(&filters).await.expect("search should succeed");
    let request = server.await.expect("server task panicked");

    assert!(request.starts_with("POST /api/v1/organizations/search "));
    assert!(request.to_ascii_lowercase().contains("x-api-key: test-api-key"));
    assert!(request.contains(r#""q_organization_name":"automation""#));
    assert!(request.contains(r#""organization_num_employees_ranges":["51,200"]"#));
    assert!(request.contains(r#""organization_locations":["Germany"]"#));

    assert_eq!(page.page, 2);
    assert_eq!(page.per_page, 10);
    assert_eq!(page.total_entries, 42);
    assert_eq!(page.total_pages, 5);
    assert_eq!(page.leads.len(), 2);

    let acme = &page.leads[0];
    assert_eq!(acme.company_name, "Acme Automation");
    assert_eq!(acme.company_size, "51-200");
    assert_eq!(acme.location, "Berlin, Germany");
    assert_eq!(acme.contact_phone.as_deref(), Some("+49 30 1234567"));
    assert_eq!(acme.status, LeadStatus::New);
    assert_eq!(acme.source, LeadSource::Apollo);

    let nameless = &page.leads[1];
    assert_eq!(nameless.company_name, "Unknown Company");
    assert_eq!(nameless.website.as_deref(), Some("https://nameless.example"));
    assert_eq!(nameless.description, "No description available");
}

#[tokio::test]
async fn test_search_surfaces_upstream_error() {
    let (base_url, server) = serve_once(
        "500 Internal Server Error",
        r#"{"error":"upstream exploded"}"#.to_string(),
    )
    .await;

    let filters = LeadSearchFilters {
        query: "fintech".to_string(),
        ..LeadSearchFilters::default()
    };

    let err = client(base_url).search(&filters).await.unwrap_err();
    server.await.expect("server task panicked");

    match err {
        LeadflowError::Upstream { service, status, body } => {
            assert_eq!(service, "Apollo");
            assert_eq!(status, 500);
            assert!(body.contains("upstream exploded"));
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_search_passes_sql_like_business_phrases() {
    let body = serde_json::json!({
        "organizations": [],
        "pagination": { "page": 1, "per_page": 25, "total_entries": 0, "total_pages": 0 }
    })
    .to_string();

    let (base_url, server) = serve_once("200 OK", body).await;
    let filters = LeadSearchFilters {
        query: "companies that need to update their CRM".to_string(),
        ..LeadSearchFilters::default()
    };

    let page = client(base_url).search(&filters).await.expect("search should succeed");
    let request = server.await.expect("server task panicked");

    assert!(request.contains(r#""q_organization_name":"update their crm""#));
    assert!(page.leads.is_empty());
    assert_eq!(page.page, 1);
}
