//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the marketplace and run the
//! full crawl cycle end-to-end: search pages, listing pages, extraction
//! and the configured output file.

use autotrawl::config::{Config, CrawlerConfig, FetchConfig, OutputConfig, OutputFormat, SearchConfig, SiteConfig};
use autotrawl::output::{load_statistics, RunStatus};
use autotrawl::{run_crawl, TrawlError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/cars/honda/civic/";

/// Creates a test configuration pointed at the mock server
fn create_test_config(origin: &str, results_wanted: i64, max_pages: i64, output: OutputConfig) -> Config {
    Config {
        search: SearchConfig {
            make: Some("Honda".to_string()),
            model: Some("Civic".to_string()),
            ..Default::default()
        },
        crawler: CrawlerConfig {
            results_wanted,
            max_pages,
            concurrency: 3,
            batch_size: 2,
        },
        fetch: FetchConfig {
            timeout_secs: 5,
            max_retries: 0,
            retry_delay_ms: 10,
            ..Default::default()
        },
        site: SiteConfig {
            origin: origin.to_string(),
        },
        output,
    }
}

fn detail_path(id: usize) -> String {
    format!("/a/honda/civic/toronto/ontario/{}_{}_abc/", id, 100 + id)
}

fn search_page(ids: &[usize]) -> String {
    let links: String = ids
        .iter()
        .map(|id| format!(r#"<div class="result-item"><a href="{}">Listing {}</a></div>"#, detail_path(*id), id))
        .collect();
    format!(
        r#"<html><head><title>Honda Civic for sale</title></head><body>{}
        <a href="/dealers/">Dealers</a></body></html>"#,
        links
    )
}

/// Listing page with the embedded data model
fn model_page(price: u64) -> String {
    format!(
        r#"<html><head><script>
        window['ngVdpModel'] = {{"make": "Honda", "model": "Civic", "year": 2019, "price": {}, "mileage": "45,000 km"}};
        </script></head><body><h1>2019 Honda Civic LX</h1></body></html>"#,
        price
    )
}

/// Listing page with JSON-LD markup only
fn linked_data_page() -> String {
    r#"<html><head><script type="application/ld+json">
    {"@context": "https://schema.org", "@type": "Car", "brand": {"@type": "Brand", "name": "Honda"},
     "model": "Civic", "offers": {"@type": "Offer", "price": "21500"}}
    </script></head><body></body></html>"#
        .to_string()
}

/// Listing page with visible markup only
fn markup_page() -> String {
    r#"<html><body>
    <h1>2018 Honda Civic Touring</h1>
    <div class="hero-price">$19,995</div>
    <dl><dt>Transmission</dt><dd>Automatic</dd></dl>
    </body></html>"#
        .to_string()
}

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_search_page(server: &MockServer, offset: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("rcs", offset))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn search_requests(requests: &[wiremock::Request]) -> Vec<String> {
    requests
        .iter()
        .filter(|r| r.url.path() == SEARCH_PATH)
        .map(|r| r.url.query().unwrap_or_default().to_string())
        .collect()
}

fn detail_requests(requests: &[wiremock::Request]) -> usize {
    requests.iter().filter(|r| r.url.path().starts_with("/a/")).count()
}

#[tokio::test]
async fn test_full_crawl_to_json_lines() {
    let mock_server = MockServer::start().await;

    mount_search_page(&mock_server, "0", search_page(&[1, 2, 3])).await;
    mount_search_page(&mock_server, "15", search_page(&[4, 5])).await;
    mount_html(&mock_server, &detail_path(1), model_page(18_500)).await;
    mount_html(&mock_server, &detail_path(2), linked_data_page()).await;
    mount_html(&mock_server, &detail_path(3), markup_page()).await;
    mount_html(&mock_server, &detail_path(4), model_page(22_000)).await;
    mount_html(&mock_server, &detail_path(5), model_page(23_000)).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let out_path = dir.path().join("vehicles.jsonl");
    let output = OutputConfig {
        format: OutputFormat::Jsonl,
        path: out_path.to_string_lossy().to_string(),
    };
    let config = create_test_config(&mock_server.uri(), 10, 2, output);

    let summary = run_crawl(&config, "test-hash").await.expect("Crawl failed");

    assert_eq!(summary.list_pages, 2);
    assert_eq!(summary.accepted, 5);
    assert!(!summary.budget_met());

    let requests = mock_server.received_requests().await.expect("Requests recorded");
    let searches = search_requests(&requests);
    assert_eq!(searches.len(), 2);
    assert!(searches[0].contains("rcp=15&rcs=0"), "first page: {}", searches[0]);
    assert!(searches[1].contains("rcp=15&rcs=15"), "second page: {}", searches[1]);
    assert!(searches[1].contains("hprc=True"), "filters kept: {}", searches[1]);

    let content = std::fs::read_to_string(&out_path).expect("Output file written");
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Each line is a JSON object"))
        .collect();
    assert_eq!(lines.len(), 5);

    let by_ad = |ad_id: &str| {
        lines
            .iter()
            .find(|v| v["ad_id"] == ad_id)
            .unwrap_or_else(|| panic!("No record for {}", ad_id))
    };

    let modelled = by_ad("1_101_abc");
    assert_eq!(modelled["make"], "Honda");
    assert_eq!(modelled["price"], 18_500);
    assert_eq!(modelled["mileage"], 45_000);
    assert!(modelled["url"].as_str().unwrap().ends_with(&detail_path(1)));

    let linked = by_ad("2_102_abc");
    assert_eq!(linked["model"], "Civic");
    assert_eq!(linked["price"], 21_500);
    assert!(linked["mileage"].is_null());

    let marked_up = by_ad("3_103_abc");
    assert_eq!(marked_up["year"], 2018);
    assert_eq!(marked_up["make"], "Honda");
    assert_eq!(marked_up["trim"], "Touring");
    assert_eq!(marked_up["price"], 19_995);
    assert_eq!(marked_up["transmission"], "Automatic");
}

#[tokio::test]
async fn test_budget_stops_detail_fetches_and_pagination() {
    let mock_server = MockServer::start().await;

    let ids: Vec<usize> = (1..=8).collect();
    mount_search_page(&mock_server, "0", search_page(&ids)).await;
    mount_search_page(&mock_server, "15", search_page(&[9, 10])).await;
    for id in 1..=10 {
        mount_html(&mock_server, &detail_path(id), model_page(20_000 + id as u64)).await;
    }

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("vehicles.db");
    let output = OutputConfig {
        format: OutputFormat::Sqlite,
        path: db_path.to_string_lossy().to_string(),
    };
    let config = create_test_config(&mock_server.uri(), 5, 5, output);

    let summary = run_crawl(&config, "test-hash").await.expect("Crawl failed");
    assert_eq!(summary.accepted, 5);
    assert!(summary.budget_met());

    let requests = mock_server.received_requests().await.expect("Requests recorded");
    assert_eq!(search_requests(&requests).len(), 1, "no second search page");
    assert_eq!(detail_requests(&requests), 5);

    let stats = load_statistics(&db_path).expect("Failed to read statistics");
    assert_eq!(stats.total_runs, 1);
    assert_eq!(stats.total_vehicles, 5);
    assert_eq!(stats.by_make, vec![("Honda".to_string(), 5)]);

    let (_, status, count) = stats.latest_run.expect("Run recorded");
    assert_eq!(status, RunStatus::Completed);
    assert_eq!(count, 5);
}

#[tokio::test]
async fn test_rejected_and_missing_listings_are_skipped() {
    let mock_server = MockServer::start().await;

    mount_search_page(&mock_server, "0", search_page(&[1, 2, 3])).await;
    mount_search_page(&mock_server, "15", search_page(&[])).await;
    mount_html(&mock_server, &detail_path(1), model_page(15_000)).await;
    mount_html(
        &mock_server,
        &detail_path(2),
        "<html><body><p>This listing is no longer available</p></body></html>".to_string(),
    )
    .await;
    // Listing 3 is not mounted and answers 404

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("vehicles.db");
    let output = OutputConfig {
        format: OutputFormat::Sqlite,
        path: db_path.to_string_lossy().to_string(),
    };
    let config = create_test_config(&mock_server.uri(), 10, 3, output);

    let summary = run_crawl(&config, "test-hash").await.expect("Crawl failed");
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.list_pages, 2);

    let requests = mock_server.received_requests().await.expect("Requests recorded");
    assert_eq!(search_requests(&requests).len(), 2, "empty page ends pagination");

    let stats = load_statistics(&db_path).expect("Failed to read statistics");
    assert_eq!(stats.total_vehicles, 1);
}

#[tokio::test]
async fn test_unreachable_seed_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("vehicles.db");
    let output = OutputConfig {
        format: OutputFormat::Sqlite,
        path: db_path.to_string_lossy().to_string(),
    };
    let config = create_test_config(&mock_server.uri(), 5, 2, output);

    let result = run_crawl(&config, "test-hash").await;
    assert!(
        matches!(result, Err(TrawlError::SeedUnreachable { attempted: 1 })),
        "expected SeedUnreachable, got {:?}",
        result.map(|s| s.accepted)
    );

    let stats = load_statistics(&db_path).expect("Failed to read statistics");
    let (_, status, count) = stats.latest_run.expect("Run recorded");
    assert_eq!(status, RunStatus::Failed);
    assert_eq!(count, 0);
}
