//! Integration tests for scrape runs
//!
//! These tests use wiremock to serve listing pages and images, and run the
//! orchestrator end-to-end against it.

use shop_scraper::config::{AssetsConfig, Config, OutputConfig, OutputFormat, ScraperConfig};
use shop_scraper::pipeline::{Orchestrator, Record, ScrapeRequest};
use shop_scraper::state::PageOutcome;
use shop_scraper::ScrapeError;
use shop_scraper::storage::{JsonFileStore, RecordStore, RunBatch, StorageError};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server's `/shop/` listing
fn create_test_config(server: &MockServer, assets_dir: Option<&Path>) -> Config {
    Config {
        scraper: ScraperConfig {
            base_url: format!("{}/shop/", server.uri()),
            max_attempts: 3,
            retry_delay_ms: 10, // Very short for testing
            request_timeout_secs: 5,
            pages_per_wave: 2,
            ..ScraperConfig::default()
        },
        assets: AssetsConfig {
            enabled: assets_dir.is_some(),
            directory: assets_dir
                .map(|d| d.to_string_lossy().into_owned())
                .unwrap_or_else(|| "images".to_string()),
            extension: "jpg".to_string(),
        },
        output: OutputConfig {
            format: OutputFormat::Json,
            path: "products.json".to_string(),
        },
    }
}

/// One product item as the shop renders it
fn item(title: &str, price: &str, image: Option<&str>) -> String {
    let thumbnail = image
        .map(|src| {
            format!(
                r#"<div class="mf-product-thumbnail"><img src="{0}" data-lazy-src="{0}"></div>"#,
                src
            )
        })
        .unwrap_or_default();
    format!(
        r#"<li class="product">{}<h2 class="woo-loop-product__title"><a href="/p">{}</a></h2>
        <span class="price"><span class="woocommerce-Price-amount amount"><bdi>{}</bdi></span></span></li>"#,
        thumbnail, title, price
    )
}

/// A listing page wrapping the given items
fn listing(items: &[String]) -> String {
    format!(
        r#"<html><body><div id="mf-shop-content"><ul class="products">{}</ul></div></body></html>"#,
        items.concat()
    )
}

/// A listing page followed by bulky markup that takes longer to parse
fn padded_listing(items: &[String], filler_blocks: usize) -> String {
    let filler = "<div class=\"footer\"><p>Dental supplies, delivered.</p></div>".repeat(filler_blocks);
    format!(
        r#"<html><body><div id="mf-shop-content"><ul class="products">{}</ul></div>{}</body></html>"#,
        items.concat(),
        filler
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    if page == 1 {
        Mock::given(method("GET"))
            .and(path("/shop/"))
            .and(query_param("page", "1"))
            .respond_with(response)
            .mount(server)
            .await;
    } else {
        Mock::given(method("GET"))
            .and(path(format!("/shop/page/{}", page)))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

fn titles(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.title.as_str()).collect()
}

#[tokio::test]
async fn test_bounded_run_fetches_each_page_once() {
    let server = MockServer::start().await;

    for page in 1..=3 {
        let body = listing(&[item(&format!("Item {}", page), "₹10.00", None)]);
        let matcher = if page == 1 {
            Mock::given(method("GET"))
                .and(path("/shop/"))
                .and(query_param("page", "1"))
        } else {
            Mock::given(method("GET")).and(path(format!("/shop/page/{}", page)))
        };
        matcher
            .respond_with(html(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(3))
        .await
        .unwrap();

    assert_eq!(titles(&result.records), vec!["Item 1", "Item 2", "Item 3"]);
    assert_eq!(result.report.pages_requested, 3);
    assert_eq!(result.report.pages_failed(), 0);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_unbounded_run_stops_at_empty_page() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        html(listing(&[item("A", "₹10.00", None), item("B", "₹20.00", None)])),
    )
    .await;
    mount_page(&server, 2, html(listing(&[]))).await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator.run(&ScrapeRequest::default()).await.unwrap();

    assert_eq!(
        result.records,
        vec![
            Record {
                title: "A".to_string(),
                price: 10.0,
                asset_path: None,
            },
            Record {
                title: "B".to_string(),
                price: 20.0,
                asset_path: None,
            },
        ]
    );
    assert_eq!(result.report.pages_with(PageOutcome::Empty), 1);
    assert!(!result.report.stopped_early);
}

#[tokio::test]
async fn test_bounded_run_with_empty_second_page() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        html(listing(&[item("A", "₹10.00", None), item("B", "₹20.00", None)])),
    )
    .await;
    mount_page(&server, 2, html(listing(&[]))).await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(2))
        .await
        .unwrap();

    assert_eq!(
        result.records,
        vec![
            Record {
                title: "A".to_string(),
                price: 10.0,
                asset_path: None,
            },
            Record {
                title: "B".to_string(),
                price: 20.0,
                asset_path: None,
            },
        ]
    );
    assert_eq!(result.report.pages_requested, 2);
    assert_eq!(result.report.pages_with(PageOutcome::Empty), 1);
    assert_eq!(result.report.pages_failed(), 0);
}

#[tokio::test]
async fn test_records_ordered_by_page_not_completion() {
    let server = MockServer::start().await;

    // page 1 answers last
    mount_page(
        &server,
        1,
        html(listing(&[item("First", "₹1.00", None)])).set_delay(Duration::from_millis(300)),
    )
    .await;
    mount_page(&server, 2, html(listing(&[item("Second", "₹2.00", None)]))).await;
    mount_page(&server, 3, html(listing(&[item("Third", "₹3.00", None)]))).await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(3))
        .await
        .unwrap();

    assert_eq!(titles(&result.records), vec!["First", "Second", "Third"]);
}

#[tokio::test]
async fn test_dedup_across_runs() {
    let server = MockServer::start().await;
    let page = listing(&[item("A", "₹10.00", None), item("B", "₹20.00", None)]);
    mount_page(&server, 1, html(page)).await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let request = ScrapeRequest::with_max_pages(1);

    let first = orchestrator.run(&request).await.unwrap();
    assert_eq!(first.records.len(), 2);

    // Unchanged prices are not reported again
    let second = orchestrator.run(&request).await.unwrap();
    assert!(second.records.is_empty());
    assert_eq!(second.report.records_unchanged, 2);

    // A price change is reported exactly once
    server.reset().await;
    let page = listing(&[item("A", "₹10.00", None), item("B", "₹25.00", None)]);
    mount_page(&server, 1, html(page)).await;

    let third = orchestrator.run(&request).await.unwrap();
    assert_eq!(
        third.records,
        vec![Record {
            title: "B".to_string(),
            price: 25.0,
            asset_path: None,
        }]
    );
    assert_eq!(orchestrator.cache().get("B"), Some(25.0));
}

#[tokio::test]
async fn test_title_on_several_pages_kept_at_first_page() {
    let server = MockServer::start().await;

    mount_page(&server, 1, html(listing(&[item("P1", "₹1.00", None)]))).await;
    // page 2 lists "Dup" first but is slower to parse than page 3
    mount_page(
        &server,
        2,
        html(padded_listing(
            &[item("Dup", "₹7.00", None), item("Only2", "₹2.00", None)],
            20_000,
        )),
    )
    .await;
    mount_page(
        &server,
        3,
        html(listing(&[item("Only3", "₹3.00", None), item("Dup", "₹7.00", None)])),
    )
    .await;

    for _ in 0..5 {
        let orchestrator = Orchestrator::new(create_test_config(&server, None));
        let result = orchestrator
            .run(&ScrapeRequest::with_max_pages(3))
            .await
            .unwrap();

        assert_eq!(titles(&result.records), vec!["P1", "Dup", "Only2", "Only3"]);
        assert_eq!(result.report.records_unchanged, 1);
    }
}

#[tokio::test]
async fn test_separate_orchestrators_do_not_share_cache() {
    let server = MockServer::start().await;
    mount_page(&server, 1, html(listing(&[item("A", "₹10.00", None)]))).await;

    let request = ScrapeRequest::with_max_pages(1);
    let first = Orchestrator::new(create_test_config(&server, None))
        .run(&request)
        .await
        .unwrap();
    let second = Orchestrator::new(create_test_config(&server, None))
        .run(&request)
        .await
        .unwrap();

    assert_eq!(first.records, second.records);
}

#[tokio::test]
async fn test_server_error_retried_until_attempts_run_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/shop/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(1))
        .await
        .unwrap();

    assert!(result.records.is_empty());
    assert_eq!(result.report.pages_with(PageOutcome::FetchFailed), 1);
    assert!(result.report.all_pages_failed());
    assert_eq!(result.report.failure_summary(), "1 of 1 pages failed");
}

#[tokio::test]
async fn test_transient_failure_recovers_on_retry() {
    let server = MockServer::start().await;

    // First attempt fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/shop/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, html(listing(&[item("A", "₹10.00", None)]))).await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(1))
        .await
        .unwrap();

    assert_eq!(titles(&result.records), vec!["A"]);
    assert_eq!(result.report.pages_failed(), 0);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/shop/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(1))
        .await
        .unwrap();

    assert!(result.records.is_empty());
    assert_eq!(result.report.pages_with(PageOutcome::NotFound), 1);
    assert_eq!(result.report.pages_failed(), 1);
}

#[tokio::test]
async fn test_failed_page_does_not_abort_run() {
    let server = MockServer::start().await;

    mount_page(&server, 1, html(listing(&[item("A", "₹10.00", None)]))).await;
    mount_page(&server, 2, ResponseTemplate::new(503)).await;
    mount_page(&server, 3, html(listing(&[item("C", "₹30.00", None)]))).await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(3))
        .await
        .unwrap();

    assert_eq!(titles(&result.records), vec!["A", "C"]);
    assert_eq!(result.report.failure_summary(), "1 of 3 pages failed");
    assert_eq!(result.report.failed_pages[0].page, 2);
}

#[tokio::test]
async fn test_malformed_items_are_skipped() {
    let server = MockServer::start().await;

    let items = vec![
        item("A", "₹10.00", None),
        item("Broken", "call for price", None),
        item("C", "₹1,250.00", None),
    ];
    mount_page(&server, 1, html(listing(&items))).await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(1))
        .await
        .unwrap();

    assert_eq!(titles(&result.records), vec!["A", "C"]);
    assert_eq!(result.records[1].price, 1250.0);
    assert_eq!(result.report.items_skipped, 1);
}

#[tokio::test]
async fn test_image_downloaded_into_assets_directory() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let assets_dir = tmp.path().join("images");

    let image_url = format!("{}/uploads/mirror.jpg", server.uri());
    mount_page(
        &server,
        1,
        html(listing(&[item("Mirror Set", "₹120.00", Some(&image_url))])),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/uploads/mirror.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server, Some(&assets_dir)));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(1))
        .await
        .unwrap();

    let expected = assets_dir.join("Mirror_Set.jpg");
    assert_eq!(
        result.records[0].asset_path.as_deref(),
        Some(expected.to_string_lossy().as_ref())
    );
    assert_eq!(std::fs::read(&expected).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);
}

#[tokio::test]
async fn test_lazy_image_used_on_later_pages() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let assets_dir = tmp.path().join("images");

    let page2 = r#"<div id="mf-shop-content"><ul><li>
        <div class="mf-product-thumbnail"><img src="data:image/svg+xml;base64,PHN2Zz4=" data-lazy-src="/uploads/lamp.jpg"></div>
        <h2 class="woo-loop-product__title">Lamp</h2>
        <span class="woocommerce-Price-amount"><bdi>₹50.00</bdi></span>
        </li></ul></div>"#
        .to_string();
    mount_page(&server, 1, html(listing(&[item("A", "₹10.00", None)]))).await;
    mount_page(&server, 2, html(page2)).await;
    Mock::given(method("GET"))
        .and(path("/uploads/lamp.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server, Some(&assets_dir)));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(2))
        .await
        .unwrap();

    assert_eq!(titles(&result.records), vec!["A", "Lamp"]);
    assert!(assets_dir.join("Lamp.jpg").exists());
}

#[tokio::test]
async fn test_unusable_assets_dir_does_not_swallow_records() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let assets_dir = tmp.path().join("images");
    std::fs::write(&assets_dir, b"not a directory").unwrap();

    let image_url = format!("{}/uploads/a.jpg", server.uri());
    mount_page(
        &server,
        1,
        html(listing(&[item("A", "₹10.00", Some(&image_url))])),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/uploads/a.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server, Some(&assets_dir)));
    let request = ScrapeRequest::with_max_pages(1);

    let failed = orchestrator.run(&request).await;
    assert!(matches!(failed, Err(ScrapeError::AssetsDir { .. })));
    assert!(orchestrator.cache().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());

    // once the directory is usable, the product is still new
    std::fs::remove_file(&assets_dir).unwrap();
    let result = orchestrator.run(&request).await.unwrap();
    assert_eq!(titles(&result.records), vec!["A"]);
    assert!(assets_dir.join("A.jpg").exists());
}

#[tokio::test]
async fn test_failed_redownload_keeps_earlier_image() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let assets_dir = tmp.path().join("images");
    let image_url = format!("{}/uploads/mirror.jpg", server.uri());

    mount_page(
        &server,
        1,
        html(listing(&[item("Mirror", "₹100.00", Some(&image_url))])),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/uploads/mirror.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first".to_vec()))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server, Some(&assets_dir)));
    let request = ScrapeRequest::with_max_pages(1);
    orchestrator.run(&request).await.unwrap();

    // price changes, but the image is gone now
    server.reset().await;
    mount_page(
        &server,
        1,
        html(listing(&[item("Mirror", "₹90.00", Some(&image_url))])),
    )
    .await;

    let result = orchestrator.run(&request).await.unwrap();
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].asset_path, None);
    assert_eq!(result.report.asset_failures, 1);
    assert_eq!(std::fs::read(assets_dir.join("Mirror.jpg")).unwrap(), b"first");
}

#[tokio::test]
async fn test_missing_image_keeps_record() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let assets_dir = tmp.path().join("images");

    // image path is not mounted, so the server answers 404
    let image_url = format!("{}/uploads/gone.jpg", server.uri());
    mount_page(
        &server,
        1,
        html(listing(&[item("Gloves", "₹5.00", Some(&image_url))])),
    )
    .await;

    let orchestrator = Orchestrator::new(create_test_config(&server, Some(&assets_dir)));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(1))
        .await
        .unwrap();

    assert_eq!(
        result.records,
        vec![Record {
            title: "Gloves".to_string(),
            price: 5.0,
            asset_path: None,
        }]
    );
    assert_eq!(result.report.asset_failures, 1);
    assert!(!assets_dir.join("Gloves.jpg").exists());
}

#[tokio::test]
async fn test_unbounded_run_stops_at_missing_page() {
    let server = MockServer::start().await;

    mount_page(&server, 1, html(listing(&[item("A", "₹10.00", None)]))).await;
    mount_page(&server, 2, html(listing(&[item("B", "₹20.00", None)]))).await;
    // pages 3 and up are not mounted and answer 404

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator.run(&ScrapeRequest::default()).await.unwrap();

    assert_eq!(titles(&result.records), vec!["A", "B"]);
    // waves of two: 1..=2, then 3..=4
    assert_eq!(result.report.pages_requested, 4);
    assert_eq!(result.report.pages_with(PageOutcome::NotFound), 2);
    assert_eq!(result.report.pages_failed(), 0);
    assert!(!result.report.stopped_early);
}

#[tokio::test]
async fn test_unbounded_run_respects_ceiling() {
    let server = MockServer::start().await;

    mount_page(&server, 1, html(listing(&[item("P1", "₹1.00", None)]))).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/shop/page/\d+$"))
        .respond_with(html(listing(&[item("Any", "₹2.00", None)])))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, None);
    config.scraper.pages_per_wave = 3;
    config.scraper.page_ceiling = 5;

    let orchestrator = Orchestrator::new(config);
    let result = orchestrator.run(&ScrapeRequest::default()).await.unwrap();

    assert_eq!(result.report.pages_requested, 5);
    assert!(result.report.stopped_early);
    assert_eq!(server.received_requests().await.unwrap().len(), 5);
    // "Any" is only new once
    assert_eq!(titles(&result.records), vec!["P1", "Any"]);
}

#[tokio::test]
async fn test_run_persisted_to_json_store() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_page(
        &server,
        1,
        html(listing(&[item("A", "₹10.00", None), item("B", "₹20.00", None)])),
    )
    .await;

    let orchestrator = Orchestrator::new(create_test_config(&server, None));
    let result = orchestrator
        .run(&ScrapeRequest::with_max_pages(1))
        .await
        .unwrap();

    let mut store = JsonFileStore::new(&tmp.path().join("products.json"));
    assert!(matches!(store.listing(), Err(StorageError::NotFound(_))));

    store
        .persist(&RunBatch {
            records: &result.records,
            report: &result.report,
            config_hash: "test",
        })
        .unwrap();

    let listing = store.listing().unwrap();
    assert!(listing.contains("\"product_title\": \"A\""));
    let stored: Vec<Record> = serde_json::from_str(&listing).unwrap();
    assert_eq!(stored, result.records);
}
