//! End-to-end tests: listing page, checksum documents and artifact bytes
//! all served by a mock HTTP server.

use std::path::Path;
use std::time::Duration;

use assert_fs::TempDir;
use assert_fs::prelude::*;
use mockito::{Mock, Server, ServerGuard};
use sha2::{Digest, Sha256};
use toolup_catalog::{
    Acquired, AcquisitionPipeline, CatalogScraper, HttpRetriever, ListingLayout, PlatformTags,
};

const FIXTURE: &str = include_str!("fixtures/downloads.html");
const LISTING_PATH: &str = "/java/technologies/downloads/";
const JDK17_BODY: &[u8] = b"\x1f\x8b fake jdk 17 archive bytes";
const JDK21_BODY: &[u8] = b"\x1f\x8b fake jdk 21 archive bytes";

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

async fn serve_listing(server: &mut ServerGuard) -> Mock {
    let page = FIXTURE.replace("{{base}}", &server.url());
    server
        .mock("GET", LISTING_PATH)
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(page)
        .create_async()
        .await
}

async fn serve(server: &mut ServerGuard, path: &str, body: impl AsRef<[u8]>) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

fn scraper(server: &ServerGuard) -> CatalogScraper {
    CatalogScraper::new(
        format!("{}{LISTING_PATH}", server.url()),
        ListingLayout::default(),
    )
    .expect("client")
    .with_platform(PlatformTags::translate("linux", "amd64"))
}

fn pipeline(server: &ServerGuard, cache: &Path) -> AcquisitionPipeline {
    AcquisitionPipeline::new(
        Box::new(scraper(server)),
        Box::new(HttpRetriever::new()),
        cache,
    )
    .with_timeout(Duration::from_secs(30))
}

#[tokio::test]
async fn scrape_builds_platform_catalog() {
    let mut server = Server::new_async().await;
    let listing = serve_listing(&mut server).await;
    let sha21 = serve(
        &mut server,
        "/java/21/jdk21-linux-x64.tar.gz.sha256",
        format!("{}\n", sha256_hex(JDK21_BODY)),
    )
    .await;
    let sha17 = serve(
        &mut server,
        "/java/17/jdk17-linux-x64.tar.gz.sha256",
        sha256_hex(JDK17_BODY),
    )
    .await;

    let catalog = scraper(&server).scrape().await.expect("catalog");

    listing.assert_async().await;
    sha21.assert_async().await;
    sha17.assert_async().await;

    assert_eq!(catalog.labels().collect::<Vec<_>>(), vec!["21", "17"]);

    let jdk21 = catalog.get("21").expect("21");
    assert_eq!(jdk21.artifacts().len(), 1);
    let artifact = jdk21.canonical().expect("artifact");
    assert_eq!(artifact.file_name, "jdk21-linux-x64.tar.gz");
    assert_eq!(artifact.size, "186.63 MB");
    assert_eq!(artifact.checksum.trim(), sha256_hex(JDK21_BODY));

    let jdk17 = catalog.get("17").and_then(|e| e.canonical()).expect("17");
    assert_eq!(
        jdk17.url,
        format!("{}/java/17/jdk17-linux-x64.tar.gz", server.url())
    );
    assert_eq!(jdk17.os, "linux");
    assert_eq!(jdk17.arch, "x64");
}

#[tokio::test]
async fn acquire_downloads_and_verifies() {
    let mut server = Server::new_async().await;
    let _listing = serve_listing(&mut server).await;
    let _sha17 = serve(
        &mut server,
        "/java/17/jdk17-linux-x64.tar.gz.sha256",
        format!("{}  jdk17-linux-x64.tar.gz\n", sha256_hex(JDK17_BODY)),
    )
    .await;
    let artifact = serve(&mut server, "/java/17/jdk17-linux-x64.tar.gz", JDK17_BODY).await;

    let cache = TempDir::new().expect("temp dir");
    let outcome = pipeline(&server, cache.path())
        .acquire("java17")
        .await
        .expect("acquire");

    artifact.assert_async().await;
    let expected = cache.path().join("jdk17-linux-x64.tar.gz");
    assert_eq!(outcome, Acquired::Ready(expected.clone()));
    assert_eq!(std::fs::read(&expected).expect("read"), JDK17_BODY);
    cache
        .child("jdk17-linux-x64.tar.gz.part")
        .assert(predicates::path::missing());
}

#[tokio::test]
async fn acquire_with_wrong_digest_leaves_no_file() {
    let mut server = Server::new_async().await;
    let _listing = serve_listing(&mut server).await;
    let _sha17 = serve(
        &mut server,
        "/java/17/jdk17-linux-x64.tar.gz.sha256",
        sha256_hex(b"something else entirely"),
    )
    .await;
    let _artifact = serve(&mut server, "/java/17/jdk17-linux-x64.tar.gz", JDK17_BODY).await;

    let cache = TempDir::new().expect("temp dir");
    let outcome = pipeline(&server, cache.path())
        .acquire("java17")
        .await
        .expect("acquire");

    assert!(matches!(outcome, Acquired::VerificationFailed { .. }));
    assert_eq!(outcome.path(), None);
    cache
        .child("jdk17-linux-x64.tar.gz")
        .assert(predicates::path::missing());
    cache
        .child("jdk17-linux-x64.tar.gz.part")
        .assert(predicates::path::missing());
}

#[tokio::test]
async fn acquire_without_published_digest_fails_verification() {
    let mut server = Server::new_async().await;
    let _listing = serve_listing(&mut server).await;
    let _missing = server
        .mock("GET", "/java/17/jdk17-linux-x64.tar.gz.sha256")
        .with_status(404)
        .create_async()
        .await;
    let _artifact = serve(&mut server, "/java/17/jdk17-linux-x64.tar.gz", JDK17_BODY).await;

    let cache = TempDir::new().expect("temp dir");
    let outcome = pipeline(&server, cache.path())
        .acquire("17")
        .await
        .expect("acquire");

    match outcome {
        Acquired::VerificationFailed { expected, actual, .. } => {
            assert!(expected.is_empty());
            assert_eq!(actual, sha256_hex(JDK17_BODY));
        }
        other => panic!("expected VerificationFailed, got {other:?}"),
    }
    cache
        .child("jdk17-linux-x64.tar.gz")
        .assert(predicates::path::missing());
}

#[tokio::test]
async fn acquire_reports_failed_transfer() {
    let mut server = Server::new_async().await;
    let _listing = serve_listing(&mut server).await;
    let _sha17 = serve(
        &mut server,
        "/java/17/jdk17-linux-x64.tar.gz.sha256",
        sha256_hex(JDK17_BODY),
    )
    .await;
    let _gone = server
        .mock("GET", "/java/17/jdk17-linux-x64.tar.gz")
        .with_status(500)
        .create_async()
        .await;

    let cache = TempDir::new().expect("temp dir");
    let outcome = pipeline(&server, cache.path())
        .acquire("java17")
        .await
        .expect("acquire");

    assert!(matches!(outcome, Acquired::TransferFailed { .. }));
    let leftovers = std::fs::read_dir(cache.path()).expect("read dir").count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn acquire_unknown_version_never_requests_artifacts() {
    let mut server = Server::new_async().await;
    let _listing = serve_listing(&mut server).await;
    let artifact = server
        .mock("GET", mockito::Matcher::Regex(r"\.tar\.gz$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let cache = TempDir::new().expect("temp dir");
    let outcome = pipeline(&server, cache.path())
        .acquire("java8")
        .await
        .expect("acquire");

    artifact.assert_async().await;
    assert_eq!(
        outcome,
        Acquired::NotFound {
            version: "8".to_string()
        }
    );
}

#[tokio::test]
async fn unreachable_listing_is_a_fetch_error() {
    let cache = TempDir::new().expect("temp dir");
    let scraper = CatalogScraper::new("http://127.0.0.1:1/downloads/", ListingLayout::default())
        .expect("client")
        .with_platform(PlatformTags::translate("linux", "amd64"));
    let pipeline = AcquisitionPipeline::new(
        Box::new(scraper),
        Box::new(HttpRetriever::new()),
        cache.path(),
    );

    let err = pipeline.acquire("java17").await.expect_err("should fail");
    assert!(matches!(err, toolup_catalog::CatalogError::Fetch { .. }));
}
