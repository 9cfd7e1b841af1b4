//! Mock server helpers for the release feed and asset downloads
//!
//! Direct downloads are served from
//! `/docker/compose/releases/download/<tag>/<asset>`, the same layout as the
//! real download host.

use compose_update::releases::{AssetRecord, ReleaseRecord};
use compose_update::verify::sha256_hex;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::builders::asset_record;
use super::constants::*;

/// Path of a directly downloaded asset
pub fn download_path(tag: &str, asset: &str) -> String {
    format!("/{}/{}/releases/download/{}/{}", REPO_OWNER, REPO_NAME, tag, asset)
}

/// Checksum sidecar contents for `content`
pub fn checksum_file(content: &[u8], asset: &str) -> String {
    format!("{}  {}\n", sha256_hex(content), asset)
}

/// Serve the release list, expecting exactly one request
pub async fn mock_release_feed(server: &MockServer, releases: &[ReleaseRecord]) {
    Mock::given(method("GET"))
        .and(path(RELEASES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(releases))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve an asset at its direct download path
pub async fn mock_asset(server: &MockServer, tag: &str, asset: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(download_path(tag, asset)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Serve the linux/amd64 binary and a matching checksum for `tag`
pub async fn mock_linux_release_assets(server: &MockServer, tag: &str, binary: &[u8]) {
    mock_asset(server, tag, ASSET_LINUX_AMD64, binary).await;
    mock_asset(
        server,
        tag,
        CHECKSUM_LINUX_AMD64,
        checksum_file(binary, ASSET_LINUX_AMD64).as_bytes(),
    )
    .await;
}

/// Serve an asset path that fails `fail_count` times with 500 before succeeding
pub async fn mock_flaky_asset(
    server: &MockServer,
    tag: &str,
    asset: &str,
    fail_count: u64,
    body: &[u8],
) {
    Mock::given(method("GET"))
        .and(path(download_path(tag, asset)))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(fail_count)
        .mount(server)
        .await;

    mock_asset(server, tag, asset, body).await;
}

/// Answer `url_path` with `status`, expecting exactly `times` requests
pub async fn mock_status(server: &MockServer, url_path: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(url_path.to_string()))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

/// Serve the asset listing API for release `release_id`
///
/// Lists `names`; every listed asset resolves to `/files/<name>` with the
/// given declared size.
pub async fn mock_asset_api(
    server: &MockServer,
    release_id: u64,
    names: &[&str],
    declared_sizes: &[u64],
) {
    let base = server.uri();
    let assets: Vec<AssetRecord> = names
        .iter()
        .enumerate()
        .map(|(i, name)| asset_record(&base, 100 + i as u64, name))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("{}/{}/assets", RELEASES_PATH, release_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(&assets))
        .mount(server)
        .await;

    for (i, name) in names.iter().enumerate() {
        let size = declared_sizes.get(i).copied().unwrap_or(0);
        Mock::given(method("GET"))
            .and(path(format!("{}/assets/{}", RELEASES_PATH, 100 + i)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 100 + i,
                "name": name,
                "size": size,
                "browser_download_url": format!("{}/files/{}", base, name),
            })))
            .mount(server)
            .await;
    }
}

/// Serve a file from `/files/<name>`
pub async fn mock_file(server: &MockServer, name: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}
