//! DAS JSON-RPC client against an HTTP fake

use credify_core::{AssetQuery, CredifyError};
use credify_verifier::{DasAssetQuery, SoulboundPolicyChecker, VerificationEngine};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn asset_json(delegate: Option<&str>) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": "credify",
        "result": {
            "id": "asset-X",
            "content": { "json_uri": "https://arweave.net/meta", "metadata": {} },
            "grouping": [{ "group_key": "collection", "group_value": "Col1" }],
            "ownership": {
                "owner": "Owner1",
                "delegate": delegate,
                "delegated": delegate.is_some(),
                "frozen": false
            },
            "compression": { "tree": "Tree1", "leaf_id": 0, "compressed": true }
        }
    })
}

#[tokio::test]
async fn test_get_asset_parses_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAsset", "params": { "id": "asset-X" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(asset_json(None)))
        .mount(&server)
        .await;

    let query = DasAssetQuery::new(&server.uri()).unwrap();
    let asset = query.get_asset("asset-X").await.unwrap().unwrap();
    assert_eq!(asset.ownership.owner, "Owner1");
    assert_eq!(asset.ownership.delegate, None);
    assert_eq!(asset.tree(), Some("Tree1"));
    assert_eq!(asset.collection(), Some("Col1"));
}

#[tokio::test]
async fn test_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "credify",
            "error": { "code": -32000, "message": "Asset Not Found" }
        })))
        .mount(&server)
        .await;

    let query = DasAssetQuery::new(&server.uri()).unwrap();
    assert!(query.get_asset("missing").await.unwrap().is_none());
    assert!(query.get_asset_proof("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_errors_are_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let query = DasAssetQuery::new(&server.uri()).unwrap();
    let err = query.get_asset("asset-X").await.unwrap_err();
    assert!(matches!(err, CredifyError::Transport(_)));
}

#[tokio::test]
async fn test_rpc_rejection_is_policy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "credify",
            "error": { "code": -32602, "message": "Invalid params: malformed id" }
        })))
        .mount(&server)
        .await;

    let query = DasAssetQuery::new(&server.uri()).unwrap();
    let err = query.get_asset("???").await.unwrap_err();
    assert!(matches!(err, CredifyError::PolicyRejection(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_error_outcome() {
    // Nothing listens on the discard port
    let query = DasAssetQuery::new("http://127.0.0.1:9/").unwrap();
    let engine = VerificationEngine::new(
        Arc::new(query),
        SoulboundPolicyChecker::for_program(credify_crypto::DEFAULT_PROGRAM_ID).unwrap(),
    )
    .with_retry(credify_issuer::RetryPolicy::new(credify_issuer::RetryOptions {
        max_retries: 1,
        initial_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(1),
        ..Default::default()
    }));

    let outcome = engine.verify("asset-X").await;
    assert_eq!(outcome.status(), "error");
}

#[tokio::test]
async fn test_bad_proof_from_das_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAsset" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(asset_json(None)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAssetProof" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "credify",
            "result": {
                "root": "11111111111111111111111111111111",
                "proof": [],
                "leaf": "11111111111111111111111111111111",
                "tree_id": "Tree1",
                "node_index": 16384
            }
        })))
        .mount(&server)
        .await;

    let engine = VerificationEngine::new(
        Arc::new(DasAssetQuery::new(&server.uri()).unwrap()),
        SoulboundPolicyChecker::for_program(credify_crypto::DEFAULT_PROGRAM_ID).unwrap(),
    );
    let outcome = engine.verify("asset-X").await;
    assert_eq!(outcome.status(), "invalid");
}
