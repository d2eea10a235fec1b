//! End-to-end notebook flows against a mocked hosting endpoint

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use atproto_client::AtprotoClient;
use labglass_notebooks::{CellDraft, NotebookStore, CELL_COLLECTION, NOTEBOOK_COLLECTION};

const DID: &str = "did:plc:alicetest123";
const HANDLE: &str = "alice.example";

async fn mount_identity_and_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.identity.resolveHandle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "did": DID })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/{DID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": DID,
            "service": [{
                "id": "#atproto_pds",
                "type": "AtprotoPersonalDataServer",
                "serviceEndpoint": server.uri(),
            }],
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": DID,
            "handle": HANDLE,
            "accessJwt": "access-1",
            "refreshJwt": "refresh-1",
        })))
        .mount(server)
        .await;
}

/// createRecord responder that echoes the URI derived from the request body
fn echo_create_record(req: &Request) -> ResponseTemplate {
    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
    let uri = format!(
        "at://{}/{}/{}",
        body["repo"].as_str().unwrap(),
        body["collection"].as_str().unwrap(),
        body["rkey"].as_str().unwrap()
    );
    ResponseTemplate::new(200).set_body_json(json!({ "uri": uri, "cid": "bafycreated" }))
}

#[tokio::test]
async fn save_notebook_creates_cells_then_envelope() {
    let server = MockServer::start().await;
    mount_identity_and_session(&server).await;

    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.createRecord"))
        .respond_with(echo_create_record)
        .expect(3)
        .mount(&server)
        .await;

    let client = Arc::new(AtprotoClient::with_urls(&server.uri(), &server.uri()));
    client.login(HANDLE, "app-secret-1234").await.unwrap();
    let store = NotebookStore::new(client);

    let drafts = vec![
        CellDraft {
            cell_type: "markdown".to_string(),
            source: "# Title".to_string(),
            ..Default::default()
        },
        CellDraft {
            cell_type: "python".to_string(),
            source: "print(1)".to_string(),
            text_output: Some("1".to_string()),
            ..Default::default()
        },
    ];
    let saved = store
        .save_notebook("pH series", "starter acidity", drafts, vec!["baking".to_string()])
        .await
        .unwrap();

    assert_eq!(saved.cell_uris.len(), 2);
    assert!(saved.uri.contains(NOTEBOOK_COLLECTION));

    let requests = server.received_requests().await.unwrap();
    let created_collections: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == "/xrpc/com.atproto.repo.createRecord")
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["collection"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        created_collections,
        vec![CELL_COLLECTION, CELL_COLLECTION, NOTEBOOK_COLLECTION]
    );

    // The envelope references the cell URIs in order.
    let envelope_body: serde_json::Value = requests
        .iter()
        .filter(|r| r.url.path() == "/xrpc/com.atproto.repo.createRecord")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .find(|b: &serde_json::Value| b["collection"] == NOTEBOOK_COLLECTION)
        .unwrap();
    assert_eq!(
        envelope_body["record"]["cells"],
        json!(saved.cell_uris),
    );
    assert_eq!(envelope_body["record"]["tags"], json!(["baking"]));

    // Cell records carry camelCase fields and defaulted names.
    let first_cell: serde_json::Value = requests
        .iter()
        .filter(|r| r.url.path() == "/xrpc/com.atproto.repo.createRecord")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .find(|b: &serde_json::Value| b["collection"] == CELL_COLLECTION)
        .unwrap();
    assert_eq!(first_cell["record"]["cellType"], "markdown");
    assert_eq!(first_cell["record"]["name"], "markdown_0");
}

#[tokio::test]
async fn load_notebook_substitutes_placeholder_for_missing_cell() {
    let server = MockServer::start().await;

    let good_cell = format!("at://{DID}/{CELL_COLLECTION}/3goodcell2345");
    let bad_cell = format!("at://{DID}/{CELL_COLLECTION}/3badcell23456");

    Mock::given(method("GET"))
        .and(path(format!("/{DID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": DID,
            "service": [{
                "id": "#atproto_pds",
                "type": "AtprotoPersonalDataServer",
                "serviceEndpoint": server.uri(),
            }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.getRecord"))
        .and(query_param("collection", NOTEBOOK_COLLECTION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uri": format!("at://{DID}/{NOTEBOOK_COLLECTION}/3notebook2345"),
            "cid": "bafynotebook",
            "value": {
                "title": "pH series",
                "description": "",
                "createdAt": "2026-08-30T12:00:00Z",
                "updatedAt": "2026-08-30T12:00:00Z",
                "visibility": "public",
                "cells": [good_cell, bad_cell],
            },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.getRecord"))
        .and(query_param("rkey", "3goodcell2345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uri": good_cell,
            "cid": "bafycell",
            "value": {
                "cellType": "python",
                "source": "print(1)",
                "name": "python_0",
                "createdAt": "2026-08-30T12:00:00Z",
                "position": 0,
            },
        })))
        .mount(&server)
        .await;
    // Missing everywhere: aggregator attempt plus authoritative fallback.
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.getRecord"))
        .and(query_param("rkey", "3badcell23456"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let client = Arc::new(AtprotoClient::with_urls(&server.uri(), &server.uri()));
    let store = NotebookStore::new(client);

    let loaded = store.load_notebook(DID, "3notebook2345").await.unwrap();

    assert_eq!(loaded.cells.len(), 2);
    assert_eq!(loaded.cells[0].cell_type, "python");
    assert_eq!(loaded.cells[1].cell_type, "markdown");
    assert!(loaded.cells[1].source.contains("failed to load"));
    assert_eq!(loaded.cells[1].position, 1);
}

#[tokio::test]
async fn delete_notebook_removes_cells_before_envelope() {
    let server = MockServer::start().await;
    mount_identity_and_session(&server).await;

    let cell_one = format!("at://{DID}/{CELL_COLLECTION}/3cellone23456");
    let cell_two = format!("at://{DID}/{CELL_COLLECTION}/3celltwo23456");

    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.getRecord"))
        .and(query_param("collection", NOTEBOOK_COLLECTION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uri": format!("at://{DID}/{NOTEBOOK_COLLECTION}/3notebook2345"),
            "cid": "bafynotebook",
            "value": {
                "title": "pH series",
                "createdAt": "2026-08-30T12:00:00Z",
                "updatedAt": "2026-08-30T12:00:00Z",
                "visibility": "public",
                "cells": [cell_one, cell_two],
            },
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.deleteRecord"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    let client = Arc::new(AtprotoClient::with_urls(&server.uri(), &server.uri()));
    client.login(HANDLE, "app-secret-1234").await.unwrap();
    let store = NotebookStore::new(client);

    let failed = store.delete_notebook("3notebook2345").await.unwrap();
    assert!(failed.is_empty());

    let requests = server.received_requests().await.unwrap();
    let deleted: Vec<(String, String)> = requests
        .iter()
        .filter(|r| r.url.path() == "/xrpc/com.atproto.repo.deleteRecord")
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            (
                body["collection"].as_str().unwrap().to_string(),
                body["rkey"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        deleted,
        vec![
            (CELL_COLLECTION.to_string(), "3cellone23456".to_string()),
            (CELL_COLLECTION.to_string(), "3celltwo23456".to_string()),
            (NOTEBOOK_COLLECTION.to_string(), "3notebook2345".to_string()),
        ]
    );
}

#[tokio::test]
async fn list_notebooks_maps_records_and_skips_malformed_entries() {
    let server = MockServer::start().await;
    mount_identity_and_session(&server).await;

    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.listRecords"))
        .and(query_param("collection", NOTEBOOK_COLLECTION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {
                    "uri": format!("at://{DID}/{NOTEBOOK_COLLECTION}/3notebook2345"),
                    "cid": "bafyone",
                    "value": {
                        "title": "pH series",
                        "createdAt": "2026-08-30T12:00:00Z",
                        "updatedAt": "2026-08-30T12:00:00Z",
                        "visibility": "public",
                        "cells": [],
                    },
                },
                {
                    "uri": format!("at://{DID}/{NOTEBOOK_COLLECTION}/3notebook6789"),
                    "cid": "bafytwo",
                    "value": { "unexpected": "shape" },
                },
            ],
            "cursor": "3notebook2345",
        })))
        .mount(&server)
        .await;

    let client = Arc::new(AtprotoClient::with_urls(&server.uri(), &server.uri()));
    let store = NotebookStore::new(client);

    let page = store.list_notebooks(HANDLE, Some(20), None).await.unwrap();

    assert_eq!(page.notebooks.len(), 1);
    assert_eq!(page.notebooks[0].rkey, "3notebook2345");
    assert_eq!(page.notebooks[0].notebook.title, "pH series");
    assert_eq!(page.cursor.as_deref(), Some("3notebook2345"));
}
