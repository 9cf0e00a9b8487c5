//! Unit tests for the remote API client

use super::*;
use serde_json::json;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn client_for(server: &MockServer) -> ApiFootballClient {
    ApiFootballClient::new(server.uri(), "test-key").unwrap()
}

#[tokio::test]
async fn test_status_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .and(header(API_KEY_HEADER, "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "results": 1,
            "response": {
                "account": {"firstname": "Test"},
                "requests": {"current": 40, "limit_day": 100}
            }
        })))
        .mount(&mock_server)
        .await;

    let status = client_for(&mock_server).await.status().await.unwrap();
    assert_eq!(status, ApiStatus { used: 40, limit: 100 });
    assert_eq!(status.remaining(), 60);
}

#[tokio::test]
async fn test_status_failure_is_quota_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    match client_for(&mock_server).await.status().await {
        Err(SyncError::QuotaUnavailable { .. }) => (),
        other => panic!("Expected QuotaUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_squad_returns_matching_team() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/players/squads"))
        .and(query_param("team", "33"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "results": 1,
            "response": [{
                "team": {"id": 33, "name": "Manchester United", "logo": "https://x/33.png"},
                "players": [
                    {
                        "id": 882, "name": "D. de Gea", "number": 1,
                        "position": "Goalkeeper", "photo": "https://x/882.png"
                    },
                    {
                        "id": 909, "name": "M. Rashford", "number": 10,
                        "position": "Attacker", "photo": null
                    }
                ]
            }]
        })))
        .mount(&mock_server)
        .await;

    let squad = client_for(&mock_server)
        .await
        .squad(TeamId::new(33))
        .await
        .unwrap()
        .expect("squad present");
    assert_eq!(squad.team.name, "Manchester United");
    assert_eq!(squad.players.len(), 2);
    assert_eq!(squad.players[1].number, Some(10));
}

#[tokio::test]
async fn test_squad_empty_response_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/players/squads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [], "results": 0, "response": []
        })))
        .mount(&mock_server)
        .await;

    let squad = client_for(&mock_server)
        .await
        .squad(TeamId::new(9999))
        .await
        .unwrap();
    assert!(squad.is_none());
}

#[tokio::test]
async fn test_daily_limit_becomes_quota_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/coachs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": {"requests": "You have reached the request limit for the day"},
            "results": 0,
            "response": []
        })))
        .mount(&mock_server)
        .await;

    match client_for(&mock_server).await.coach(TeamId::new(33)).await {
        Err(SyncError::QuotaExhausted { message }) => {
            assert!(message.contains("request limit"));
        }
        other => panic!("Expected QuotaExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_too_many_requests_becomes_quota_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/players/squads"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).await.squad(TeamId::new(33)).await;
    assert!(matches!(result, Err(SyncError::QuotaExhausted { .. })));
}

#[tokio::test]
async fn test_other_body_errors_become_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/coachs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": {"team": "The Team field must contain an integer."},
            "results": 0,
            "response": []
        })))
        .mount(&mock_server)
        .await;

    match client_for(&mock_server).await.coach(TeamId::new(33)).await {
        Err(SyncError::Api { status, message }) => {
            assert_eq!(status, 200);
            assert!(message.contains("integer"));
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_coach_prefers_current_spell() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/coachs"))
        .and(query_param("team", "33"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "results": 2,
            "response": [
                {"id": 1, "name": "Former Coach", "career": [
                    {"team": {"id": 33}, "start": "2019-01-01", "end": "2021-11-01"}
                ]},
                {"id": 2, "name": "Current Coach", "career": [
                    {"team": {"id": 33}, "start": "2022-07-01", "end": null}
                ]}
            ]
        })))
        .mount(&mock_server)
        .await;

    let coach = client_for(&mock_server)
        .await
        .coach(TeamId::new(33))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coach.name, "Current Coach");
}

#[tokio::test]
async fn test_server_error_carries_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;

    match client_for(&mock_server)
        .await
        .teams(LeagueId::new(39), Season::new(2024))
        .await
    {
        Err(SyncError::Api { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "bad gateway");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_lineup_colors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fixtures/lineups"))
        .and(query_param("fixture", "1035037"))
        .and(query_param("team", "33"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "results": 1,
            "response": [{
                "team": {
                    "id": 33,
                    "colors": {
                        "player": {"primary": "da291c", "number": "ffffff", "border": "da291c"},
                        "goalkeeper": {"primary": "000000", "number": "ffffff", "border": "000000"}
                    }
                }
            }]
        })))
        .mount(&mock_server)
        .await;

    let colors = client_for(&mock_server)
        .await
        .lineup_colors(1035037, TeamId::new(33))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(colors.primary.as_deref(), Some("da291c"));
    assert_eq!(colors.number.as_deref(), Some("ffffff"));
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("abcdefghij", 4), "abcd...");
}
