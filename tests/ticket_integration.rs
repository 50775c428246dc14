//! Integration tests for trusted-ticket issuance.
//!
//! These tests run the issuer against a mock `/trusted` endpoint.

use std::time::Duration;

use viz_export::ticket::{TicketError, TicketIssuer, TicketRequest};
use viz_export::tls::TlsPolicy;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn issuer() -> TicketIssuer {
    TicketIssuer::new(&TlsPolicy::Plaintext, Duration::from_secs(5))
        .expect("plaintext client should build")
}

fn request(server: &str) -> TicketRequest<'_> {
    TicketRequest {
        server,
        site: "",
        username: "alice",
        domain: None,
        client_ip: None,
    }
}

#[tokio::test]
async fn test_issue_returns_ticket() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trusted"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("username=alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string("tkt-abc"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let host = mock_server.address().to_string();
    let ticket = issuer().issue(&request(&host), 1).await.unwrap();

    assert_eq!(ticket.into_secret(), "tkt-abc");
}

#[tokio::test]
async fn test_issue_sends_domain_client_ip_and_site() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trusted"))
        .and(body_string(
            "username=CORP%5Calice&client_ip=10.0.0.5&target_site=finance",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("tkt-abc"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let host = mock_server.address().to_string();
    let req = TicketRequest {
        site: "finance",
        domain: Some("CORP"),
        client_ip: Some("10.0.0.5"),
        ..request(&host)
    };

    assert!(issuer().issue(&req, 1).await.is_ok());
}

#[tokio::test]
async fn test_sentinel_ticket_exhausts_attempts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trusted"))
        .respond_with(ResponseTemplate::new(200).set_body_string("-1"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let host = mock_server.address().to_string();
    let err = issuer().issue(&request(&host), 3).await.unwrap_err();

    match err {
        TicketError::IssuanceFailed {
            attempts,
            last,
            details,
        } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, TicketError::Invalid { .. }));
            assert!(details.contains("Username: alice"), "details: {details}");
        }
        other => panic!("expected IssuanceFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_ticket_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trusted"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&mock_server)
        .await;

    let host = mock_server.address().to_string();
    let err = issuer().issue(&request(&host), 1).await.unwrap_err();

    assert!(err.is_issuance_failure());
    assert!(err.to_string().contains("invalid trusted ticket"), "got: {err}");
}

#[tokio::test]
async fn test_server_error_retried_then_ticket_issued() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trusted"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/trusted"))
        .respond_with(ResponseTemplate::new(200).set_body_string("tkt-second"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let host = mock_server.address().to_string();
    let ticket = issuer().issue(&request(&host), 2).await.unwrap();

    assert_eq!(ticket.into_secret(), "tkt-second");
}

#[tokio::test]
async fn test_http_error_reported_after_last_attempt() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trusted"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&mock_server)
        .await;

    let host = mock_server.address().to_string();
    let err = issuer().issue(&request(&host), 2).await.unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("2 attempt(s)"), "got: {msg}");
    assert!(msg.contains("HTTP 401"), "got: {msg}");
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let host = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };

    let err = issuer().issue(&request(&host), 1).await.unwrap_err();

    match err {
        TicketError::IssuanceFailed { last, .. } => {
            assert!(
                matches!(*last, TicketError::Network { .. }),
                "expected network error, got {last:?}"
            );
        }
        other => panic!("expected IssuanceFailed, got {other:?}"),
    }
}
