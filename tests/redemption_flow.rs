//! End-to-end credential lifecycle tests: issue, scan, and the failure
//! taxonomy, run against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::task::JoinSet;
use uuid::Uuid;

use gatepass_server::credential::{CredentialIssuer, IssueError, QrPayload, PAYLOAD_TYPE};
use gatepass_server::models::{Event, NewIssuedToken, Ticket, TicketStatus};
use gatepass_server::redemption::{GateVerifier, ScanRejection};
use gatepass_server::security::{self, GateSecret};
use gatepass_server::store::{GateStore, MemoryGateStore, TicketStore, TokenStore};

const SECRET: &[u8] = b"integration-test-secret";

struct Harness {
    store: Arc<MemoryGateStore>,
    issuer: CredentialIssuer,
    verifier: GateVerifier,
    secret: GateSecret,
}

fn event(id: i64, title: &str) -> Event {
    Event {
        id,
        title: title.to_string(),
        location: None,
        starts_at: Utc::now() + Duration::days(1),
    }
}

fn ticket(id: i64, owner_id: i64, event_id: i64, status: TicketStatus) -> Ticket {
    let now = Utc::now();
    Ticket {
        id,
        owner_id,
        event_id,
        status,
        created_at: now,
        updated_at: now,
    }
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryGateStore::new());
    store.seed_event(event(7, "Harbor Lights Festival")).await;
    store
        .seed_ticket(ticket(101, 55, 7, TicketStatus::Valid))
        .await;

    let secret = Arc::new(GateSecret::new(SECRET.to_vec()));
    let gate: Arc<dyn GateStore> = store.clone();

    Harness {
        issuer: CredentialIssuer::new(secret.clone(), gate.clone()),
        verifier: GateVerifier::new(secret, gate),
        store,
        secret: GateSecret::new(SECRET.to_vec()),
    }
}

fn scanner() -> Uuid {
    Uuid::new_v4()
}

async fn issue_qr(h: &Harness, ticket_id: i64, window: Duration) -> (QrPayload, String) {
    let credential = h.issuer.issue(ticket_id, window).await.unwrap();
    let qr = serde_json::to_string(&credential.payload).unwrap();
    (credential.payload, qr)
}

#[tokio::test]
async fn valid_scan_admits_and_marks_ticket_used() {
    let h = harness().await;
    let (_, qr) = issue_qr(&h, 101, Duration::hours(24)).await;

    let admission = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap();

    assert_eq!(admission.ticket.id, 101);
    assert_eq!(admission.ticket.event_id, 7);
    assert_eq!(admission.ticket.owner_id, 55);
    assert_eq!(admission.ticket.status, TicketStatus::Used);
    let event = admission.event.unwrap();
    assert_eq!(event.id, 7);
    assert_eq!(event.title, "Harbor Lights Festival");

    let stored = h.store.get_ticket(101).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Used);
    assert_eq!(h.store.scan_audit().await.len(), 1);
    assert_eq!(h.store.attendance().await.len(), 1);
}

#[tokio::test]
async fn second_scan_of_same_credential_is_rejected() {
    let h = harness().await;
    let (_, qr) = issue_qr(&h, 101, Duration::hours(24)).await;

    h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap();
    let err = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap_err();

    // The token was consumed by the first scan, so the replay dies at the
    // token lookup.
    assert_eq!(err, ScanRejection::UnknownOrConsumedToken);
    assert_eq!(h.store.scan_audit().await.len(), 1);
    assert_eq!(h.store.attendance().await.len(), 1);
}

#[tokio::test]
async fn expired_credential_is_rejected_as_expired() {
    let h = harness().await;
    let (_, qr) = issue_qr(&h, 101, Duration::seconds(1)).await;

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    let err = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap_err();
    assert_eq!(err, ScanRejection::Expired);

    // Nothing was consumed; the ticket is still redeemable with a fresh
    // credential.
    let stored = h.store.get_ticket(101).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Valid);
}

#[tokio::test]
async fn tampered_event_id_with_stale_signature_is_a_forgery() {
    let h = harness().await;
    let (payload, _) = issue_qr(&h, 101, Duration::hours(24)).await;

    let mut tampered = payload;
    tampered.event_id = 8; // signature left as issued

    let qr = serde_json::to_string(&tampered).unwrap();
    let err = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap_err();
    assert_eq!(err, ScanRejection::InvalidSignature);
}

#[tokio::test]
async fn mutating_any_signed_field_invalidates_the_signature() {
    let h = harness().await;
    let (payload, _) = issue_qr(&h, 101, Duration::hours(24)).await;

    let mut later_expiry = payload.clone();
    later_expiry.expires_at = later_expiry.expires_at + Duration::days(30);

    let mut other_token = payload;
    other_token.token = security::generate_token();

    for tampered in [later_expiry, other_token] {
        let qr = serde_json::to_string(&tampered).unwrap();
        let err = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap_err();
        assert_eq!(err, ScanRejection::InvalidSignature);
    }
}

#[tokio::test]
async fn missing_token_record_is_unknown_or_consumed() {
    let h = harness().await;
    let (payload, qr) = issue_qr(&h, 101, Duration::hours(24)).await;

    // Simulated storage loss of the backing record.
    assert!(h.store.delete_token(&payload.token).await.unwrap());

    let err = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap_err();
    assert_eq!(err, ScanRejection::UnknownOrConsumedToken);
}

#[tokio::test]
async fn wrong_type_tag_is_rejected_before_signature_checks() {
    let h = harness().await;
    let (payload, _) = issue_qr(&h, 101, Duration::hours(24)).await;

    let mut wrong_type = payload;
    wrong_type.kind = "general-admission".to_string();

    let qr = serde_json::to_string(&wrong_type).unwrap();
    let err = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap_err();
    assert_eq!(err, ScanRejection::InvalidType);
}

#[tokio::test]
async fn unreadable_payload_is_malformed() {
    let h = harness().await;
    for junk in ["", "not json", "{\"type\":", "42"] {
        let err = h.verifier.verify_and_redeem(junk, scanner()).await.unwrap_err();
        assert_eq!(err, ScanRejection::MalformedPayload);
    }
}

#[tokio::test]
async fn authentic_payload_bound_to_wrong_event_is_a_mismatch() {
    let h = harness().await;
    let (payload, _) = issue_qr(&h, 101, Duration::hours(24)).await;

    // An attacker with the server secret could re-sign a swapped eventId;
    // the record cross-check still refuses it.
    let mut resigned = payload;
    resigned.event_id = 8;
    resigned.signature = security::sign(&h.secret, &resigned.canonical_bytes());

    let qr = serde_json::to_string(&resigned).unwrap();
    let err = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap_err();
    assert_eq!(err, ScanRejection::EventMismatch);
}

#[tokio::test]
async fn token_for_unknown_ticket_reports_ticket_not_found() {
    let h = harness().await;

    let token = security::generate_token();
    h.store
        .create_token(NewIssuedToken {
            token: token.clone(),
            ticket_id: 999,
            event_id: 7,
            owner_id: 55,
            expires_at: security::expiry_after(Duration::hours(1)),
        })
        .await
        .unwrap();

    let mut payload = QrPayload {
        kind: PAYLOAD_TYPE.to_string(),
        token,
        event_id: 7,
        expires_at: security::expiry_after(Duration::hours(1)),
        signature: String::new(),
    };
    payload.signature = security::sign(&h.secret, &payload.canonical_bytes());

    let qr = serde_json::to_string(&payload).unwrap();
    let err = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap_err();
    assert_eq!(err, ScanRejection::TicketNotFound);
}

#[tokio::test]
async fn used_ticket_with_live_token_reports_already_used() {
    let h = harness().await;
    let (_, qr) = issue_qr(&h, 101, Duration::hours(24)).await;

    // Ticket leaves VALID through some other channel while the token row
    // is still live.
    h.store
        .seed_ticket(ticket(101, 55, 7, TicketStatus::Used))
        .await;

    let err = h.verifier.verify_and_redeem(&qr, scanner()).await.unwrap_err();
    assert_eq!(err, ScanRejection::TicketAlreadyUsed);
}

#[tokio::test]
async fn issuing_for_used_ticket_is_a_precondition_failure() {
    let h = harness().await;
    h.store
        .seed_ticket(ticket(102, 55, 7, TicketStatus::Used))
        .await;

    let err = h.issuer.issue(102, Duration::hours(24)).await.unwrap_err();
    assert!(matches!(
        err,
        IssueError::NotIssuable {
            id: 102,
            status: TicketStatus::Used
        }
    ));

    let err = h.issuer.issue(404, Duration::hours(24)).await.unwrap_err();
    assert!(matches!(err, IssueError::TicketNotFound(404)));
}

#[tokio::test]
async fn reissue_revokes_the_previous_credential() {
    let h = harness().await;
    let (_, first_qr) = issue_qr(&h, 101, Duration::hours(24)).await;
    let (_, second_qr) = issue_qr(&h, 101, Duration::hours(24)).await;

    assert_eq!(h.store.token_count().await, 1);

    let err = h
        .verifier
        .verify_and_redeem(&first_qr, scanner())
        .await
        .unwrap_err();
    assert_eq!(err, ScanRejection::UnknownOrConsumedToken);

    h.verifier
        .verify_and_redeem(&second_qr, scanner())
        .await
        .unwrap();
}

#[tokio::test]
async fn round_trip_preserves_the_issuance_bindings() {
    let h = harness().await;
    let (payload, qr) = issue_qr(&h, 101, Duration::hours(24)).await;

    let parsed: QrPayload = serde_json::from_str(&qr).unwrap();
    assert_eq!(parsed.event_id, 7);

    let record = h.store.find_token(&parsed.token).await.unwrap().unwrap();
    assert_eq!(record.ticket_id, 101);
    assert_eq!(record.event_id, 7);
    assert_eq!(record.owner_id, 55);
    assert_eq!(record.expires_at, payload.expires_at);
}

#[tokio::test]
async fn concurrent_scans_of_one_credential_admit_exactly_once() {
    let h = harness().await;
    let (_, qr) = issue_qr(&h, 101, Duration::hours(24)).await;

    const SCANNERS: usize = 16;
    let mut tasks = JoinSet::new();
    for _ in 0..SCANNERS {
        let verifier = h.verifier.clone();
        let qr = qr.clone();
        tasks.spawn(async move { verifier.verify_and_redeem(&qr, scanner()).await });
    }

    let mut successes = 0;
    let mut rejections = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => successes += 1,
            Err(
                ScanRejection::UnknownOrConsumedToken | ScanRejection::TicketAlreadyUsed,
            ) => rejections += 1,
            Err(other) => panic!("unexpected rejection: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(rejections, SCANNERS - 1);
    assert_eq!(h.store.scan_audit().await.len(), 1);
    assert_eq!(h.store.attendance().await.len(), 1);
}

#[tokio::test]
async fn purge_removes_only_expired_tokens() {
    let h = harness().await;
    h.store
        .seed_ticket(ticket(103, 56, 7, TicketStatus::Valid))
        .await;

    let (_, short_lived) = issue_qr(&h, 101, Duration::seconds(1)).await;
    let (long_payload, _) = issue_qr(&h, 103, Duration::hours(1)).await;

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    assert_eq!(h.verifier.purge_expired().await.unwrap(), 1);
    assert_eq!(h.store.token_count().await, 1);
    assert!(h
        .store
        .find_token(&long_payload.token)
        .await
        .unwrap()
        .is_some());

    // The purged credential stays dead either way.
    let err = h
        .verifier
        .verify_and_redeem(&short_lived, scanner())
        .await
        .unwrap_err();
    assert_eq!(err, ScanRejection::Expired);
}
