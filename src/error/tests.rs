//! Error classification and messages

use super::*;

fn store(message: &str) -> SyncError {
    SyncError::Store {
        message: message.to_string(),
    }
}

#[test]
fn test_setup_failures_are_fatal() {
    let fatal = [
        SyncError::MissingCredential {
            env_var: "API_FOOTBALL_KEY".to_string(),
        },
        SyncError::QuotaUnavailable {
            reason: "status endpoint timed out".to_string(),
        },
        SyncError::StoreUnreachable {
            message: "connection refused".to_string(),
        },
        SyncError::UnknownJob {
            name: "fixtures".to_string(),
        },
    ];
    for e in &fatal {
        assert!(e.is_fatal(), "{e} should abort the run");
    }
}

#[test]
fn test_per_entity_failures_are_not_fatal() {
    let recoverable = [
        store("duplicate key"),
        SyncError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        },
        SyncError::QuotaExhausted {
            message: "requests: limit reached".to_string(),
        },
        SyncError::UnknownTable {
            name: "fixtures".to_string(),
        },
    ];
    for e in &recoverable {
        assert!(!e.is_fatal(), "{e} should only fail one entity");
    }
}

#[test]
fn test_lock_held_names_job_and_start() {
    let error = SyncError::LockHeld {
        job: "squads".to_string(),
        since: "2025-01-01T00:00:00Z".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "Job squads is already running (lock held since 2025-01-01T00:00:00Z)"
    );
    // Another instance running is reported, not treated as a setup failure.
    assert!(!error.is_fatal());
}

#[test]
fn test_quota_messages_are_distinct() {
    let unavailable = SyncError::QuotaUnavailable {
        reason: "no subscription".to_string(),
    };
    let exhausted = SyncError::QuotaExhausted {
        message: "rateLimit: Too many requests".to_string(),
    };

    assert_eq!(
        unavailable.to_string(),
        "Quota status unavailable: no subscription"
    );
    assert_eq!(
        exhausted.to_string(),
        "Remote quota exhausted: rateLimit: Too many requests"
    );
}

#[test]
fn test_sqlite_errors_keep_their_source() {
    let db_error = rusqlite::Error::InvalidColumnType(
        0,
        "payload".to_string(),
        rusqlite::types::Type::Null,
    );
    let sync_error = SyncError::from(db_error);

    assert!(matches!(sync_error, SyncError::Sqlite(_)));
    assert!(!sync_error.is_fatal());
    let as_dyn: &dyn std::error::Error = &sync_error;
    assert!(as_dyn.source().is_some());
}

#[test]
fn test_missing_credential_names_variable() {
    let error = SyncError::MissingCredential {
        env_var: "STORE_KEY".to_string(),
    };
    assert_eq!(error.to_string(), "STORE_KEY environment variable not set");
}
