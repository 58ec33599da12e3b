//! Account and worker provisioning against the in-memory controller

mod common;

use boundary_secrets_engine::account::{create_account, delete_account};
use boundary_secrets_engine::client::memory::Operation;
use boundary_secrets_engine::client::ClientError;
use boundary_secrets_engine::worker::{create_worker, delete_worker};
use boundary_secrets_engine::{EngineError, OrphanedResource, ProvisionStep};
use tokio_test::assert_ok;

fn roles(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// ACCOUNT CREATION
// ============================================================================

#[tokio::test]
async fn test_create_account_links_all_resources() {
    let server = common::controller(&["r1", "r2"]);
    let session = common::session(&server).await;

    let cred = create_account(&session, "dev", "ampw_1", &roles(&["r1", "r2"]), "global")
        .await
        .unwrap();

    assert!(cred.login_name.starts_with("vault-role-dev-"));
    assert_eq!(cred.auth_method_id, "ampw_1");
    assert_eq!(cred.password.len(), 16);
    assert_eq!(server.account_password(&cred.account_id).unwrap(), cred.password);

    let user = server.user(&cred.user_id).unwrap();
    assert_eq!(user.name, cred.login_name);
    assert_eq!(user.scope_id, "global");
    assert_eq!(user.account_ids, vec![cred.account_id.clone()]);

    for role in ["r1", "r2"] {
        let role = server.role(role).unwrap();
        assert_eq!(role.principal_ids, vec![cred.user_id.clone()]);
        assert_eq!(role.version, 2);
    }
}

#[tokio::test]
async fn test_boundary_roles_keep_input_order() {
    let server = common::controller(&["r1", "r2"]);
    let session = common::session(&server).await;

    let cred = create_account(&session, "dev", "ampw_1", &roles(&["r2", "r1"]), "global")
        .await
        .unwrap();

    let ids: Vec<&str> = cred.boundary_roles.split(',').collect();
    assert_eq!(ids, vec!["r2", "r1"]);
}

#[tokio::test]
async fn test_sequential_grants_on_shared_role() {
    let server = common::controller(&["shared"]);
    let session = common::session(&server).await;

    for _ in 0..3 {
        create_account(&session, "dev", "ampw_1", &roles(&["shared"]), "global")
            .await
            .unwrap();
    }

    let role = server.role("shared").unwrap();
    assert_eq!(role.principal_ids.len(), 3);
    assert_eq!(role.version, 4);
}

#[tokio::test]
async fn test_stale_role_version_is_rejected() {
    let server = common::controller(&["shared"]);
    let session = common::session(&server).await;

    let stale = session.client().read_role("shared").await.unwrap();
    create_account(&session, "dev", "ampw_1", &roles(&["shared"]), "global")
        .await
        .unwrap();

    let err = session
        .client()
        .add_principals("shared", stale.version, &roles(&["u_late"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 400, .. }));
    assert!(!server.role("shared").unwrap().principal_ids.contains(&"u_late".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_grants_on_shared_role() {
    let server = common::controller(&["shared"]);
    let session = common::session(&server).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let session = session.clone();
            tokio::spawn(async move {
                create_account(&session, "dev", "ampw_1", &roles(&["shared"]), "global").await
            })
        })
        .collect();

    let mut granted = Vec::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(cred) => granted.push(cred.user_id),
            // A lost race is reported, never applied twice or dropped silently.
            Err(EngineError::RemoteResource { step, orphaned, .. }) => {
                assert_eq!(step, ProvisionStep::AddPrincipalToRole);
                assert_eq!(orphaned.len(), 2);
            }
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert!(!granted.is_empty());
    let role = server.role("shared").unwrap();
    assert_eq!(role.principal_ids.len(), granted.len());
    assert_eq!(role.version as usize, 1 + granted.len());
    for user_id in &granted {
        assert!(role.principal_ids.contains(user_id));
    }
}

#[tokio::test]
async fn test_role_grant_failure_reports_orphans() {
    let server = common::controller(&["r1", "r2"]);
    let session = common::session(&server).await;
    server.fail_next(
        Operation::AddPrincipals,
        ClientError::Api {
            status: 400,
            message: "version mismatch".to_string(),
        },
    );

    let err = create_account(&session, "dev", "ampw_1", &roles(&["r1", "r2"]), "global")
        .await
        .unwrap_err();

    match &err {
        EngineError::RemoteResource { step, orphaned, .. } => {
            assert_eq!(*step, ProvisionStep::AddPrincipalToRole);
            assert_eq!(orphaned.len(), 2);
            assert!(matches!(orphaned[0], OrphanedResource::Account(_)));
            assert!(matches!(orphaned[1], OrphanedResource::User(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("may be orphaned"));

    // No rollback: the account and user remain
    assert_eq!(server.account_count(), 1);
    assert_eq!(server.user_count(), 1);
}

#[tokio::test]
async fn test_unknown_role_fails_at_read_step() {
    let server = common::controller(&[]);
    let session = common::session(&server).await;

    let err = create_account(&session, "dev", "ampw_1", &roles(&["missing"]), "global")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::RemoteResource { step: ProvisionStep::ReadRole, .. }
    ));
}

#[tokio::test]
async fn test_password_policy_rejection_is_remote_error() {
    let server = common::controller(&["r1"]).with_min_password_length(32);
    let session = common::session(&server).await;

    let err = create_account(&session, "dev", "ampw_1", &roles(&["r1"]), "global")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::RemoteResource { step: ProvisionStep::CreateAccount, .. }
    ));
    assert!(err.orphaned().is_empty());
    assert_eq!(server.account_count(), 0);
}

// ============================================================================
// ACCOUNT REVOCATION
// ============================================================================

#[tokio::test]
async fn test_delete_account_is_idempotent() {
    let server = common::controller(&["r1"]);
    let session = common::session(&server).await;
    let cred = create_account(&session, "dev", "ampw_1", &roles(&["r1"]), "global")
        .await
        .unwrap();

    assert_ok!(delete_account(&session, &cred.account_id, &cred.user_id).await);
    assert!(server.user(&cred.user_id).is_none());
    assert!(server.account(&cred.account_id).is_none());
    assert!(server.role("r1").unwrap().principal_ids.is_empty());

    assert_ok!(delete_account(&session, &cred.account_id, &cred.user_id).await);
}

#[tokio::test]
async fn test_user_delete_failure_keeps_account() {
    let server = common::controller(&["r1"]);
    let session = common::session(&server).await;
    let cred = create_account(&session, "dev", "ampw_1", &roles(&["r1"]), "global")
        .await
        .unwrap();

    server.fail_next(Operation::DeleteUser, ClientError::Transport("reset".to_string()));
    let err = delete_account(&session, &cred.account_id, &cred.user_id)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::RemoteResource { step: ProvisionStep::DeleteUser, .. }
    ));
    assert!(err.is_retryable());
    assert!(server.account(&cred.account_id).is_some());

    // Retry completes the revocation
    assert_ok!(delete_account(&session, &cred.account_id, &cred.user_id).await);
    assert!(server.account(&cred.account_id).is_none());
}

// ============================================================================
// WORKERS
// ============================================================================

#[tokio::test]
async fn test_create_and_delete_worker() {
    let server = common::controller(&[]);
    let session = common::session(&server).await;

    let cred = create_worker(&session, "global", "vault-worker-edge-abcdefgh", "edge node")
        .await
        .unwrap();

    let stored = server.worker(&cred.worker_id).unwrap();
    assert_eq!(cred.activation_token, stored.controller_generated_activation_token);
    assert_eq!(cred.worker_name, "vault-worker-edge-abcdefgh");
    assert_eq!(cred.description, "edge node");
    assert!(!format!("{:?}", cred).contains(&cred.activation_token));

    assert_ok!(delete_worker(&session, &cred.worker_id).await);
    assert!(server.worker(&cred.worker_id).is_none());
    assert_ok!(delete_worker(&session, &cred.worker_id).await);
}

#[tokio::test]
async fn test_worker_delete_error_surfaces() {
    let server = common::controller(&[]);
    let session = common::session(&server).await;
    let cred = create_worker(&session, "global", "w", "d").await.unwrap();

    server.fail_next(
        Operation::DeleteWorker,
        ClientError::Api {
            status: 500,
            message: "internal".to_string(),
        },
    );
    let err = delete_worker(&session, &cred.worker_id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::RemoteResource { step: ProvisionStep::DeleteWorker, .. }
    ));
}
