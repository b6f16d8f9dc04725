//! Governance layer integration tests.
//!
//! Exercises the hub end to end against a real temporary store
//! directory, including cross-instance visibility of the kill switch.

use std::time::Duration;

use soctide_core::types::ThreatCategory;
use soctide_governance::{
    ApprovalState, AuditFilter, GovernanceError, GovernanceHub, OverrideAction,
};

fn new_hub(store: &std::path::Path) -> GovernanceHub {
    GovernanceHub::new(store, Duration::from_secs(3600)).unwrap()
}

#[test]
fn test_killswitch_visible_across_hub_instances() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("governance");

    let hub_a = new_hub(&store);
    let hub_b = new_hub(&store);

    assert!(hub_a.activate_killswitch("alice", "incident").unwrap());
    assert!(hub_b.is_killswitch_active());
    assert!(hub_b.probe()());

    assert!(hub_b.deactivate_killswitch("bob").unwrap());
    assert!(!hub_a.is_killswitch_active());
    assert!(!hub_a.probe()());

    // both transitions audited, visible from either instance
    let events = hub_a.audit_events(&AuditFilter::default()).unwrap();
    let actions: Vec<&str> = events.iter().map(|e| e.action.as_str()).collect();
    assert!(actions.contains(&"killswitch.activate"));
    assert!(actions.contains(&"killswitch.deactivate"));
}

#[test]
fn test_approval_expiry_blocks_override() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("governance");
    let hub = GovernanceHub::new(&store, Duration::ZERO).unwrap();

    let req = hub
        .request_approval("alice", "suppress BruteForce", "lab noise")
        .unwrap();

    // expires on next read
    let requests = hub.approval_requests().unwrap();
    assert_eq!(requests[0].state, ApprovalState::Expired);

    let result = hub.apply_override(
        &req.id,
        OverrideAction::SuppressCategory {
            category: ThreatCategory::BruteForce,
        },
        "alice",
    );
    assert!(matches!(result, Err(GovernanceError::NotApproved { .. })));
    assert!(hub.active_suppressions().unwrap().is_empty());
}

#[test]
fn test_override_rollback_leaves_compensating_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("governance");
    let hub = new_hub(&store);

    let req = hub
        .request_approval("alice", "suppress Malware", "sandbox replay")
        .unwrap();
    hub.approve(&req.id, "bob", Some("confirmed with SOC lead".to_owned()))
        .unwrap();
    let applied = hub
        .apply_override(
            &req.id,
            OverrideAction::SuppressCategory {
                category: ThreatCategory::Malware,
            },
            "alice",
        )
        .unwrap();
    assert_eq!(
        hub.active_suppressions().unwrap(),
        vec![ThreatCategory::Malware]
    );

    hub.rollback_override(&applied.override_id, "bob").unwrap();
    assert!(hub.active_suppressions().unwrap().is_empty());

    // history is preserved, not erased
    let history = hub.overrides().unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].rolled_back);

    // the rollback event references the original override
    let events = hub
        .audit_events(&AuditFilter {
            action: Some("override.rollback".to_owned()),
            ..AuditFilter::default()
        })
        .unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].detail.contains(&applied.override_id));
}

#[test]
fn test_state_survives_hub_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("governance");

    let (request_id, override_id) = {
        let hub = new_hub(&store);
        hub.activate_killswitch("alice", "maintenance").unwrap();
        let req = hub.request_approval("alice", "force reanalysis", "").unwrap();
        hub.approve(&req.id, "bob", None).unwrap();
        let applied = hub
            .apply_override(&req.id, OverrideAction::ForceReanalysis, "alice")
            .unwrap();
        (req.id, applied.override_id)
    };

    let hub = new_hub(&store);
    assert!(hub.is_killswitch_active());
    assert_eq!(
        hub.approval_requests().unwrap()[0].state,
        ApprovalState::Approved
    );
    assert_eq!(hub.overrides().unwrap()[0].override_id, override_id);
    assert_eq!(hub.overrides().unwrap()[0].request_id, request_id);

    let events = hub.audit_events(&AuditFilter::default()).unwrap();
    assert!(events.len() >= 4);
}
