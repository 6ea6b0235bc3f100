mod common;

use cluster_converge::{
    ClusterAdminClient, ConvergeError, InMemoryClusterConfig, OperationOutcome, StateDiagnostic,
    TableState,
};
use common::{context, two_servers};

#[test]
fn disable_is_polled_until_visible() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::new().state_delay(3));
    cluster.add_table("users", &[]).unwrap();
    let (ctx, sleeper) = context(&cluster, 200);

    cluster.disable_table("users").unwrap();
    let outcome = ctx.tables().verify_disabled("users").unwrap();

    assert_eq!(outcome, OperationOutcome::Converged { attempts: 3 });
    assert_eq!(sleeper.count(), 2);
}

#[test]
fn enable_that_never_happens_times_out() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::default());
    cluster.add_table("users", &[]).unwrap();
    cluster.disable_table("users").unwrap();
    let (ctx, sleeper) = context(&cluster, 5);

    let outcome = ctx.tables().verify_enabled("users").unwrap();

    assert_eq!(
        outcome,
        OperationOutcome::TimedOut {
            tag: "verify_enabled:users".to_string(),
            attempts: 5,
            last_observed: StateDiagnostic {
                table: "users".to_string(),
                wanted: TableState::Enabled,
                query: "is_table_enabled",
                answer: false,
            },
        }
    );
    assert_eq!(sleeper.count(), 4);
}

#[test]
fn disabling_twice_is_absorbed() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::new().state_delay(1));
    cluster.add_table("users", &[]).unwrap();
    let (ctx, _) = context(&cluster, 200);

    assert!(ctx.tables().disable_table("users").unwrap().is_converged());
    assert!(ctx.tables().disable_table("users").unwrap().is_converged());
    assert!(cluster.is_table_disabled("users").unwrap());
}

#[test]
fn enabling_an_enabled_table_is_absorbed() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::default());
    cluster.add_table("users", &[]).unwrap();
    let (ctx, _) = context(&cluster, 200);

    assert!(ctx.tables().enable_table("users").unwrap().is_converged());
}

#[test]
fn disable_then_enable_reassigns_regions() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::new().state_delay(2));
    cluster.add_table("users", &[b"h".as_slice(), b"q".as_slice()]).unwrap();
    let (ctx, _) = context(&cluster, 200);

    ctx.tables().disable_table("users").unwrap().into_result().unwrap();
    assert_eq!(ctx.placement().actual_placement("users").unwrap().region_count(), 0);

    ctx.tables().enable_table("users").unwrap().into_result().unwrap();
    assert_eq!(ctx.placement().actual_placement("users").unwrap().region_count(), 3);
}

#[test]
fn drop_table_removes_enabled_and_disabled_tables() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::new().state_delay(2));
    cluster.add_table("enabled", &[]).unwrap();
    cluster.add_table("disabled", &[]).unwrap();
    cluster.disable_table("disabled").unwrap();
    let (ctx, _) = context(&cluster, 200);

    ctx.drop_table("enabled").unwrap();
    ctx.drop_table("disabled").unwrap();

    assert!(!cluster.table_exists("enabled").unwrap());
    assert!(!cluster.table_exists("disabled").unwrap());
    assert!(
        cluster
            .cluster_status()
            .unwrap()
            .servers
            .values()
            .all(|load| load.region_count() == 0)
    );
}

#[test]
fn drop_of_missing_table_is_a_no_op() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::default());
    let (ctx, sleeper) = context(&cluster, 200);

    ctx.drop_table("never_created").unwrap();
    assert_eq!(sleeper.count(), 0);
}

#[test]
fn verify_deleted_on_missing_table_converges_at_once() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::default());
    let (ctx, _) = context(&cluster, 200);

    let outcome = ctx.tables().verify_deleted("never_created").unwrap();
    assert_eq!(outcome, OperationOutcome::Converged { attempts: 1 });
}

#[test]
fn validate_table_checks_existence_and_state() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::default());
    cluster.add_table("live", &[]).unwrap();
    cluster.add_table("parked", &[]).unwrap();
    cluster.disable_table("parked").unwrap();
    let (ctx, _) = context(&cluster, 200);

    assert!(ctx.tables().validate_table("live").is_ok());
    assert!(matches!(
        ctx.tables().validate_table("missing"),
        Err(ConvergeError::TableNotFound(_))
    ));
    assert!(matches!(
        ctx.tables().validate_table("parked"),
        Err(ConvergeError::InvalidTable(_, _))
    ));
}

#[test]
fn state_query_errors_propagate() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::default());
    let (ctx, sleeper) = context(&cluster, 200);

    let result = ctx.tables().verify_enabled("missing");

    assert!(matches!(result, Err(ConvergeError::TableNotFound(_))));
    assert_eq!(sleeper.count(), 0);
}

#[test]
fn balancer_toggle_is_idempotent() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::default());
    let (ctx, _) = context(&cluster, 200);

    assert!(ctx.balancer().toggle_balancer(false).unwrap());
    assert!(!ctx.balancer().toggle_balancer(false).unwrap());
    assert!(!cluster.balancer_running().unwrap());

    ctx.balancer().restore(true).unwrap();
    assert!(cluster.balancer_running().unwrap());
}

#[test]
fn delete_timeout_reports_table_still_present() {
    let (cluster, _, _) = two_servers(InMemoryClusterConfig::default());
    cluster.add_table("users", &[]).unwrap();
    let (ctx, _) = context(&cluster, 3);

    let outcome = ctx.tables().verify_deleted("users").unwrap();

    let diagnostic = outcome.last_observed().unwrap();
    assert_eq!(diagnostic.wanted, TableState::Deleted);
    assert_eq!(diagnostic.query, "table_exists");
    assert!(diagnostic.answer);
    let err = outcome.into_result().unwrap_err();
    assert!(err.to_string().contains("last table_exists answered true"));
}
