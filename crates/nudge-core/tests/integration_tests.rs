//! Integration tests for nudge-core
//!
//! These tests exercise the full ingest → guard → store → confirm workflow.

use chrono::{Duration, NaiveDate, Utc};
use nudge_core::{
    config::GuardConfig,
    db::Database,
    guard::Guard,
    models::{GuardState, RequiredAction, RiskFlag, TransactionKind, TransactionSource},
    pipeline::{process_batch, Pipeline},
    categorize::KeywordCategorizer,
    confirmation::Resolution,
    ingest::Ingestor,
    NewTransaction, ProtectionState, TransactionQuery,
};

/// Statement export with one night purchase, one afternoon purchase,
/// a salary credit, and one row with a date but no time
fn statement_csv() -> &'static str {
    r#"Timestamp,Amount,Description,Category
2024-03-15 02:00:00,-150.00,STEAM PURCHASE,
2024-03-15 14:00:00,-50.00,PADARIA DO BAIRRO,
2024-03-05 09:00:00,7200.00,SALARIO EMPRESA,
2024-03-16,-30.00,POSTO IPIRANGA,"#
}

fn guard() -> Guard {
    Guard::new(GuardConfig::embedded().expect("embedded config")).expect("valid config")
}

// =============================================================================
// Ingest + Guard Workflow
// =============================================================================

#[test]
fn test_full_ingest_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let guard = guard();
    let categorizer = KeywordCategorizer::new().unwrap();
    let protection = ProtectionState::new();

    let ingested = Ingestor::new(TransactionSource::Import)
        .parse_csv(statement_csv().as_bytes())
        .expect("Failed to parse CSV");

    // The date-only row is rejected on its own
    assert_eq!(ingested.accepted.len(), 3);
    assert_eq!(ingested.errors.len(), 1);
    assert_eq!(ingested.errors[0].row, 4);

    let pipeline = Pipeline {
        db: &db,
        guard: &guard,
        categorizer: &categorizer,
        protection: &protection,
    };
    let now = Utc::now();
    let report = process_batch(&pipeline, ingested.accepted.clone(), now);

    assert_eq!(report.inserted, 3);
    assert_eq!(report.pending, 1);

    let night = &report.results[0];
    assert_eq!(
        night.flags,
        [
            RiskFlag::NightPurchase,
            RiskFlag::ImpulseSuspected,
            RiskFlag::HighRiskConfirmationPending
        ]
        .into_iter()
        .collect()
    );
    assert_eq!(night.action, RequiredAction::BlockPendingConfirmation);
    assert_eq!(night.category.as_deref(), Some("games"));

    let salary = &report.results[2];
    assert!(salary.flags.is_empty());
    assert_eq!(salary.category.as_deref(), Some("salary"));

    // Re-importing the same statement stores nothing new
    let again = process_batch(&pipeline, ingested.accepted, now);
    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicates, 3);

    let stored = db.list_transactions(&TransactionQuery::default()).unwrap();
    assert_eq!(stored.len(), 3);
    let credit = stored
        .iter()
        .find(|t| t.kind == TransactionKind::Credit)
        .unwrap();
    assert_eq!(credit.amount, 7200.0);
}

#[test]
fn test_pending_purchase_released_after_delay() {
    let db = Database::in_memory().unwrap();
    let guard = guard();
    let now = Utc::now();

    let ts = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(23, 30, 0)
        .unwrap();
    let tx = NewTransaction::expense(ts, 400.0, "Magazine Luiza");
    let eval = guard.evaluate(&tx, &db, now).unwrap();
    assert!(eval.is_pending());
    assert_eq!(eval.release_at, Some(now + Duration::minutes(5)));

    let id = match db.insert_transaction(&tx, &eval).unwrap() {
        nudge_core::TransactionInsertResult::Inserted(id) => id,
        other => panic!("unexpected {:?}", other),
    };
    let pending = db.get_pending_for_transaction(id).unwrap().unwrap();

    // Nothing changes before the delay
    assert!(db.release_due(now + Duration::minutes(4)).unwrap().is_empty());
    assert_eq!(
        db.get_transaction(id).unwrap().unwrap().guard_state,
        GuardState::PendingConfirmation
    );

    let released = db.release_due(now + Duration::minutes(5)).unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].id, pending.id);
    assert_eq!(released[0].resolution, Some(Resolution::Released));
    assert_eq!(
        db.get_transaction(id).unwrap().unwrap().guard_state,
        GuardState::Finalized
    );
}

#[test]
fn test_cancelled_purchase_is_not_precedent() {
    let db = Database::in_memory().unwrap();
    let guard = guard();
    let now = Utc::now();

    let day = |d: u32| {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    };

    let first = NewTransaction::expense(day(1), 300.0, "Zara");
    let eval = guard.evaluate(&first, &db, now).unwrap();
    let id = match db.insert_transaction(&first, &eval).unwrap() {
        nudge_core::TransactionInsertResult::Inserted(id) => id,
        other => panic!("unexpected {:?}", other),
    };
    db.cancel_pending_for_transaction(id, now).unwrap();

    let second = NewTransaction::expense(day(10), 300.0, "Zara");
    let eval = guard.evaluate(&second, &db, now).unwrap();
    assert!(eval.flags.contains(&RiskFlag::ImpulseSuspected));
}

#[test]
fn test_correction_supersedes_original() {
    let db = Database::in_memory().unwrap();
    let guard = guard();
    let now = Utc::now();

    let ts = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let tx = NewTransaction::expense(ts, 45.0, "Cafe Central");
    let eval = guard.evaluate(&tx, &db, now).unwrap();
    let original = match db.insert_transaction(&tx, &eval).unwrap() {
        nudge_core::TransactionInsertResult::Inserted(id) => id,
        other => panic!("unexpected {:?}", other),
    };

    let fixed = NewTransaction::expense(ts, 54.0, "Cafe Central");
    let eval = guard.evaluate(&fixed, &db, now).unwrap();
    let correction = db.insert_correction(original, &fixed, &eval).unwrap();

    let listed = db.list_transactions(&TransactionQuery::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, correction);
    assert_eq!(listed[0].supersedes_id, Some(original));

    // The original row is still there, untouched
    let kept = db.get_transaction(original).unwrap().unwrap();
    assert_eq!(kept.amount, 45.0);

    assert!(db.insert_correction(original, &fixed, &eval).is_err());
}

#[test]
fn test_disabled_protection_keeps_flags() {
    let db = Database::in_memory().unwrap();
    let guard = guard();
    let categorizer = KeywordCategorizer::new().unwrap();
    let mut protection = ProtectionState::new();
    protection.disable();
    db.save_protection(&protection, "protection_disable").unwrap();

    let protection = db.load_protection().unwrap();
    let pipeline = Pipeline {
        db: &db,
        guard: &guard,
        categorizer: &categorizer,
        protection: &protection,
    };

    let ts = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(2, 0, 0)
        .unwrap();
    let report = process_batch(
        &pipeline,
        vec![NewTransaction::expense(ts, 150.0, "Online Store")],
        Utc::now(),
    );

    assert_eq!(report.pending, 0);
    assert_eq!(report.results[0].action, RequiredAction::None);
    assert_eq!(report.results[0].flags.len(), 3);
    assert!(db.list_pending().unwrap().is_empty());
}

#[test]
fn test_decendio_report_from_database() {
    let db = Database::in_memory().unwrap();
    let guard = guard();
    let now = Utc::now();

    let entries = [
        (3, 10, 7200.0, TransactionKind::Credit, "Salario"),
        (8, 12, 80.0, TransactionKind::Debit, "Mercado"),
        (15, 12, 60.0, TransactionKind::Debit, "Farmacia"),
        (28, 12, 40.0, TransactionKind::Debit, "Cinema"),
    ];
    for (day, hour, amount, kind, desc) in entries {
        let ts = NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        let mut tx = NewTransaction::expense(ts, amount, desc);
        tx.kind = kind;
        let eval = guard.evaluate(&tx, &db, now).unwrap();
        db.insert_transaction(&tx, &eval).unwrap();
    }

    let report = db.decendio_report(2024, 3).unwrap();
    assert_eq!(report.periods[0].income, 7200.0);
    assert_eq!(report.periods[0].expenses, 80.0);
    assert_eq!(report.periods[1].expenses, 60.0);
    assert_eq!(report.periods[2].label, "21 to 31");
    assert_eq!(report.periods[2].expenses, 40.0);
    assert_eq!(report.total.net, 7020.0);
}

#[test]
fn test_spending_summary_from_database() {
    let db = Database::in_memory().unwrap();
    let guard = guard();
    let now = Utc::now();

    let entries = [
        (3, 10, 4000.0, TransactionKind::Credit, "Salario", None),
        (8, 12, 600.0, TransactionKind::Debit, "Mercado", Some("food")),
        (15, 12, 400.0, TransactionKind::Debit, "Padaria", Some("food")),
        (20, 12, 1000.0, TransactionKind::Debit, "Aluguel", Some("housing")),
    ];
    for (day, hour, amount, kind, desc, category) in entries {
        let ts = NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        let mut tx = NewTransaction::expense(ts, amount, desc);
        tx.kind = kind;
        tx.category = category.map(str::to_string);
        let eval = guard.evaluate(&tx, &db, now).unwrap();
        db.insert_transaction(&tx, &eval).unwrap();
    }

    let summary = db.spending_summary(None, None).unwrap();
    assert_eq!(summary.income, 4000.0);
    assert_eq!(summary.expenses, 2000.0);
    assert_eq!(summary.savings_rate, 50.0);
    assert_eq!(summary.categories.len(), 2);
    assert_eq!(summary.categories[0].category, "food");
    assert_eq!(summary.categories[0].amount, 1000.0);
    assert_eq!(summary.categories[0].percentage, 50.0);

    // The range is inclusive on both ends
    let from = NaiveDate::from_ymd_opt(2024, 3, 8);
    let to = NaiveDate::from_ymd_opt(2024, 3, 15);
    let week = db.spending_summary(from, to).unwrap();
    assert_eq!(week.income, 0.0);
    assert_eq!(week.expenses, 1000.0);
    assert_eq!(week.transaction_count, 2);
}

// =============================================================================
// Goals + Alerts
// =============================================================================

#[test]
fn test_flagged_import_raises_alert_and_stored_goals_feed_interventions() {
    use nudge_core::intervention::InterventionComponent;
    use nudge_core::{Goal, InterventionEngine};

    let db = Database::in_memory().unwrap();
    let guard = guard();
    let categorizer = KeywordCategorizer::new().unwrap();
    let protection = ProtectionState::new();
    let pipeline = Pipeline {
        db: &db,
        guard: &guard,
        categorizer: &categorizer,
        protection: &protection,
    };

    db.add_goal(&Goal::new("Emergency fund", 5000.0)).unwrap();

    let ingested = Ingestor::new(TransactionSource::Import)
        .parse_csv(statement_csv().as_bytes())
        .unwrap();
    let report = process_batch(&pipeline, ingested.accepted.clone(), Utc::now());

    let alerts = db.list_alerts(false).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].transaction_id, report.results[0].id);
    db.acknowledge_alert(alerts[0].id, Utc::now()).unwrap();
    assert!(db.list_alerts(false).unwrap().is_empty());

    let goals = db.active_goals().unwrap();
    let mut engine = InterventionEngine::new(guard.config().clone());
    let intervention =
        engine.generate(&ingested.accepted[0], report.results[0].risk_score, &goals);
    let comparison = intervention
        .components
        .iter()
        .find_map(|c| match c {
            InterventionComponent::Comparison(cmp) => Some(cmp),
            _ => None,
        })
        .expect("stored goal is compared");
    assert_eq!(comparison.comparisons[0].goal_name, "Emergency fund");
}
