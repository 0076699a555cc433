//! Import and evaluation command implementations

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use nudge_core::{
    ingest::parse_timestamp,
    intervention::{Intervention, InterventionComponent},
    process_batch, Database, Evaluation, Guard, Ingestor, InterventionEngine,
    KeywordCategorizer, NewTransaction, Pipeline, Processed, RequiredAction, SignConvention,
    TransactionKind, TransactionSource,
};

use super::{format_flags, truncate};

pub fn cmd_import(
    db: &Database,
    guard: &Guard,
    file: &Path,
    source: &str,
    sign: Option<&str>,
) -> Result<()> {
    let source: TransactionSource = source.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let mut ingestor = Ingestor::new(source);
    if let Some(sign) = sign {
        let sign: SignConvention = sign.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        ingestor = ingestor.with_sign(sign);
    }

    println!("📥 Importing {} from {}...", source, file.display());

    let ingested = ingestor
        .parse_file(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    println!("   Found {} records", ingested.accepted.len());
    if !ingested.errors.is_empty() {
        println!("   ⚠️  {} unreadable rows skipped:", ingested.errors.len());
        for err in &ingested.errors {
            println!("      row {}: {}", err.row, err.message);
        }
    }

    let protection = db.load_protection()?;
    let categorizer = KeywordCategorizer::new()?;
    let pipeline = Pipeline {
        db,
        guard,
        categorizer: &categorizer,
        protection: &protection,
    };
    let report = process_batch(&pipeline, ingested.accepted, Utc::now());

    println!("✅ Import complete!");
    println!("   Imported: {}", report.inserted);
    println!("   Skipped (duplicates): {}", report.duplicates);
    println!("   Flagged: {}", report.flagged);
    println!("   Held for confirmation: {}", report.pending);
    if !report.errors.is_empty() {
        println!("   Failed: {}", report.errors.len());
        for err in &report.errors {
            println!("      record {}: {}", err.row, err.message);
        }
    }

    let flagged: Vec<_> = report.results.iter().filter(|r| !r.flags.is_empty()).collect();
    if !flagged.is_empty() {
        println!();
        println!("🚩 Flagged purchases");
        println!("   ─────────────────────────────────────────────────────────────");
        for r in flagged {
            println!(
                "   #{:<5} {:>10.2}  {:<28} {}",
                r.id,
                r.amount,
                truncate(&r.description, 28),
                format_flags(&r.flags)
            );
        }
    }

    if report.pending > 0 {
        println!();
        println!("⏳ Run 'nudge pending' to review held purchases.");
    }
    if !protection.is_active(Utc::now()) {
        println!();
        println!("⚠️  Protection is OFF: flags were recorded but nothing was held.");
    }

    Ok(())
}

/// A purchase entered on the command line
pub struct EvaluateInput {
    pub amount: f64,
    pub description: String,
    pub timestamp: Option<String>,
    pub category: Option<String>,
    pub payee: Option<String>,
}

impl EvaluateInput {
    pub fn into_transaction(self) -> Result<NewTransaction> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            anyhow::bail!("Amount must be a non-negative number");
        }
        let timestamp = self
            .timestamp
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .context("Invalid --timestamp")?;

        Ok(NewTransaction {
            timestamp,
            amount: self.amount,
            kind: TransactionKind::Debit,
            description: self.description,
            payee: self.payee,
            category: self.category.map(|c| c.trim().to_lowercase()),
            source: TransactionSource::Manual,
            import_hash: None,
        })
    }
}

pub fn cmd_evaluate(
    db: &Database,
    guard: &Guard,
    input: EvaluateInput,
    store: bool,
    json: bool,
) -> Result<()> {
    let tx = input.into_transaction()?;
    let now = Utc::now();
    let protection = db.load_protection()?;

    let (evaluation, stored_id) = if store {
        let categorizer = KeywordCategorizer::new()?;
        let pipeline = Pipeline {
            db,
            guard,
            categorizer: &categorizer,
            protection: &protection,
        };
        match pipeline.process_one(tx.clone(), now)? {
            Processed::Stored { id, evaluation, .. } => (evaluation, Some(id)),
            Processed::Duplicate(id) => anyhow::bail!("Already stored as transaction {}", id),
        }
    } else {
        (guard.evaluate_with_protection(&tx, db, now, &protection)?, None)
    };

    let intervention = if evaluation.action != RequiredAction::None {
        let goals = db.active_goals()?;
        let mut engine = InterventionEngine::new(guard.config().clone());
        Some(engine.generate(&tx, evaluation.assessment.score, &goals))
    } else {
        None
    };

    if json {
        let out = serde_json::json!({
            "transaction_id": stored_id,
            "evaluation": evaluation,
            "intervention": intervention,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_evaluation(&tx, &evaluation);
    if let Some(intervention) = &intervention {
        print_intervention(intervention);
    }

    if let Some(id) = stored_id {
        println!();
        println!("💾 Stored as transaction #{}", id);
        if evaluation.is_pending() {
            if let Some(pending) = db.get_pending_for_transaction(id)? {
                println!(
                    "   Confirm with 'nudge confirm {}' or cancel with 'nudge cancel {}'",
                    pending.id, pending.id
                );
            }
        }
    }

    Ok(())
}

fn print_evaluation(tx: &NewTransaction, evaluation: &Evaluation) {
    let when = tx
        .timestamp
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown time".to_string());

    println!();
    println!("🔎 {:.2} at {} ({})", tx.amount, truncate(&tx.description, 40), when);
    println!("   ─────────────────────────────────────────────");
    println!("   Flags:      {}", format_flags(&evaluation.flags));
    println!(
        "   Risk score: {} ({})",
        evaluation.assessment.score,
        evaluation.assessment.level.as_str()
    );
    for factor in &evaluation.assessment.factors {
        println!("      +{:>5.1}  {}", factor.score, factor.description);
    }

    let icon = match evaluation.action {
        RequiredAction::None => "✅",
        RequiredAction::ReflectivePrompt => "🤔",
        RequiredAction::BlockPendingConfirmation => "⏸️ ",
    };
    println!("   Action:     {} {}", icon, evaluation.action);

    if let Some(release_at) = evaluation.release_at {
        println!(
            "   Finalizes on its own at {} unless cancelled",
            release_at.with_timezone(&chrono::Local).format("%H:%M:%S")
        );
    }
    if !evaluation.protected {
        println!("   ⚠️  Protection is OFF: nothing is held");
    }
}

fn print_intervention(intervention: &Intervention) {
    println!();
    println!("💭 {}", intervention.main_message);
    for component in &intervention.components {
        match component {
            InterventionComponent::Question(questions) => {
                for q in questions {
                    println!("   • {}", q);
                }
            }
            InterventionComponent::Visualization(v) => {
                println!("   {}", v.work_hours);
                println!("   {}", v.daily_food);
                println!("   {}", v.investment);
                if let Some(goal) = &v.goal_impact {
                    println!("   {}", goal);
                }
            }
            InterventionComponent::Alternative(alternatives) => {
                println!("   Instead you could:");
                for a in alternatives {
                    println!("     - {}", a);
                }
            }
            InterventionComponent::Delay(delay) => {
                println!("   ⏳ {}", delay.message);
            }
            InterventionComponent::Block(block) => {
                println!("   🛑 {}", block.reason);
            }
            InterventionComponent::Comparison(_) => {}
        }
    }
}
