//! Reflective interventions
//!
//! Builds what a UI shows next to a risky purchase: reflective questions,
//! an impact visualization, goal comparisons, cheaper alternatives, and
//! for the riskiest purchases a mandatory delay or a block.
//!
//! Question and alternative sampling is random. Pass a seeded RNG to
//! [`InterventionEngine::generate_with_rng`] for reproducible output.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GuardConfig;
use crate::models::NewTransaction;

const MAX_QUESTIONS: usize = 4;
const IMPACT_MIN_AMOUNT: f64 = 50.0;
const HIGH_VALUE_AMOUNT: f64 = 200.0;
const DAILY_FOOD_COST: f64 = 30.0;
const STREAMING_MONTHLY_COST: f64 = 45.0;
const HOURLY_WAGE: f64 = 15.0;
const INVESTMENT_YEARLY_RATE: f64 = 0.10;
const INVESTMENT_YEARS: i32 = 5;

const DEFAULT_QUESTIONS: &[&str] = &[
    "Was this purchase part of your plan?",
    "How will you feel about this decision tomorrow?",
    "Do you really need this right now?",
    "What would happen if you waited a week?",
    "Does this purchase bring you closer to your goals or further away?",
];

const NIGHT_QUESTIONS: &[&str] = &[
    "Are you making this decision well rested?",
    "Late-night purchases tend to be impulsive. Is this one?",
    "What made you want to buy this now, at {hour}h?",
    "Will you still want this tomorrow morning?",
];

const HIGH_VALUE_QUESTIONS: &[&str] = &[
    "Do you have an emergency fund?",
    "How much of your monthly income is this?",
    "Have you talked to anyone about this purchase?",
    "Is this in your monthly budget?",
];

fn category_questions(category: &str) -> Option<&'static [&'static str]> {
    let questions: &[&str] = match category {
        "delivery" => &[
            "Do you have food at home you could cook?",
            "How much have you spent on delivery this week?",
            "Wouldn't cooking be healthier and cheaper?",
            "Is this order about real hunger or impulse?",
        ],
        "games" => &[
            "How much time and money have you put into games this month?",
            "Will this bring you lasting satisfaction?",
            "Are you playing for fun or to escape?",
            "What else could you do with this amount?",
        ],
        "shopping" => &[
            "Have you compared prices elsewhere?",
            "Will you use this item regularly?",
            "Do you already own something similar?",
            "Why do you want this now and not in a week?",
        ],
        "leisure" => &[
            "Are there free alternatives for this plan?",
            "How much have you spent on leisure this month?",
            "Will this moment be memorable?",
            "Could you do something just as enjoyable for less?",
        ],
        _ => return None,
    };
    Some(questions)
}

fn category_alternatives(category: &str) -> Option<&'static [&'static str]> {
    let alternatives: &[&str] = match category {
        "delivery" => &[
            "Cook a simple meal at home",
            "Order something cheaper from the same place",
            "Use a discount coupon if one is available",
            "Split the order with someone",
        ],
        "shopping" => &[
            "Add it to a wishlist and wait 48 hours",
            "Look for a similar second-hand item",
            "Wait for a sale",
            "Check whether you already own something similar",
        ],
        "leisure" => &[
            "Look for free events in your city",
            "Plan something at home",
            "Use accumulated points or miles",
            "Go with friends and split the cost",
        ],
        "subscriptions" => &[
            "Cancel unused subscriptions first",
            "Look for a family or student plan",
            "Use a free trial period",
            "Rotate between services month to month",
        ],
        _ => return None,
    };
    Some(alternatives)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionLevel {
    Gentle,
    Moderate,
    Strong,
    Critical,
}

impl InterventionLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=29 => Self::Gentle,
            30..=49 => Self::Moderate,
            50..=74 => Self::Strong,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gentle => "gentle",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionType {
    Question,
    Delay,
    Comparison,
    Visualization,
    Alternative,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Paused,
    Completed,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Unknown goal status: {}", s)),
        }
    }
}

/// A savings goal the user is working towards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub status: GoalStatus,
}

impl Goal {
    pub fn new(name: impl Into<String>, target_amount: f64) -> Self {
        Self {
            name: name.into(),
            target_amount,
            current_amount: 0.0,
            status: GoalStatus::Active,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.target_amount - self.current_amount
    }

    /// Share of the target already saved, capped at 100
    pub fn progress_percent(&self) -> f64 {
        if self.target_amount <= 0.0 {
            return 0.0;
        }
        (self.current_amount / self.target_amount * 100.0).min(100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactVisualization {
    pub daily_food: String,
    pub subscriptions: String,
    pub investment: String,
    pub work_hours: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_impact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalComparisonItem {
    pub goal_name: String,
    pub remaining: f64,
    pub this_purchase_percent: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalComparison {
    pub comparisons: Vec<GoalComparisonItem>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayComponent {
    pub minutes: i64,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockComponent {
    pub reason: String,
    pub can_override: bool,
}

/// One piece of an intervention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum InterventionComponent {
    Question(Vec<String>),
    Visualization(ImpactVisualization),
    Comparison(GoalComparison),
    Alternative(Vec<String>),
    Delay(DelayComponent),
    Block(BlockComponent),
}

impl InterventionComponent {
    pub fn kind(&self) -> InterventionType {
        match self {
            Self::Question(_) => InterventionType::Question,
            Self::Visualization(_) => InterventionType::Visualization,
            Self::Comparison(_) => InterventionType::Comparison,
            Self::Alternative(_) => InterventionType::Alternative,
            Self::Delay(_) => InterventionType::Delay,
            Self::Block(_) => InterventionType::Block,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub action: String,
    pub label: String,
    pub style: String,
}

impl SuggestedAction {
    fn new(action: &str, label: &str, style: &str) -> Self {
        Self {
            action: action.to_string(),
            label: label.to_string(),
            style: style.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub level: InterventionLevel,
    pub risk_score: u8,
    pub created_at: DateTime<Utc>,
    pub components: Vec<InterventionComponent>,
    pub main_message: String,
    pub actions: Vec<SuggestedAction>,
}

impl Intervention {
    pub fn has(&self, kind: InterventionType) -> bool {
        self.components.iter().any(|c| c.kind() == kind)
    }

    pub fn questions(&self) -> &[String] {
        self.components
            .iter()
            .find_map(|c| match c {
                InterventionComponent::Question(q) => Some(q.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterventionStats {
    pub total: usize,
    pub by_level: BTreeMap<String, usize>,
}

impl InterventionStats {
    fn record(&mut self, level: InterventionLevel) {
        self.total += 1;
        *self.by_level.entry(level.as_str().to_string()).or_insert(0) += 1;
    }
}

/// Generates interventions and counts them per level
///
/// Only counters are kept, so a long-running server holds constant state.
pub struct InterventionEngine {
    config: GuardConfig,
    stats: InterventionStats,
}

impl InterventionEngine {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            stats: InterventionStats::default(),
        }
    }

    /// Generate an intervention with the thread RNG and the current time
    pub fn generate(&mut self, tx: &NewTransaction, risk_score: u8, goals: &[Goal]) -> Intervention {
        self.generate_with_rng(tx, risk_score, goals, Utc::now(), &mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(
        &mut self,
        tx: &NewTransaction,
        risk_score: u8,
        goals: &[Goal],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Intervention {
        let amount = tx.amount;
        let category = tx
            .category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .unwrap_or_else(|| "other".to_string());
        let night_hour = tx
            .timestamp
            .filter(|ts| self.config.is_night(ts.time()))
            .map(|ts| ts.hour());
        let level = InterventionLevel::from_score(risk_score);

        let mut components = vec![InterventionComponent::Question(select_questions(
            &category, amount, night_hour, rng,
        ))];

        if amount >= IMPACT_MIN_AMOUNT {
            components.push(InterventionComponent::Visualization(impact_visualization(
                amount, goals,
            )));
        }

        if let Some(comparison) = compare_with_goals(amount, goals) {
            components.push(InterventionComponent::Comparison(comparison));
        }

        if let Some(alternatives) = category_alternatives(&category) {
            components.push(InterventionComponent::Alternative(sample(alternatives, 2, rng)));
        }

        if level >= InterventionLevel::Strong {
            let mut minutes = self.config.confirmation_delay.num_minutes();
            if level == InterventionLevel::Critical {
                minutes *= 2;
            }
            components.push(InterventionComponent::Delay(DelayComponent {
                minutes,
                expires_at: now + Duration::minutes(minutes),
                message: format!("Wait {} minutes before confirming", minutes),
            }));
        }

        if level == InterventionLevel::Critical {
            components.push(InterventionComponent::Block(BlockComponent {
                reason: block_reason(risk_score, night_hour.is_some(), amount),
                can_override: true,
            }));
        }

        let intervention = Intervention {
            level,
            risk_score,
            created_at: now,
            components,
            main_message: main_message(level, night_hour.is_some(), rng),
            actions: suggested_actions(level),
        };

        debug!(
            level = level.as_str(),
            risk_score,
            components = intervention.components.len(),
            "Generated intervention"
        );
        self.stats.record(level);
        intervention
    }

    /// Up to `count` reflective questions for a category
    pub fn reflective_questions<R: Rng + ?Sized>(
        &self,
        category: &str,
        count: usize,
        rng: &mut R,
    ) -> Vec<String> {
        reflective_questions(category, count, rng)
    }

    pub fn stats(&self) -> InterventionStats {
        self.stats.clone()
    }
}

/// Up to `count` reflective questions for a category, falling back to the
/// general set for categories without their own
pub fn reflective_questions<R: Rng + ?Sized>(category: &str, count: usize, rng: &mut R) -> Vec<String> {
    let category = category.trim().to_lowercase();
    let pool = match category.as_str() {
        "night" => NIGHT_QUESTIONS,
        "high_value" => HIGH_VALUE_QUESTIONS,
        other => category_questions(other).unwrap_or(DEFAULT_QUESTIONS),
    };
    sample(pool, count, rng)
}

fn sample<R: Rng + ?Sized>(pool: &[&str], count: usize, rng: &mut R) -> Vec<String> {
    pool.choose_multiple(rng, count.min(pool.len()))
        .map(|s| s.to_string())
        .collect()
}

fn select_questions<R: Rng + ?Sized>(
    category: &str,
    amount: f64,
    night_hour: Option<u32>,
    rng: &mut R,
) -> Vec<String> {
    let mut questions = Vec::new();

    if let Some(pool) = category_questions(category) {
        questions.extend(sample(pool, 2, rng));
    }

    if let Some(hour) = night_hour {
        if let Some(q) = NIGHT_QUESTIONS.choose(rng) {
            questions.push(q.replace("{hour}", &hour.to_string()));
        }
    }

    if amount >= HIGH_VALUE_AMOUNT {
        questions.extend(sample(HIGH_VALUE_QUESTIONS, 1, rng));
    }

    if questions.is_empty() {
        questions = sample(DEFAULT_QUESTIONS, 2, rng);
    }

    questions.truncate(MAX_QUESTIONS);
    questions
}

fn impact_visualization(amount: f64, goals: &[Goal]) -> ImpactVisualization {
    let future_value = amount * (1.0 + INVESTMENT_YEARLY_RATE).powi(INVESTMENT_YEARS);
    let goal_impact = goals
        .iter()
        .find(|g| g.status == GoalStatus::Active && g.target_amount > 0.0)
        .map(|g| {
            format!(
                "This amount is {:.1}% of your goal '{}'",
                amount / g.target_amount * 100.0,
                g.name
            )
        });

    ImpactVisualization {
        daily_food: format!(
            "With {:.2} you could eat for {:.1} days",
            amount,
            amount / DAILY_FOOD_COST
        ),
        subscriptions: format!(
            "Equivalent to {:.1} months of streaming",
            amount / STREAMING_MONTHLY_COST
        ),
        investment: format!(
            "Invested, in {} years it would be {:.2}",
            INVESTMENT_YEARS, future_value
        ),
        work_hours: format!(
            "You work {:.1} hours to earn this",
            amount / HOURLY_WAGE
        ),
        goal_impact,
    }
}

fn compare_with_goals(amount: f64, goals: &[Goal]) -> Option<GoalComparison> {
    let active: Vec<&Goal> = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Active)
        .collect();
    if active.is_empty() {
        return None;
    }

    let comparisons = active
        .iter()
        .filter(|g| g.remaining() > 0.0)
        .map(|g| {
            let percent = amount / g.remaining() * 100.0;
            GoalComparisonItem {
                goal_name: g.name.clone(),
                remaining: g.remaining(),
                this_purchase_percent: (percent * 10.0).round() / 10.0,
                message: format!(
                    "This purchase is {:.1}% of what is left for '{}'",
                    percent, g.name
                ),
            }
        })
        .collect();

    Some(GoalComparison {
        comparisons,
        summary: format!("You have {} active goal(s)", active.len()),
    })
}

fn block_reason(risk_score: u8, is_night: bool, amount: f64) -> String {
    let mut reasons = Vec::new();
    if is_night {
        reasons.push("purchase during high-risk hours (late night)");
    }
    if risk_score >= 80 {
        reasons.push("impulse purchase pattern detected");
    }
    if amount >= 500.0 {
        reasons.push("significant amount requires reflection");
    }
    if reasons.is_empty() {
        reasons.push("multiple risk factors identified");
    }
    format!("Blocked due to: {}", reasons.join(", "))
}

fn main_message<R: Rng + ?Sized>(level: InterventionLevel, is_night: bool, rng: &mut R) -> String {
    let options: &[&str] = match level {
        InterventionLevel::Gentle => &[
            "It's fine to go ahead, but consider these reflections:",
            "Before confirming, a quick reflection:",
        ],
        InterventionLevel::Moderate => &[
            "Heads up! This purchase deserves some thought.",
            "Pause for a moment and consider:",
        ],
        InterventionLevel::Strong => &[
            "Alert: high risk of an impulse purchase!",
            "Careful! This pattern suggests an impulse.",
        ],
        InterventionLevel::Critical => &[
            "Maximum attention: safety block enabled!",
            "Stop! This purchase has been temporarily blocked.",
        ],
    };
    let mut message = options.choose(rng).copied().unwrap_or_default().to_string();
    if is_night {
        message.push_str(" [Night mode]");
    }
    message
}

fn suggested_actions(level: InterventionLevel) -> Vec<SuggestedAction> {
    match level {
        InterventionLevel::Gentle => vec![
            SuggestedAction::new("proceed", "Proceed", "primary"),
            SuggestedAction::new("cancel", "Cancel", "secondary"),
        ],
        InterventionLevel::Moderate => vec![
            SuggestedAction::new("reflect", "Think it over", "primary"),
            SuggestedAction::new("proceed", "Proceed anyway", "secondary"),
            SuggestedAction::new("cancel", "Cancel", "secondary"),
        ],
        InterventionLevel::Strong => vec![
            SuggestedAction::new("wait", "Wait out the reflection period", "primary"),
            SuggestedAction::new("add_to_wishlist", "Add to wishlist", "secondary"),
            SuggestedAction::new("cancel", "Cancel", "danger"),
        ],
        InterventionLevel::Critical => vec![
            SuggestedAction::new("cancel", "Cancel (recommended)", "danger"),
            SuggestedAction::new("override", "Unblock (requires confirmation)", "warning"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> InterventionEngine {
        InterventionEngine::new(GuardConfig::embedded().unwrap())
    }

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(h, 15, 0)
            .unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_levels() {
        assert_eq!(InterventionLevel::from_score(0), InterventionLevel::Gentle);
        assert_eq!(InterventionLevel::from_score(30), InterventionLevel::Moderate);
        assert_eq!(InterventionLevel::from_score(74), InterventionLevel::Strong);
        assert_eq!(InterventionLevel::from_score(75), InterventionLevel::Critical);
    }

    #[test]
    fn test_low_risk_is_gentle_with_default_questions() {
        let mut engine = engine();
        let tx = NewTransaction::expense(at(12), 20.0, "Market").with_category("food");
        let i = engine.generate_with_rng(&tx, 20, &[], Utc::now(), &mut rng());

        assert_eq!(i.level, InterventionLevel::Gentle);
        assert_eq!(i.questions().len(), 2);
        assert!(!i.has(InterventionType::Visualization));
        assert!(!i.has(InterventionType::Delay));
        assert_eq!(i.actions[0].action, "proceed");
    }

    #[test]
    fn test_critical_has_delay_and_block() {
        let mut engine = engine();
        let now = Utc::now();
        let tx = NewTransaction::expense(at(12), 500.0, "Bet Online").with_category("games");
        let i = engine.generate_with_rng(&tx, 80, &[], now, &mut rng());

        assert_eq!(i.level, InterventionLevel::Critical);
        let delay = i
            .components
            .iter()
            .find_map(|c| match c {
                InterventionComponent::Delay(d) => Some(d),
                _ => None,
            })
            .unwrap();
        assert_eq!(delay.minutes, 10);
        assert_eq!(delay.expires_at, now + Duration::minutes(10));

        let block = i
            .components
            .iter()
            .find_map(|c| match c {
                InterventionComponent::Block(b) => Some(b),
                _ => None,
            })
            .unwrap();
        assert!(block.can_override);
        assert!(block.reason.contains("impulse purchase pattern"));
        assert!(block.reason.contains("significant amount"));
    }

    #[test]
    fn test_strong_uses_base_delay_without_block() {
        let mut engine = engine();
        let tx = NewTransaction::expense(at(12), 120.0, "Shop").with_category("shopping");
        let i = engine.generate_with_rng(&tx, 60, &[], Utc::now(), &mut rng());

        assert_eq!(i.level, InterventionLevel::Strong);
        assert!(i.has(InterventionType::Delay));
        assert!(!i.has(InterventionType::Block));
        assert!(i.has(InterventionType::Alternative));
    }

    #[test]
    fn test_night_question_and_message() {
        let mut engine = engine();
        let tx = NewTransaction::expense(at(3), 80.0, "Delivery app").with_category("delivery");
        let i = engine.generate_with_rng(&tx, 40, &[], Utc::now(), &mut rng());

        // 2 delivery questions + 1 night question
        assert_eq!(i.questions().len(), 3);
        assert!(i.main_message.ends_with("[Night mode]"));
        assert!(i.questions().iter().all(|q| !q.contains("{hour}")));
    }

    #[test]
    fn test_questions_capped_at_four() {
        let questions = select_questions("games", 900.0, Some(2), &mut rng());
        assert_eq!(questions.len(), 4);
    }

    #[test]
    fn test_goal_comparison_only_active() {
        let goals = vec![
            Goal {
                name: "Trip".to_string(),
                target_amount: 2000.0,
                current_amount: 1000.0,
                status: GoalStatus::Active,
            },
            Goal {
                name: "Old laptop".to_string(),
                target_amount: 3000.0,
                current_amount: 0.0,
                status: GoalStatus::Completed,
            },
        ];
        let comparison = compare_with_goals(100.0, &goals).unwrap();
        assert_eq!(comparison.comparisons.len(), 1);
        assert_eq!(comparison.comparisons[0].this_purchase_percent, 10.0);
        assert_eq!(comparison.summary, "You have 1 active goal(s)");

        let impact = impact_visualization(100.0, &goals);
        assert_eq!(
            impact.goal_impact.as_deref(),
            Some("This amount is 5.0% of your goal 'Trip'")
        );
    }

    #[test]
    fn test_no_comparison_without_active_goals() {
        assert!(compare_with_goals(100.0, &[]).is_none());
    }

    #[test]
    fn test_reflective_questions_fallback() {
        let q = reflective_questions("unknown", 3, &mut rng());
        assert_eq!(q.len(), 3);
        assert!(q.iter().all(|q| DEFAULT_QUESTIONS.contains(&q.as_str())));

        let q = reflective_questions("delivery", 10, &mut rng());
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn test_stats_by_level() {
        let mut engine = engine();
        let tx = NewTransaction::expense(at(12), 20.0, "Market");
        engine.generate_with_rng(&tx, 10, &[], Utc::now(), &mut rng());
        engine.generate_with_rng(&tx, 20, &[], Utc::now(), &mut rng());
        engine.generate_with_rng(&tx, 90, &[], Utc::now(), &mut rng());

        let stats = engine.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_level.get("gentle"), Some(&2));
        assert_eq!(stats.by_level.get("critical"), Some(&1));
    }

    #[test]
    fn test_stats_counters_over_many_generations() {
        let mut engine = engine();
        let tx = NewTransaction::expense(at(12), 20.0, "Market");
        let mut rng = rng();
        for i in 0..1000u32 {
            let score = if i % 4 == 0 { 90 } else { 10 };
            engine.generate_with_rng(&tx, score, &[], Utc::now(), &mut rng);
        }

        let stats = engine.stats();
        assert_eq!(stats.total, 1000);
        assert_eq!(stats.by_level.get("critical"), Some(&250));
        assert_eq!(stats.by_level.get("gentle"), Some(&750));
        assert_eq!(stats.by_level.values().sum::<usize>(), stats.total);
    }
}
