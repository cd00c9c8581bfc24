//! Plain-text rendering of an evaluation.

use chrono::NaiveDateTime;
use turf_core::{Evaluation, TurfConfig};

const MOMENT_FORMAT: &str = "%H:%M %-d %b %Y";

/// Configuration values the report shows alongside the standings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Ledger origin.
    pub origin: Option<NaiveDateTime>,
    /// Label of the origin.
    pub origin_label: Option<String>,
    /// Balance at which a member owes an anytimer.
    pub anytimer_threshold: Option<i64>,
}

impl ReportOptions {
    /// Options taken from the configuration.
    pub fn from_config(config: &TurfConfig) -> Self {
        Self {
            origin: config.rules.anchor,
            origin_label: config.day0_event.clone(),
            anytimer_threshold: config.rules.anytimer_threshold,
        }
    }
}

/// Render the standings, the reason summary and solidarity activity.
///
/// `scope` selects which members appear in the standings; balances are
/// shown highest first, ties in name order.
pub fn render(evaluation: &Evaluation, scope: &[String], options: &ReportOptions) -> String {
    let mut lines = vec![format!("Standings as of {}", evaluation.now.format(MOMENT_FORMAT))];
    match (options.origin, options.origin_label.as_deref()) {
        (Some(origin), Some(label)) => lines.push(format!("Counting since {} ({label})", origin.format(MOMENT_FORMAT))),
        (Some(origin), None) => lines.push(format!("Counting since {}", origin.format(MOMENT_FORMAT))),
        (None, Some(label)) => lines.push(format!("Counting since {label}")),
        (None, None) => {}
    }

    let mut standings: Vec<(&str, i64, u64)> = scope
        .iter()
        .map(|member| {
            let current = evaluation.balances.get(member).copied().unwrap_or_default();
            let all_time = evaluation.all_time.get(member).copied().unwrap_or_default();
            (member.as_str(), current, all_time)
        })
        .collect();
    standings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let width = standings.iter().map(|(name, ..)| name.len()).max().unwrap_or(0);
    for (name, current, all_time) in &standings {
        lines.push(format!("  {name:<width$}  {current:>5}  (all time {all_time})"));
    }

    if !evaluation.reason_summary.is_empty() {
        lines.push(String::new());
        lines.push("Reasons".to_owned());
        for (reason, count) in evaluation.reason_summary.iter() {
            lines.push(format!("  {reason}: {count}"));
        }
    }

    if !evaluation.folded_reasons.is_empty() {
        let folded: Vec<&str> = evaluation.folded_reasons.iter().map(String::as_str).collect();
        lines.push(format!("Counted as Other: {}", folded.join(", ")));
    }

    if !evaluation.injections.is_empty() {
        lines.push(String::new());
        lines.push("Solidarity".to_owned());
        for injection in &evaluation.injections {
            lines.push(format!(
                "  {}: {} +{}",
                injection.timestamp.format("%-d %b %Y"),
                injection.member,
                injection.amount
            ));
        }
    }

    if let Some(threshold) = options.anytimer_threshold {
        let owing: Vec<String> = evaluation
            .anytimers(threshold)
            .into_iter()
            .filter(|(member, _)| scope.iter().any(|m| m == member))
            .map(|(member, balance)| format!("{member} ({balance})"))
            .collect();
        if !owing.is_empty() {
            lines.push(String::new());
            lines.push(format!("Anytimers due: {}", owing.join(", ")));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use turf_core::LedgerEngine;
    use turf_types::Event;

    use super::*;

    const CONFIG: &str = r#"
names:
  a: Anna
  b: Bob
turfreasons:
  Beer: {}
turfrules:
  forcenonegative: true
plotsettings:
  day0: "09:00 1 Feb 2024"
  day0event: Founding
  anytimeramount: 2
  graphxticks: 5
"#;

    #[test]
    fn standings_are_sorted_and_summarized() {
        let engine = LedgerEngine::from_yaml(CONFIG).unwrap();
        let at = |hour| NaiveDate::from_ymd_opt(2024, 2, 3).unwrap().and_hms_opt(hour, 0, 0).unwrap();
        let events = vec![
            Event::award("Bob", at(10), "Beer"),
            Event::award("Bob", at(11), "Karaoke"),
            Event::award("Anna", at(12), "Beer"),
        ];
        let evaluation = engine.evaluate(events, at(13));
        let options = ReportOptions::from_config(engine.config());
        let text = render(&evaluation, &engine.members(), &options);

        let bob = text.find("Bob").unwrap();
        let anna = text.find("Anna").unwrap();
        assert!(bob < anna);
        assert!(text.starts_with("Standings as of 13:00 3 Feb 2024"));
        assert!(text.contains("Counting since 09:00 1 Feb 2024 (Founding)"));
        assert!(text.contains("Beer: 2"));
        assert!(text.contains("Counted as Other: Karaoke"));
        assert!(text.contains("Anytimers due: Bob (2)"));
        assert!(!text.contains("Solidarity"));
    }
}
