use parley_core::{Config, EntryType, HistoryEntry, Role};
use parley_telemetry::{read_jsonl, Paths};

const DEFAULT_LIMIT: usize = 20;

/// Saved entries for one panel, or for every panel ordered by time
fn load_entries(paths: &Paths, panel: Option<&str>) -> anyhow::Result<Vec<HistoryEntry>> {
    if let Some(panel) = panel {
        return Ok(read_jsonl(&paths.history_file(panel))?);
    }

    let dir = paths.history_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for file in std::fs::read_dir(&dir)? {
        let path = file?.path();
        if path.extension().is_some_and(|ext| ext == "jsonl") {
            entries.extend(read_jsonl::<HistoryEntry>(&path)?);
        }
    }
    entries.sort_by_key(|e| e.timestamp);
    Ok(entries)
}

fn compute_stats(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No history to analyze.".to_string();
    }
    let analyses = entries
        .iter()
        .filter(|e| e.entry_type == EntryType::Analysis)
        .count();
    let questions = entries
        .iter()
        .filter(|e| e.entry_type == EntryType::Followup && e.role == Role::User)
        .count();
    let input_tokens = entries
        .iter()
        .filter_map(|e| e.usage)
        .map(|u| u.input_tokens)
        .fold(0, u64::saturating_add);
    let output_tokens = entries
        .iter()
        .filter_map(|e| e.usage)
        .map(|u| u.output_tokens)
        .fold(0, u64::saturating_add);
    let structured = entries.iter().filter(|e| e.structured.is_some()).count();

    format!(
        "Total entries: {}\n\
         Analyses: {} ({} structured)\n\
         Follow-up questions: {}\n\
         Tokens: {} in / {} out",
        entries.len(),
        analyses,
        structured,
        questions,
        input_tokens,
        output_tokens
    )
}

fn preview(content: &str, width: usize) -> String {
    let line = content.lines().next().unwrap_or_default();
    if line.chars().count() <= width {
        return line.to_string();
    }
    let cut: String = line.chars().take(width.saturating_sub(1)).collect();
    format!("{cut}…")
}

fn history_limit(paths: &Paths) -> usize {
    let path = paths.config_file();
    if !path.exists() {
        return DEFAULT_LIMIT;
    }
    match Config::load(&path) {
        Ok(config) => config.history_limit.unwrap_or(usize::MAX),
        Err(err) => {
            tracing::warn!(%err, "ignoring unreadable config");
            DEFAULT_LIMIT
        }
    }
}

pub fn run(panel: Option<&str>, stats: bool) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let entries = load_entries(&paths, panel)?;

    if entries.is_empty() {
        println!("No analysis history");
        return Ok(());
    }

    if stats {
        println!("{}", compute_stats(&entries));
        return Ok(());
    }

    let shown: Vec<_> = entries.iter().rev().take(history_limit(&paths)).collect();

    println!("Recent History (last {})", shown.len());
    println!("========================");
    for entry in shown.into_iter().rev() {
        let kind = match (entry.entry_type, entry.role) {
            (EntryType::Analysis, _) => "analysis",
            (EntryType::Followup, Role::User) => "question",
            (EntryType::Followup, Role::Assistant) => "reply",
        };
        println!(
            "  {} | {:<8} | {:<10} | {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            kind,
            entry.message_id.as_deref().unwrap_or("-"),
            preview(&entry.content, 60),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use parley_core::Usage;
    use parley_telemetry::append_jsonl;

    fn entry(entry_type: EntryType, role: Role, message_id: Option<&str>, minutes_ago: i64) -> HistoryEntry {
        HistoryEntry {
            role,
            entry_type,
            content: format!("content {message_id:?}"),
            structured: None,
            message_id: message_id.map(str::to_string),
            usage: Some(Usage {
                input_tokens: 100,
                output_tokens: 40,
            }),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_stats_summary() {
        let entries = vec![
            entry(EntryType::Analysis, Role::Assistant, Some("m1"), 3),
            entry(EntryType::Followup, Role::User, None, 2),
            entry(EntryType::Followup, Role::Assistant, Some("m2"), 1),
        ];
        let stats = compute_stats(&entries);
        assert!(stats.contains("Total entries: 3"));
        assert!(stats.contains("Analyses: 1"));
        assert!(stats.contains("Follow-up questions: 1"));
        assert!(stats.contains("300 in / 120 out"));
    }

    #[test]
    fn test_stats_token_totals_saturate() {
        let mut huge = entry(EntryType::Analysis, Role::Assistant, Some("m1"), 2);
        huge.usage = Some(Usage {
            input_tokens: u64::MAX,
            output_tokens: u64::MAX,
        });
        let entries = vec![huge, entry(EntryType::Analysis, Role::Assistant, Some("m2"), 1)];

        let stats = compute_stats(&entries);
        assert!(stats.contains(&format!("{} in / {} out", u64::MAX, u64::MAX)));
    }

    #[test]
    fn test_stats_empty() {
        assert_eq!(compute_stats(&[]), "No history to analyze.");
    }

    #[test]
    fn test_load_merges_panels_by_time() {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = Paths::with_root(temp.path());

        let newer = vec![entry(EntryType::Analysis, Role::Assistant, Some("m2"), 1)];
        let older = vec![entry(EntryType::Analysis, Role::Assistant, Some("m1"), 10)];
        append_jsonl(&paths.history_file("editor"), &newer).unwrap();
        append_jsonl(&paths.history_file("sidebar"), &older).unwrap();

        let all = load_entries(&paths, None).unwrap();
        let ids: Vec<_> = all.iter().filter_map(|e| e.message_id.as_deref()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);

        let editor = load_entries(&paths, Some("editor")).unwrap();
        assert_eq!(editor.len(), 1);
    }

    #[test]
    fn test_load_without_history_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let entries = load_entries(&Paths::with_root(temp.path()), None).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_preview_truncates_first_line() {
        assert_eq!(preview("short\nsecond", 10), "short");
        assert_eq!(preview("abcdefghij", 5), "abcd…");
    }

    #[test]
    #[serial_test::serial]
    fn test_run_reads_overridden_home() {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = Paths::with_root(temp.path());
        let saved = vec![entry(EntryType::Analysis, Role::Assistant, Some("m1"), 1)];
        append_jsonl(&paths.history_file("editor"), &saved).unwrap();

        std::env::set_var(parley_telemetry::HOME_ENV, temp.path());
        let listed = run(Some("editor"), false);
        let summarized = run(None, true);
        std::env::remove_var(parley_telemetry::HOME_ENV);

        assert!(listed.is_ok());
        assert!(summarized.is_ok());
    }
}
