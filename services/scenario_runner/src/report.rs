//! Results summary and JSON report.

use crate::error::{Result, RunnerError};
use crate::orchestrator::RunSummary;
use std::fmt::Write;
use std::path::Path;

pub fn print_summary(summary: &RunSummary) {
    print!("{}", render_summary(summary));
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n═══════════════════════════════════════");
    let _ = writeln!(out, "        SCENARIO RESULTS SUMMARY");
    let _ = writeln!(out, "═══════════════════════════════════════");
    let _ = writeln!(out, "Sessions: {}", summary.results.len());
    let _ = writeln!(out, "Passed:   {} ✓", summary.passed);
    let _ = writeln!(out, "Failed:   {} ✗", summary.failed);
    let _ = writeln!(out);

    for result in &summary.results {
        let status = if result.passed { "✓ PASS" } else { "✗ FAIL" };
        let _ = writeln!(
            out,
            "{} {} ({} ms)",
            status, result.session, result.duration_ms
        );
        if let Some(ref failure) = result.failure {
            let _ = writeln!(out, "      Error: {} (reached {})", failure, result.phase_reached);
        }
        let _ = writeln!(
            out,
            "      Messages: {} sent | {} received | {} unread",
            result.messages_sent, result.messages_received, result.unread
        );
        if let Some(ref script) = result.script {
            if script.skipped > 0 {
                let _ = writeln!(
                    out,
                    "      Optional expectations skipped: {}",
                    script.skipped
                );
            }
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "═══════════════════════════════════════");
    out
}

pub async fn save_report(summary: &RunSummary, path: &Path) -> Result<()> {
    let report_error = |message: String| RunnerError::Report {
        path: path.to_path_buf(),
        message,
    };
    let json_output = serde_json::json!({
        "run": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "sessions": summary.results.len(),
            "passed": summary.passed,
            "failed": summary.failed,
            "parallel": summary.parallel,
            "duration_ms": summary.duration_ms,
        },
        "results": summary.results
    });

    let text = serde_json::to_string_pretty(&json_output).map_err(|e| report_error(e.to_string()))?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| report_error(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCause;
    use crate::lifecycle::ScenarioResult;
    use fix_network::SessionId;

    fn summary() -> RunSummary {
        let id = SessionId::new("FIX.4.4", "CLIENT", "EXCHANGE", "B");
        let mut failed = ScenarioResult::panicked(&id, "boom");
        failed.failure = Some(FailureCause::LogonTimeout { timeout_ms: 10_000 });
        RunSummary {
            started_at: chrono::Utc::now(),
            duration_ms: 12,
            parallel: false,
            passed: 0,
            failed: 1,
            results: vec![failed],
        }
    }

    #[test]
    fn test_summary_lists_failures() {
        let text = render_summary(&summary());
        assert!(text.contains("Failed:   1"));
        assert!(text.contains("✗ FAIL FIX.4.4:CLIENT->EXCHANGE:B"));
        assert!(text.contains("Logon not confirmed within 10000ms"));
    }

    #[tokio::test]
    async fn test_report_is_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        save_report(&summary(), &path).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["run"]["failed"], 1);
        assert_eq!(value["results"][0]["qualifier"], "B");
        assert_eq!(value["results"][0]["failure"]["cause"], "LogonTimeout");
        assert_eq!(value["results"][0]["phase"], "Failed");
    }

    #[tokio::test]
    async fn test_unwritable_report_path() {
        let result = save_report(&summary(), Path::new("/nonexistent/dir/results.json")).await;
        assert!(matches!(result, Err(RunnerError::Report { .. })));
    }
}
