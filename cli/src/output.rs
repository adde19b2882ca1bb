use aurora_protocol::BackendConnectionState;
use aurora_protocol::CodeImprovement;
use aurora_protocol::PageAnalysis;
use aurora_protocol::SearchResponse;
use owo_colors::OwoColorize;

/// Human-readable rendering of assistant results on stdout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Printer {
    color_enabled: bool,
}

impl Printer {
    pub(crate) fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    fn heading(self, text: &str) {
        if self.color_enabled {
            println!("{}", text.bold());
        } else {
            println!("{text}");
        }
    }

    fn list(self, title: &str, items: &[String]) {
        if items.is_empty() {
            return;
        }
        println!();
        self.heading(title);
        for item in items {
            println!("  - {item}");
        }
    }

    pub(crate) fn connection(self, state: &BackendConnectionState) {
        let status = if state.is_connected {
            "connected"
        } else {
            "disconnected"
        };
        if self.color_enabled {
            if state.is_connected {
                println!("backend: {}", status.green());
            } else {
                println!("backend: {}", status.red());
            }
        } else {
            println!("backend: {status}");
        }
        if let Some(model) = &state.model_info {
            println!(
                "model: {} (context {} tokens)",
                model.id, model.context_length
            );
        }
        if let Some(error) = &state.last_error {
            println!("last error: {error}");
        }
    }

    pub(crate) fn page_analysis(self, analysis: &PageAnalysis) {
        self.heading(analysis.url.as_str());
        println!("{}", analysis.summary);
        self.list("Topics", &analysis.topics);
        self.list("Insights", &analysis.insights);
        self.list("Questions", &analysis.suggested_questions);
    }

    pub(crate) fn code_improvement(self, improvement: &CodeImprovement) {
        self.heading("Improved code");
        println!("{}", improvement.improved_code);
        println!();
        self.heading("Explanation");
        println!("{}", improvement.explanation);
        println!();
        self.heading("Impact");
        println!("  performance:     {:+.2}", improvement.performance_impact);
        println!("  security:        {:+.2}", improvement.security_impact);
        println!("  user experience: {:+.2}", improvement.user_experience_impact);
        println!("  overall:         {:+.2}", improvement.overall_impact());
    }

    pub(crate) fn search(self, response: &SearchResponse) {
        if !response.llm_response.trim().is_empty() {
            println!("{}", response.llm_response.trim());
            println!();
        }
        for (rank, result) in response.results.iter().enumerate() {
            let title = result
                .metadata
                .as_ref()
                .and_then(|m| m.get("title"))
                .map_or(result.id.as_str(), String::as_str);
            let header = format!("{}. {title} ({:.3})", rank + 1, result.score);
            self.heading(&header);
            println!("   {}", snippet(&result.content));
        }
        if self.color_enabled {
            println!("{}", format!("{:.1} ms", response.query_time_ms).dimmed());
        } else {
            println!("{:.1} ms", response.query_time_ms);
        }
    }
}

const SNIPPET_CHARS: usize = 160;

fn snippet(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snippet_flattens_whitespace_and_truncates() {
        assert_eq!(snippet("a\n  b\tc"), "a b c");
        let long = "x".repeat(SNIPPET_CHARS + 5);
        assert_eq!(snippet(&long).len(), SNIPPET_CHARS + 3);
    }
}
