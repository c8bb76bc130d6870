const MAX_LINES: usize = 10;
const HEADER: &str = "Heuristic summary:";

/// First ten non-blank lines, trimmed, each as a `- ` bullet. No network, never fails.
pub fn summarize(text: &str) -> String {
    let bullets: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|ln| !ln.is_empty())
        .take(MAX_LINES)
        .map(|ln| format!("- {ln}"))
        .collect();

    format!("{HEADER}\n{}", bullets.join("\n"))
}
