//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        style("🐧").cyan(),
        style("PENGUIN EXPORT").cyan().bold()
    );
    println!(
        "    {}",
        style("Logistic regression to ONNX / PMML").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Everything shown on the configuration card
pub struct ConfigCard<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub label: &'a str,
    pub classes: (&'a str, &'a str),
    pub features: &'a [String],
    pub categorical: &'a [String],
    pub c: f64,
    pub max_iter: usize,
}

/// Print configuration card
pub fn print_config(card: &ConfigCard) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Input:    {:<37}│",
        FOLDER,
        truncate_path(card.input, 36)
    );
    println!(
        "    │  {} Output:   {:<37}│",
        SAVE,
        truncate_path(card.output, 36)
    );
    println!(
        "    │  {} Label:    {:<37}│",
        TARGET,
        truncate_string(
            &format!(
                "{} ({}=0, {}=1)",
                card.label, card.classes.0, card.classes.1
            ),
            36
        )
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Numeric:     {:<34}│",
        CHART,
        truncate_string(&join_or_none(card.features), 33)
    );
    println!(
        "    │  {} Categorical: {:<34}│",
        CHART,
        truncate_string(&join_or_none(card.categorical), 33)
    );
    println!(
        "    │  {} C / max_iter: {:<33}│",
        CHART,
        style(format!("{} / {}", card.c, card.max_iter)).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(info) = detail {
        println!(
            "      {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!("      {} {}", style(count).yellow().bold(), description);
    }
}

/// Print elapsed time for a step
pub fn print_step_time(elapsed: std::time::Duration) {
    println!(
        "    {}",
        style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

// Helper functions

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_keeps_tail() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("abcdefghijkl", 8), "...hijkl");
    }

    #[test]
    fn test_join_or_none() {
        assert_eq!(join_or_none(&[]), "-");
        assert_eq!(
            join_or_none(&["a".to_string(), "b".to_string()]),
            "a, b"
        );
    }
}
