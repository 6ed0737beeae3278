//! CLI output formatting utilities.

use crate::rag::CitedAnswer;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print source info.
    pub fn source_info(title: &str, id: &str, kind: &str, chunks: u32) {
        println!(
            "  {} {} ({}, {}, {} chunks)",
            style("*").cyan(),
            style(title).bold(),
            style(id).dim(),
            kind,
            chunks
        );
    }

    /// Print a chunk with its position.
    pub fn chunk(label: &str, score: Option<f32>, content: &str, link: Option<&str>) {
        match score {
            Some(score) => println!(
                "\n{} {} (score: {:.2})",
                style(">>").green(),
                style(label).cyan(),
                score
            ),
            None => println!("\n{} {}", style(">>").green(), style(label).cyan()),
        }
        println!("   {}", content_preview(content, 200));
        if let Some(u) = link {
            println!("   {}", style(u).dim());
        }
    }

    /// Print an answer followed by its citations.
    pub fn cited_answer(answer: &CitedAnswer) {
        println!("\n{}\n", answer.answer_text);

        if !answer.citations.is_empty() {
            Output::header("Sources");
            for citation in &answer.citations {
                println!(
                    "\n{} {}",
                    style(format!("[{}]", citation.marker)).green().bold(),
                    style(&citation.source_reference.label).cyan()
                );
                println!("   {}", content_preview(&citation.snippet, 200));
                if let Some(link) = &citation.source_reference.link {
                    println!("   {}", style(link).dim());
                }
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis, on a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let head: String = content.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("a\nb", 10), "a b");
        assert_eq!(content_preview("ééééé", 3), "ééé...");
    }
}
