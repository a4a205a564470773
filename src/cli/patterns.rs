use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::patterns::analyze_patterns;

/// Display session statistics in the terminal.
pub async fn patterns(config: &RecollectConfig, json: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let analysis = analyze_patterns(&store).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("Session Patterns");
    println!("{}", "=".repeat(40));
    println!("  Total sessions:      {}", analysis.total_sessions);
    println!("  Completed:           {}", analysis.completed_sessions);
    println!(
        "  Timer completion:    {}%",
        analysis.timer_completion_percent()
    );
    println!();

    if analysis.type_distribution.is_empty() {
        println!("No classified sessions yet.");
        return Ok(());
    }

    println!("By Avoidance Type:");
    for (entry, share) in analysis
        .type_distribution
        .iter()
        .zip(&analysis.type_percentages)
    {
        println!(
            "  {:<16} {:>4}  ({}%)",
            entry.avoidance_type, entry.count, share.percentage
        );
    }

    if let Some(most_common) = &analysis.most_common_type {
        println!();
        println!("Most common:           {most_common}");
    }

    Ok(())
}
