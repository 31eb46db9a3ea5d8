// Colored terminal output for decisions and the provider chain.

use colored::Colorize;

use crate::config::{Config, ProviderConfig};
use crate::moderation::Decision;
use crate::rephrase::chain::UsedProvider;

/// Display a single moderation decision.
pub fn display_decision(decision: &Decision) {
    let verdict = if decision.is_toxic {
        "TOXIC".red().bold()
    } else {
        "ALLOWED".green().bold()
    };

    println!(
        "\n{}  {}",
        verdict,
        format!("(toxicity {:.3})", decision.score).dimmed()
    );

    if decision.altered() {
        println!("  {:<10} {}", "Original:".dimmed(), decision.original_text);
        println!("  {:<10} {}", "Delivered:".dimmed(), decision.delivered_text);
        let provider = match &decision.used_provider {
            UsedProvider::Fallback => "fallback".yellow().to_string(),
            other => other.to_string().cyan().to_string(),
        };
        println!("  {:<10} {}", "Provider:".dimmed(), provider);
    } else {
        println!("  {:<10} {}", "Message:".dimmed(), decision.delivered_text);
    }

    println!(
        "  {}",
        format!(
            "scoring {} ms, rephrasing {} ms",
            decision.scoring_latency.as_millis(),
            decision.rephrase_latency.as_millis()
        )
        .dimmed()
    );
}

/// Display the configured provider chain in priority order.
pub fn display_providers(config: &Config, scorer: &str) {
    println!("\n{}", "=== Moderation Setup ===".bold());
    println!("  Scorer:    {scorer}");
    println!("  Threshold: {}", config.threshold);
    println!();
    println!("  {}", "Rephrase chain (in priority order):".bold());

    if config.providers.is_empty() {
        println!("    {}", "no providers configured".dimmed());
    }
    for (i, provider) in config.providers.iter().enumerate() {
        println!("    {}. {}", i + 1, describe_provider(provider));
    }

    println!(
        "    {}. {} {}",
        config.providers.len() + 1,
        "fallback".yellow(),
        "(static phrase, always available)".dimmed()
    );
}

fn describe_provider(provider: &ProviderConfig) -> String {
    let status = if !provider.enabled {
        "disabled".dimmed().to_string()
    } else if let Some(missing) = provider.missing() {
        format!("skipped, no {missing}").yellow().to_string()
    } else {
        "ready".green().to_string()
    };

    let model = if provider.model.is_empty() {
        String::new()
    } else {
        format!(" [{}]", provider.model)
    };

    format!(
        "{:<8}{} timeout {} ms  {}",
        provider.id,
        model,
        provider.timeout.as_millis(),
        status
    )
}
