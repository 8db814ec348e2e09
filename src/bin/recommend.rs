//! Interactive front end: asks for a title and a cover URL, prints matches.

use std::io::{self, BufRead, Write};

use cover_match::{
    bootstrap::build_components,
    config::Config,
    models::RecommendationQuery,
    services::{cancel::Cancellation, recommendations::recommend_similar},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cover_match=warn".into());

    // Logs go to stderr so they don't interleave with the prompts
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::from_env()?;
    let components = build_components(&config).await?;

    let title = prompt("Enter the title of the movie: ")?;
    let image_reference = prompt("Enter the URL of the cover image: ")?;

    let mut query = RecommendationQuery::new(image_reference);
    if !title.is_empty() {
        query = query.with_title(title);
    }

    let outcome = recommend_similar(
        components.catalog.as_ref(),
        &components.pipeline,
        query,
        config.top_n,
        Cancellation::never(),
    )
    .await;

    if let Some(cache_writer) = components.cache_writer {
        cache_writer.shutdown().await;
    }

    let report = outcome?;

    println!("Recommended movies:");
    if report.ranked.recommendations.is_empty() {
        println!("  (none)");
    }
    for recommendation in &report.ranked.recommendations {
        let item = &recommendation.item;
        println!(
            "Title: {}, Genre: {}, Poster: {} (distance {:.4})",
            item.title,
            item.genre,
            item.image_reference,
            recommendation.distance,
        );
    }

    let skipped = report.skipped_count();
    if skipped > 0 {
        println!(
            "{skipped} catalog item(s) skipped because their cover could not be processed \
             or compared"
        );
    }
    if report.cancelled {
        println!("Catalog processing was cancelled before every item was scored");
    }

    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
