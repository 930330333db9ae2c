use crate::OutputFormat;
use crate::engine::EngineArgs;
use anyhow::{Context, Result};
use kestrel_core::analysis::AnalysisRun;
use kestrel_core::model::{AnalysisRequest, AnalysisResult, Category};
use kestrel_core::session::SessionRegistry;
use kestrel_server::spawn_exposure_server;
use std::path::Path;

/// Build a request from an HTML file and/or a URL, as given on the command line
pub fn build_request(
    file: Option<&Path>,
    url: Option<String>,
    performance: bool,
) -> Result<AnalysisRequest> {
    let html = match file {
        Some(path) => {
            tracing::debug!("Reading HTML from {}", path.display());
            Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            )
        }
        None => None,
    };

    Ok(AnalysisRequest {
        html,
        url,
        performance_required: performance,
    })
}

/// Run one analysis with a private exposure server for the Lighthouse audit
pub async fn analyze_page(request: &AnalysisRequest, engine: &EngineArgs) -> Result<AnalysisRun> {
    let registry = SessionRegistry::new();
    let (base_url, exposure) = spawn_exposure_server(registry.clone()).await?;

    let run = engine.orchestrator(registry, &base_url).run(request).await;
    exposure.abort();

    Ok(run?)
}

pub fn execute(
    file: Option<&Path>,
    url: Option<String>,
    performance: bool,
    engine: &EngineArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = build_request(file, url, performance)?;

    // Reject bad input before any browser is started
    request.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let run = runtime.block_on(analyze_page(&request, engine))?;

    match format {
        OutputFormat::Json => output_json(&run.result)?,
        OutputFormat::Table => output_table(&run.result),
        OutputFormat::Pretty => output_pretty(&run),
    }

    Ok(())
}

fn styled_category(category: Category) -> console::StyledObject<&'static str> {
    use console::style;

    match category {
        Category::Good => style(category.as_str()).green(),
        Category::NeedsImprovement => style(category.as_str()).yellow(),
        Category::Poor => style(category.as_str()).red(),
    }
}

fn output_pretty(run: &AnalysisRun) {
    use console::style;

    let result = &run.result;

    println!("\n{}", style("Page Analysis Report").bold().cyan());
    println!("{}", style("====================").cyan());

    println!(
        "\n{} ({})",
        style("Accessibility:").bold(),
        result.violations.len()
    );
    if result.violations.is_empty() {
        println!("  No violations found");
    }
    for violation in &result.violations {
        println!("  {} {}", style(&violation.id).red(), violation.help);
        for node in &violation.nodes {
            println!("    [{}] {}", node.impact, node.html);
        }
    }

    println!("\n{}", style("Responsiveness:").bold());
    for viewport in &result.responsiveness {
        let overflow = if viewport.has_horizontal_overflow {
            style("horizontal overflow").red()
        } else {
            style("fits").green()
        };
        let images = if viewport.images_oversize {
            ", oversized images"
        } else {
            ""
        };
        println!("  {:<18} {}{}", viewport.viewport_name, overflow, images);
    }

    if let Some(performance) = &result.performance {
        println!(
            "\n{} {}",
            style("Performance:").bold(),
            styled_category(performance.overall_category)
        );
        for (name, metric) in performance.metrics.iter() {
            println!(
                "  {:<26} {:>10} {}",
                name,
                metric.percentile_value,
                styled_category(metric.category)
            );
        }
        let scores = &performance.category_scores;
        println!(
            "  Scores: performance {:.2}, accessibility {:.2}, best practices {:.2}, SEO {:.2}",
            scores.performance, scores.accessibility, scores.best_practices, scores.seo
        );
    }

    if !run.failures.is_empty() {
        println!("\n{}", style("Skipped:").bold().yellow());
        for failure in &run.failures {
            println!("  ⚠️  {}: {}", failure.stage, failure.error);
        }
    }

    println!();
}

fn output_json(result: &AnalysisResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{}", json);
    Ok(())
}

fn output_table(result: &AnalysisResult) {
    println!("Section,Item,Value");
    for violation in &result.violations {
        println!("Accessibility,{},{}", violation.id, violation.nodes.len());
    }
    for viewport in &result.responsiveness {
        println!(
            "Responsiveness,{},{}",
            viewport.viewport_name,
            if viewport.has_horizontal_overflow {
                "overflow"
            } else {
                "fits"
            }
        );
    }
    if let Some(performance) = &result.performance {
        println!("Performance,Overall,{}", performance.overall_category);
        for (name, metric) in performance.metrics.iter() {
            println!(
                "Performance,{},{} ({})",
                name, metric.percentile_value, metric.category
            );
        }
    }
}
