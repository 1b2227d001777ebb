//! Prompt construction for the suggestion generator.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::learnings::{IterationLearnings, PerformerSummary};
use super::suggestion::SeedSuggestion;
use super::validated::ValidatedOpportunity;

/// System prompt shared by every suggestion request.
pub const SUGGESTION_SYSTEM_PROMPT: &str = "You are a travel-experience market analyst. \
You identify niche microsite opportunities: a destination, an experience category, and a \
primary search keyword with related cluster keywords. Respond with a JSON array only.";

const OUTPUT_FORMAT: &str = r#"Return a JSON array. Each element:
{
  "destination": "City or region",
  "category": "Experience category",
  "niche": "Specific niche",
  "keyword": "primary search phrase",
  "clusterKeywords": ["related phrase", "..."],
  "rationale": "Why this niche is viable",
  "suggestedDomain": "example-domain.com",
  "alternativeDomains": ["alt-one.com", "alt-two.com"],
  "confidenceScore": 0-100
}"#;

/// Product counts per destination and category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryLandscape {
    pub entries: Vec<LandscapeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandscapeEntry {
    pub destination: String,
    pub category: String,
    pub product_count: u32,
}

impl InventoryLandscape {
    /// Entries with the most products first.
    pub fn strongest(&self, limit: usize) -> Vec<&LandscapeEntry> {
        let mut entries: Vec<&LandscapeEntry> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.product_count.cmp(&a.product_count));
        entries.truncate(limit);
        entries
    }
}

/// What the generator is asked to do in a given iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStage {
    /// First iteration, no seeds.
    Exploratory,
    /// First iteration with seeds: evaluate them and fill the gaps.
    SeedEvaluation,
    /// Middle iterations: deepen winners, avoid losers.
    Refinement,
    /// Last iteration of a multi-iteration run.
    Final,
}

impl PromptStage {
    pub fn for_iteration(iteration: u32, max_iterations: u32, has_seeds: bool) -> Self {
        match iteration {
            1 if has_seeds => PromptStage::SeedEvaluation,
            1 => PromptStage::Exploratory,
            i if i >= max_iterations => PromptStage::Final,
            _ => PromptStage::Refinement,
        }
    }
}

/// Inputs for one suggestion prompt.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub iteration: u32,
    pub max_iterations: u32,
    pub target_count: usize,
    pub seeds: &'a [SeedSuggestion],
    pub previous: Option<&'a IterationLearnings>,
    pub landscape: Option<&'a InventoryLandscape>,
}

impl PromptContext<'_> {
    pub fn stage(&self) -> PromptStage {
        PromptStage::for_iteration(self.iteration, self.max_iterations, !self.seeds.is_empty())
    }
}

/// Builds the user prompt for one iteration.
pub fn build_suggestion_prompt(ctx: &PromptContext<'_>) -> String {
    let mut out = String::new();
    let n = ctx.target_count;

    match ctx.stage() {
        PromptStage::Exploratory => {
            let _ = writeln!(
                out,
                "Propose {n} travel-experience niche opportunities with real search demand, \
                 bookable products, and beatable competition."
            );
        }
        PromptStage::SeedEvaluation => {
            let _ = writeln!(
                out,
                "Evaluate the seed opportunities below. Keep the viable ones, enrich each with \
                 cluster keywords and domain names, then add new opportunities until there are {n} in total."
            );
            out.push_str("\nSeeds:\n");
            for seed in ctx.seeds {
                let _ = write!(out, "- \"{}\" ({}, {})", seed.keyword, seed.destination, seed.category);
                if !seed.cluster_keywords.is_empty() {
                    let _ = write!(out, " related: {}", seed.cluster_keywords.join(", "));
                }
                out.push('\n');
            }
        }
        PromptStage::Refinement => {
            let _ = writeln!(
                out,
                "Iteration {} of {}. Propose {n} opportunities that deepen the winning patterns \
                 below and avoid the losing ones.",
                ctx.iteration, ctx.max_iterations
            );
        }
        PromptStage::Final => {
            let _ = writeln!(
                out,
                "Final iteration ({} of {}). Propose {n} opportunities with maximal precision: only \
                 niches you are highly confident in, scored with calibrated confidence.",
                ctx.iteration, ctx.max_iterations
            );
        }
    }

    if let Some(learnings) = ctx.previous {
        write_learnings(&mut out, learnings);
    }

    if let Some(landscape) = ctx.landscape {
        let strongest = landscape.strongest(15);
        if !strongest.is_empty() {
            out.push_str("\nInventory landscape (products available):\n");
            for e in strongest {
                let _ = writeln!(out, "- {} / {}: {}", e.destination, e.category, e.product_count);
            }
        }
    }

    out.push('\n');
    out.push_str(OUTPUT_FORMAT);
    out
}

fn write_learnings(out: &mut String, learnings: &IterationLearnings) {
    write_performers(out, "Top performers", &learnings.top_performers);
    write_performers(out, "Bottom performers", &learnings.bottom_performers);
    write_list(out, "Success patterns", &learnings.success_patterns);
    write_list(out, "Failure patterns", &learnings.failure_patterns);

    if let Some(r) = learnings.optimal_difficulty {
        let _ = writeln!(out, "\nOptimal difficulty range: {:.0}-{:.0}", r.min, r.max);
    }
    if let Some(r) = learnings.optimal_volume {
        let _ = writeln!(out, "Optimal monthly volume range: {:.0}-{:.0}", r.min, r.max);
    }

    write_list(out, "Best destinations", &learnings.best_destinations);
    write_list(out, "Avoid destinations", &learnings.avoid_destinations);
    write_list(out, "Best categories", &learnings.best_categories);
    write_list(out, "Avoid categories", &learnings.avoid_categories);
    write_list(out, "Recommendations", &learnings.recommendations);
}

fn write_performers(out: &mut String, title: &str, performers: &[PerformerSummary]) {
    if performers.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    for p in performers {
        let _ = write!(
            out,
            "- \"{}\" ({}, {}) score {}, volume {}, difficulty {}, CPC ${:.2}, products {}",
            p.keyword, p.destination, p.category, p.score.value(), p.search_volume, p.difficulty, p.cpc, p.product_count
        );
        if !p.failure_reasons.is_empty() {
            let _ = write!(out, " [{}]", p.failure_reasons.join("; "));
        }
        out.push('\n');
    }
}

fn write_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

/// Prompt asking for a short natural-language explanation of a ranked result.
pub fn build_explanation_prompt(opportunity: &ValidatedOpportunity, rank: usize) -> String {
    let m = &opportunity.keyword_metrics;
    format!(
        "In two or three sentences, explain to a site owner why \"{keyword}\" in {destination} \
         ranks #{rank} among microsite opportunities. Data: priority score {score}/100, cluster volume \
         {volume}/month, difficulty {difficulty}, CPC ${cpc:.2}, trend {trend}, {products} bookable \
         products. Reply with plain text only.",
        keyword = opportunity.suggestion.keyword,
        destination = opportunity.suggestion.destination,
        score = opportunity.priority_score.value(),
        volume = opportunity.cluster_volume(),
        difficulty = m.difficulty,
        cpc = opportunity.effective_cpc(),
        trend = m.trend.as_str(),
        products = opportunity.inventory.product_count,
    )
}
