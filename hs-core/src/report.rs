use crate::pipeline::RunResult;
use anyhow::{Context, Result};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use hs_domain::{rank_by_score, ComputedHotspot, ExcludedHotspot};
use thousands::Separable;

const PREAMBLE: &str = "
*AFK factor means how long you can AFK there without banking artefacts
**Score is calculated based on the avgPrice vs price volatility vs AFK factor
";

pub fn format_number(value: f64) -> String {
    (value.round() as i64).separate_with_commas()
}

/// The full console report: one block per ranking criterion, then an overview of every
/// ranked hotspot and, if there are any, the excluded ones.
pub fn render_report(result: &RunResult) -> Result<String> {
    let mut out = String::from(PREAMBLE);

    if let Some(cost) = result.transport_cost_per_action {
        out.push_str(&format!("Transport cost per action: {cost:.2}\n"));
    }
    out.push('\n');

    for entry in result.leaderboard.entries.iter() {
        out.push_str(entry.criterion.headline());
        out.push('\n');
        match &entry.best {
            Some(best) => out.push_str(&render_hotspot_block(best)?),
            None => out.push_str("  no eligible hotspot\n\n\n"),
        }
    }

    out.push_str(&format!("Ranking\n{}\n", generate_ranking_table(&result.valuation.computed)));

    if !result.valuation.excluded.is_empty() {
        out.push_str(&format!(
            "\nExcluded hotspots\n{}\n",
            generate_excluded_table(&result.valuation.excluded)
        ));
    }

    Ok(out)
}

pub fn render_hotspot_block(computed: &ComputedHotspot) -> Result<String> {
    let metrics = &computed.metrics;
    let materials = serde_json::to_string_pretty(&computed.hotspot.materials)
        .with_context(|| format!("Failed to render the drop table of '{}'", computed.name))?;

    Ok(format!(
        r#"
===== {name} =====
  Level:                 {level}

  GP range per gather:   {min} - {max}
  Average GP per gather: ~{avg}
  Price volatility:      {volatility}%

  AFK factor:            ~{afk}%
  Score:                 {score}

Materials: {materials}


"#,
        name = computed.name,
        level = computed.hotspot.level,
        min = metrics.min_price,
        max = metrics.max_price,
        avg = metrics.avg_price.round(),
        volatility = metrics.price_volatility * 100.0,
        afk = (metrics.afk_factor * 100.0).round(),
        score = metrics.score.floor(),
    ))
}

fn generate_ranking_table(computed: &[ComputedHotspot]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .force_no_tty()
        .enforce_styling()
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Hotspot", "Level", "Avg GP", "Volatility", "AFK", "Score"]);

    for (rank, hotspot) in rank_by_score(computed).into_iter().enumerate() {
        let metrics = &hotspot.metrics;
        table.add_row(vec![
            (rank + 1).to_string().as_str(),
            hotspot.name.0.as_str(),
            hotspot.hotspot.level.to_string().as_str(),
            format_number(metrics.avg_price).as_str(),
            format!("{:.1}%", metrics.price_volatility * 100.0).as_str(),
            format!("{:.0}%", metrics.afk_factor * 100.0).as_str(),
            format_number(metrics.score).as_str(),
        ]);
    }

    table.to_string()
}

fn generate_excluded_table(excluded: &[ExcludedHotspot]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .force_no_tty()
        .enforce_styling()
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Hotspot", "Level", "Reason"]);

    for hotspot in excluded {
        table.add_row(vec![
            hotspot.name.0.as_str(),
            hotspot.hotspot.level.to_string().as_str(),
            hotspot.error.short_reason().as_str(),
        ]);
    }

    table.to_string()
}
