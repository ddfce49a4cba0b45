//! The three pipeline stages, each reading its input file and fully
//! rewriting its outputs.

use anyhow::{Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::adjust::adjust_for_high_demand;
use crate::geocode::{Geocoder, geocode_records};
use crate::network::{
    TransitNetwork, classify_degrees, default_merge_name, merge_routes, route_scores,
    simulate_dynamic_routing,
};
use crate::output::{append_record, preview_geocoded, preview_records, print_json, write_records};
use crate::parser::parse_timetable;
use crate::records::{GeocodedRecord, RouteStopRecord};
use crate::render::{render_maps, render_plots};
use crate::stats::NetworkSummary;
use crate::table::{
    read_geocoded_table, read_raw_rows, read_route_table, write_geocoded_table, write_route_table,
};

pub const ROUTE_SCORES: &str = "route_scores.csv";
pub const ADJUSTED_TIMETABLE: &str = "adjusted_timetable.csv";
pub const RUN_HISTORY: &str = "network_runs.csv";

/// A requested merge of two routes, written `ROUTE1,ROUTE2[,NAME]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    pub route1: String,
    pub route2: String,
    pub name: String,
}

impl FromStr for MergeSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [r1, r2] if !r1.is_empty() && !r2.is_empty() => Ok(MergeSpec {
                route1: r1.to_string(),
                route2: r2.to_string(),
                name: default_merge_name(r1, r2),
            }),
            [r1, r2, name] if !r1.is_empty() && !r2.is_empty() && !name.is_empty() => {
                Ok(MergeSpec {
                    route1: r1.to_string(),
                    route2: r2.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!("expected ROUTE1,ROUTE2[,NAME], got '{s}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub output_dir: PathBuf,
    pub merges: Vec<MergeSpec>,
    pub sample_size: usize,
    pub seed: Option<u64>,
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub summary: NetworkSummary,
    pub network: TransitNetwork,
    pub artifacts: Vec<PathBuf>,
}

/// Stage 1: raw export to long-format route table.
#[tracing::instrument(fields(input = %input.display(), output = %output.display()))]
pub fn run_parse(input: &Path, output: &Path) -> Result<Vec<RouteStopRecord>> {
    let rows = read_raw_rows(input)?;
    let records = parse_timetable(&rows);
    if records.is_empty() {
        warn!("No stop rows found under any route marker");
    }

    write_route_table(output, &records)?;
    info!(rows = rows.len(), records = records.len(), "Timetable parsed");
    preview_records("routes", &records);
    Ok(records)
}

/// Stage 2: route table to geocoded table.
#[tracing::instrument(skip(geocoder), fields(input = %input.display(), output = %output.display()))]
pub async fn run_geocode<G>(
    geocoder: &G,
    input: &Path,
    output: &Path,
    region: &str,
) -> Result<Vec<GeocodedRecord>>
where
    G: Geocoder + ?Sized,
{
    let records = read_route_table(input)?;
    let geocoded = geocode_records(geocoder, records, region).await;

    write_geocoded_table(output, &geocoded)?;
    preview_geocoded("geocoded", &geocoded);
    Ok(geocoded)
}

/// Stage 3: build the network, score and classify it, apply merges and write
/// every artifact into `options.output_dir`.
#[tracing::instrument(skip(options), fields(input = %input.display(), output_dir = %options.output_dir.display()))]
pub fn run_analyze(input: &Path, options: &AnalyzeOptions) -> Result<AnalysisOutcome> {
    let records = read_geocoded_table(input)?;
    preview_geocoded("input", &records);

    let built = TransitNetwork::from_records(&records);
    let scores = route_scores(&built);
    for score in &scores {
        info!(
            route = %score.route_id,
            stops = score.stops,
            mean_distance_km = score.mean_distance_km,
            "Route optimization by distance"
        );
    }
    let mut artifacts = Vec::new();
    let scores_path = options.output_dir.join(ROUTE_SCORES);
    write_records(&scores_path, &scores)?;
    artifacts.push(scores_path);

    let classes = classify_degrees(&built.graph);
    info!(
        high = classes.high.len(),
        low = classes.low.len(),
        "Degree classes computed"
    );

    let mut network = built.clone();
    let mut merged = Vec::new();
    for spec in &options.merges {
        match merge_routes(&mut network, &spec.route1, &spec.route2, &spec.name) {
            Ok(report) => {
                info!(
                    "Routes {} and {} merged into {}",
                    spec.route1, spec.route2, report.merged_route
                );
                merged.push(report.merged_route);
            }
            Err(e) => warn!(error = %e, merge = ?spec, "Skipping route merge"),
        }
    }

    artifacts.extend(render_plots(&network, &classes, &options.output_dir)?);

    let timetable: Vec<RouteStopRecord> = records.iter().map(|r| r.record.clone()).collect();
    let adjusted = adjust_for_high_demand(&timetable);
    let adjusted_path = options.output_dir.join(ADJUSTED_TIMETABLE);
    write_route_table(&adjusted_path, &adjusted)?;
    preview_records("adjusted", &adjusted);
    artifacts.push(adjusted_path);

    artifacts.extend(render_maps(&built, &scores, &options.output_dir)?);

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    simulate_dynamic_routing(&records, options.sample_size, &mut rng);

    let geocoded_records = records.iter().filter(|r| r.coordinates.is_some()).count();
    let summary = NetworkSummary::from_network(&built, &classes, &scores)
        .with_input(&input.display().to_string(), records.len(), geocoded_records)
        .with_merges(&merged);
    info!(geocoded_pct = summary.geocoded_pct(), "Geocoding coverage");
    print_json(&summary)?;

    let history = options.output_dir.join(RUN_HISTORY);
    append_record(&history, &summary)
        .map_err(|e| anyhow!("failed to append run summary to '{}': {e}", history.display()))?;
    artifacts.push(history);

    Ok(AnalysisOutcome {
        summary,
        network,
        artifacts,
    })
}
