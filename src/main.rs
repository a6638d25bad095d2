// Entry point and high-level CLI flow.
//
// The original dashboard drives one analytical view at a time from a
// sidebar; here every view is a menu entry. Option [1] loads (or reloads)
// the accident CSV into the dataset cache, options [2]..[10] each prompt
// for their filters, run the aggregation and print/export the result.
mod aggregate;
mod dataset;
mod errors;
mod geo;
mod loader;
mod output;
mod types;
mod util;

use aggregate::{CategoryChoice, CategoryField};
use dataset::{Dataset, DatasetCache};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use types::{Gender, InjurySeverity, ParticipantRole};
use util::{format_int, format_number};

const DEFAULT_DATA_PATH: &str = "podatki/pn2009_2023.csv";
const DEFAULT_VOLUME_PATH: &str = "podatki/pldp_odseki.xlsx";

/// The analytical views. Menu input maps to exactly one tag and each tag
/// dispatches to an independent handler over the shared dataset handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Heatmap,
    DangerousSegments,
    SegmentsByVolume,
    Causes,
    YoungDrivers,
    Alcohol,
    Seatbelt,
    GenderBreakdown,
    Seasons,
}

impl View {
    fn from_choice(choice: &str) -> Option<View> {
        match choice {
            "2" => Some(View::Heatmap),
            "3" => Some(View::DangerousSegments),
            "4" => Some(View::SegmentsByVolume),
            "5" => Some(View::Causes),
            "6" => Some(View::YoungDrivers),
            "7" => Some(View::Alcohol),
            "8" => Some(View::Seatbelt),
            "9" => Some(View::GenderBreakdown),
            "10" => Some(View::Seasons),
            _ => None,
        }
    }
}

fn read_line_trimmed(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Read a single line of input after printing the common "Enter choice:"
/// prompt.
fn read_choice() -> String {
    read_line_trimmed("Enter choice: ")
}

fn prompt_year(label: &str, fallback: i32) -> i32 {
    let input = read_line_trimmed(&format!("{} [{}]: ", label, fallback));
    if input.is_empty() {
        fallback
    } else {
        input.parse().unwrap_or(fallback)
    }
}

fn prompt_usize(label: &str, fallback: usize) -> usize {
    let input = read_line_trimmed(&format!("{} [{}]: ", label, fallback));
    if input.is_empty() {
        fallback
    } else {
        input.parse().unwrap_or(fallback)
    }
}

/// List the available values and read one, with blank meaning "all".
/// A value that matches nothing simply yields an empty result table.
fn prompt_category(label: &str, options: &[String]) -> CategoryChoice {
    println!("Available {}: {}", label, options.join(", "));
    let input = read_line_trimmed(&format!("{} (blank = all): ", label));
    if input.is_empty() {
        CategoryChoice::All
    } else {
        CategoryChoice::Only(input)
    }
}

fn prompt_gender() -> Option<Gender> {
    match read_line_trimmed("Gender filter [M/Z, blank = all]: ").to_uppercase().as_str() {
        "M" => Some(Gender::Male),
        "Z" | "Ž" => Some(Gender::Female),
        _ => None,
    }
}

fn export_csv<T: Serialize>(path: &str, rows: &[T]) {
    if let Err(e) = output::write_csv(path, rows) {
        eprintln!("Write error: {}", e);
        return;
    }
    println!("(Full table exported to {})\n", path);
}

/// Handle option [1]: load the accident CSV, or reload it from disk if it
/// is already cached.
fn handle_load(cache: &mut DatasetCache, path: &Path) {
    let result = if cache.loaded(path).is_some() {
        cache.reload(path)
    } else {
        cache.accidents(path)
    };
    match result {
        Ok(ds) => {
            let report = &ds.report;
            println!(
                "Processing dataset... ({} rows read, {} kept)",
                format_int(report.total_rows as i64),
                format_int(report.kept_rows as i64)
            );
            println!(
                "Note: {} rows skipped due to parse/validation errors.",
                format_int(report.skipped_rows as i64)
            );
            println!(
                "Info: {} rows carry usable coordinates.\n",
                format_int(report.located_rows as i64)
            );
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", path.display(), e);
        }
    }
}

fn handle_heatmap(ds: &Dataset) {
    let rows = ds.rows();
    let (min_year, max_year) = match ds.year_span() {
        Some(span) => span,
        None => {
            println!("(no rows)\n");
            return;
        }
    };
    let from = prompt_year("From year", min_year);
    let to = prompt_year("To year", max_year);

    let subset = aggregate::filter_years(&rows, from, to);
    let points = geo::heatmap_points(&subset);
    println!(
        "\nHeatmap points: {} of {} selected rows are located in-bounds\n",
        format_int(points.len() as i64),
        format_int(subset.len() as i64)
    );
    output::preview_table(&points, 5);
    export_csv("heatmap_points.csv", &points);
}

fn handle_segments(ds: &Dataset) {
    let rows = ds.rows();
    let units = aggregate::distinct_values(&rows, CategoryField::AdminUnit);
    let choice = prompt_category("administrative unit", &units);

    let filtered = aggregate::filter_category(&rows, CategoryField::AdminUnit, &choice);
    let top = aggregate::top_segments(&filtered, aggregate::DEFAULT_TOP_K);
    println!("\nTop {} road segments by accident count\n", aggregate::DEFAULT_TOP_K);
    output::preview_table(&top, aggregate::DEFAULT_TOP_K);
    export_csv("dangerous_segments.csv", &top);
}

fn handle_segments_by_volume(ds: &Dataset, cache: &mut DatasetCache, volume_path: &Path) {
    let volumes = match cache.volumes(volume_path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", volume_path.display(), e);
            return;
        }
    };
    let rows = ds.rows();
    let ranked = aggregate::rate_ranking(
        &rows,
        &volumes,
        aggregate::DEFAULT_MIN_SEGMENT_COUNT,
        aggregate::DEFAULT_TOP_K,
    );
    println!(
        "\nSegments by accident rate per million vehicle-passages (>= {} accidents)\n",
        aggregate::DEFAULT_MIN_SEGMENT_COUNT
    );
    output::preview_table(&ranked, aggregate::DEFAULT_TOP_K);
    export_csv("segment_rates.csv", &ranked);
}

fn handle_causes(ds: &Dataset) {
    let rows = ds.rows();
    let accident_types = aggregate::distinct_values(&rows, CategoryField::AccidentType);
    let choice = prompt_category("accident type", &accident_types);

    let filtered = aggregate::filter_category(&rows, CategoryField::AccidentType, &choice);
    let top = aggregate::top_categories(&filtered, CategoryField::Cause, aggregate::DEFAULT_TOP_K);
    println!("\nMost frequent accident causes\n");
    output::preview_table(&top, aggregate::DEFAULT_TOP_K);
    export_csv("top_causes.csv", &top);
}

fn handle_young_drivers(ds: &Dataset) {
    let rows = ds.rows();
    let perpetrators = aggregate::filter_role(&rows, ParticipantRole::Perpetrator);
    let selected = aggregate::filter_gender(&perpetrators, prompt_gender());

    let distribution = aggregate::age_distribution(&selected);
    println!("\nPerpetrators by age group\n");
    output::preview_table(&distribution, distribution.len());
    export_csv("young_driver_ages.csv", &distribution);

    let young = aggregate::filter_age_bucket(&selected, 0);
    let causes = aggregate::top_categories(&young, CategoryField::Cause, aggregate::DEFAULT_TOP_K);
    println!("Most frequent causes among 18-24 year old perpetrators\n");
    output::preview_table(&causes, aggregate::DEFAULT_TOP_K);
    export_csv("young_driver_causes.csv", &causes);

    let summary = aggregate::young_driver_summary(&selected);
    println!(
        "Mean age of young perpetrators: {} | share among all perpetrators: {}%",
        format_number(summary.mean_young_age, 1),
        format_number(summary.young_share_pct, 1)
    );
    if let Err(e) = output::write_json("young_driver_summary.json", &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("(Summary exported to young_driver_summary.json)\n");
}

fn handle_alcohol(ds: &Dataset) {
    let rows = ds.rows();
    let tiers = aggregate::alcohol_tiers(&rows);
    println!("\nBreath-alcohol tiers across all participants\n");
    output::preview_table(&tiers, tiers.len());
    export_csv("alcohol_tiers.csv", &tiers);

    for (label, severity) in [("severe", InjurySeverity::Severe), ("fatal", InjurySeverity::Fatal)] {
        let attribution = aggregate::injury_attribution(&rows, |r| r.alcohol > 0.0, severity);
        println!(
            "{} injuries in accidents with an alcoholized perpetrator: {} ({}%), in the rest: {} ({}%)",
            label,
            format_int(attribution.attributed as i64),
            format_number(attribution.attributed_share_pct, 1),
            format_int(attribution.other as i64),
            format_number(attribution.other_share_pct, 1)
        );
    }
    println!();
}

fn handle_seatbelt(ds: &Dataset) {
    let rows = ds.rows();
    let crosstab = aggregate::seatbelt_crosstab(&rows);

    println!("\nInjury outcome shares by seatbelt use (row percentages)\n");
    output::preview_table(&crosstab.share_rows, crosstab.share_rows.len());
    export_csv("seatbelt_shares.csv", &crosstab.share_rows);

    println!("Raw counts by injury outcome\n");
    output::preview_table(&crosstab.count_rows, crosstab.count_rows.len());
    export_csv("seatbelt_counts.csv", &crosstab.count_rows);

    println!("Fatality rate per belt column\n");
    output::preview_table(&crosstab.fatality_rows, crosstab.fatality_rows.len());
    export_csv("seatbelt_fatality.csv", &crosstab.fatality_rows);
}

fn handle_gender_breakdown(ds: &Dataset) {
    let rows = ds.rows();
    let split = aggregate::gender_split(&rows, true);
    println!("\nPerpetrators by gender\n");
    output::preview_table(&split, split.len());
    export_csv("gender_split.csv", &split);

    let table = aggregate::cause_by_gender(&rows, aggregate::DEFAULT_TOP_K);
    println!("Top causes by perpetrator gender\n");
    output::preview_table(&table, aggregate::DEFAULT_TOP_K);
    export_csv("cause_by_gender.csv", &table);
}

fn handle_seasons(ds: &Dataset) {
    let rows = ds.rows();
    let top_n = prompt_usize("Number of causes", 5);
    let trend = aggregate::seasonal_trend(&rows, top_n);
    println!("\nAccidents per season for the top {} causes\n", top_n);
    output::preview_table(&trend, trend.len());
    export_csv("seasonal_trends.csv", &trend);
}

fn dispatch(view: View, ds: &Dataset, cache: &mut DatasetCache, volume_path: &Path) {
    match view {
        View::Heatmap => handle_heatmap(ds),
        View::DangerousSegments => handle_segments(ds),
        View::SegmentsByVolume => handle_segments_by_volume(ds, cache, volume_path),
        View::Causes => handle_causes(ds),
        View::YoungDrivers => handle_young_drivers(ds),
        View::Alcohol => handle_alcohol(ds),
        View::Seatbelt => handle_seatbelt(ds),
        View::GenderBreakdown => handle_gender_breakdown(ds),
        View::Seasons => handle_seasons(ds),
    }
}

fn main() {
    env_logger::init();
    let data_path = PathBuf::from(
        std::env::var("TRAFFIC_DATA").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string()),
    );
    let volume_path = PathBuf::from(
        std::env::var("TRAFFIC_VOLUMES").unwrap_or_else(|_| DEFAULT_VOLUME_PATH.to_string()),
    );
    let mut cache = DatasetCache::default();

    loop {
        println!("Traffic accidents in Slovenia, 2009-2023");
        println!("[1] Load / reload the accident data");
        println!("[2] Accident heatmap points");
        println!("[3] Most dangerous road segments");
        println!("[4] Segment ranking by traffic volume");
        println!("[5] Accident causes");
        println!("[6] Young drivers (18-24)");
        println!("[7] Alcohol involvement");
        println!("[8] Seatbelt use and injuries");
        println!("[9] Gender breakdown");
        println!("[10] Seasonal trends");
        println!("[0] Exit\n");

        let choice = read_choice();
        println!();
        match choice.as_str() {
            "0" => {
                println!("Exiting the program.");
                break;
            }
            "1" => handle_load(&mut cache, &data_path),
            other => match View::from_choice(other) {
                Some(view) => {
                    let Some(ds) = cache.loaded(&data_path) else {
                        println!("Error: No data loaded. Please load the accident data first (option 1).\n");
                        continue;
                    };
                    dispatch(view, &ds, &mut cache, &volume_path);
                }
                None => println!("Invalid choice.\n"),
            },
        }
    }
}
