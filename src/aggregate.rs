// The accident data aggregator: every view's filtering, grouping and
// percentage logic lives here as pure functions over borrowed row sets.
// Inputs are never mutated; each function returns a fresh derived table.
use crate::types::{
    AccidentRecord, AgeGroupRow, AlcoholTierRow, CategoryCountRow, CauseGenderRow, Gender,
    GenderShareRow, InjuryAttribution, InjurySeverity, ParticipantRole, RoadVolumeRecord, Season,
    SeasonCauseRow, SeatbeltCountRow, SeatbeltFatalityRow, SeatbeltShareRow, SegmentCountRow,
    SegmentRateRow,
};
use crate::util::{average, normalize_segment, percentage};
use chrono::Datelike;
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

pub const DEFAULT_TOP_K: usize = 10;
/// Segments with fewer accidents than this are dropped from the
/// volume-normalized ranking; a handful of accidents on a near-empty road
/// would otherwise dominate the rate.
pub const DEFAULT_MIN_SEGMENT_COUNT: usize = 20;
/// Legal breath-alcohol threshold; exactly at the limit still counts as
/// "within limit", only strictly greater readings are over.
pub const LEGAL_ALCOHOL_LIMIT: f64 = 0.5;

const AGE_EDGES: [i32; 8] = [18, 24, 34, 44, 54, 64, 74, 100];
const AGE_LABELS: [&str; 7] = ["18-24", "25-34", "35-44", "45-54", "55-64", "65-74", "75+"];

pub struct AgeBucket {
    pub label: &'static str,
    lower: i32,
    upper: i32,
}

static AGE_BUCKETS: Lazy<Vec<AgeBucket>> = Lazy::new(|| {
    AGE_EDGES
        .windows(2)
        .zip(AGE_LABELS)
        .map(|(edge_pair, label)| AgeBucket { label, lower: edge_pair[0], upper: edge_pair[1] })
        .collect()
});

/// Bucket index for an age, or `None` when the age falls outside every
/// bucket. An age on a shared edge belongs to the lower bucket (24 is
/// still "18-24"); the final edge itself is already out of range.
pub fn age_bucket_index(age: i32) -> Option<usize> {
    if age >= AGE_EDGES[AGE_EDGES.len() - 1] {
        return None;
    }
    AGE_BUCKETS.iter().position(|b| age >= b.lower && age <= b.upper)
}

/// Inclusive year-range filter. An inverted range yields an empty set,
/// never an error.
pub fn filter_years<'a>(
    rows: &[&'a AccidentRecord],
    year_min: i32,
    year_max: i32,
) -> Vec<&'a AccidentRecord> {
    if year_min > year_max {
        return Vec::new();
    }
    rows.iter()
        .copied()
        .filter(|r| (year_min..=year_max).contains(&r.year))
        .collect()
}

/// The string-valued fields a view can filter or rank on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    AdminUnit,
    AccidentType,
    Cause,
}

impl CategoryField {
    pub fn value<'r>(&self, r: &'r AccidentRecord) -> &'r str {
        match self {
            CategoryField::AdminUnit => &r.admin_unit,
            CategoryField::AccidentType => &r.accident_type,
            CategoryField::Cause => &r.cause,
        }
    }
}

/// A widget selection: either the "all" sentinel or one concrete value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChoice {
    All,
    Only(String),
}

pub fn filter_category<'a>(
    rows: &[&'a AccidentRecord],
    field: CategoryField,
    choice: &CategoryChoice,
) -> Vec<&'a AccidentRecord> {
    match choice {
        CategoryChoice::All => rows.to_vec(),
        CategoryChoice::Only(value) => {
            rows.iter().copied().filter(|r| field.value(r) == value).collect()
        }
    }
}

pub fn filter_role<'a>(rows: &[&'a AccidentRecord], role: ParticipantRole) -> Vec<&'a AccidentRecord> {
    rows.iter().copied().filter(|r| r.role == role).collect()
}

/// Gender filter with `None` as the "all" sentinel.
pub fn filter_gender<'a>(rows: &[&'a AccidentRecord], choice: Option<Gender>) -> Vec<&'a AccidentRecord> {
    match choice {
        None => rows.to_vec(),
        Some(gender) => rows.iter().copied().filter(|r| r.gender == Some(gender)).collect(),
    }
}

pub fn filter_age_bucket<'a>(rows: &[&'a AccidentRecord], bucket: usize) -> Vec<&'a AccidentRecord> {
    rows.iter()
        .copied()
        .filter(|r| r.age.is_some_and(|a| age_bucket_index(a) == Some(bucket)))
        .collect()
}

/// Sorted distinct non-empty values of a field, for filter prompts.
pub fn distinct_values(rows: &[&AccidentRecord], field: CategoryField) -> Vec<String> {
    let mut values: Vec<String> = rows
        .iter()
        .map(|r| field.value(r))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    values.sort();
    values
}

/// Count occurrences of each key, ordered by count descending with ties
/// broken by first encounter in the input. The tie-break is part of the
/// contract: equal-count groups keep their input order.
fn ordered_counts<K: Eq + Hash>(keys: impl Iterator<Item = K>) -> Vec<(K, usize)> {
    let mut counts: HashMap<K, (usize, usize)> = HashMap::new();
    for (index, key) in keys.enumerate() {
        let entry = counts.entry(key).or_insert((0, index));
        entry.0 += 1;
    }
    let mut out: Vec<(K, (usize, usize))> = counts.into_iter().collect();
    out.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });
    out.into_iter().map(|(key, (count, _))| (key, count)).collect()
}

/// Top-k road segments by raw accident count, labeled `"{road} – {segment}"`.
pub fn top_segments(rows: &[&AccidentRecord], k: usize) -> Vec<SegmentCountRow> {
    ordered_counts(rows.iter().map(|r| (r.road_name.clone(), r.segment_name.clone())))
        .into_iter()
        .take(k)
        .map(|((road, segment), accidents)| SegmentCountRow {
            label: format!("{} – {}", road, segment),
            accidents,
        })
        .collect()
}

/// Segment ranking normalized by traffic volume: accidents per million
/// vehicle-passages, `count / (AADT * 365) * 1_000_000`.
///
/// Segments without an AADT match (or a non-positive AADT) have no defined
/// rate and are skipped, never scored as zero; segments below `min_count`
/// are dropped as noise.
pub fn rate_ranking(
    rows: &[&AccidentRecord],
    volumes: &[RoadVolumeRecord],
    min_count: usize,
    k: usize,
) -> Vec<SegmentRateRow> {
    let aadt_by_segment: HashMap<String, f64> = volumes
        .iter()
        .map(|v| (normalize_segment(&v.segment_name), v.aadt))
        .collect();

    let mut ranked: Vec<(String, usize, f64, f64)> =
        ordered_counts(rows.iter().map(|r| normalize_segment(&r.segment_name)))
            .into_iter()
            .filter(|(segment, _)| !segment.is_empty())
            .filter_map(|(segment, count)| {
                if count < min_count {
                    return None;
                }
                let &aadt = aadt_by_segment.get(&segment)?;
                if aadt <= 0.0 {
                    return None;
                }
                let rate = count as f64 / (aadt * 365.0) * 1_000_000.0;
                Some((segment, count, aadt, rate))
            })
            .collect();

    ranked.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(Ordering::Equal));
    ranked
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(index, (segment, accidents, aadt, rate))| SegmentRateRow {
            rank: index + 1,
            segment,
            accidents,
            aadt,
            rate,
        })
        .collect()
}

/// Top-k values of a categorical field by count.
pub fn top_categories(rows: &[&AccidentRecord], field: CategoryField, k: usize) -> Vec<CategoryCountRow> {
    ordered_counts(
        rows.iter()
            .map(|r| field.value(r))
            .filter(|v| !v.is_empty())
            .map(str::to_string),
    )
    .into_iter()
    .take(k)
    .map(|(value, accidents)| CategoryCountRow { value, accidents })
    .collect()
}

/// Counts per fixed age group, in label order. Ages outside every bucket
/// (and rows without an age) are excluded, not errored.
pub fn age_distribution(rows: &[&AccidentRecord]) -> Vec<AgeGroupRow> {
    let mut counts = vec![0usize; AGE_BUCKETS.len()];
    for r in rows {
        if let Some(index) = r.age.and_then(age_bucket_index) {
            counts[index] += 1;
        }
    }
    AGE_BUCKETS
        .iter()
        .zip(counts)
        .map(|(bucket, accidents)| AgeGroupRow { age_group: bucket.label.to_string(), accidents })
        .collect()
}

/// Split readings into sober / within limit / over the limit tiers with
/// each tier's share of the total. Unparseable readings were already
/// normalized to 0.0 at load, so they land in the sober tier and the
/// shares always total 100.
pub fn alcohol_tiers(rows: &[&AccidentRecord]) -> Vec<AlcoholTierRow> {
    let mut sober = 0usize;
    let mut within = 0usize;
    let mut over = 0usize;
    for r in rows {
        if r.alcohol > LEGAL_ALCOHOL_LIMIT {
            over += 1;
        } else if r.alcohol > 0.0 {
            within += 1;
        } else {
            sober += 1;
        }
    }
    let total = rows.len();
    let row = |tier: &str, participants: usize| AlcoholTierRow {
        tier: tier.to_string(),
        participants,
        share_pct: percentage(participants, total),
    };
    vec![
        row("No alcohol", sober),
        row("Positive, within limit", within),
        row("Over the limit", over),
    ]
}

/// Two-step relational attribution: find the accidents whose perpetrator
/// satisfies `condition`, then split all rows with the given injury by
/// membership in that accident set. Membership is by accident id, because
/// the condition (say, an alcoholized perpetrator) and the injury usually
/// sit on different participant rows of the same accident.
pub fn injury_attribution(
    rows: &[&AccidentRecord],
    condition: impl Fn(&AccidentRecord) -> bool,
    injury: InjurySeverity,
) -> InjuryAttribution {
    let flagged_accidents: HashSet<&str> = rows
        .iter()
        .filter(|r| r.role == ParticipantRole::Perpetrator && condition(r))
        .map(|r| r.accident_id.as_str())
        .collect();

    let mut attributed = 0usize;
    let mut other = 0usize;
    for r in rows.iter().filter(|r| r.injury == Some(injury)) {
        if flagged_accidents.contains(r.accident_id.as_str()) {
            attributed += 1;
        } else {
            other += 1;
        }
    }
    let total = attributed + other;
    InjuryAttribution {
        attributed,
        other,
        attributed_share_pct: percentage(attributed, total),
        other_share_pct: percentage(other, total),
    }
}

/// The seatbelt cross-tabulation, restricted to rows with a definite
/// yes/no belt flag and a known injury outcome.
pub struct SeatbeltCrossTab {
    /// Row-normalized percentages, sorted by the no-belt share descending.
    pub share_rows: Vec<SeatbeltShareRow>,
    /// Raw counts, sorted by row total ascending.
    pub count_rows: Vec<SeatbeltCountRow>,
    /// Fatality rate per belt column.
    pub fatality_rows: Vec<SeatbeltFatalityRow>,
}

pub fn seatbelt_crosstab(rows: &[&AccidentRecord]) -> SeatbeltCrossTab {
    use crate::types::SeatbeltUse;

    // (no-belt, belt) counts per severity.
    let mut table: HashMap<InjurySeverity, (usize, usize)> = HashMap::new();
    let mut column_no = 0usize;
    let mut column_yes = 0usize;
    for r in rows {
        let belted = match r.seatbelt {
            SeatbeltUse::Yes => true,
            SeatbeltUse::No => false,
            SeatbeltUse::Unknown => continue,
        };
        let Some(injury) = r.injury else { continue };
        let entry = table.entry(injury).or_insert((0, 0));
        if belted {
            entry.1 += 1;
            column_yes += 1;
        } else {
            entry.0 += 1;
            column_no += 1;
        }
    }

    let mut share_rows = Vec::new();
    let mut count_rows = Vec::new();
    for severity in InjurySeverity::ALL {
        let Some(&(no_belt, belt)) = table.get(&severity) else { continue };
        let total = no_belt + belt;
        share_rows.push(SeatbeltShareRow {
            injury: severity.to_string(),
            no_belt_pct: percentage(no_belt, total),
            belt_pct: percentage(belt, total),
        });
        count_rows.push(SeatbeltCountRow { injury: severity.to_string(), no_belt, belt, total });
    }
    share_rows.sort_by(|a, b| b.no_belt_pct.partial_cmp(&a.no_belt_pct).unwrap_or(Ordering::Equal));
    count_rows.sort_by_key(|row| row.total);

    let fatal = table.get(&InjurySeverity::Fatal).copied().unwrap_or((0, 0));
    let fatality_rows = vec![
        SeatbeltFatalityRow {
            seatbelt: "No belt".to_string(),
            participants: column_no,
            fatalities: fatal.0,
            fatality_pct: percentage(fatal.0, column_no),
        },
        SeatbeltFatalityRow {
            seatbelt: "Belt worn".to_string(),
            participants: column_yes,
            fatalities: fatal.1,
            fatality_pct: percentage(fatal.1, column_yes),
        },
    ];

    SeatbeltCrossTab { share_rows, count_rows, fatality_rows }
}

/// Gender counts with sentinel values excluded, optionally restricted to
/// perpetrator rows first. Shares are relative to the known-gender total.
pub fn gender_split(rows: &[&AccidentRecord], only_perpetrators: bool) -> Vec<GenderShareRow> {
    let mut male = 0usize;
    let mut female = 0usize;
    for r in rows {
        if only_perpetrators && r.role != ParticipantRole::Perpetrator {
            continue;
        }
        match r.gender {
            Some(Gender::Male) => male += 1,
            Some(Gender::Female) => female += 1,
            None => {}
        }
    }
    let known = male + female;
    vec![
        GenderShareRow {
            gender: Gender::Male.to_string(),
            participants: male,
            share_pct: percentage(male, known),
        },
        GenderShareRow {
            gender: Gender::Female.to_string(),
            participants: female,
            share_pct: percentage(female, known),
        },
    ]
}

/// Cross-tabulate the top-k causes among perpetrators with known gender
/// against gender, preserving the overall-frequency ordering of causes.
pub fn cause_by_gender(rows: &[&AccidentRecord], k: usize) -> Vec<CauseGenderRow> {
    let perpetrators: Vec<&AccidentRecord> = rows
        .iter()
        .copied()
        .filter(|r| r.role == ParticipantRole::Perpetrator && r.gender.is_some() && !r.cause.is_empty())
        .collect();

    let top_causes: Vec<String> = ordered_counts(perpetrators.iter().map(|r| r.cause.clone()))
        .into_iter()
        .take(k)
        .map(|(cause, _)| cause)
        .collect();

    top_causes
        .into_iter()
        .map(|cause| {
            let male = perpetrators
                .iter()
                .filter(|r| r.cause == cause && r.gender == Some(Gender::Male))
                .count();
            let female = perpetrators
                .iter()
                .filter(|r| r.cause == cause && r.gender == Some(Gender::Female))
                .count();
            CauseGenderRow { cause, male, female }
        })
        .collect()
}

/// Season-by-cause count table for the `top_n` most frequent causes.
/// Seasons come out in fixed order (Spring, Summer, Autumn, Winter),
/// causes in overall-frequency order, missing combinations as zero.
/// Records without a parseable date are excluded.
pub fn seasonal_trend(rows: &[&AccidentRecord], top_n: usize) -> Vec<SeasonCauseRow> {
    let dated: Vec<(Season, &AccidentRecord)> = rows
        .iter()
        .filter(|r| !r.cause.is_empty())
        .filter_map(|r| r.date.map(|d| (Season::from_month(d.month()), *r)))
        .collect();

    let top_causes: Vec<String> = ordered_counts(dated.iter().map(|(_, r)| r.cause.clone()))
        .into_iter()
        .take(top_n)
        .map(|(cause, _)| cause)
        .collect();
    let cause_index: HashMap<&str, usize> =
        top_causes.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();

    let mut counts = vec![[0usize; 4]; top_causes.len()];
    for (season, r) in &dated {
        if let Some(&i) = cause_index.get(r.cause.as_str()) {
            counts[i][season.index()] += 1;
        }
    }

    let mut out = Vec::with_capacity(top_causes.len() * Season::ALL.len());
    for season in Season::ALL {
        for (i, cause) in top_causes.iter().enumerate() {
            out.push(SeasonCauseRow {
                season: season.to_string(),
                cause: cause.clone(),
                accidents: counts[i][season.index()],
            });
        }
    }
    out
}

/// Scalar summary for the young-driver view over a set of perpetrator rows.
pub fn young_driver_summary(perpetrators: &[&AccidentRecord]) -> crate::types::YoungDriverSummary {
    let young_ages: Vec<f64> = perpetrators
        .iter()
        .filter_map(|r| r.age)
        .filter(|a| age_bucket_index(*a) == Some(0))
        .map(f64::from)
        .collect();
    crate::types::YoungDriverSummary {
        young_perpetrators: young_ages.len(),
        all_perpetrators: perpetrators.len(),
        mean_young_age: average(&young_ages),
        young_share_pct: percentage(young_ages.len(), perpetrators.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeatbeltUse;
    use crate::util::parse_alcohol;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn rec(id: &str, year: i32) -> AccidentRecord {
        AccidentRecord {
            accident_id: id.to_string(),
            year,
            date: None,
            admin_unit: "CELJE".to_string(),
            road_name: String::new(),
            segment_name: String::new(),
            accident_type: String::new(),
            cause: String::new(),
            role: ParticipantRole::Participant,
            gender: None,
            age: None,
            injury: None,
            seatbelt: SeatbeltUse::Unknown,
            alcohol: 0.0,
            easting: None,
            northing: None,
        }
    }

    fn refs(records: &[AccidentRecord]) -> Vec<&AccidentRecord> {
        records.iter().collect()
    }

    #[test]
    fn year_filter_is_inclusive_and_idempotent() {
        let records: Vec<AccidentRecord> =
            (2009..=2023).map(|y| rec(&y.to_string(), y)).collect();
        let rows = refs(&records);

        let once = filter_years(&rows, 2012, 2015);
        assert_eq!(once.len(), 4);
        assert!(once.iter().all(|r| (2012..=2015).contains(&r.year)));

        let twice = filter_years(&once, 2012, 2015);
        assert_eq!(
            once.iter().map(|r| r.accident_id.as_str()).collect::<Vec<_>>(),
            twice.iter().map(|r| r.accident_id.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn inverted_year_range_is_empty_not_an_error() {
        let records = vec![rec("1", 2010)];
        assert!(filter_years(&refs(&records), 2015, 2012).is_empty());
    }

    #[test]
    fn category_filter_honors_the_all_sentinel() {
        let mut a = rec("1", 2010);
        a.accident_type = "ČELNO TRČENJE".to_string();
        let mut b = rec("2", 2010);
        b.accident_type = "NALETNO TRČENJE".to_string();
        let records = vec![a, b];
        let rows = refs(&records);

        assert_eq!(filter_category(&rows, CategoryField::AccidentType, &CategoryChoice::All).len(), 2);
        let only = filter_category(
            &rows,
            CategoryField::AccidentType,
            &CategoryChoice::Only("ČELNO TRČENJE".to_string()),
        );
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].accident_id, "1");
    }

    fn on_segment(id: &str, road: &str, segment: &str) -> AccidentRecord {
        let mut r = rec(id, 2015);
        r.road_name = road.to_string();
        r.segment_name = segment.to_string();
        r
    }

    #[test]
    fn top_segments_counts_orders_and_truncates() {
        let mut records = Vec::new();
        for i in 0..5 {
            records.push(on_segment(&format!("a{}", i), "LJUBLJANA", "CELOVŠKA CESTA"));
        }
        for i in 0..3 {
            records.push(on_segment(&format!("b{}", i), "MARIBOR", "TITOVA CESTA"));
        }
        records.push(on_segment("c0", "KRANJ", "GLAVNA CESTA"));

        let top = top_segments(&refs(&records), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label, "LJUBLJANA – CELOVŠKA CESTA");
        assert_eq!(top[0].accidents, 5);
        assert_eq!(top[1].label, "MARIBOR – TITOVA CESTA");
        assert_eq!(top[1].accidents, 3);
    }

    #[test]
    fn top_segments_ties_keep_first_encounter_order() {
        let records = vec![
            on_segment("1", "A", "X"),
            on_segment("2", "B", "Y"),
            on_segment("3", "A", "X"),
            on_segment("4", "B", "Y"),
        ];
        let top = top_segments(&refs(&records), 10);
        assert_eq!(top[0].label, "A – X");
        assert_eq!(top[1].label, "B – Y");
    }

    #[test]
    fn top_segments_set_is_order_independent() {
        let records = vec![
            on_segment("1", "A", "X"),
            on_segment("2", "B", "Y"),
            on_segment("3", "A", "X"),
            on_segment("4", "B", "Y"),
        ];
        let mut reversed: Vec<AccidentRecord> = records.clone();
        reversed.reverse();

        let sorted_pairs = |rows: Vec<SegmentCountRow>| {
            let mut pairs: Vec<(String, usize)> =
                rows.into_iter().map(|r| (r.label, r.accidents)).collect();
            pairs.sort();
            pairs
        };
        assert_eq!(
            sorted_pairs(top_segments(&refs(&records), 10)),
            sorted_pairs(top_segments(&refs(&reversed), 10))
        );
    }

    #[test]
    fn rate_ranking_matches_the_reference_rate() {
        let mut records = Vec::new();
        for i in 0..25 {
            records.push(on_segment(&format!("a{}", i), "R", "ODSEK A"));
        }
        let volumes = vec![RoadVolumeRecord { segment_name: "ODSEK A".to_string(), aadt: 1000.0 }];
        let ranked = rate_ranking(&refs(&records), &volumes, 20, 10);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].accidents, 25);
        // 25 / (1000 * 365) * 1_000_000
        assert!((ranked[0].rate - 68.493_150_684_93).abs() < 1e-6);
    }

    #[test]
    fn rate_ranking_drops_low_count_and_unmatched_segments() {
        let mut records = Vec::new();
        // Below min_count even though its rate would be enormous.
        for i in 0..19 {
            records.push(on_segment(&format!("a{}", i), "R", "REDKA CESTA"));
        }
        // No AADT match at all.
        for i in 0..30 {
            records.push(on_segment(&format!("b{}", i), "R", "NEZNAN ODSEK"));
        }
        // AADT of zero must be skipped, not scored as zero or infinity.
        for i in 0..30 {
            records.push(on_segment(&format!("c{}", i), "R", "PRAZNA CESTA"));
        }
        let volumes = vec![
            RoadVolumeRecord { segment_name: "REDKA CESTA".to_string(), aadt: 10.0 },
            RoadVolumeRecord { segment_name: "PRAZNA CESTA".to_string(), aadt: 0.0 },
        ];
        assert!(rate_ranking(&refs(&records), &volumes, 20, 10).is_empty());
    }

    #[test]
    fn rate_ranking_joins_on_normalized_segment_names() {
        let mut records = Vec::new();
        for i in 0..25 {
            records.push(on_segment(&format!("a{}", i), "R", "  GLAVNA   CESTA "));
        }
        let volumes = vec![RoadVolumeRecord { segment_name: "GLAVNA CESTA".to_string(), aadt: 500.0 }];
        let ranked = rate_ranking(&refs(&records), &volumes, 20, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].segment, "GLAVNA CESTA");
    }

    #[test]
    fn top_categories_skips_empty_values() {
        let mut a = rec("1", 2010);
        a.cause = "HITROST".to_string();
        let mut b = rec("2", 2010);
        b.cause = "HITROST".to_string();
        let c = rec("3", 2010);
        let records = vec![a, b, c];

        let top = top_categories(&refs(&records), CategoryField::Cause, 10);
        assert_eq!(top, vec![CategoryCountRow { value: "HITROST".to_string(), accidents: 2 }]);
    }

    fn aged(id: &str, age: i32) -> AccidentRecord {
        let mut r = rec(id, 2015);
        r.age = Some(age);
        r
    }

    #[test]
    fn age_buckets_follow_the_documented_boundaries() {
        assert_eq!(age_bucket_index(24), Some(0)); // shared edge goes low
        assert_eq!(age_bucket_index(25), Some(1));
        assert_eq!(age_bucket_index(34), Some(1));
        assert_eq!(age_bucket_index(17), None);
        assert_eq!(age_bucket_index(100), None);
        assert_eq!(age_bucket_index(99), Some(6));
    }

    #[test]
    fn age_distribution_is_in_label_order() {
        let records = vec![aged("1", 24), aged("2", 34), aged("3", 17), aged("4", 100), aged("5", 80)];
        let dist = age_distribution(&refs(&records));
        let expected: Vec<(String, usize)> = vec![
            ("18-24".to_string(), 1),
            ("25-34".to_string(), 1),
            ("35-44".to_string(), 0),
            ("45-54".to_string(), 0),
            ("55-64".to_string(), 0),
            ("65-74".to_string(), 0),
            ("75+".to_string(), 1),
        ];
        let got: Vec<(String, usize)> =
            dist.into_iter().map(|r| (r.age_group, r.accidents)).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn alcohol_tiers_split_and_sum_to_hundred() {
        let readings = ["0", "0,3", "0,7", "garbage"];
        let records: Vec<AccidentRecord> = readings
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut r = rec(&i.to_string(), 2015);
                r.alcohol = parse_alcohol(Some(s));
                r
            })
            .collect();

        let tiers = alcohol_tiers(&refs(&records));
        assert_eq!(tiers[0].participants, 2); // "0" and the garbage reading
        assert_eq!(tiers[1].participants, 1); // 0.3
        assert_eq!(tiers[2].participants, 1); // 0.7
        let sum: f64 = tiers.iter().map(|t| t.share_pct).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn exactly_the_limit_is_still_within_limit() {
        let mut r = rec("1", 2015);
        r.alcohol = 0.5;
        let records = vec![r];
        let tiers = alcohol_tiers(&refs(&records));
        assert_eq!(tiers[1].participants, 1);
        assert_eq!(tiers[2].participants, 0);
    }

    #[test]
    fn injury_attribution_uses_accident_id_membership() {
        // Accident A: alcoholized perpetrator, severely injured passenger.
        let mut a_perp = rec("A", 2015);
        a_perp.role = ParticipantRole::Perpetrator;
        a_perp.alcohol = 0.8;
        let mut a_victim = rec("A", 2015);
        a_victim.injury = Some(InjurySeverity::Severe);
        // Accident B: sober perpetrator, severely injured participant.
        let mut b_perp = rec("B", 2015);
        b_perp.role = ParticipantRole::Perpetrator;
        let mut b_victim = rec("B", 2015);
        b_victim.injury = Some(InjurySeverity::Severe);

        let records = vec![a_perp, a_victim, b_perp, b_victim];
        let result =
            injury_attribution(&refs(&records), |r| r.alcohol > 0.0, InjurySeverity::Severe);

        assert_eq!(result.attributed, 1);
        assert_eq!(result.other, 1);
        assert!((result.attributed_share_pct - 50.0).abs() < 1e-9);
        assert!((result.other_share_pct - 50.0).abs() < 1e-9);
    }

    fn belted(id: &str, injury: InjurySeverity, seatbelt: SeatbeltUse) -> AccidentRecord {
        let mut r = rec(id, 2015);
        r.injury = Some(injury);
        r.seatbelt = seatbelt;
        r
    }

    #[test]
    fn seatbelt_crosstab_shares_counts_and_fatality_rates() {
        let records = vec![
            belted("1", InjurySeverity::Minor, SeatbeltUse::No),
            belted("2", InjurySeverity::Minor, SeatbeltUse::Yes),
            belted("3", InjurySeverity::Fatal, SeatbeltUse::No),
            belted("4", InjurySeverity::Fatal, SeatbeltUse::No),
            belted("5", InjurySeverity::Fatal, SeatbeltUse::Yes),
            // Unknown belt flag must not enter the table at all.
            belted("6", InjurySeverity::Fatal, SeatbeltUse::Unknown),
        ];
        let crosstab = seatbelt_crosstab(&refs(&records));

        for row in &crosstab.share_rows {
            assert!((row.no_belt_pct + row.belt_pct - 100.0).abs() < 1e-9);
        }
        // Fatal rows are 2/3 without a belt, minor rows 1/2.
        assert_eq!(crosstab.share_rows[0].injury, "Fatal");

        // Count view is sorted by row total ascending.
        let totals: Vec<usize> = crosstab.count_rows.iter().map(|r| r.total).collect();
        assert_eq!(totals, vec![2, 3]);

        let no_belt = &crosstab.fatality_rows[0];
        assert_eq!(no_belt.participants, 3);
        assert_eq!(no_belt.fatalities, 2);
        assert!((no_belt.fatality_pct - 200.0 / 3.0).abs() < 1e-9);
        let belt = &crosstab.fatality_rows[1];
        assert_eq!(belt.participants, 2);
        assert_eq!(belt.fatalities, 1);
        assert!((belt.fatality_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn gender_split_excludes_sentinels_and_restricts_to_perpetrators() {
        let mut m = rec("1", 2015);
        m.gender = Some(Gender::Male);
        m.role = ParticipantRole::Perpetrator;
        let mut f = rec("2", 2015);
        f.gender = Some(Gender::Female);
        f.role = ParticipantRole::Perpetrator;
        let mut m2 = rec("3", 2015);
        m2.gender = Some(Gender::Male);
        m2.role = ParticipantRole::Perpetrator;
        let mut unknown = rec("4", 2015); // gender sentinel, must stay out
        unknown.role = ParticipantRole::Perpetrator;
        let mut passenger = rec("5", 2015);
        passenger.gender = Some(Gender::Female);

        let records = vec![m, f, m2, unknown, passenger];
        let split = gender_split(&refs(&records), true);

        assert_eq!(split[0].gender, "Male");
        assert_eq!(split[0].participants, 2);
        assert_eq!(split[1].participants, 1);
        assert!((split[0].share_pct - 200.0 / 3.0).abs() < 1e-9);

        let unrestricted = gender_split(&refs(&records), false);
        assert_eq!(unrestricted[1].participants, 2);
    }

    #[test]
    fn cause_by_gender_preserves_frequency_order() {
        let mut records = Vec::new();
        for i in 0..3 {
            let mut r = rec(&format!("m{}", i), 2015);
            r.role = ParticipantRole::Perpetrator;
            r.gender = Some(Gender::Male);
            r.cause = "HITROST".to_string();
            records.push(r);
        }
        for i in 0..5 {
            let mut r = rec(&format!("f{}", i), 2015);
            r.role = ParticipantRole::Perpetrator;
            r.gender = Some(Gender::Female);
            r.cause = "PREDNOST".to_string();
            records.push(r);
        }

        let table = cause_by_gender(&refs(&records), 10);
        assert_eq!(table[0].cause, "PREDNOST");
        assert_eq!(table[0].female, 5);
        assert_eq!(table[0].male, 0);
        assert_eq!(table[1].cause, "HITROST");
        assert_eq!(table[1].male, 3);
    }

    fn dated(id: &str, month: u32, cause: &str) -> AccidentRecord {
        let mut r = rec(id, 2015);
        r.date = NaiveDate::from_ymd_opt(2015, month, 15);
        r.cause = cause.to_string();
        r
    }

    #[test]
    fn seasonal_trend_is_season_ordered_and_zero_filled() {
        let records = vec![
            dated("1", 1, "HITROST"),
            dated("2", 2, "HITROST"),
            dated("3", 7, "HITROST"),
            dated("4", 7, "PREDNOST"),
            dated("5", 10, "PREDNOST"),
            // No date: excluded from the seasonal view.
            {
                let mut r = rec("6", 2015);
                r.cause = "HITROST".to_string();
                r
            },
        ];
        let trend = seasonal_trend(&refs(&records), 2);

        // 2 causes x 4 seasons, zero-filled.
        assert_eq!(trend.len(), 8);
        assert_eq!(trend[0].season, "Spring");
        assert_eq!(trend[0].cause, "HITROST");
        assert_eq!(trend[0].accidents, 0);

        let lookup = |season: &str, cause: &str| {
            trend
                .iter()
                .find(|r| r.season == season && r.cause == cause)
                .map(|r| r.accidents)
                .unwrap()
        };
        assert_eq!(lookup("Winter", "HITROST"), 2);
        assert_eq!(lookup("Summer", "HITROST"), 1);
        assert_eq!(lookup("Summer", "PREDNOST"), 1);
        assert_eq!(lookup("Autumn", "PREDNOST"), 1);
        assert_eq!(lookup("Autumn", "HITROST"), 0);
    }

    #[test]
    fn seasonal_trend_restricts_to_top_causes() {
        let records = vec![
            dated("1", 4, "HITROST"),
            dated("2", 5, "HITROST"),
            dated("3", 6, "PREDNOST"),
        ];
        let trend = seasonal_trend(&refs(&records), 1);
        assert!(trend.iter().all(|r| r.cause == "HITROST"));
    }

    #[test]
    fn young_driver_summary_measures_the_first_bucket() {
        let mut records = vec![aged("1", 19), aged("2", 24), aged("3", 40)];
        for r in &mut records {
            r.role = ParticipantRole::Perpetrator;
        }
        let perpetrators = refs(&records);
        let summary = young_driver_summary(&perpetrators);

        assert_eq!(summary.young_perpetrators, 2);
        assert_eq!(summary.all_perpetrators, 3);
        assert!((summary.mean_young_age - 21.5).abs() < 1e-9);
        assert!((summary.young_share_pct - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn distinct_values_are_sorted_and_deduplicated() {
        let mut a = rec("1", 2015);
        a.admin_unit = "MARIBOR".to_string();
        let mut b = rec("2", 2015);
        b.admin_unit = "CELJE".to_string();
        let mut c = rec("3", 2015);
        c.admin_unit = "MARIBOR".to_string();
        let records = vec![a, b, c];
        assert_eq!(
            distinct_values(&refs(&records), CategoryField::AdminUnit),
            vec!["CELJE".to_string(), "MARIBOR".to_string()]
        );
    }
}
