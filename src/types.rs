use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// Raw accident row as it appears in the police export. Column names are
/// the fixed contract with the upstream dataset; everything is optional
/// text at this stage and gets cleaned in the loader.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "ZaporednaStevilkaPN")]
    pub accident_id: Option<String>,
    #[serde(rename = "Leto")]
    pub year: Option<String>,
    #[serde(rename = "DatumPN")]
    pub date: Option<String>,
    #[serde(rename = "UpravnaEnotaStoritve")]
    pub admin_unit: Option<String>,
    #[serde(rename = "TekstCesteNaselja")]
    pub road_name: Option<String>,
    #[serde(rename = "TekstOdsekaUlice")]
    pub segment_name: Option<String>,
    #[serde(rename = "TipNesrece")]
    pub accident_type: Option<String>,
    #[serde(rename = "VzrokNesrece")]
    pub cause: Option<String>,
    #[serde(rename = "Povzrocitelj")]
    pub role: Option<String>,
    #[serde(rename = "Spol")]
    pub gender: Option<String>,
    #[serde(rename = "Starost")]
    pub age: Option<String>,
    #[serde(rename = "PoskodbaUdelezenca")]
    pub injury: Option<String>,
    #[serde(rename = "UporabaVarnostnegaPasu")]
    pub seatbelt: Option<String>,
    #[serde(rename = "VrednostAlkotesta")]
    pub alcohol: Option<String>,
    // The export stores the D96/TM northing in GeoKoordinataX and the
    // easting in GeoKoordinataY.
    #[serde(rename = "GeoKoordinataX")]
    pub geo_x: Option<String>,
    #[serde(rename = "GeoKoordinataY")]
    pub geo_y: Option<String>,
}

/// One participant-in-accident, cleaned and typed. Several rows share one
/// `accident_id` (one per participant).
#[derive(Debug, Clone)]
pub struct AccidentRecord {
    pub accident_id: String,
    pub year: i32,
    pub date: Option<NaiveDate>,
    pub admin_unit: String,
    pub road_name: String,
    pub segment_name: String,
    pub accident_type: String,
    pub cause: String,
    pub role: ParticipantRole,
    pub gender: Option<Gender>,
    pub age: Option<i32>,
    pub injury: Option<InjurySeverity>,
    pub seatbelt: SeatbeltUse,
    /// Breath-alcohol reading; unparseable cells degrade to 0.0.
    pub alcohol: f64,
    /// D96/TM easting (from GeoKoordinataY), metres.
    pub easting: Option<f64>,
    /// D96/TM northing (from GeoKoordinataX), metres.
    pub northing: Option<f64>,
}

/// One named road segment with its annual average daily traffic count.
#[derive(Debug, Clone)]
pub struct RoadVolumeRecord {
    pub segment_name: String,
    pub aadt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Perpetrator,
    Participant,
}

impl ParticipantRole {
    pub fn parse(s: &str) -> Self {
        if s.trim() == "POVZROČITELJ" {
            ParticipantRole::Perpetrator
        } else {
            ParticipantRole::Participant
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Sentinel values (unknown / no data) map to `None` and are excluded
    /// from every gender breakdown.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "MOŠKI" => Some(Gender::Male),
            "ŽENSKI" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjurySeverity {
    NoInjury,
    Minor,
    Severe,
    Fatal,
}

impl InjurySeverity {
    pub const ALL: [InjurySeverity; 4] = [
        InjurySeverity::NoInjury,
        InjurySeverity::Minor,
        InjurySeverity::Severe,
        InjurySeverity::Fatal,
    ];

    /// Fuzzy match on the export's wording; the files are inconsistent
    /// between "LAŽJA" and "LAHKA" for minor injuries, so we key on the
    /// stable parts of each phrase. Unknown wording maps to `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if s.contains("SMRT") {
            Some(InjurySeverity::Fatal)
        } else if s.contains("HUDA") {
            Some(InjurySeverity::Severe)
        } else if s.contains("BREZ") {
            Some(InjurySeverity::NoInjury)
        } else if s.contains("TELESNA") {
            Some(InjurySeverity::Minor)
        } else {
            None
        }
    }
}

impl fmt::Display for InjurySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InjurySeverity::NoInjury => "No injury",
            InjurySeverity::Minor => "Minor injury",
            InjurySeverity::Severe => "Severe injury",
            InjurySeverity::Fatal => "Fatal",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatbeltUse {
    Yes,
    No,
    Unknown,
}

impl SeatbeltUse {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "DA" => SeatbeltUse::Yes,
            "NE" => SeatbeltUse::No,
            _ => SeatbeltUse::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Display and aggregation order for seasonal tables.
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn index(self) -> usize {
        Season::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Aggregation output rows. Plain labeled values: `Serialize` drives the CSV
// export, `Tabled` the console preview. Percentages stay numeric so callers
// (and tests) can do arithmetic on them; the preview formats to two decimals.
// ---------------------------------------------------------------------------

fn fmt_pct(v: &f64) -> String {
    format!("{:.2}", v)
}

fn fmt_whole(v: &f64) -> String {
    crate::util::format_number(*v, 0)
}

fn fmt_coord(v: &f64) -> String {
    format!("{:.6}", v)
}

/// A reprojected accident location in geographic coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct GeoPointRow {
    #[serde(rename = "Latitude")]
    #[tabled(rename = "Latitude", display_with = "fmt_coord")]
    pub lat: f64,
    #[serde(rename = "Longitude")]
    #[tabled(rename = "Longitude", display_with = "fmt_coord")]
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SegmentCountRow {
    #[serde(rename = "Segment")]
    #[tabled(rename = "Segment")]
    pub label: String,
    #[serde(rename = "Accidents")]
    #[tabled(rename = "Accidents")]
    pub accidents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SegmentRateRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Segment")]
    #[tabled(rename = "Segment")]
    pub segment: String,
    #[serde(rename = "Accidents")]
    #[tabled(rename = "Accidents")]
    pub accidents: usize,
    #[serde(rename = "AADT")]
    #[tabled(rename = "AADT", display_with = "fmt_whole")]
    pub aadt: f64,
    /// Accidents per million vehicle-passages.
    #[serde(rename = "RatePerMillion")]
    #[tabled(rename = "RatePerMillion", display_with = "fmt_pct")]
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CategoryCountRow {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub value: String,
    #[serde(rename = "Accidents")]
    #[tabled(rename = "Accidents")]
    pub accidents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct AgeGroupRow {
    #[serde(rename = "AgeGroup")]
    #[tabled(rename = "AgeGroup")]
    pub age_group: String,
    #[serde(rename = "Accidents")]
    #[tabled(rename = "Accidents")]
    pub accidents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct AlcoholTierRow {
    #[serde(rename = "Tier")]
    #[tabled(rename = "Tier")]
    pub tier: String,
    #[serde(rename = "Participants")]
    #[tabled(rename = "Participants")]
    pub participants: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct", display_with = "fmt_pct")]
    pub share_pct: f64,
}

/// Result of the accident-id based injury attribution: how many injuries of
/// a given severity happened in accidents whose perpetrator satisfied the
/// condition, vs. the rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InjuryAttribution {
    pub attributed: usize,
    pub other: usize,
    pub attributed_share_pct: f64,
    pub other_share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SeatbeltShareRow {
    #[serde(rename = "Injury")]
    #[tabled(rename = "Injury")]
    pub injury: String,
    #[serde(rename = "NoBeltPct")]
    #[tabled(rename = "NoBeltPct", display_with = "fmt_pct")]
    pub no_belt_pct: f64,
    #[serde(rename = "BeltPct")]
    #[tabled(rename = "BeltPct", display_with = "fmt_pct")]
    pub belt_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SeatbeltCountRow {
    #[serde(rename = "Injury")]
    #[tabled(rename = "Injury")]
    pub injury: String,
    #[serde(rename = "NoBelt")]
    #[tabled(rename = "NoBelt")]
    pub no_belt: usize,
    #[serde(rename = "Belt")]
    #[tabled(rename = "Belt")]
    pub belt: usize,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SeatbeltFatalityRow {
    #[serde(rename = "Seatbelt")]
    #[tabled(rename = "Seatbelt")]
    pub seatbelt: String,
    #[serde(rename = "Participants")]
    #[tabled(rename = "Participants")]
    pub participants: usize,
    #[serde(rename = "Fatalities")]
    #[tabled(rename = "Fatalities")]
    pub fatalities: usize,
    #[serde(rename = "FatalityPct")]
    #[tabled(rename = "FatalityPct", display_with = "fmt_pct")]
    pub fatality_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct GenderShareRow {
    #[serde(rename = "Gender")]
    #[tabled(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Participants")]
    #[tabled(rename = "Participants")]
    pub participants: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct", display_with = "fmt_pct")]
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CauseGenderRow {
    #[serde(rename = "Cause")]
    #[tabled(rename = "Cause")]
    pub cause: String,
    #[serde(rename = "Male")]
    #[tabled(rename = "Male")]
    pub male: usize,
    #[serde(rename = "Female")]
    #[tabled(rename = "Female")]
    pub female: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SeasonCauseRow {
    #[serde(rename = "Season")]
    #[tabled(rename = "Season")]
    pub season: String,
    #[serde(rename = "Cause")]
    #[tabled(rename = "Cause")]
    pub cause: String,
    #[serde(rename = "Accidents")]
    #[tabled(rename = "Accidents")]
    pub accidents: usize,
}

/// Scalar summary for the young-driver view, exported as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YoungDriverSummary {
    pub young_perpetrators: usize,
    pub all_perpetrators: usize,
    pub mean_young_age: f64,
    pub young_share_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_matches_perpetrator_only() {
        assert_eq!(ParticipantRole::parse("POVZROČITELJ"), ParticipantRole::Perpetrator);
        assert_eq!(ParticipantRole::parse("UDELEŽENEC"), ParticipantRole::Participant);
        assert_eq!(ParticipantRole::parse(""), ParticipantRole::Participant);
    }

    #[test]
    fn gender_sentinels_are_none() {
        assert_eq!(Gender::parse("MOŠKI"), Some(Gender::Male));
        assert_eq!(Gender::parse("ŽENSKI"), Some(Gender::Female));
        assert_eq!(Gender::parse("NEZNANO"), None);
        assert_eq!(Gender::parse("NI PODATKA"), None);
    }

    #[test]
    fn injury_parsing_handles_both_spellings() {
        assert_eq!(InjurySeverity::parse("BREZ POŠKODBE"), Some(InjurySeverity::NoInjury));
        assert_eq!(InjurySeverity::parse("LAŽJA TELESNA POŠKODBA"), Some(InjurySeverity::Minor));
        assert_eq!(InjurySeverity::parse("LAHKA TELESNA POŠKODBA"), Some(InjurySeverity::Minor));
        assert_eq!(InjurySeverity::parse("HUDA TELESNA POŠKODBA"), Some(InjurySeverity::Severe));
        assert_eq!(InjurySeverity::parse("SMRT"), Some(InjurySeverity::Fatal));
        assert_eq!(InjurySeverity::parse("NI PODATKA"), None);
    }

    #[test]
    fn seatbelt_unknown_fallback() {
        assert_eq!(SeatbeltUse::parse("DA"), SeatbeltUse::Yes);
        assert_eq!(SeatbeltUse::parse("NE"), SeatbeltUse::No);
        assert_eq!(SeatbeltUse::parse("NEZNANO"), SeatbeltUse::Unknown);
        assert_eq!(SeatbeltUse::parse(""), SeatbeltUse::Unknown);
    }

    #[test]
    fn season_mapping_is_fixed() {
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(5), Season::Spring);
        assert_eq!(Season::from_month(6), Season::Summer);
        assert_eq!(Season::from_month(8), Season::Summer);
        assert_eq!(Season::from_month(9), Season::Autumn);
        assert_eq!(Season::from_month(11), Season::Autumn);
    }
}
