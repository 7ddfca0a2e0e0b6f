//! File classification by filename token or header column set

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Record type of an import file.
///
/// Variant order is the processing order of a batch: later kinds look up
/// entities created by earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvFileKind {
    Customer,
    Device,
    Job,
    Assignment,
    Measurement,
    Moisture,
    Insulation,
    Activity,
    Report,
}

impl CsvFileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CsvFileKind::Customer => "customer",
            CsvFileKind::Device => "device",
            CsvFileKind::Job => "job",
            CsvFileKind::Assignment => "assignment",
            CsvFileKind::Measurement => "measurement",
            CsvFileKind::Moisture => "moisture",
            CsvFileKind::Insulation => "insulation",
            CsvFileKind::Activity => "activity",
            CsvFileKind::Report => "report",
        }
    }
}

impl fmt::Display for CsvFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export vintage; decides defaults for columns the file does not carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    SwissAirDry,
    FirstDry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: CsvFileKind,
    pub format: SourceFormat,
}

/// Filename tokens of the current exports, checked in order
const FILENAME_TOKENS: &[(&str, CsvFileKind)] = &[
    ("GERAETESTANDORTWECHSELPROTOKOLL", CsvFileKind::Assignment),
    ("GERAETESTAMMVERZEICHNISS", CsvFileKind::Device),
    ("KUNDENSTAMM", CsvFileKind::Customer),
    ("AUFTRAGSPROTOKOLL", CsvFileKind::Job),
    ("MESSPROTOKOLLWERTERFASSUNG", CsvFileKind::Activity),
    ("MESSWERTERFASSUNGEN", CsvFileKind::Activity),
];

/// Required column sets, checked in priority order
const COLUMN_SETS: &[(CsvFileKind, &[&str])] = &[
    (CsvFileKind::Customer, &["UID", "Firma", "Vorname", "Nachname"]),
    (CsvFileKind::Device, &["Gerätenummer", "Kategorie", "Name"]),
    (CsvFileKind::Measurement, &["UID", "Gerätenummer", "Auftragsnummer", "Zählerstand kWh"]),
    (CsvFileKind::Assignment, &["Gerätenummer", "Auftragsnummer", "Datum"]),
    (CsvFileKind::Insulation, &["Auftragsnummer", "Referenz %"]),
    (CsvFileKind::Moisture, &["Auftragsnummer", "Baustoff"]),
    (CsvFileKind::Report, &["Auftragsnummer", "Bild 1"]),
    (CsvFileKind::Activity, &["Auftragsnummer", "Mitarbeiter"]),
    (CsvFileKind::Job, &["Auftragsnummer", "Schadensart"]),
];

const LEGACY_PREFIX: &str = "FIRSTDRY_";

static LEGACY_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(\d)_").unwrap());

/// Classify a file; `None` means unknown
pub fn classify(filename: &str, headers: &[String]) -> Option<Classification> {
    let format = source_format(filename);
    classify_by_name(filename)
        .or_else(|| classify_by_columns(headers))
        .map(|kind| Classification { kind, format })
}

fn source_format(filename: &str) -> SourceFormat {
    if filename.to_uppercase().contains(LEGACY_PREFIX) {
        SourceFormat::FirstDry
    } else {
        SourceFormat::SwissAirDry
    }
}

pub fn classify_by_name(filename: &str) -> Option<CsvFileKind> {
    let upper = filename.to_uppercase();

    if let Some((_, kind)) = FILENAME_TOKENS.iter().find(|(token, _)| upper.contains(token)) {
        return Some(*kind);
    }

    if upper.contains(LEGACY_PREFIX) {
        return match LEGACY_SUFFIX_RE.captures(&upper) {
            None => Some(CsvFileKind::Job),
            Some(caps) => match &caps[1] {
                "1" => Some(CsvFileKind::Customer),
                "3" => Some(CsvFileKind::Activity),
                "4" => Some(CsvFileKind::Report),
                "5" => Some(CsvFileKind::Device),
                "6" => Some(CsvFileKind::Measurement),
                "8" => Some(CsvFileKind::Moisture),
                "9" => Some(CsvFileKind::Insulation),
                _ => None,
            },
        };
    }

    None
}

pub fn classify_by_columns(headers: &[String]) -> Option<CsvFileKind> {
    COLUMN_SETS
        .iter()
        .find(|(_, required)| required.iter().all(|col| headers.iter().any(|h| h == col)))
        .map(|(kind, _)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_token_wins_regardless_of_columns() {
        let cols = headers(&["Nachname", "UID", "Vorname", "Firma"]);
        assert_eq!(
            classify("2025_KUNDENSTAMM.csv", &cols).map(|c| c.kind),
            Some(CsvFileKind::Customer)
        );
        // Token even overrides a column set of another kind
        let device_cols = headers(&["Gerätenummer", "Kategorie", "Name"]);
        assert_eq!(classify_by_name("export_KUNDENSTAMM.csv"), Some(CsvFileKind::Customer));
        assert_eq!(
            classify("export_KUNDENSTAMM.csv", &device_cols).map(|c| c.kind),
            Some(CsvFileKind::Customer)
        );
    }

    #[test]
    fn test_unknown_name_with_device_columns() {
        let cols = headers(&["Name", "Kategorie", "Gerätenummer", "Preis pro Tag"]);
        let classification = classify("geraete.csv", &cols).unwrap();
        assert_eq!(classification.kind, CsvFileKind::Device);
        assert_eq!(classification.format, SourceFormat::SwissAirDry);
    }

    #[test]
    fn test_assignment_token_checked_before_device_token() {
        assert_eq!(
            classify_by_name("GERAETESTANDORTWECHSELPROTOKOLL.csv"),
            Some(CsvFileKind::Assignment)
        );
        assert_eq!(classify_by_name("GERAETESTAMMVERZEICHNISS.csv"), Some(CsvFileKind::Device));
        assert_eq!(classify_by_name("MESSWERTERFASSUNGEN.csv"), Some(CsvFileKind::Activity));
    }

    #[test]
    fn test_legacy_suffixes() {
        assert_eq!(classify_by_name("FirstDry_2024_1_Kunden.csv"), Some(CsvFileKind::Customer));
        assert_eq!(classify_by_name("FirstDry_5_Geraete.csv"), Some(CsvFileKind::Device));
        assert_eq!(classify_by_name("FirstDry_6_Einsaetze.csv"), Some(CsvFileKind::Measurement));
        assert_eq!(classify_by_name("FirstDry_9_Daemmschicht.csv"), Some(CsvFileKind::Insulation));
        assert_eq!(classify_by_name("FirstDry_Auftraege.csv"), Some(CsvFileKind::Job));
        assert_eq!(classify_by_name("FirstDry_7_Sonstiges.csv"), None);
    }

    #[test]
    fn test_legacy_format_flag() {
        let classification = classify("FirstDry_5_Geraete.csv", &[]).unwrap();
        assert_eq!(classification.format, SourceFormat::FirstDry);

        // Marker may follow an export prefix
        let prefixed = classify("Export_FirstDry_1_x.csv", &[]).unwrap();
        assert_eq!(prefixed.kind, CsvFileKind::Customer);
        assert_eq!(prefixed.format, SourceFormat::FirstDry);
    }

    #[test]
    fn test_column_priority_resolves_ambiguity() {
        // Matches both the measurement and the assignment set
        let cols = headers(&["UID", "Gerätenummer", "Auftragsnummer", "Zählerstand kWh", "Datum"]);
        assert_eq!(classify_by_columns(&cols), Some(CsvFileKind::Measurement));

        let cols = headers(&["Auftragsnummer", "Baustoff", "Mitarbeiter"]);
        assert_eq!(classify_by_columns(&cols), Some(CsvFileKind::Moisture));
    }

    #[test]
    fn test_unknown_file() {
        assert_eq!(classify("notizen.csv", &headers(&["Spalte A", "Spalte B"])), None);
    }

    #[test]
    fn test_kind_order_is_processing_order() {
        let mut kinds = vec![
            CsvFileKind::Report,
            CsvFileKind::Job,
            CsvFileKind::Activity,
            CsvFileKind::Customer,
            CsvFileKind::Assignment,
            CsvFileKind::Device,
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                CsvFileKind::Customer,
                CsvFileKind::Device,
                CsvFileKind::Job,
                CsvFileKind::Assignment,
                CsvFileKind::Activity,
                CsvFileKind::Report,
            ]
        );
    }
}
