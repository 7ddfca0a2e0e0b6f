//! Free-text records: material moisture, insulation layer, activities and
//! image documentation.
//!
//! These rows have no normalized target columns. Each row becomes one
//! structured SystemLog entry (never deduplicated), except report rows which
//! extend one report per job and day.

use anyhow::Result;
use chrono::{DateTime, NaiveTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::parse::{display_number, parse_decimal};
use super::reader::CsvRow;
use super::resolve::row_date;
use super::store::ImportStore;
use super::ImportStats;
use crate::types::{Job, Report, ReportImage, SystemLog};

const MOISTURE_SOURCE: &str = "CSV Import: Baustofffeuchte-Messung";
const INSULATION_SOURCE: &str = "CSV Import: Dämmschichtmessung";
const ACTIVITY_SOURCE: &str = "CSV Import: Aktivitäten";

const MOISTURE_FIELDS: &[(&str, &str)] = &[
    ("Digits tiefster Wert", "Digits (min)"),
    ("Digits Mittelwert", "Digits (Mittel)"),
    ("Digits höchster Wert", "Digits (max)"),
    ("% tiefster Wert", "Feuchtigkeit % (min)"),
    ("% Mittelwert", "Feuchtigkeit % (Mittel)"),
    ("% höchster Wert", "Feuchtigkeit % (max)"),
    ("Temperatur", "Temperatur °C"),
    ("Luftfeuchtigkeit", "Luftfeuchtigkeit %"),
];

const INSULATION_REFERENCE_FIELDS: &[(&str, &str)] = &[
    ("Referenz %", "Referenz Feuchtigkeit %"),
    ("Referenz °C", "Referenz Temperatur °C"),
    ("Referenz g/m3", "Referenz Absolutfeuchte g/m³"),
];

const INSULATION_BOREHOLES: usize = 20;

/// Hour columns of the activity sheets
const ACTIVITY_FIELDS: &[&str] = &[
    "Schadenaufnahme",
    "Messung/Kontrolle",
    "Sofortmassnahmen",
    "Leckortung",
    "Montage",
    "Demontage",
    "Wassersaugen",
    "Fahrzeit",
    "Bericht",
    "Bauleitung",
    "Schimmelbehandlung",
    "Abdeckarbeiten",
    "Besprechung",
    "Endabnahme",
    "Bauprogramm",
    "Abbruch",
];

const REPORT_IMAGE_COLUMNS: usize = 3;
const DRAWING_COLUMN: &str = "Zeichnung 1";
const DRAWING_SORT_ORDER: i32 = 10;

/// Job referenced by the row; `None` when the row is skipped
async fn resolve_job(store: &dyn ImportStore, row: &CsvRow, stats: &mut ImportStats) -> Result<Option<Job>> {
    let Some(job_number) = row.get("Auftragsnummer") else {
        stats.rows_skipped += 1;
        return Ok(None);
    };
    let job = store.find_job_by_number(job_number).await?;
    if job.is_none() {
        stats.warn(row.line, format!("Auftrag {} nicht gefunden", job_number));
        stats.rows_skipped += 1;
    }
    Ok(job)
}

fn row_timestamp(row: &CsvRow, stats: &mut ImportStats) -> DateTime<Utc> {
    row_date(row, "Datum", stats)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or_else(Utc::now)
}

async fn append_log(
    store: &dyn ImportStore,
    source: &str,
    job: &Job,
    message: String,
    timestamp: DateTime<Utc>,
    stats: &mut ImportStats,
) -> Result<()> {
    let log = SystemLog::info(source, Some(job.id), message, timestamp);
    store.insert_system_log(&log).await?;
    stats.system_logs_created += 1;
    Ok(())
}

pub(crate) fn moisture_message(row: &CsvRow, job_number: &str) -> String {
    let mut message = format!("Baustofffeuchtemessung für Auftrag {}", job_number);
    for (column, label) in [("Baustoff", "Baustoff"), ("Ort", "Ort"), ("Stelle", "Stelle")] {
        if let Some(value) = row.get(column) {
            message.push_str(&format!("\n{}: {}", label, value));
        }
    }
    for (column, label) in MOISTURE_FIELDS {
        if let Some(value) = row.get(column) {
            message.push_str(&format!("\n{}: {}", label, display_number(value)));
        }
    }
    if let Some(remarks) = row.get("Bemerkungen") {
        message.push_str(&format!("\n\nBemerkungen: {}", remarks));
    }
    if let Some(recorder) = row.get("Erfasser") {
        message.push_str(&format!("\n\nErfasser: {}", recorder));
    }
    message
}

pub(crate) fn insulation_message(row: &CsvRow, job_number: &str) -> String {
    let mut message = format!("Dämmschichtmessung für Auftrag {}", job_number);
    if let Some(kind) = row.get("Art") {
        message.push_str(&format!("\nDämmstoffart: {}", kind));
    }
    if let Some(place) = row.get("Ort") {
        message.push_str(&format!("\nOrt: {}", place));
    }
    for (column, label) in INSULATION_REFERENCE_FIELDS {
        if let Some(value) = row.get(column) {
            message.push_str(&format!("\n{}: {}", label, display_number(value)));
        }
    }
    for i in 1..=INSULATION_BOREHOLES {
        let humidity = row.get(&format!("Bohrung {} %", i));
        let temperature = row.get(&format!("Bohrung {} °C", i));
        // A borehole needs both readings
        let (Some(humidity), Some(temperature)) = (humidity, temperature) else {
            continue;
        };
        message.push_str(&format!("\n\nBohrung {}:", i));
        message.push_str(&format!("\n  Feuchtigkeit: {}%", display_number(humidity)));
        message.push_str(&format!("\n  Temperatur: {}°C", display_number(temperature)));
        if let Some(absolute) = row.get(&format!("Bohrung {} g/m3", i)) {
            message.push_str(&format!("\n  Absolutfeuchte: {} g/m³", display_number(absolute)));
        }
    }
    if let Some(recorder) = row.get("Erfasser") {
        message.push_str(&format!("\n\nErfasser: {}", recorder));
    }
    if let Some(remarks) = row.get("Bemerkungen") {
        message.push_str(&format!("\n\nBemerkungen: {}", remarks));
    }
    message
}

/// `None` when the row lists no positive hours
pub(crate) fn activity_message(row: &CsvRow, job_number: &str) -> Option<String> {
    let activities: Vec<String> = ACTIVITY_FIELDS
        .iter()
        .filter_map(|field| {
            let hours = row.get(field).and_then(parse_decimal)?;
            (hours > 0.0).then(|| format!("{}: {}h", field, hours))
        })
        .collect();
    if activities.is_empty() {
        return None;
    }

    let mut message = format!("Aktivitäten für Auftrag {}", job_number);
    if let Some(employee) = row.get("Mitarbeiter") {
        message.push_str(&format!("\nMitarbeiter: {}", employee));
    }
    message.push_str("\n\n");
    message.push_str(&activities.join("\n"));
    if let Some(remarks) = row.get("Bemerkungen") {
        message.push_str(&format!("\n\nBemerkungen: {}", remarks));
    }
    Some(message)
}

pub async fn import_moisture(store: &dyn ImportStore, row: &CsvRow, stats: &mut ImportStats) -> Result<()> {
    let Some(job) = resolve_job(store, row, stats).await? else {
        return Ok(());
    };
    let timestamp = row_timestamp(row, stats);
    let message = moisture_message(row, &job.job_number);
    append_log(store, MOISTURE_SOURCE, &job, message, timestamp, stats).await
}

pub async fn import_insulation(store: &dyn ImportStore, row: &CsvRow, stats: &mut ImportStats) -> Result<()> {
    let Some(job) = resolve_job(store, row, stats).await? else {
        return Ok(());
    };
    let timestamp = row_timestamp(row, stats);
    let message = insulation_message(row, &job.job_number);
    append_log(store, INSULATION_SOURCE, &job, message, timestamp, stats).await
}

pub async fn import_activity(store: &dyn ImportStore, row: &CsvRow, stats: &mut ImportStats) -> Result<()> {
    let Some(job) = resolve_job(store, row, stats).await? else {
        return Ok(());
    };
    let Some(message) = activity_message(row, &job.job_number) else {
        stats.rows_skipped += 1;
        return Ok(());
    };
    let timestamp = row_timestamp(row, stats);
    append_log(store, ACTIVITY_SOURCE, &job, message, timestamp, stats).await
}

/// Image documentation row: one report per (job, day), each image path once
pub async fn import_report(store: &dyn ImportStore, row: &CsvRow, stats: &mut ImportStats) -> Result<()> {
    let mut images: Vec<(String, String, i32)> = (1..=REPORT_IMAGE_COLUMNS)
        .filter_map(|i| {
            row.get(&format!("Bild {}", i))
                .map(|path| (path.to_string(), format!("Bild {}", i), i as i32))
        })
        .collect();
    if let Some(drawing) = row.get(DRAWING_COLUMN) {
        images.push((drawing.to_string(), "Zeichnung".to_string(), DRAWING_SORT_ORDER));
    }
    if images.is_empty() {
        stats.rows_skipped += 1;
        return Ok(());
    }

    let Some(job) = resolve_job(store, row, stats).await? else {
        return Ok(());
    };
    let report_date = row_date(row, "Datum", stats).unwrap_or_else(|| Utc::now().date_naive());

    let mut content = "Automatisch importierte Bilddokumentation".to_string();
    if let Some(remarks) = row.get("Bemerkungen") {
        content.push_str(&format!("\n\nBemerkungen: {}", remarks));
    }

    let report = match store.find_report(job.id, report_date).await? {
        Some(mut report) => {
            let merged = match report.content.as_deref() {
                Some(existing) if existing.contains(&content) => None,
                Some(existing) => Some(format!("{}\n\n---\n\n{}", existing, content)),
                None => Some(content),
            };
            if let Some(merged) = merged {
                report.content = Some(merged);
                report.updated_at = Some(Utc::now());
                store.update_report(&report).await?;
                stats.reports_updated += 1;
            }
            report
        }
        None => {
            let report = Report {
                id: Uuid::new_v4(),
                job_id: job.id,
                title: format!("Bilddokumentation für Auftrag {}", job.job_number),
                content: Some(content),
                report_type: "regular".to_string(),
                report_date,
                created_at: Utc::now(),
                updated_at: None,
            };
            store.insert_report(&report).await?;
            stats.reports_created += 1;
            report
        }
    };

    for (path, caption, sort_order) in images {
        if store.report_image_exists(report.id, &path).await? {
            continue;
        }
        let image = ReportImage {
            id: Uuid::new_v4(),
            report_id: report.id,
            image_path: path,
            caption,
            sort_order,
            created_at: Utc::now(),
        };
        store.insert_report_image(&image).await?;
        stats.images_attached += 1;
    }
    debug!("Report rows imported for job {}", job.job_number);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::import::memory::MemoryStore;
    use crate::services::import::resolve::import_job;

    async fn store_with_job() -> (MemoryStore, ImportStats) {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        let row = CsvRow::from_pairs(&[("Auftragsnummer", "A-100"), ("Schadensart", "Wasserschaden")]);
        import_job(&store, &row, &mut stats).await.unwrap();
        (store, stats)
    }

    #[test]
    fn test_moisture_message_label_order() {
        let row = CsvRow::from_pairs(&[
            ("Auftragsnummer", "A-100"),
            ("Stelle", "Wand Nord"),
            ("Baustoff", "Beton"),
            ("% Mittelwert", "4,2"),
            ("Digits tiefster Wert", "38"),
            ("Erfasser", "M. Meier"),
        ]);
        assert_eq!(
            moisture_message(&row, "A-100"),
            "Baustofffeuchtemessung für Auftrag A-100\nBaustoff: Beton\nStelle: Wand Nord\n\
             Digits (min): 38\nFeuchtigkeit % (Mittel): 4.2\n\nErfasser: M. Meier"
        );
    }

    #[test]
    fn test_insulation_message_lists_complete_boreholes() {
        let row = CsvRow::from_pairs(&[
            ("Art", "EPS"),
            ("Referenz %", "55"),
            ("Bohrung 1 %", "80"),
            ("Bohrung 1 °C", "19,5"),
            ("Bohrung 1 g/m3", "13"),
            ("Bohrung 2 %", "70"),
        ]);
        let message = insulation_message(&row, "A-100");
        assert!(message.contains("\nDämmstoffart: EPS"));
        assert!(message.contains("\nReferenz Feuchtigkeit %: 55"));
        assert!(message.contains("\n\nBohrung 1:\n  Feuchtigkeit: 80%\n  Temperatur: 19.5°C\n  Absolutfeuchte: 13 g/m³"));
        assert!(!message.contains("Bohrung 2"));
    }

    #[test]
    fn test_activity_message_only_positive_hours() {
        let row = CsvRow::from_pairs(&[
            ("Mitarbeiter", "P. Keller"),
            ("Montage", "1,5"),
            ("Fahrzeit", "0"),
            ("Bericht", "abc"),
            ("Leckortung", "2"),
        ]);
        assert_eq!(
            activity_message(&row, "A-100").unwrap(),
            "Aktivitäten für Auftrag A-100\nMitarbeiter: P. Keller\n\nLeckortung: 2h\nMontage: 1.5h"
        );
        assert_eq!(activity_message(&CsvRow::from_pairs(&[("Fahrzeit", "0")]), "A-100"), None);
    }

    #[tokio::test]
    async fn test_free_text_logs_duplicate_on_reimport() {
        let (store, mut stats) = store_with_job().await;
        let row = CsvRow::from_pairs(&[("Auftragsnummer", "A-100"), ("Baustoff", "Estrich"), ("Datum", "10.04.2025")]);
        import_moisture(&store, &row, &mut stats).await.unwrap();
        import_moisture(&store, &row, &mut stats).await.unwrap();

        let logs = store.snapshot().system_logs;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].source, MOISTURE_SOURCE);
        assert_eq!(logs[0].timestamp.date_naive().to_string(), "2025-04-10");
    }

    #[tokio::test]
    async fn test_free_text_requires_job() {
        let (store, mut stats) = store_with_job().await;
        let row = CsvRow::from_pairs(&[("Auftragsnummer", "A-999"), ("Mitarbeiter", "X"), ("Montage", "2")]);
        import_activity(&store, &row, &mut stats).await.unwrap();

        assert!(store.snapshot().system_logs.is_empty());
        assert_eq!(stats.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_report_images_attached_once() {
        let (store, mut stats) = store_with_job().await;
        let row = CsvRow::from_pairs(&[
            ("Auftragsnummer", "A-100"),
            ("Datum", "10.04.2025"),
            ("Bild 1", "fotos/a.jpg"),
            ("Bild 2", "fotos/b.jpg"),
            ("Zeichnung 1", "plan.pdf"),
        ]);
        import_report(&store, &row, &mut stats).await.unwrap();
        import_report(&store, &row, &mut stats).await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.reports.len(), 1);
        assert_eq!(state.report_images.len(), 3);
        assert_eq!(state.update_count, 0);
        let drawing = state.report_images.iter().find(|i| i.caption == "Zeichnung").unwrap();
        assert_eq!(drawing.sort_order, 10);
    }

    #[tokio::test]
    async fn test_report_row_without_images_skipped() {
        let (store, mut stats) = store_with_job().await;
        let row = CsvRow::from_pairs(&[("Auftragsnummer", "A-100"), ("Bemerkungen", "nur Text")]);
        import_report(&store, &row, &mut stats).await.unwrap();
        assert!(store.snapshot().reports.is_empty());
    }
}
