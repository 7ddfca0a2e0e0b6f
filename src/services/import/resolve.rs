//! Upsert resolvers for customers, devices, jobs, assignments and measurements
//!
//! Each resolver looks up the entity by its natural key, applies the fields
//! that differ and writes only when something changed. A row without its key
//! is skipped silently; a row whose parent is unknown is skipped with a warning.

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::classify::SourceFormat;
use super::parse::{join_present, map_legacy_category, parse_date, parse_decimal};
use super::reader::CsvRow;
use super::store::ImportStore;
use super::ImportStats;
use crate::types::{
    AssignmentStatus, Customer, Device, DeviceStatus, Job, JobDevice, JobStatus, Measurement,
};

/// Contact columns of a job row, in lookup order
const JOB_CONTACT_COLUMNS: &[&str] = &["Auftraggeber Kontakt", "Eigentümer 1 Kontakt", "Bewohner 1 Kontakt"];

/// Names of the fields an update touched
#[derive(Debug, Default)]
pub(crate) struct FieldChanges(Vec<&'static str>);

impl FieldChanges {
    pub(crate) fn set<T: PartialEq>(&mut self, field: &'static str, slot: &mut T, value: T) {
        if *slot != value {
            *slot = value;
            self.0.push(field);
        }
    }

    /// Only overwrite when the row carries a value
    pub(crate) fn set_present<T: PartialEq>(&mut self, field: &'static str, slot: &mut Option<T>, value: Option<T>) {
        if value.is_some() {
            self.set(field, slot, value);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn fields(&self) -> String {
        self.0.join(", ")
    }
}

/// Parse a date column, warning when a present value is unreadable
pub(crate) fn row_date(row: &CsvRow, column: &str, stats: &mut ImportStats) -> Option<NaiveDate> {
    let raw = row.get(column)?;
    let date = parse_date(raw);
    if date.is_none() {
        stats.warn(row.line, format!("Datum nicht lesbar in '{}': {}", column, raw));
    }
    date
}

fn labeled(label: &str, value: Option<&str>) -> Option<String> {
    value.map(|v| format!("{}: {}", label, v))
}

// =============================================================================
// CUSTOMER
// =============================================================================

struct CustomerFields {
    name: Option<String>,
    address: Option<String>,
    contact_person: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

fn customer_fields(row: &CsvRow) -> CustomerFields {
    let contact_person = join_present(&[row.get("Vorname"), row.get("Nachname")], " ");
    CustomerFields {
        name: join_present(&[row.get("Firma"), contact_person.as_deref()], " - "),
        address: join_present(
            &[row.get("Adresszeile 1"), row.get("Adresszeile 2"), row.get("PLZ"), row.get("Ort")],
            ", ",
        ),
        contact_person,
        email: row.get("E-Mail").map(str::to_string),
        phone: join_present(&[row.get("Festnetz"), row.get("Mobil")], " / "),
    }
}

/// Customer master row, keyed by `UID`
pub async fn import_customer(store: &dyn ImportStore, row: &CsvRow, stats: &mut ImportStats) -> Result<()> {
    let Some(external_id) = row.get("UID") else {
        stats.rows_skipped += 1;
        return Ok(());
    };
    let fields = customer_fields(row);

    match store.find_customer_by_external_id(external_id).await? {
        Some(mut customer) => {
            let mut changes = FieldChanges::default();
            if let Some(name) = fields.name {
                changes.set("name", &mut customer.name, name);
            }
            changes.set_present("address", &mut customer.address, fields.address);
            changes.set_present("contact_person", &mut customer.contact_person, fields.contact_person);
            changes.set_present("email", &mut customer.email, fields.email);
            changes.set_present("phone", &mut customer.phone, fields.phone);

            if !changes.is_empty() {
                customer.updated_at = Some(Utc::now());
                store.update_customer(&customer).await?;
                stats.customers_updated += 1;
                info!("Customer {} updated: {}", external_id, changes.fields());
            }
        }
        None => {
            let mut customer = Customer::new(
                Some(external_id.to_string()),
                fields.name.unwrap_or_else(|| "Unbekannt".to_string()),
            );
            customer.address = fields.address;
            customer.contact_person = fields.contact_person;
            customer.email = fields.email;
            customer.phone = fields.phone;
            store.insert_customer(&customer).await?;
            stats.customers_created += 1;
            info!("Customer {} created: {}", external_id, customer.name);
        }
    }

    Ok(())
}

// =============================================================================
// DEVICE
// =============================================================================

struct DeviceFields {
    name: Option<String>,
    category: Option<String>,
    location: Option<String>,
    description: Option<String>,
    price_per_day: Option<f64>,
}

fn device_fields(row: &CsvRow, format: SourceFormat) -> DeviceFields {
    match format {
        SourceFormat::SwissAirDry => DeviceFields {
            name: row.get("Name").map(str::to_string),
            category: row.get("Kategorie").map(str::to_string),
            location: row.get("Standort").map(str::to_string),
            description: join_present(&[row.get("Beschreibung"), row.get("Bemerkungen")], " - "),
            price_per_day: row.get("Preis pro Tag").and_then(parse_decimal),
        },
        SourceFormat::FirstDry => DeviceFields {
            name: row.get("Name").map(str::to_string),
            category: row
                .get("Kategorie")
                .map(|c| map_legacy_category(Some(c)).to_string()),
            location: row.get("Einsatzort").map(str::to_string),
            description: None,
            price_per_day: row.get("Preis pro Tag").and_then(parse_decimal),
        },
    }
}

/// Device master row, keyed by `Gerätenummer`
pub async fn import_device(
    store: &dyn ImportStore,
    row: &CsvRow,
    format: SourceFormat,
    stats: &mut ImportStats,
) -> Result<()> {
    let Some(serial) = row.get("Gerätenummer") else {
        stats.rows_skipped += 1;
        return Ok(());
    };
    if let Some(raw) = row.get("Preis pro Tag") {
        if parse_decimal(raw).is_none() {
            stats.warn(row.line, format!("Preis nicht lesbar: {}", raw));
        }
    }
    let fields = device_fields(row, format);

    match store.find_device_by_serial(serial).await? {
        Some(mut device) => {
            let mut changes = FieldChanges::default();
            if let Some(name) = fields.name {
                changes.set("name", &mut device.name, name);
            }
            if let Some(category) = fields.category {
                changes.set("category", &mut device.category, category);
            }
            changes.set_present("location", &mut device.location, fields.location);
            changes.set_present("description", &mut device.description, fields.description);
            changes.set_present("price_per_day", &mut device.price_per_day, fields.price_per_day);

            if !changes.is_empty() {
                device.updated_at = Some(Utc::now());
                store.update_device(&device).await?;
                stats.devices_updated += 1;
                info!("Device {} updated: {}", serial, changes.fields());
            }
        }
        None => {
            let (name, category, status) = match format {
                SourceFormat::SwissAirDry => (
                    fields.name.unwrap_or_else(|| "Unbekanntes Gerät".to_string()),
                    fields.category.unwrap_or_else(|| "Sonstiges".to_string()),
                    DeviceStatus::Available,
                ),
                SourceFormat::FirstDry => (
                    fields.name.unwrap_or_else(|| match row.get("Kategorie") {
                        Some(category) => format!("{} {}", category, serial),
                        None => format!("Gerät {}", serial),
                    }),
                    fields
                        .category
                        .unwrap_or_else(|| map_legacy_category(None).to_string()),
                    DeviceStatus::Inactive,
                ),
            };
            let mut device = Device::new(serial.to_string(), name, category, status);
            device.location = fields.location;
            device.description = fields.description;
            device.price_per_day = fields.price_per_day;
            store.insert_device(&device).await?;
            stats.devices_created += 1;
            info!("Device {} created: {}", serial, device.name);
        }
    }

    Ok(())
}

// =============================================================================
// JOB
// =============================================================================

fn job_description(row: &CsvRow) -> Option<String> {
    let lines = [
        labeled("Schadensart", row.get("Schadensart")),
        labeled("Betroffene Räume", row.get("Räume")),
        labeled("Wohnung", row.get("Wohnung")),
        labeled("Bemerkungen", row.get("Bemerkungen")),
    ];
    let present: Vec<String> = lines.into_iter().flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join("\n"))
    }
}

async fn find_contact_customer(store: &dyn ImportStore, row: &CsvRow) -> Result<Option<Customer>> {
    for column in JOB_CONTACT_COLUMNS {
        if let Some(contact) = row.get(column) {
            if let Some(customer) = store.find_customer_by_external_id(contact).await? {
                return Ok(Some(customer));
            }
        }
    }
    Ok(None)
}

/// Customer for a job whose contacts are unknown
async fn synthesize_customer(
    store: &dyn ImportStore,
    row: &CsvRow,
    job_number: &str,
    stats: &mut ImportStats,
) -> Result<Customer> {
    let name = join_present(
        &[
            labeled("Kontakt", row.get("Bewohner 1 Kontakt")).as_deref(),
            labeled("Adresse", row.get("Adresse")).as_deref(),
        ],
        " - ",
    )
    .unwrap_or_else(|| format!("Kunde für Auftrag {}", job_number));

    let mut customer = Customer::new(row.get("Auftraggeber Kontakt").map(str::to_string), name);
    customer.address = row.get("Adresse").map(str::to_string);
    store.insert_customer(&customer).await?;
    stats.customers_created += 1;
    info!("Customer created for job {}: {}", job_number, customer.name);
    Ok(customer)
}

/// Job row, keyed by `Auftragsnummer`
pub async fn import_job(store: &dyn ImportStore, row: &CsvRow, stats: &mut ImportStats) -> Result<()> {
    let Some(job_number) = row.get("Auftragsnummer") else {
        stats.rows_skipped += 1;
        return Ok(());
    };

    let status = row.get("Status").and_then(JobStatus::from_source);
    if let (Some(raw), None) = (row.get("Status"), status) {
        stats.warn(row.line, format!("Unbekannter Auftragsstatus: {}", raw));
    }
    let description = job_description(row);
    let start_date = row_date(row, "Datum Erstbegehung", stats);
    let end_date = row_date(row, "Datum Rechnungsversand", stats);
    let contact_customer = find_contact_customer(store, row).await?;

    match store.find_job_by_number(job_number).await? {
        Some(mut job) => {
            let mut changes = FieldChanges::default();
            if let Some(customer) = contact_customer {
                changes.set("customer_id", &mut job.customer_id, Some(customer.id));
            }
            changes.set_present("description", &mut job.description, description);
            if let Some(status) = status {
                changes.set("status", &mut job.status, status.as_str().to_string());
            }
            changes.set_present("address", &mut job.address, row.get("Adresse").map(str::to_string));
            changes.set_present(
                "insurance_number",
                &mut job.insurance_number,
                row.get("Schadennummer Versicherung").map(str::to_string),
            );
            changes.set_present("damage_type", &mut job.damage_type, row.get("Schadensart").map(str::to_string));
            changes.set_present("rooms", &mut job.rooms, row.get("Räume").map(str::to_string));
            changes.set_present("start_date", &mut job.start_date, start_date);
            changes.set_present("end_date", &mut job.end_date, end_date);

            if !changes.is_empty() {
                job.updated_at = Some(Utc::now());
                store.update_job(&job).await?;
                stats.jobs_updated += 1;
                info!("Job {} updated: {}", job_number, changes.fields());
            }
        }
        None => {
            let customer = match contact_customer {
                Some(customer) => customer,
                None => synthesize_customer(store, row, job_number, stats).await?,
            };
            let mut job = Job::new(
                job_number.to_string(),
                Some(customer.id),
                status.unwrap_or(JobStatus::Pending),
            );
            job.description = description;
            job.address = row.get("Adresse").map(str::to_string);
            job.insurance_number = row.get("Schadennummer Versicherung").map(str::to_string);
            job.damage_type = row.get("Schadensart").map(str::to_string);
            job.rooms = row.get("Räume").map(str::to_string);
            job.start_date = start_date;
            job.end_date = end_date;
            store.insert_job(&job).await?;
            stats.jobs_created += 1;
            info!("Job {} created for customer {}", job_number, customer.id);
        }
    }

    Ok(())
}

// =============================================================================
// DEVICE ASSIGNMENT
// =============================================================================

/// Resolve the (device, job) parents of a row; `None` when the row is skipped
async fn resolve_parents(
    store: &dyn ImportStore,
    row: &CsvRow,
    stats: &mut ImportStats,
) -> Result<Option<(Device, Job)>> {
    let (Some(serial), Some(job_number)) = (row.get("Gerätenummer"), row.get("Auftragsnummer")) else {
        stats.rows_skipped += 1;
        return Ok(None);
    };

    let device = store.find_device_by_serial(serial).await?;
    let job = store.find_job_by_number(job_number).await?;
    match (device, job) {
        (Some(device), Some(job)) => Ok(Some((device, job))),
        (device, job) => {
            let missing = match (device.is_none(), job.is_none()) {
                (true, true) => format!("Gerät {} und Auftrag {} nicht gefunden", serial, job_number),
                (true, false) => format!("Gerät {} nicht gefunden", serial),
                _ => format!("Auftrag {} nicht gefunden", job_number),
            };
            stats.warn(row.line, missing);
            stats.rows_skipped += 1;
            Ok(None)
        }
    }
}

fn assignment_notes(row: &CsvRow) -> Option<String> {
    let lines = [
        labeled("Standort", row.get("Standort")),
        labeled("Wohnung", row.get("Wohnung")),
        labeled("Bemerkungen", row.get("Bemerkungen")),
    ];
    let present: Vec<String> = lines.into_iter().flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join("\n"))
    }
}

/// Apply one location change row to the (job, device) assignment
async fn upsert_assignment(
    store: &dyn ImportStore,
    row: &CsvRow,
    job_id: Uuid,
    device_id: Uuid,
    stats: &mut ImportStats,
) -> Result<()> {
    let kind = AssignmentStatus::from_source(row.get("Art"));
    let date = row_date(row, "Datum", stats);
    let location = join_present(&[row.get("Wohnung"), row.get("Standort")], ", ");
    let reading = row.get("Zählerstand kWh").and_then(parse_decimal);
    if let (Some(raw), None) = (row.get("Zählerstand kWh"), reading) {
        stats.warn(row.line, format!("Zählerstand nicht lesbar: {}", raw));
    }
    let notes = assignment_notes(row);

    match store.find_job_device(job_id, device_id).await? {
        Some(mut assignment) => {
            let mut changes = FieldChanges::default();
            match kind {
                AssignmentStatus::Removal => {
                    // First removal wins
                    if assignment.removal_date.is_none() && date.is_some() {
                        changes.set("removal_date", &mut assignment.removal_date, date);
                        changes.set("status", &mut assignment.status, kind.as_str().to_string());
                        changes.set_present("final_reading", &mut assignment.final_reading, reading);
                    }
                }
                AssignmentStatus::Installation => {
                    if assignment.installation_date.is_none() {
                        changes.set_present("installation_date", &mut assignment.installation_date, date);
                    }
                    if assignment.initial_reading.is_none() {
                        changes.set_present("initial_reading", &mut assignment.initial_reading, reading);
                    }
                }
            }
            changes.set_present("location", &mut assignment.location, location);

            if let Some(block) = notes {
                let appended = match assignment.notes.as_deref() {
                    Some(existing) if existing.contains(&block) => None,
                    Some(existing) => Some(format!("{}\n\n{}", existing, block)),
                    None => Some(block),
                };
                if let Some(appended) = appended {
                    changes.set("notes", &mut assignment.notes, Some(appended));
                }
            }

            if !changes.is_empty() {
                assignment.updated_at = Some(Utc::now());
                store.update_job_device(&assignment).await?;
                stats.assignments_updated += 1;
                debug!("Assignment {} updated: {}", assignment.id, changes.fields());
            }
        }
        None => {
            let mut assignment = JobDevice::new(job_id, device_id, kind);
            match kind {
                AssignmentStatus::Installation => {
                    assignment.installation_date = date;
                    assignment.initial_reading = reading;
                }
                AssignmentStatus::Removal => {
                    assignment.removal_date = date;
                    assignment.final_reading = reading;
                }
            }
            assignment.location = location;
            assignment.notes = notes;
            store.insert_job_device(&assignment).await?;
            stats.assignments_created += 1;
            debug!("Assignment created: job {} device {}", job_id, device_id);
        }
    }

    Ok(())
}

/// Device location change row (installation or removal)
pub async fn import_assignment(store: &dyn ImportStore, row: &CsvRow, stats: &mut ImportStats) -> Result<()> {
    let Some((device, job)) = resolve_parents(store, row, stats).await? else {
        return Ok(());
    };
    upsert_assignment(store, row, job.id, device.id, stats).await
}

// =============================================================================
// MEASUREMENT
// =============================================================================

/// Legacy device deployment row: always a measurement, plus the assignment
/// for `Montage`/`Demontage` rows
pub async fn import_measurement(store: &dyn ImportStore, row: &CsvRow, stats: &mut ImportStats) -> Result<()> {
    let Some((device, job)) = resolve_parents(store, row, stats).await? else {
        return Ok(());
    };

    let timestamp = row_date(row, "Datum", stats)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or_else(Utc::now);
    let measurement = Measurement {
        id: Uuid::new_v4(),
        device_id: device.id,
        job_id: Some(job.id),
        timestamp,
        temperature: row.get("Temperatur").and_then(parse_decimal),
        humidity: row.get("Luftfeuchtigkeit").and_then(parse_decimal),
        energy_consumption: row.get("Zählerstand kWh").and_then(parse_decimal),
        created_at: Utc::now(),
    };
    store.insert_measurement(&measurement).await?;
    stats.measurements_created += 1;

    if matches!(row.get("Art"), Some("Montage") | Some("Demontage")) {
        upsert_assignment(store, row, job.id, device.id, stats).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::import::memory::MemoryStore;

    fn device_row(serial: &str, name: &str, price: &str) -> CsvRow {
        CsvRow::from_pairs(&[
            ("Gerätenummer", serial),
            ("Kategorie", "Entfeuchter"),
            ("Name", name),
            ("Beschreibung", "Kondenstrockner"),
            ("Preis pro Tag", price),
        ])
    }

    fn job_row(number: &str, status: &str) -> CsvRow {
        CsvRow::from_pairs(&[
            ("Auftragsnummer", number),
            ("Schadensart", "Wasserschaden"),
            ("Räume", "Bad, Küche"),
            ("Status", status),
            ("Adresse", "Bahnhofstrasse 1, 8001 Zürich"),
            ("Datum Erstbegehung", "04/10/2025"),
        ])
    }

    async fn seed_job_and_device(store: &MemoryStore, stats: &mut ImportStats) {
        import_device(store, &device_row("D-1", "TK 500", "CHF 16.00"), SourceFormat::SwissAirDry, stats)
            .await
            .unwrap();
        import_job(store, &job_row("A-100", "aktiv"), stats).await.unwrap();
    }

    fn assignment_row(art: &str, date: &str, remark: &str) -> CsvRow {
        CsvRow::from_pairs(&[
            ("Gerätenummer", "D-1"),
            ("Auftragsnummer", "A-100"),
            ("Datum", date),
            ("Art", art),
            ("Standort", "Keller"),
            ("Bemerkungen", remark),
            ("Zählerstand kWh", "120,5"),
        ])
    }

    #[tokio::test]
    async fn test_customer_create_then_idempotent() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        let row = CsvRow::from_pairs(&[
            ("UID", "K-1"),
            ("Firma", "Muster AG"),
            ("Vorname", "Hans"),
            ("Nachname", "Muster"),
            ("Adresszeile 1", "Bahnhofstrasse 1"),
            ("PLZ", "8001"),
            ("Ort", "Zürich"),
            ("Festnetz", "044 123 45 67"),
            ("Mobil", "079 123 45 67"),
        ]);

        import_customer(&store, &row, &mut stats).await.unwrap();
        import_customer(&store, &row, &mut stats).await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.customers.len(), 1);
        assert_eq!(state.update_count, 0);
        let customer = &state.customers[0];
        assert_eq!(customer.name, "Muster AG - Hans Muster");
        assert_eq!(customer.address.as_deref(), Some("Bahnhofstrasse 1, 8001, Zürich"));
        assert_eq!(customer.contact_person.as_deref(), Some("Hans Muster"));
        assert_eq!(customer.phone.as_deref(), Some("044 123 45 67 / 079 123 45 67"));
        assert_eq!(stats.customers_created, 1);
    }

    #[tokio::test]
    async fn test_customer_without_name_parts() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        import_customer(&store, &CsvRow::from_pairs(&[("UID", "K-2")]), &mut stats)
            .await
            .unwrap();
        assert_eq!(store.snapshot().customers[0].name, "Unbekannt");
    }

    #[tokio::test]
    async fn test_blank_key_never_writes() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();

        import_customer(&store, &CsvRow::from_pairs(&[("UID", "  "), ("Firma", "X")]), &mut stats)
            .await
            .unwrap();
        import_device(&store, &device_row("nan", "X", "1"), SourceFormat::SwissAirDry, &mut stats)
            .await
            .unwrap();
        import_job(&store, &job_row("", "aktiv"), &mut stats).await.unwrap();

        let state = store.snapshot();
        assert!(state.customers.is_empty());
        assert!(state.devices.is_empty());
        assert!(state.jobs.is_empty());
        assert_eq!(stats.rows_skipped, 3);
        assert!(stats.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_device_single_field_update() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        import_device(&store, &device_row("X", "TK 500", "CHF 16.00"), SourceFormat::SwissAirDry, &mut stats)
            .await
            .unwrap();
        let before = store.snapshot().devices[0].clone();
        assert_eq!(before.status, "available");
        assert_eq!(before.price_per_day, Some(16.0));

        import_device(&store, &device_row("X", "TK 500", "CHF 18.50"), SourceFormat::SwissAirDry, &mut stats)
            .await
            .unwrap();
        let after = store.snapshot().devices[0].clone();

        assert_eq!(after.price_per_day, Some(18.5));
        assert!(after.updated_at.is_some());
        assert_eq!(
            Device { price_per_day: before.price_per_day, updated_at: before.updated_at, ..after },
            before
        );
        assert_eq!(stats.devices_updated, 1);
    }

    #[tokio::test]
    async fn test_legacy_device_defaults() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        let row = CsvRow::from_pairs(&[
            ("Gerätenummer", "FD-7"),
            ("Kategorie", "Ventilator"),
            ("Einsatzort", "Lager Bern"),
        ]);
        import_device(&store, &row, SourceFormat::FirstDry, &mut stats).await.unwrap();

        let device = store.snapshot().devices[0].clone();
        assert_eq!(device.status, "inactive");
        assert_eq!(device.category, "fan");
        assert_eq!(device.name, "Ventilator FD-7");
        assert_eq!(device.location.as_deref(), Some("Lager Bern"));
    }

    #[tokio::test]
    async fn test_job_created_with_synthesized_customer() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        import_job(&store, &job_row("A-100", "In Bearbeitung"), &mut stats).await.unwrap();

        let state = store.snapshot();
        let job = &state.jobs[0];
        assert_eq!(job.status, "active");
        assert_eq!(job.start_date, NaiveDate::from_ymd_opt(2025, 4, 10));
        assert_eq!(
            job.description.as_deref(),
            Some("Schadensart: Wasserschaden\nBetroffene Räume: Bad, Küche")
        );
        assert_eq!(state.customers.len(), 1);
        assert_eq!(job.customer_id, Some(state.customers[0].id));
        assert_eq!(state.customers[0].name, "Adresse: Bahnhofstrasse 1, 8001 Zürich");
    }

    #[tokio::test]
    async fn test_job_links_existing_contact() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        import_customer(&store, &CsvRow::from_pairs(&[("UID", "K-9"), ("Firma", "Verwaltung AG")]), &mut stats)
            .await
            .unwrap();
        let row = CsvRow::from_pairs(&[
            ("Auftragsnummer", "A-200"),
            ("Schadensart", "Rohrbruch"),
            ("Eigentümer 1 Kontakt", "K-9"),
        ]);
        import_job(&store, &row, &mut stats).await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.customers.len(), 1);
        assert_eq!(state.jobs[0].customer_id, Some(state.customers[0].id));
        assert_eq!(state.jobs[0].status, "pending");
    }

    #[tokio::test]
    async fn test_job_unknown_status_keeps_current() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        import_job(&store, &job_row("A-100", "abgeschlossen"), &mut stats).await.unwrap();
        import_job(&store, &job_row("A-100", "irgendwas"), &mut stats).await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.jobs[0].status, "completed");
        assert_eq!(state.update_count, 0);
        assert_eq!(stats.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_job_unparseable_date_warns() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        let row = CsvRow::from_pairs(&[
            ("Auftragsnummer", "A-300"),
            ("Schadensart", "Hochwasser"),
            ("Datum Erstbegehung", "not-a-date"),
        ]);
        import_job(&store, &row, &mut stats).await.unwrap();

        assert_eq!(store.snapshot().jobs[0].start_date, None);
        assert_eq!(stats.warnings.len(), 1);
        assert!(stats.warnings[0].contains("not-a-date"));
    }

    #[tokio::test]
    async fn test_assignment_requires_parents() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        import_assignment(&store, &assignment_row("Montage", "01.04.2025", "neu"), &mut stats)
            .await
            .unwrap();

        assert!(store.snapshot().job_devices.is_empty());
        assert_eq!(stats.warnings.len(), 1);
        assert_eq!(stats.rows_skipped, 1);
    }

    #[tokio::test]
    async fn test_assignment_removal_date_locked_and_notes_appended() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        seed_job_and_device(&store, &mut stats).await;

        import_assignment(&store, &assignment_row("Montage", "01.04.2025", "aufgestellt"), &mut stats)
            .await
            .unwrap();
        import_assignment(&store, &assignment_row("Demontage", "20.04.2025", "abgeholt"), &mut stats)
            .await
            .unwrap();
        import_assignment(&store, &assignment_row("Demontage", "25.04.2025", "nachkontrolle"), &mut stats)
            .await
            .unwrap();

        let state = store.snapshot();
        assert_eq!(state.job_devices.len(), 1);
        let assignment = &state.job_devices[0];
        assert_eq!(assignment.installation_date, NaiveDate::from_ymd_opt(2025, 4, 1));
        assert_eq!(assignment.removal_date, NaiveDate::from_ymd_opt(2025, 4, 20));
        assert_eq!(assignment.status, "removal");
        assert_eq!(assignment.initial_reading, Some(120.5));
        assert_eq!(assignment.location.as_deref(), Some("Keller"));
        let notes = assignment.notes.as_deref().unwrap();
        assert!(notes.starts_with("Standort: Keller\nBemerkungen: aufgestellt"));
        assert!(notes.contains("\n\nStandort: Keller\nBemerkungen: abgeholt"));
        assert!(notes.ends_with("Bemerkungen: nachkontrolle"));
    }

    #[tokio::test]
    async fn test_assignment_reimport_is_idempotent() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        seed_job_and_device(&store, &mut stats).await;
        let row = assignment_row("Demontage", "20.04.2025", "abgeholt");

        import_assignment(&store, &row, &mut stats).await.unwrap();
        let first = store.snapshot();
        import_assignment(&store, &row, &mut stats).await.unwrap();
        let second = store.snapshot();

        assert_eq!(first.job_devices, second.job_devices);
        assert_eq!(first.update_count, second.update_count);
    }

    #[tokio::test]
    async fn test_measurement_with_montage_creates_assignment() {
        let store = MemoryStore::new();
        let mut stats = ImportStats::default();
        seed_job_and_device(&store, &mut stats).await;
        let row = CsvRow::from_pairs(&[
            ("UID", "M-1"),
            ("Gerätenummer", "D-1"),
            ("Auftragsnummer", "A-100"),
            ("Zählerstand kWh", "15.2"),
            ("Datum", "04/02/2025"),
            ("Art", "Montage"),
        ]);
        import_measurement(&store, &row, &mut stats).await.unwrap();
        import_measurement(&store, &row, &mut stats).await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.measurements.len(), 2);
        assert_eq!(state.measurements[0].energy_consumption, Some(15.2));
        assert_eq!(
            state.measurements[0].timestamp.date_naive(),
            NaiveDate::from_ymd_opt(2025, 4, 2).unwrap()
        );
        assert_eq!(state.job_devices.len(), 1);
    }
}
