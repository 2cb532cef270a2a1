//! Intake record storage with date-bucketed queries.
//!
//! Records are kept in insertion order, which carries no meaning: every query
//! re-derives temporal order from the timestamps. Days are local calendar
//! days, `[local midnight, next local midnight)`.

use crate::persistence::{keys, write_json, KeyValueStore};
use crate::{Result, StorageError, ValidationError, WaterIntakeRecord};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Largest amount accepted for a single intake event (ml)
pub const MAX_RECORD_AMOUNT: i64 = 5000;

/// Check the `(0, 5000]` bound applied when records are created
pub fn validate_amount(amount: i64) -> std::result::Result<(), ValidationError> {
    if amount <= 0 || amount > MAX_RECORD_AMOUNT {
        return Err(ValidationError::Amount(amount));
    }
    Ok(())
}

/// Instant at which local calendar day `date` begins
///
/// On days where local midnight does not exist (DST gaps), the earliest valid
/// local time after it is used.
pub fn start_of_local_day(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            // Skip forward through the gap an hour at a time
            (1..=3)
                .find_map(|h| {
                    Local
                        .from_local_datetime(&(midnight + chrono::Duration::hours(h)))
                        .earliest()
                })
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
        }
    }
}

/// Local calendar date of an instant
pub fn local_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

/// Local calendar date right now
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// The collection of intake events
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    records: Vec<WaterIntakeRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a new record, returning its freshly generated id
    pub fn add(
        &mut self,
        amount: i64,
        timestamp: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<String> {
        validate_amount(amount)?;

        let id = self.generate_id();
        self.records.push(WaterIntakeRecord {
            id: id.clone(),
            amount,
            timestamp,
            note,
        });

        tracing::debug!("Added record {} ({} ml at {})", id, amount, timestamp);
        Ok(id)
    }

    fn generate_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.records.iter().any(|r| r.id == id) {
                return id;
            }
        }
    }

    /// Independent copy of every record, in insertion order
    pub fn get_all(&self) -> Vec<WaterIntakeRecord> {
        self.records.clone()
    }

    pub fn get(&self, id: &str) -> Option<&WaterIntakeRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose timestamp falls on local calendar day `date`
    pub fn get_by_date(&self, date: NaiveDate) -> Vec<WaterIntakeRecord> {
        let start = start_of_local_day(date);
        let end = start_of_local_day(date + chrono::Duration::days(1));

        self.records
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp < end)
            .cloned()
            .collect()
    }

    /// Records from `from` through `to` (both inclusive), oldest first
    ///
    /// Bounds are compared as calendar dates, so `NaiveDate::MIN` and
    /// `NaiveDate::MAX` are valid open ends.
    pub fn records_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<WaterIntakeRecord> {
        let mut found: Vec<_> = self
            .records
            .iter()
            .filter(|r| (from..=to).contains(&local_date(r.timestamp)))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.timestamp);
        found
    }

    /// Overwrite the amount of an existing record
    ///
    /// Unlike [`RecordStore::add`], the new amount is not range checked.
    pub fn update(&mut self, id: &str, new_amount: i64) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                if validate_amount(new_amount).is_err() {
                    tracing::warn!(
                        "Record {} updated to out-of-range amount {} ml",
                        id,
                        new_amount
                    );
                }
                record.amount = new_amount;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        match self.records.iter().position(|r| r.id == id) {
            Some(idx) => {
                self.records.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Sum of amounts logged on local calendar day `date`
    pub fn daily_total(&self, date: NaiveDate) -> i64 {
        self.get_by_date(date)
            .iter()
            .fold(0i64, |total, r| total.saturating_add(r.amount))
    }

    pub fn today_total(&self) -> i64 {
        self.daily_total(local_today())
    }

    /// Per-day totals for every day that has at least one record
    pub fn daily_totals(&self) -> HashMap<NaiveDate, i64> {
        let mut totals = HashMap::new();
        for record in &self.records {
            let total = totals.entry(local_date(record.timestamp)).or_insert(0i64);
            *total = total.saturating_add(record.amount);
        }
        totals
    }

    pub fn clear(&mut self) {
        let removed = self.records.len();
        self.records.clear();
        tracing::info!("Cleared {} records", removed);
    }

    /// Rebuild a store from previously persisted records
    ///
    /// Ids are kept. Amounts outside the creation bound are kept with a
    /// warning, since `update` can legitimately store them. Records repeating
    /// an id that was already seen are dropped.
    pub fn restore(records: Vec<WaterIntakeRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(records.len());

        for record in records {
            if let Err(e) = validate_amount(record.amount) {
                tracing::warn!("Stored record {} is out of range: {}", record.id, e);
            }
            if !seen.insert(record.id.clone()) {
                tracing::warn!("Dropping stored record with duplicate id {}", record.id);
                continue;
            }
            kept.push(record);
        }

        Self { records: kept }
    }

    /// Load records from the gateway
    ///
    /// A missing key yields an empty store. Array elements that fail to decode
    /// are skipped with a warning; a payload that is not an array at all is a
    /// [`StorageError::Corrupt`].
    pub fn load_from(store: &dyn KeyValueStore) -> std::result::Result<Self, StorageError> {
        let Some(raw) = store.get(keys::WATER_RECORDS)? else {
            tracing::info!("No stored records found, starting empty");
            return Ok(Self::new());
        };

        let values: Vec<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                key: keys::WATER_RECORDS.to_string(),
                reason: e.to_string(),
            })?;

        let mut records = Vec::with_capacity(values.len());
        for (idx, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<WaterIntakeRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Failed to parse stored record at index {}: {}", idx, e);
                }
            }
        }

        let restored = Self::restore(records);
        tracing::debug!("Loaded {} records", restored.len());
        Ok(restored)
    }

    /// Write every record to the gateway, replacing what was stored
    pub fn save_to(&self, store: &dyn KeyValueStore) -> std::result::Result<(), StorageError> {
        write_json(store, keys::WATER_RECORDS, &self.records)?;
        tracing::debug!("Saved {} records", self.records.len());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::Error;

    /// Instant for a local wall-clock time on `date`
    pub(crate) fn at(date: NaiveDate, h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
        let naive = date.and_hms_milli_opt(h, m, s, ms).unwrap();
        Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()
    }

    #[test]
    fn test_add_returns_unique_ids() {
        let mut store = RecordStore::new();
        let mut ids = HashSet::new();

        for amount in [1, 250, 5000] {
            let id = store.add(amount, at(day(), 10, 0, 0, 0), None).unwrap();
            assert!(ids.insert(id), "id was reused");
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_add_rejects_out_of_range() {
        let mut store = RecordStore::new();

        for amount in [0, -100, 5001] {
            let result = store.add(amount, at(day(), 10, 0, 0, 0), None);
            assert!(matches!(
                result,
                Err(Error::Validation(ValidationError::Amount(a))) if a == amount
            ));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_all_is_independent_copy() {
        let mut store = RecordStore::new();
        store.add(250, at(day(), 9, 0, 0, 0), None).unwrap();

        let mut copy = store.get_all();
        copy[0].amount = 9999;
        copy.clear();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_all()[0].amount, 250);
    }

    #[test]
    fn test_get_by_date_boundaries() {
        let mut store = RecordStore::new();
        let next = day() + chrono::Duration::days(1);

        store.add(100, at(day(), 0, 0, 0, 0), None).unwrap();
        store.add(200, at(day(), 23, 59, 59, 999), None).unwrap();
        store.add(400, at(next, 0, 0, 0, 0), None).unwrap();

        let found: Vec<i64> = store.get_by_date(day()).iter().map(|r| r.amount).collect();
        assert_eq!(found, vec![100, 200]);

        let found: Vec<i64> = store.get_by_date(next).iter().map(|r| r.amount).collect();
        assert_eq!(found, vec![400]);
    }

    #[test]
    fn test_daily_total() {
        let mut store = RecordStore::new();
        store.add(250, at(day(), 8, 0, 0, 0), None).unwrap();
        store.add(500, at(day(), 12, 0, 0, 0), None).unwrap();
        store.add(750, at(day(), 18, 0, 0, 0), None).unwrap();

        assert_eq!(store.daily_total(day()), 1500);
        assert_eq!(store.daily_total(day() - chrono::Duration::days(1)), 0);
    }

    #[test]
    fn test_update_and_delete() {
        let mut store = RecordStore::new();
        let id = store.add(250, at(day(), 8, 0, 0, 0), None).unwrap();

        assert!(store.update(&id, 300));
        assert_eq!(store.get(&id).unwrap().amount, 300);
        assert!(!store.update("missing", 300));

        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_does_not_revalidate() {
        let mut store = RecordStore::new();
        let id = store.add(250, at(day(), 8, 0, 0, 0), None).unwrap();

        assert!(store.update(&id, 8000));
        assert_eq!(store.daily_total(day()), 8000);
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let mut store = RecordStore::new();
        let id = store.add(250, at(day(), 8, 0, 0, 0), None).unwrap();
        store.add(500, at(day(), 12, 0, 0, 0), None).unwrap();

        assert!(store.update(&id, i64::MAX));
        assert_eq!(store.daily_total(day()), i64::MAX);
        assert_eq!(store.daily_totals()[&day()], i64::MAX);
    }

    #[test]
    fn test_records_between_sorted() {
        let mut store = RecordStore::new();
        let yesterday = day() - chrono::Duration::days(1);
        store.add(300, at(day(), 9, 0, 0, 0), None).unwrap();
        store.add(100, at(yesterday, 7, 0, 0, 0), None).unwrap();
        store.add(200, at(yesterday, 22, 0, 0, 0), None).unwrap();

        let amounts: Vec<i64> = store
            .records_between(yesterday, day())
            .iter()
            .map(|r| r.amount)
            .collect();
        assert_eq!(amounts, vec![100, 200, 300]);
    }

    #[test]
    fn test_records_between_open_ended() {
        let mut store = RecordStore::new();
        store.add(300, at(day(), 9, 0, 0, 0), None).unwrap();

        assert_eq!(store.records_between(NaiveDate::MIN, day()).len(), 1);
        assert_eq!(store.records_between(day(), NaiveDate::MAX).len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut store = RecordStore::new();
        store.add(250, at(day(), 8, 0, 0, 0), None).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.daily_total(day()), 0);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let kv = MemoryStore::new();
        let mut store = RecordStore::new();
        let id = store
            .add(330, at(day(), 14, 5, 7, 250), Some("sparkling".into()))
            .unwrap();
        store.add(200, at(day(), 16, 0, 0, 0), None).unwrap();

        store.save_to(&kv).unwrap();
        let loaded = RecordStore::load_from(&kv).unwrap();

        assert_eq!(loaded.get_all(), store.get_all());
        assert_eq!(loaded.get(&id).unwrap().note.as_deref(), Some("sparkling"));
    }

    #[test]
    fn test_load_missing_key_is_empty() {
        let kv = MemoryStore::new();
        let loaded = RecordStore::load_from(&kv).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_skips_bad_elements() {
        let kv = MemoryStore::new();
        kv.set(
            keys::WATER_RECORDS,
            r#"[
                {"id":"a","amount":250,"timestamp":"2024-03-12T08:00:00.000Z"},
                {"id":"b","amount":"lots","timestamp":"2024-03-12T09:00:00.000Z"},
                {"id":"c","amount":9000,"timestamp":"2024-03-12T10:00:00.000Z"},
                {"id":"a","amount":100,"timestamp":"2024-03-12T11:00:00.000Z"}
            ]"#,
        )
        .unwrap();

        let loaded = RecordStore::load_from(&kv).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("a").unwrap().amount, 250);
        assert_eq!(loaded.get("c").unwrap().amount, 9000);
    }

    #[test]
    fn test_load_corrupt_payload_is_error() {
        let kv = MemoryStore::new();
        kv.set(keys::WATER_RECORDS, "{ not an array }").unwrap();

        assert!(matches!(
            RecordStore::load_from(&kv),
            Err(StorageError::Corrupt { .. })
        ));
    }
}
