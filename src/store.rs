//! In-memory store backing the data access facade.
//!
//! Fields and sensors are keyed by id (`IndexMap`, so listing keeps insertion
//! order). Readings, alerts and recommendations are append-only sequences
//! written by the simulator. The store is shared as [`SharedStore`]; the
//! facade is the only writer of fields and thresholds, the simulator the only
//! writer of telemetry.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{
    Action, Alert, Crop, Field, FieldPatch, Kpis, Reading, ReadingsFilter, Recommendation,
    Sensor, SensorKind, SensorStatus, Severity, Thresholds, ThresholdsPatch,
};

pub type SharedStore = Arc<RwLock<Store>>;

// ---

#[derive(Debug)]
pub struct Store {
    // ---
    sensors: IndexMap<String, SensorStatus>,
    fields: IndexMap<String, Field>,
    thresholds: HashMap<String, Thresholds>,
    readings: VecDeque<Reading>,
    alerts: Vec<Alert>,
    recommendations: Vec<Recommendation>,
    kpis: Kpis,
    /// Retention cap for readings; 0 keeps everything.
    max_readings: usize,
}

impl Default for Store {
    fn default() -> Self {
        Store {
            sensors: IndexMap::new(),
            fields: IndexMap::new(),
            thresholds: HashMap::new(),
            readings: VecDeque::new(),
            alerts: Vec::new(),
            recommendations: Vec::new(),
            kpis: Kpis {
                avg_nitrate: 0.0,
                avg_moisture: 0.0,
                avg_temp: 0.0,
                generated_at: DateTime::<Utc>::default(),
            },
            max_readings: 0,
        }
    }
}

impl Store {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_readings(mut self, max_readings: usize) -> Self {
        self.max_readings = max_readings;
        self.enforce_retention();
        self
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Store populated with the dashboard's demo data: two fields with one
    /// probe each, a handful of readings, alerts and recommendations.
    pub fn seeded() -> Self {
        // ---
        let mut store = Store::new();

        let sensor1 = Sensor {
            id: "sensor1".to_string(),
            kind: SensorKind::SoilProbe,
            lat: 34.0,
            lng: -118.0,
        };
        let sensor2 = Sensor {
            id: "sensor2".to_string(),
            kind: SensorKind::SoilProbe,
            lat: 34.1,
            lng: -118.1,
        };
        store.insert_sensor(sensor1.clone());
        store.insert_sensor(sensor2.clone());

        store.insert_field(Field {
            id: "field1".to_string(),
            name: "Field A".to_string(),
            crop: Crop::Tomato,
            lat: 34.0,
            lng: -118.0,
            sensors: vec![sensor1],
        });
        store.insert_field(Field {
            id: "field2".to_string(),
            name: "Field B".to_string(),
            crop: Crop::Potato,
            lat: 34.1,
            lng: -118.1,
            sensors: vec![sensor2],
        });

        for (sensor_id, min, nitrate, moisture, temp) in [
            ("sensor1", 0, 5.0, 30.0, 22.0),
            ("sensor2", 1, 5.5, 32.0, 23.0),
            ("sensor1", 2, 6.0, 31.0, 24.0),
        ] {
            store.push_reading(Reading {
                sensor_id: sensor_id.to_string(),
                timestamp: seed_time(min),
                nitrate_mg_l: nitrate,
                moisture_pct: moisture,
                temperature_c: temp,
            });
        }

        store.set_kpis(Kpis {
            avg_nitrate: 5.5,
            avg_moisture: 31.0,
            avg_temp: 23.0,
            generated_at: seed_time(2),
        });

        for (id, field_id, message, severity, min) in [
            ("alert1", "field1", "High nitrate levels detected in Field A", Severity::Critical, 0),
            ("alert2", "field2", "Moisture levels below threshold in Field B", Severity::Warn, 5),
            ("alert3", "field1", "Temperature spike in Field A", Severity::Info, 10),
        ] {
            store.push_alert(Alert {
                id: id.to_string(),
                field_id: field_id.to_string(),
                message: message.to_string(),
                severity,
                created_at: seed_time(min),
            });
        }

        for (id, field_id, action, amount, reason, min) in [
            ("rec1", "field1", Action::Irrigate, 100.0, "Low moisture levels", 0),
            ("rec2", "field2", Action::Fertilize, 50.0, "Nutrient deficiency", 1),
        ] {
            store.push_recommendation(Recommendation {
                id: id.to_string(),
                field_id: field_id.to_string(),
                action,
                amount,
                units: action.units(),
                reason: reason.to_string(),
                severity: Severity::Warn,
                created_at: seed_time(min),
            });
        }

        store
    }

    // --- sensors

    pub fn insert_sensor(&mut self, sensor: Sensor) {
        self.sensors.insert(
            sensor.id.clone(),
            SensorStatus {
                sensor,
                last_reading: None,
            },
        );
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.values().map(|s| &s.sensor)
    }

    pub fn sensor_statuses(&self) -> Vec<SensorStatus> {
        self.sensors.values().cloned().collect()
    }

    // --- fields

    pub fn insert_field(&mut self, field: Field) {
        self.thresholds.entry(field.id.clone()).or_default();
        self.fields.insert(field.id.clone(), field);
    }

    pub fn fields(&self) -> Vec<Field> {
        self.fields.values().cloned().collect()
    }

    pub fn field_ids(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn field(&self, id: &str) -> Result<&Field, StoreError> {
        self.fields
            .get(id)
            .ok_or_else(|| StoreError::field_not_found(id))
    }

    pub fn contains_field(&self, id: &str) -> bool {
        self.fields.contains_key(id)
    }

    /// Merge `patch` into a stored field.
    ///
    /// Sensor ids are resolved against the sensor set first; an unknown id
    /// rejects the whole update with `UnknownSensor` and leaves the field
    /// untouched.
    pub fn update_field(&mut self, id: &str, patch: FieldPatch) -> Result<Field, StoreError> {
        // ---
        if !self.fields.contains_key(id) {
            return Err(StoreError::field_not_found(id));
        }
        let sensors = match &patch.sensor_ids {
            Some(ids) => Some(self.resolve_sensors(ids)?),
            None => None,
        };

        let field = self
            .fields
            .get_mut(id)
            .ok_or_else(|| StoreError::field_not_found(id))?;
        patch.apply_to(field);
        if let Some(sensors) = sensors {
            field.sensors = sensors;
        }
        Ok(field.clone())
    }

    fn resolve_sensors(&self, ids: &[String]) -> Result<Vec<Sensor>, StoreError> {
        ids.iter()
            .map(|sid| {
                self.sensors
                    .get(sid)
                    .map(|s| s.sensor.clone())
                    .ok_or_else(|| StoreError::UnknownSensor(sid.clone()))
            })
            .collect()
    }

    /// Remove a field and its thresholds. Order of the remaining fields is kept.
    pub fn remove_field(&mut self, id: &str) -> Result<Field, StoreError> {
        // ---
        let field = self
            .fields
            .shift_remove(id)
            .ok_or_else(|| StoreError::field_not_found(id))?;
        self.thresholds.remove(id);
        Ok(field)
    }

    // --- thresholds

    pub fn thresholds(&self, field_id: &str) -> Result<&Thresholds, StoreError> {
        self.thresholds
            .get(field_id)
            .ok_or_else(|| StoreError::thresholds_not_found(field_id))
    }

    pub fn update_thresholds(
        &mut self,
        field_id: &str,
        patch: ThresholdsPatch,
    ) -> Result<Thresholds, StoreError> {
        // ---
        let thresholds = self
            .thresholds
            .get_mut(field_id)
            .ok_or_else(|| StoreError::thresholds_not_found(field_id))?;
        let mut merged = thresholds.clone();
        patch.apply_to(&mut merged);
        merged.validate()?;
        *thresholds = merged.clone();
        Ok(merged)
    }

    // --- telemetry

    pub fn push_reading(&mut self, reading: Reading) {
        // ---
        if let Some(status) = self.sensors.get_mut(&reading.sensor_id) {
            status.last_reading = Some(reading.clone());
        }
        self.readings.push_back(reading);
        self.enforce_retention();
    }

    pub fn push_alert(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }

    pub fn push_recommendation(&mut self, recommendation: Recommendation) {
        self.recommendations.push(recommendation);
    }

    pub fn set_kpis(&mut self, kpis: Kpis) {
        self.kpis = kpis;
    }

    pub fn kpis(&self) -> &Kpis {
        &self.kpis
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    pub fn recommendations_for(&self, field_id: &str) -> Vec<Recommendation> {
        self.recommendations
            .iter()
            .filter(|r| r.field_id == field_id)
            .cloned()
            .collect()
    }

    /// Apply a readings filter.
    ///
    /// `sensor_id` wins over `field_id`; an unknown field yields nothing.
    /// `limit` keeps the last N entries of the filtered sequence.
    pub fn readings(&self, filter: &ReadingsFilter) -> Vec<Reading> {
        // ---
        let mut matched: Vec<Reading> = if let Some(sensor_id) = &filter.sensor_id {
            self.readings
                .iter()
                .filter(|r| &r.sensor_id == sensor_id)
                .cloned()
                .collect()
        } else if let Some(field_id) = &filter.field_id {
            match self.fields.get(field_id) {
                Some(field) => {
                    let ids: Vec<&str> = field.sensor_ids().collect();
                    self.readings
                        .iter()
                        .filter(|r| ids.contains(&r.sensor_id.as_str()))
                        .cloned()
                        .collect()
                }
                None => Vec::new(),
            }
        } else {
            self.readings.iter().cloned().collect()
        };

        if let Some(limit) = filter.limit {
            let skip = matched.len().saturating_sub(limit);
            matched.drain(..skip);
        }
        matched
    }

    fn enforce_retention(&mut self) {
        // ---
        if self.max_readings == 0 {
            return;
        }
        while self.readings.len() > self.max_readings {
            self.readings.pop_front();
        }
    }
}

fn seed_time(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 10, 1, 12, minute, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::default())
}
