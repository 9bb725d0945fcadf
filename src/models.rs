//! Data models for fields, sensors and the synthetic telemetry they produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    SoilProbe,
    WeatherStation,
}

/// Fixed-location measurement device. Static for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    // ---
    pub id: String,
    pub kind: SensorKind,
    pub lat: f64,
    pub lng: f64,
}

/// Sensor together with the most recent reading it produced, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStatus {
    // ---
    #[serde(flatten)]
    pub sensor: Sensor,
    pub last_reading: Option<Reading>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crop {
    Tomato,
    Potato,
    Wheat,
    Corn,
}

/// Cultivated area with a geographic center and its attached sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    // ---
    pub id: String,
    pub name: String,
    pub crop: Crop,
    pub lat: f64,
    pub lng: f64,
    pub sensors: Vec<Sensor>,
}

impl Field {
    // ---
    pub fn sensor_ids(&self) -> impl Iterator<Item = &str> {
        self.sensors.iter().map(|s| s.id.as_str())
    }
}

/// Payload for creating a field; the id is generated and the sensor list
/// starts empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewField {
    // ---
    pub name: String,
    pub crop: Crop,
    pub lat: f64,
    pub lng: f64,
}

/// Partial update for a field. Absent members keep their stored value.
///
/// Sensors are given by id and resolved against the store's sensor set, so a
/// field can only ever reference known sensors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldPatch {
    // ---
    pub name: Option<String>,
    pub crop: Option<Crop>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default, alias = "sensors", alias = "sensorIds")]
    pub sensor_ids: Option<Vec<String>>,
}

impl FieldPatch {
    // ---
    /// Merge the scalar members into `field`. `sensor_ids` is resolved and
    /// applied by the store.
    pub fn apply_to(&self, field: &mut Field) {
        // ---
        if let Some(name) = &self.name {
            field.name = name.clone();
        }
        if let Some(crop) = self.crop {
            field.crop = crop;
        }
        if let Some(lat) = self.lat {
            field.lat = lat;
        }
        if let Some(lng) = self.lng {
            field.lng = lng;
        }
    }
}

/// One timestamped measurement triple from a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    // ---
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub nitrate_mg_l: f64,
    pub moisture_pct: f64,
    pub temperature_c: f64,
}

/// Aggregate dashboard figures for the current tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    // ---
    pub avg_nitrate: f64,
    pub avg_moisture: f64,
    pub avg_temp: f64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warn, Severity::Critical];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    // ---
    pub id: String,
    pub field_id: String,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Irrigate,
    Fertilize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    #[serde(rename = "L/ha")]
    LitresPerHectare,
    #[serde(rename = "kg/ha")]
    KilogramsPerHectare,
}

impl Action {
    /// Units an amount of this action is expressed in.
    pub fn units(self) -> Units {
        match self {
            Action::Irrigate => Units::LitresPerHectare,
            Action::Fertilize => Units::KilogramsPerHectare,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    // ---
    pub id: String,
    pub field_id: String,
    pub action: Action,
    pub amount: f64,
    pub units: Units,
    pub reason: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// Per-field alerting limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    // ---
    pub nitrate_max: f64,
    pub moisture_min: f64,
    pub moisture_max: f64,
    pub temperature_max: f64,
}

impl Thresholds {
    // ---
    /// Limits must be non-negative and finite, and the moisture band must
    /// not be inverted.
    pub fn validate(&self) -> Result<(), StoreError> {
        // ---
        for (name, v) in [
            ("nitrate_max", self.nitrate_max),
            ("moisture_min", self.moisture_min),
            ("moisture_max", self.moisture_max),
            ("temperature_max", self.temperature_max),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(StoreError::InvalidThresholds(format!(
                    "{} must be a non-negative number, got {}",
                    name, v
                )));
            }
        }
        if self.moisture_min > self.moisture_max {
            return Err(StoreError::InvalidThresholds(format!(
                "moisture_min {} exceeds moisture_max {}",
                self.moisture_min, self.moisture_max
            )));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            nitrate_max: 10.0,
            moisture_min: 20.0,
            moisture_max: 70.0,
            temperature_max: 32.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThresholdsPatch {
    // ---
    pub nitrate_max: Option<f64>,
    pub moisture_min: Option<f64>,
    pub moisture_max: Option<f64>,
    pub temperature_max: Option<f64>,
}

impl ThresholdsPatch {
    // ---
    pub fn apply_to(self, thresholds: &mut Thresholds) {
        // ---
        if let Some(v) = self.nitrate_max {
            thresholds.nitrate_max = v;
        }
        if let Some(v) = self.moisture_min {
            thresholds.moisture_min = v;
        }
        if let Some(v) = self.moisture_max {
            thresholds.moisture_max = v;
        }
        if let Some(v) = self.temperature_max {
            thresholds.temperature_max = v;
        }
    }
}

/// Filter for reading queries. `sensor_id` takes precedence over `field_id`;
/// `limit` keeps the most recent entries of the filtered result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReadingsFilter {
    // ---
    #[serde(default, alias = "fieldId")]
    pub field_id: Option<String>,
    #[serde(default, alias = "sensorId")]
    pub sensor_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ReadingsFilter {
    // ---
    pub fn by_sensor(sensor_id: &str) -> Self {
        ReadingsFilter {
            sensor_id: Some(sensor_id.to_string()),
            ..Default::default()
        }
    }

    pub fn by_field(field_id: &str) -> Self {
        ReadingsFilter {
            field_id: Some(field_id.to_string()),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn create_test_field() -> Field {
        // ---
        Field {
            id: "field-test".to_string(),
            name: "Test Field".to_string(),
            crop: Crop::Wheat,
            lat: 32.1,
            lng: 34.8,
            sensors: vec![Sensor {
                id: "sensor-test".to_string(),
                kind: SensorKind::SoilProbe,
                lat: 32.1,
                lng: 34.8,
            }],
        }
    }

    #[test]
    fn test_field_patch_merges() {
        // ---
        let mut field = create_test_field();
        let patch = FieldPatch {
            name: Some("Renamed".to_string()),
            crop: Some(Crop::Corn),
            ..Default::default()
        };
        patch.apply_to(&mut field);

        assert_eq!(field.name, "Renamed");
        assert_eq!(field.crop, Crop::Corn);

        // Untouched members are preserved
        assert_eq!(field.id, "field-test");
        assert_eq!(field.lat, 32.1);
        assert_eq!(field.sensors.len(), 1);
    }

    #[test]
    fn test_thresholds_patch_merges() {
        // ---
        let mut thresholds = Thresholds::default();
        ThresholdsPatch {
            moisture_min: Some(15.0),
            ..Default::default()
        }
        .apply_to(&mut thresholds);

        assert_eq!(thresholds.moisture_min, 15.0);
        assert_eq!(thresholds.nitrate_max, Thresholds::default().nitrate_max);
    }

    #[test]
    fn test_thresholds_validate() {
        // ---
        assert!(Thresholds::default().validate().is_ok());

        let inverted = Thresholds {
            moisture_min: 60.0,
            moisture_max: 40.0,
            ..Thresholds::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(StoreError::InvalidThresholds(_))
        ));

        let negative = Thresholds {
            nitrate_max: -1.0,
            ..Thresholds::default()
        };
        assert!(negative.validate().is_err());

        let nan = Thresholds {
            temperature_max: f64::NAN,
            ..Thresholds::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_field_patch_accepts_sensor_id_list() {
        // ---
        let patch: FieldPatch = serde_json::from_str(r#"{"sensors":["sensor1"]}"#).unwrap();
        assert_eq!(patch.sensor_ids, Some(vec!["sensor1".to_string()]));
        assert_eq!(patch.name, None);
    }

    #[test]
    fn test_action_units() {
        // ---
        assert_eq!(Action::Irrigate.units(), Units::LitresPerHectare);
        assert_eq!(Action::Fertilize.units(), Units::KilogramsPerHectare);
    }

    #[test]
    fn test_wire_names() {
        // ---
        let json = serde_json::to_value(Severity::Critical).unwrap();
        assert_eq!(json, "critical");

        let json = serde_json::to_value(Action::Irrigate).unwrap();
        assert_eq!(json, "IRRIGATE");

        let json = serde_json::to_value(Units::KilogramsPerHectare).unwrap();
        assert_eq!(json, "kg/ha");
    }

    #[test]
    fn test_readings_filter_accepts_camel_case() {
        // ---
        let filter: ReadingsFilter =
            serde_json::from_str(r#"{"fieldId":"field1","limit":5}"#).unwrap();
        assert_eq!(filter.field_id.as_deref(), Some("field1"));
        assert_eq!(filter.sensor_id, None);
        assert_eq!(filter.limit, Some(5));
    }
}
