//! Asynchronous data access facade over the shared in-memory store.
//!
//! Every call first waits out the configured [`Latency`] and then resolves
//! against the store under a single lock acquisition. Callers get owned
//! copies; nothing returned aliases the store. Signatures mirror the HTTP
//! surface in `routes` so a networked backend can replace the store without
//! touching callers.

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::latency::Latency;
use crate::models::{
    Alert, Field, FieldPatch, Kpis, NewField, Reading, ReadingsFilter, Recommendation,
    SensorStatus, Thresholds, ThresholdsPatch,
};
use crate::store::SharedStore;

// ---

#[derive(Debug, Clone)]
pub struct DataApi {
    // ---
    store: SharedStore,
    latency: Latency,
}

impl DataApi {
    // ---
    pub fn new(store: SharedStore, latency: Latency) -> Self {
        DataApi { store, latency }
    }

    pub async fn fetch_kpis(&self) -> Kpis {
        self.latency.wait().await;
        self.store.read().await.kpis().clone()
    }

    pub async fn fetch_alerts(&self) -> Vec<Alert> {
        self.latency.wait().await;
        self.store.read().await.alerts().to_vec()
    }

    pub async fn fetch_sensors(&self) -> Vec<SensorStatus> {
        self.latency.wait().await;
        self.store.read().await.sensor_statuses()
    }

    pub async fn fetch_fields(&self) -> Vec<Field> {
        self.latency.wait().await;
        self.store.read().await.fields()
    }

    pub async fn fetch_field_by_id(&self, id: &str) -> Result<Field, StoreError> {
        self.latency.wait().await;
        self.store.read().await.field(id).cloned()
    }

    pub async fn fetch_readings(&self, filter: &ReadingsFilter) -> Vec<Reading> {
        // ---
        self.latency.wait().await;
        let readings = self.store.read().await.readings(filter);
        debug!("fetch_readings {:?} -> {} readings", filter, readings.len());
        readings
    }

    pub async fn fetch_recommendations(&self, field_id: &str) -> Vec<Recommendation> {
        self.latency.wait().await;
        self.store.read().await.recommendations_for(field_id)
    }

    /// Create a field with a generated id and no sensors.
    pub async fn add_field(&self, data: NewField) -> Field {
        // ---
        self.latency.wait().await;
        let field = Field {
            id: Uuid::new_v4().to_string(),
            name: data.name,
            crop: data.crop,
            lat: data.lat,
            lng: data.lng,
            sensors: Vec::new(),
        };
        self.store.write().await.insert_field(field.clone());
        info!("Created field {} ({})", field.id, field.name);
        field
    }

    pub async fn update_field(&self, id: &str, patch: FieldPatch) -> Result<Field, StoreError> {
        // ---
        self.latency.wait().await;
        let field = self.store.write().await.update_field(id, patch)?;
        info!("Updated field {}", id);
        Ok(field)
    }

    /// Delete a field. Deleting an id that is already gone is `NotFound`.
    pub async fn delete_field(&self, id: &str) -> Result<(), StoreError> {
        // ---
        self.latency.wait().await;
        self.store.write().await.remove_field(id)?;
        info!("Deleted field {}", id);
        Ok(())
    }

    pub async fn fetch_thresholds(&self, field_id: &str) -> Result<Thresholds, StoreError> {
        self.latency.wait().await;
        self.store.read().await.thresholds(field_id).cloned()
    }

    pub async fn update_thresholds(
        &self,
        field_id: &str,
        patch: ThresholdsPatch,
    ) -> Result<Thresholds, StoreError> {
        // ---
        self.latency.wait().await;
        let thresholds = self
            .store
            .write()
            .await
            .update_thresholds(field_id, patch)?;
        info!("Updated thresholds for field {}", field_id);
        Ok(thresholds)
    }
}
