//! In-memory house repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{HouseName, HouseRecord, HouseRepository, RepositoryError};

/// House repository keyed by house name
#[derive(Default)]
pub struct InMemoryHouseRepository {
    houses: Mutex<HashMap<String, HouseRecord>>,
}

impl InMemoryHouseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, e.g. with houses that should exist at startup
    pub fn with_houses(houses: impl IntoIterator<Item = HouseRecord>) -> Self {
        let houses = houses
            .into_iter()
            .map(|house| (house.name.as_str().to_string(), house))
            .collect();
        Self {
            houses: Mutex::new(houses),
        }
    }
}

#[async_trait]
impl HouseRepository for InMemoryHouseRepository {
    async fn find_by_name(&self, name: &HouseName) -> Result<Option<HouseRecord>, RepositoryError> {
        let houses = self.houses.lock().await;
        Ok(houses.get(name.as_str()).cloned())
    }

    async fn add(&self, house: HouseRecord) -> Result<(), RepositoryError> {
        let mut houses = self.houses.lock().await;
        let key = house.name.as_str().to_string();
        if houses.contains_key(&key) {
            return Err(RepositoryError::DuplicateHouse(key));
        }
        houses.insert(key, house);
        Ok(())
    }
}
