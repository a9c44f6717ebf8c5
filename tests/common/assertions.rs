//! Custom assertion macros and utilities

use journey_sync::shared::entity::Entity;

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// `businessId` of every favorite, in view order
pub fn business_ids(favorites: &[Entity]) -> Vec<String> {
    favorites
        .iter()
        .filter_map(|f| f.get_str("businessId").map(str::to_string))
        .collect()
}

/// Ids of the given entities, in order
pub fn ids(entities: &[Entity]) -> Vec<String> {
    entities.iter().filter_map(Entity::id).collect()
}
