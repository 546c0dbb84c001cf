use std::{collections::BTreeMap, path::Path};

use serde::de::DeserializeOwned;

use crate::error::FleetError;

pub mod bin;
pub mod records;
pub mod vehicle;

pub type MapType<K, V> = BTreeMap<K, V>;

/// Identifier of an entity kept in one of the fleet maps.
pub trait EntityId: Copy + Ord {
    fn not_found(self) -> FleetError;
}

/// Id-keyed lookups that report unknown ids as [`FleetError`]s.
pub trait Map<K: EntityId, V> {
    fn find(&self, id: K) -> Result<&V, FleetError>;
    fn find_mut(&mut self, id: K) -> Result<&mut V, FleetError>;
}

impl<K: EntityId, V> Map<K, V> for MapType<K, V> {
    fn find(&self, id: K) -> Result<&V, FleetError> {
        self.get(&id).ok_or_else(|| id.not_found())
    }

    fn find_mut(&mut self, id: K) -> Result<&mut V, FleetError> {
        self.get_mut(&id).ok_or_else(|| id.not_found())
    }
}

#[macro_export]
macro_rules! define_map {
    ($key:ty, $value:ty, $name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name($crate::model::MapType<$key, $value>);

        impl From<$crate::model::MapType<$key, $value>> for $name {
            fn from(map: $crate::model::MapType<$key, $value>) -> Self {
                Self(map)
            }
        }

        impl FromIterator<$value> for $name {
            fn from_iter<I: IntoIterator<Item = $value>>(iter: I) -> Self {
                Self(iter.into_iter().map(|v| (v.id, v)).collect())
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::model::MapType<$key, $value>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}

pub(crate) fn read_csv<T>(path: impl AsRef<Path>) -> anyhow::Result<Vec<T>>
where
    T: DeserializeOwned,
{
    let mut reader = csv::Reader::from_path(path)?;
    let records: csv::Result<Vec<T>> = reader.deserialize().collect();
    Ok(records?)
}
