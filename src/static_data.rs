//! Static route and direction reference data.
//!
//! [`RouteIndex`] is built once from the `routes.txt` and `directions.txt`
//! tables and is read-only afterwards, so it can be shared behind an `Arc`
//! between concurrent requests without locking.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const ROUTES_FILE: &str = "routes.txt";
pub const DIRECTIONS_FILE: &str = "directions.txt";

/// Failure to build a [`RouteIndex`]. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// A single row of `routes.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRecord {
    pub route_id: String,
    pub agency_id: String,
    pub route_short_name: String,
    pub route_long_name: String,
}

/// A single row of `directions.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Direction {
    #[serde(rename = "direction")]
    pub text: String,
    #[serde(rename = "direction_id")]
    pub id: u32,
    pub route_id: String,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub id: String,
    pub agency_id: String,
    pub short_name: String,
    pub long_name: String,
    directions: HashMap<u32, Direction>,
}

impl Route {
    fn from_record(record: RouteRecord) -> Self {
        Self {
            id: record.route_id,
            agency_id: record.agency_id,
            short_name: record.route_short_name,
            long_name: record.route_long_name,
            directions: HashMap::new(),
        }
    }

    /// Returns the direction with the given id, if this route has one.
    pub fn direction(&self, direction_id: u32) -> Option<&Direction> {
        self.directions.get(&direction_id)
    }

    pub fn directions(&self) -> impl Iterator<Item = &Direction> {
        self.directions.values()
    }
}

/// Entry of the `/getRoutes` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub short_name: String,
    pub long_name: String,
}

/// Route id → [`Route`] lookup.
#[derive(Debug, Default)]
pub struct RouteIndex {
    routes: HashMap<String, Route>,
}

impl RouteIndex {
    /// Loads `routes.txt` and `directions.txt` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if either file is missing, unreadable, or lacks
    /// a required column.
    #[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let routes_path = dir.join(ROUTES_FILE);
        let directions_path = dir.join(DIRECTIONS_FILE);

        let routes = read_table(open(&routes_path)?, &routes_path)?;
        let directions = read_table(open(&directions_path)?, &directions_path)?;

        Ok(Self::from_records(routes, directions))
    }

    /// Like [`RouteIndex::load`], reading the two tables from arbitrary sources.
    pub fn from_readers<R: Read, D: Read>(routes: R, directions: D) -> Result<Self, LoadError> {
        let routes = read_table(routes, Path::new(ROUTES_FILE))?;
        let directions = read_table(directions, Path::new(DIRECTIONS_FILE))?;

        Ok(Self::from_records(routes, directions))
    }

    /// Joins directions onto routes. Directions whose `route_id` matches no
    /// route are dropped.
    pub fn from_records(routes: Vec<RouteRecord>, directions: Vec<Direction>) -> Self {
        let mut index: HashMap<String, Route> = HashMap::with_capacity(routes.len());

        for record in routes {
            let route = Route::from_record(record);
            if let Some(previous) = index.insert(route.id.clone(), route) {
                warn!(route_id = %previous.id, "Duplicate route id, keeping last row");
            }
        }

        let total_directions = directions.len();
        let mut dropped = 0usize;

        for direction in directions {
            match index.get_mut(&direction.route_id) {
                Some(route) => {
                    route.directions.insert(direction.id, direction);
                }
                None => {
                    debug!(
                        route_id = %direction.route_id,
                        direction_id = direction.id,
                        "No route for direction, dropping"
                    );
                    dropped += 1;
                }
            }
        }

        info!(
            routes = index.len(),
            directions = total_directions - dropped,
            dropped_directions = dropped,
            "Static data loaded"
        );

        Self { routes: index }
    }

    pub fn lookup(&self, route_id: &str) -> Option<&Route> {
        self.routes.get(route_id)
    }

    /// Convenience for `lookup(route_id)` followed by [`Route::direction`].
    pub fn lookup_direction(&self, route_id: &str, direction_id: u32) -> Option<&Direction> {
        self.lookup(route_id)?.direction(direction_id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Routes ordered by short name (byte-wise), ties broken by route id so
    /// the order is stable across loads.
    pub fn sorted_routes(&self) -> Vec<&Route> {
        let mut routes: Vec<&Route> = self.routes.values().collect();
        routes.sort_by(|a, b| a.short_name.cmp(&b.short_name).then_with(|| a.id.cmp(&b.id)));
        routes
    }

    /// All routes as `{short_name, long_name}`, in [`RouteIndex::sorted_routes`] order.
    pub fn summaries(&self) -> Vec<RouteSummary> {
        self.sorted_routes()
            .into_iter()
            .map(|route| RouteSummary {
                short_name: route.short_name.clone(),
                long_name: route.long_name.clone(),
            })
            .collect()
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn read_table<T: DeserializeOwned, R: Read>(reader: R, path: &Path) -> Result<Vec<T>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: T = result.map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "Read table");
    Ok(rows)
}
