//! Spatial search widget.

use crate::widget::{Widget, WidgetContext};

/// Local parameter names set on `q` by a spatial query.
const SPATIAL_LOCALS: [&str; 7] = ["type", "lat", "long", "radius", "unit", "calc", "threadCount"];

/// A point-radius search.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialQuery {
    pub lat: f64,
    pub long: f64,
    pub radius: f64,
    pub unit: Option<String>,
    pub calc: Option<String>,
    pub thread_count: Option<u32>,
}

impl SpatialQuery {
    pub fn new(lat: f64, long: f64, radius: f64) -> Self {
        Self {
            lat,
            long,
            radius,
            unit: None,
            calc: None,
            thread_count: None,
        }
    }
}

/// Base for widgets that restrict results to an area.
///
/// The restriction is carried as local parameters on `q`, so it travels with
/// the query and is persisted along with it.
pub struct SpatialWidget {
    id: String,
}

impl SpatialWidget {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Apply a spatial restriction, replacing any previous one.
    pub fn set(&self, ctx: &WidgetContext, query: &SpatialQuery) {
        ctx.with_store(|store| {
            let q = store.get("q");
            for key in SPATIAL_LOCALS {
                q.remove_local(key);
            }
            q.set_local("type", "spatial");
            q.set_local("lat", query.lat.to_string());
            q.set_local("long", query.long.to_string());
            q.set_local("radius", query.radius.to_string());
            if let Some(unit) = &query.unit {
                q.set_local("unit", unit.clone());
            }
            if let Some(calc) = &query.calc {
                q.set_local("calc", calc.clone());
            }
            if let Some(threads) = query.thread_count {
                q.set_local("threadCount", threads.to_string());
            }
        });
    }

    /// Remove the spatial restriction.
    pub fn clear(&self, ctx: &WidgetContext) {
        ctx.with_store(|store| {
            if !store.contains("q") {
                return;
            }
            let q = store.get("q");
            for key in SPATIAL_LOCALS {
                q.remove_local(key);
            }
        });
    }
}

impl Widget for SpatialWidget {
    fn id(&self) -> &str {
        &self.id
    }
}
