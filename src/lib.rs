pub mod api;
pub mod config;
pub mod feed;
pub mod fetch;
pub mod reconcile;
pub mod static_data;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
