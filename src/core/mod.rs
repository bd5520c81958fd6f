//! Core terrain-correction processing modules

pub mod sector;
pub mod sampling;
pub mod selection;
pub mod hammer;
pub mod table;
pub mod survey;

// Re-export main types
pub use sector::{generate_sector_polygon, generate_ring_sectors, SectorPolygon, DEFAULT_ARC_STEP_DEG};
pub use sampling::{sample_dem, sample_dem_with, DemSample};
pub use selection::{DemSelection, SelectedSample};
pub use hammer::{
    compute_elevation_difference, validate_rings, DifferenceMode, ElevationSource, HammerParams,
    RingSectorAverager, SectorRecord, MAX_ROUND_DECIMALS,
};
pub use table::{StationRow, StationTable};
pub use survey::{check_coordinate_systems, run_survey, RunSummary};
