use crate::core::hammer::SectorRecord;
use crate::types::{AttributeKind, AttributeValue, RingSpec, Station, StationSet};
use std::collections::HashMap;

/// Station attributes augmented with one column per compartment
#[derive(Debug, Clone, PartialEq)]
pub struct StationTable {
    pub name_field: String,
    pub elevation_field: String,
    /// Pass-through attribute fields of the station layer
    pub attributes: Vec<(String, AttributeKind)>,
    /// Compartment columns, ring by ring and partition by partition
    pub columns: Vec<String>,
    pub rows: Vec<StationRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationRow {
    pub station: Station,
    /// One value per entry of [`StationTable::attributes`]
    pub attributes: Vec<Option<AttributeValue>>,
    /// One value per entry of [`StationTable::columns`]
    pub values: Vec<Option<f64>>,
}

impl StationTable {
    /// One row per station of `set`, in order.
    ///
    /// Records are matched to rows by `station_index`, so stations sharing a
    /// name keep their own values.
    pub fn build(set: &StationSet, rings: &[RingSpec], records: &[SectorRecord]) -> Self {
        let columns: Vec<String> = rings
            .iter()
            .flat_map(|ring| (0..ring.num_compartments).map(move |i| ring.field_name(i)))
            .collect();
        let column_index: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        // Attributes named like a compartment column are replaced by the new values
        let kept: Vec<usize> = set
            .schema
            .attributes
            .iter()
            .enumerate()
            .filter_map(|(i, (name, _))| {
                if column_index.contains_key(name.as_str()) {
                    log::warn!("Station attribute {} is overwritten by the computed column", name);
                    None
                } else {
                    Some(i)
                }
            })
            .collect();
        let attributes = kept.iter().map(|&i| set.schema.attributes[i].clone()).collect();

        let mut rows: Vec<StationRow> = set
            .stations
            .iter()
            .map(|station| StationRow {
                station: station.clone(),
                attributes: kept
                    .iter()
                    .map(|&i| station.attributes.get(i).cloned().flatten())
                    .collect(),
                values: vec![None; columns.len()],
            })
            .collect();

        for record in records {
            let column = column_index.get(record.field_name().as_str()).copied();
            match (rows.get_mut(record.station_index), column) {
                (Some(row), Some(column)) => row.values[column] = record.half_difference,
                _ => log::warn!(
                    "Result for station #{} ({}) column {} has no place in the table",
                    record.station_index,
                    record.station_name,
                    record.field_name()
                ),
            }
        }

        Self {
            name_field: set.schema.name_field.clone(),
            elevation_field: set.schema.elevation_field.clone(),
            attributes,
            columns,
            rows,
        }
    }

    /// Value of `column` for the first station called `station_name`
    pub fn value(&self, station_name: &str, column: &str) -> Option<f64> {
        let row = self.rows.iter().position(|row| row.station.name == station_name)?;
        self.value_at(row, column)
    }

    /// Value of `column` in row `row`
    pub fn value_at(&self, row: usize, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|row| row.values[col])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hammer::{HammerParams, RingSectorAverager};
    use crate::types::{CoordinateSystem, DemRaster, GeoTransform, StationSchema};
    use ndarray::Array2;

    fn flat_dem(value: f32) -> DemRaster {
        DemRaster::new(
            "dem",
            Array2::from_elem((200, 200), value),
            GeoTransform::from_gdal([499_900.0, 1.0, 0.0, 4_500_100.0, 0.0, -1.0]),
            None,
            CoordinateSystem::Unspecified,
        )
    }

    #[test]
    fn test_table_columns_and_values() {
        let stations = vec![
            Station::new("A", 500_000.0, 4_500_000.0, Some(100.0)),
            Station::new("B", 500_000.0, 4_500_000.0, None),
        ];
        let rings = vec![
            RingSpec::new(2.0, 16.6, 4).unwrap(),
            RingSpec::new(16.6, 53.3, 6).unwrap(),
        ];
        let dem = flat_dem(104.0);
        let averager = RingSectorAverager::new(HammerParams {
            rings: rings.clone(),
            ..HammerParams::default()
        })
        .unwrap();
        let records = averager.process(&stations, &[dem]).unwrap();

        let set = StationSet::new(stations, CoordinateSystem::Unspecified);
        let table = StationTable::build(&set, &rings, &records);
        assert_eq!(table.columns.len(), 10);
        assert_eq!(table.columns[0], "2_17_4.1");
        assert_eq!(table.columns[9], "17_53_6.6");
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows[0].values.iter().all(|v| *v == Some(2.0)));
        assert!(table.rows[1].values.iter().all(|v| v.is_none()));
        assert_eq!(table.value("A", "17_53_6.3"), Some(2.0));
        assert_eq!(table.value("A", "missing"), None);
    }

    #[test]
    fn test_columns_without_records_are_null() {
        let stations = vec![Station::new("A", 0.0, 0.0, Some(0.0))];
        let rings = vec![RingSpec::new(53.3, 170.1, 6).unwrap()];
        let set = StationSet::new(stations, CoordinateSystem::Unspecified);
        let table = StationTable::build(&set, &rings, &[]);
        assert_eq!(table.columns.len(), 6);
        assert!(table.rows[0].values.iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_stations_sharing_a_name_keep_their_values() {
        let stations = vec![
            Station::new("A", 500_000.0, 4_500_000.0, Some(100.0)),
            Station::new("A", 500_010.0, 4_500_010.0, Some(80.0)),
        ];
        let rings = vec![RingSpec::new(10.0, 20.0, 4).unwrap()];
        let averager = RingSectorAverager::new(HammerParams {
            rings: rings.clone(),
            ..HammerParams::default()
        })
        .unwrap();
        let records = averager.process(&stations, &[flat_dem(120.0)]).unwrap();

        let set = StationSet::new(stations, CoordinateSystem::Unspecified);
        let table = StationTable::build(&set, &rings, &records);
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows[0].values.iter().all(|v| *v == Some(10.0)));
        assert!(table.rows[1].values.iter().all(|v| *v == Some(20.0)));
        assert_eq!(table.value_at(1, "10_20_4.2"), Some(20.0));
    }

    #[test]
    fn test_attributes_pass_through() {
        let stations = vec![
            Station::new("A", 0.0, 0.0, Some(1.0)).with_attributes(vec![
                Some(AttributeValue::Real(979_812.4)),
                Some(AttributeValue::Real(5.0)),
                Some(AttributeValue::Text("ok".to_string())),
            ]),
            Station::new("B", 0.0, 0.0, Some(1.0)).with_attributes(vec![None, None, None]),
        ];
        let set = StationSet {
            stations,
            coordinate_system: CoordinateSystem::Unspecified,
            schema: StationSchema {
                name_field: "Station".to_string(),
                elevation_field: "Z".to_string(),
                attributes: vec![
                    ("Gravity".to_string(), AttributeKind::Real),
                    ("2_17_4.1".to_string(), AttributeKind::Real),
                    ("Remark".to_string(), AttributeKind::Text),
                ],
            },
        };
        let rings = vec![RingSpec::new(2.0, 16.6, 4).unwrap()];
        let table = StationTable::build(&set, &rings, &[]);

        assert_eq!(table.name_field, "Station");
        assert_eq!(table.elevation_field, "Z");
        // The stale compartment column from a previous run is dropped
        assert_eq!(
            table.attributes,
            vec![
                ("Gravity".to_string(), AttributeKind::Real),
                ("Remark".to_string(), AttributeKind::Text)
            ]
        );
        assert_eq!(
            table.rows[0].attributes,
            vec![
                Some(AttributeValue::Real(979_812.4)),
                Some(AttributeValue::Text("ok".to_string()))
            ]
        );
        assert_eq!(table.rows[1].attributes, vec![None, None]);
    }
}
