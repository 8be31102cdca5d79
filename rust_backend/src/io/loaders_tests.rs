#[cfg(test)]
mod tests {
    use crate::algorithms::selector::{SelectorSettings, TileSelector};
    use crate::core::domain::{SelectionCriteria, SelectionKind, StopReason};
    use crate::io::loaders::{
        CatalogLoader, CatalogSourceType, EventInfo, SkymapLoader, TilingReport,
    };
    use crate::parsing::catalog_parser::CatalogSchema;
    use crate::services::alerts::NullAlertSink;
    use crate::services::horizon::FixedHorizon;
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    const CATALOG_CSV: &str = "\
SimbadName,_RAJ2000,_DEJ2000,cz
NGC 4993,197.448,-23.384,2958
NGC 4970,196.854,-24.005,2886
ESO 508-19,197.140,-24.262,3010
";

    /// Helper to create a temp file with the given suffix
    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn layer(value: &str, n: usize) -> String {
        vec![value; n].join(", ")
    }

    fn skymap_json(npix: usize) -> String {
        format!(
            r#"{{ "prob": [{}], "distmu": [{}], "distsigma": [{}], "distnorm": [{}] }}"#,
            layer("0.0833", npix),
            layer("40.0", npix),
            layer("8.0", npix),
            layer("0.0005", npix)
        )
    }

    /// Test format detection picks the CSV parser
    #[test]
    fn test_load_csv_by_extension() {
        let file = temp_file(".csv", CATALOG_CSV);
        let result =
            CatalogLoader::load_from_file(file.path(), "test", &CatalogSchema::default()).unwrap();

        assert_eq!(result.source_type, CatalogSourceType::Csv);
        assert_eq!(result.num_candidates, 3);
        assert!(result.skipped.is_empty());
        assert_eq!(result.catalog.candidates()[0].name, "NGC 4993");
    }

    /// Test format detection picks the JSON parser, case-insensitively
    #[test]
    fn test_load_json_by_extension() {
        let json = r#"[
            {"SimbadName": "NGC 4993", "_RAJ2000": 197.448, "_DEJ2000": -23.384, "cz": 2958},
            {"SimbadName": "NGC 4970", "_RAJ2000": "196.854", "_DEJ2000": "-24.005", "cz": "2886"}
        ]"#;
        let file = temp_file(".JSON", json);
        let result =
            CatalogLoader::load_from_file(file.path(), "test", &CatalogSchema::default()).unwrap();

        assert_eq!(result.source_type, CatalogSourceType::Json);
        assert_eq!(result.num_candidates, 2);
    }

    /// Test unsupported and missing extensions are rejected
    #[test]
    fn test_unsupported_extension() {
        let file = temp_file(".fits", "SIMPLE");
        let err = CatalogLoader::load_from_file(file.path(), "test", &CatalogSchema::default())
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));

        let bare = Builder::new().tempfile().unwrap();
        let err = CatalogLoader::load_from_file(bare.path(), "test", &CatalogSchema::default())
            .unwrap_err();
        assert!(err.to_string().contains("no extension"));
    }

    /// Test skymap loading rejects a pixel count that is not 12·nside²
    #[test]
    fn test_skymap_loader_validates_resolution() {
        let good = temp_file(".json", &skymap_json(12));
        let map = SkymapLoader::load_from_file(good.path()).unwrap();
        assert_eq!(map.npix(), 12);

        let err = SkymapLoader::load_from_str(&skymap_json(11)).unwrap_err();
        assert!(format!("{:#}", err).contains("resolution"), "{:#}", err);
    }

    /// Test the report carries run metadata and round-trips through a file
    #[test]
    fn test_report_write_and_read() {
        let file = temp_file(".csv", CATALOG_CSV);
        let loaded =
            CatalogLoader::load_from_file(file.path(), "J/ApJS/199/26/table3", &CatalogSchema::default())
                .unwrap();
        let filtered = loaded.catalog.clone();

        let sunset = Utc.with_ymd_and_hms(2017, 8, 17, 23, 0, 0).unwrap();
        let sunrise = Utc.with_ymd_and_hms(2017, 8, 18, 9, 0, 0).unwrap();
        let horizon = FixedHorizon::full_sky(sunset, sunrise);
        let mut selector = TileSelector::new(SelectorSettings {
            selection: SelectionCriteria::new(SelectionKind::MaxTiles, 1),
            event_prefix: "GW170817".to_string(),
            ..SelectorSettings::default()
        });
        let outcome = selector.run(filtered.clone(), sunset, &horizon, &NullAlertSink);

        let report = TilingReport::new(
            EventInfo {
                name: "GW170817".to_string(),
                event_type: "Initial".to_string(),
            },
            &loaded,
            &filtered,
            outcome,
        );
        assert_eq!(report.stop_reason, StopReason::Budget);
        assert_eq!(report.tiles.len(), 1);
        assert_eq!(report.catalog_checksum, filtered.checksum());
        assert_eq!(report.catalog_checksum.len(), 64);
        assert!(report.tiles[0].name().starts_with("GW170817_"));

        let out = Builder::new().suffix(".json").tempfile().unwrap();
        report.write_to_file(out.path()).unwrap();
        let back = TilingReport::read_from_file(out.path()).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.tiles, report.tiles);

        let value: serde_json::Value =
            serde_json::from_str(&report.to_json_string().unwrap()).unwrap();
        assert_eq!(value["stop_reason"], "budget");
        assert_eq!(value["catalog_identifier"], "J/ApJS/199/26/table3");
        assert!(value["tiles"][0]["covered"].is_array());
        assert!(value["tiles"][0]["exposure"].is_number());
        assert_eq!(value["tiles"][0]["mode"], "HDR");
        assert_eq!(value["tiles"][0]["min_nexp"], 1);
        assert_eq!(value["tiles"][0]["exp_set_size"], 1);
        assert_eq!(value["tiles"][0]["min_mag"], 10.0);
        assert_eq!(value["tiles"][0]["max_mag"], 21.0);

        let galaxies = value["tiles"][0]["galaxies"].as_array().unwrap();
        let covered = value["tiles"][0]["covered"].as_array().unwrap();
        assert_eq!(galaxies.len(), covered.len());
        assert!(galaxies.iter().all(|g| g["name"].is_string() && g["position"].is_string()));
    }
}
