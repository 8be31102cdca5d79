#[cfg(test)]
mod tests {
    use crate::error::TilingError;
    use crate::parsing::skymap_parser::{parse_skymap_json, parse_skymap_json_str};
    use crate::skymap::PixelOrdering;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn layer(value: &str) -> String {
        vec![value; 12].join(", ")
    }

    fn skymap_json(ordering: Option<&str>) -> String {
        let ordering = ordering
            .map(|o| format!("\"ordering\": \"{}\",", o))
            .unwrap_or_default();
        format!(
            r#"{{ {} "prob": [{}], "distmu": [{}], "distsigma": [{}], "distnorm": [{}] }}"#,
            ordering,
            layer("0.0833"),
            layer("40.0"),
            layer("8.0"),
            layer("0.0005")
        )
    }

    /// Test parsing a minimal nside=1 map defaults to RING ordering
    #[test]
    fn test_parse_defaults_to_ring() {
        let map = parse_skymap_json_str(&skymap_json(None)).unwrap();
        assert_eq!(map.ordering, PixelOrdering::Ring);
        assert_eq!(map.npix(), 12);
        assert_eq!(map.resolution().unwrap().nside(), 1);
    }

    /// Test NESTED ordering is honoured
    #[test]
    fn test_parse_nested() {
        let map = parse_skymap_json_str(&skymap_json(Some("NESTED"))).unwrap();
        assert_eq!(map.ordering, PixelOrdering::Nested);
    }

    /// Test that null pixels become NaN instead of failing
    #[test]
    fn test_null_pixels_are_nan() {
        let json = skymap_json(None).replacen("40.0", "null", 1);
        let map = parse_skymap_json_str(&json).unwrap();
        assert!(map.distmu[0].is_nan());
        assert_eq!(map.distmu[1], 40.0);
    }

    /// Test the error names the JSON path of a bad value
    #[test]
    fn test_error_reports_path() {
        let json = skymap_json(None).replacen("8.0", "\"wide\"", 1);
        let err = parse_skymap_json_str(&json).unwrap_err();
        match err {
            TilingError::MapFormat(msg) => assert!(msg.contains("distsigma"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Test a missing layer is a format error
    #[test]
    fn test_missing_layer() {
        let json = r#"{"prob": [0.1], "distmu": [1.0], "distsigma": [1.0]}"#;
        assert!(matches!(
            parse_skymap_json_str(json),
            Err(TilingError::MapFormat(_))
        ));
    }

    /// Test pixel counts that are not 12 * nside^2 are rejected
    #[test]
    fn test_invalid_pixel_count() {
        let json = r#"{"prob": [0.5, 0.5], "distmu": [1.0, 1.0],
                       "distsigma": [1.0, 1.0], "distnorm": [1.0, 1.0]}"#;
        assert!(matches!(
            parse_skymap_json_str(json),
            Err(TilingError::InvalidResolution(_))
        ));
    }

    /// Test malformed JSON
    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_skymap_json_str("{ not json"),
            Err(TilingError::MapFormat(_))
        ));
    }

    /// Test reading from a file
    #[test]
    fn test_parse_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(skymap_json(Some("RING")).as_bytes()).unwrap();

        let map = parse_skymap_json(file.path()).unwrap();
        assert_eq!(map.npix(), 12);
    }

    #[test]
    fn test_missing_file() {
        let result = parse_skymap_json(std::path::Path::new("/nonexistent/skymap.json"));
        assert!(matches!(result, Err(TilingError::Io(_))));
    }
}
