use eeindex_core::models::Footprint;

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    /// All errors joined into one line
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.location, e.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Check ring structure and coordinate ranges of a footprint
pub fn validate_footprint(footprint: &Footprint) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if footprint.polygons.is_empty() {
        result.add_error("footprint".to_string(), "has no polygons".to_string());
        return result;
    }

    for (p, rings) in footprint.polygons.iter().enumerate() {
        if rings.is_empty() {
            result.add_error(format!("polygon[{}]", p), "has no exterior ring".to_string());
            continue;
        }

        for (r, ring) in rings.iter().enumerate() {
            let location = format!("polygon[{}] ring[{}]", p, r);

            if ring.len() < 4 {
                result.add_error(
                    location.clone(),
                    format!("ring must have at least 4 positions, found {}", ring.len()),
                );
            }

            if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
                if first != last {
                    result.add_error(
                        location.clone(),
                        "ring must be closed (first position == last position)".to_string(),
                    );
                }
            }

            for (i, [lon, lat]) in ring.iter().enumerate() {
                if !lon.is_finite() || !lat.is_finite() {
                    result.add_error(format!("{}[{}]", location, i), "coordinates must be finite".to_string());
                } else if !(-180.0..=180.0).contains(lon) || !(-90.0..=90.0).contains(lat) {
                    result.add_error(
                        format!("{}[{}]", location, i),
                        format!("({}, {}) is outside the lon/lat range", lon, lat),
                    );
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_square() {
        let footprint = Footprint::from_polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]]);
        assert!(validate_footprint(&footprint).is_valid);
    }

    #[test]
    fn test_short_ring_and_range() {
        let footprint = Footprint::from_polygon(vec![vec![[0.0, 0.0], [200.0, 0.0], [0.0, 0.0]]]);
        let result = validate_footprint(&footprint);

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
        assert!(result.summary().contains("at least 4 positions"));
    }

    #[test]
    fn test_empty_footprint() {
        let result = validate_footprint(&Footprint { polygons: Vec::new() });
        assert!(!result.is_valid);
    }
}
