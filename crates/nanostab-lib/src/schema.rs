use serde::{Deserialize, Serialize};

/// Name of the image-series test type in the dataset.
pub const IMAGE_SERIES_TEST: &str = "Cellules";

/// Characterization techniques recorded in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestType {
    #[serde(rename = "UVVIS")]
    UvVis,
    #[serde(rename = "DLS")]
    Dls,
    #[serde(rename = "ELISA")]
    Elisa,
    /// Microscopy images keyed by cell type; carries no numeric fields.
    #[serde(rename = "Cellules")]
    CellImages,
}

impl TestType {
    pub const ALL: [TestType; 4] = [
        TestType::UvVis,
        TestType::Dls,
        TestType::Elisa,
        TestType::CellImages,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|test| test.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            TestType::UvVis => "UVVIS",
            TestType::Dls => "DLS",
            TestType::Elisa => "ELISA",
            TestType::CellImages => IMAGE_SERIES_TEST,
        }
    }

    pub fn is_image_series(self) -> bool {
        matches!(self, TestType::CellImages)
    }

    pub fn parameters(self) -> &'static [Parameter] {
        match self {
            TestType::UvVis => UVVIS_PARAMETERS,
            TestType::Dls => DLS_PARAMETERS,
            TestType::Elisa => ELISA_PARAMETERS,
            TestType::CellImages => &[],
        }
    }
}

/// One numeric field a test record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub key: &'static str,
    pub label: &'static str,
    /// Empty for dimensionless values.
    pub unit: &'static str,
}

const PARTICLES_PER_ML: &str = "particles/mL";
const OPTICAL_DENSITY: &str = "OD";

const UVVIS_PARAMETERS: &[Parameter] = &[
    Parameter {
        key: "c_avg",
        label: "Average concentration",
        unit: PARTICLES_PER_ML,
    },
    Parameter {
        key: "c_peak",
        label: "Peak concentration",
        unit: PARTICLES_PER_ML,
    },
    Parameter {
        key: "perc_quality",
        label: "Quality",
        unit: "%",
    },
];

const DLS_PARAMETERS: &[Parameter] = &[
    Parameter {
        key: "Z-AVG",
        label: "Z-average",
        unit: "nm",
    },
    Parameter {
        key: "PolyDis",
        label: "Polydispersity",
        unit: "",
    },
];

const ELISA_PARAMETERS: &[Parameter] = &[
    Parameter {
        key: "positive",
        label: "Positive",
        unit: OPTICAL_DENSITY,
    },
    Parameter {
        key: "negative",
        label: "Negative",
        unit: OPTICAL_DENSITY,
    },
    Parameter {
        key: "control1",
        label: "Control 1",
        unit: OPTICAL_DENSITY,
    },
    Parameter {
        key: "control2",
        label: "Control 2",
        unit: OPTICAL_DENSITY,
    },
];

/// Displayable numeric parameters of `test`, in display order.
/// Unknown test names have none.
pub fn test_parameter_schema(test: &str) -> &'static [Parameter] {
    TestType::from_name(test)
        .map(TestType::parameters)
        .unwrap_or(&[])
}

/// Schema entry for `key` under `test`, if the field is known.
pub fn find_parameter(test: &str, key: &str) -> Option<&'static Parameter> {
    test_parameter_schema(test)
        .iter()
        .find(|param| param.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantitative_tests_have_parameters() {
        let keys: Vec<_> = test_parameter_schema("UVVIS").iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["c_avg", "c_peak", "perc_quality"]);
        assert_eq!(test_parameter_schema("DLS").len(), 2);
        assert!(test_parameter_schema("ELISA")
            .iter()
            .all(|p| p.unit == OPTICAL_DENSITY));
    }

    #[test]
    fn image_series_and_unknown_tests_are_empty() {
        assert!(test_parameter_schema(IMAGE_SERIES_TEST).is_empty());
        assert!(test_parameter_schema("XRD").is_empty());
        assert!(test_parameter_schema("uvvis").is_empty());
    }

    #[test]
    fn finds_units_by_key() {
        assert_eq!(find_parameter("DLS", "Z-AVG").map(|p| p.unit), Some("nm"));
        assert_eq!(find_parameter("DLS", "PolyDis").map(|p| p.unit), Some(""));
        assert!(find_parameter("DLS", "c_avg").is_none());
    }

    #[test]
    fn names_round_trip_through_lookup() {
        for test in TestType::ALL {
            assert_eq!(TestType::from_name(test.name()), Some(test));
        }
        assert!(TestType::CellImages.is_image_series());
    }
}
