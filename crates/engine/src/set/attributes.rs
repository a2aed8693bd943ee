use std::fmt;

use thiserror::Error;

use crate::region::{Color, ExactSearchMode, RegionAttribute};

/// Numeric slots of one attribute group, in file order after the name line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeField {
    Alpha,
    Red,
    Green,
    Blue,
}

impl fmt::Display for AttributeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttributeField::Alpha => "alpha",
            AttributeField::Red => "red",
            AttributeField::Green => "green",
            AttributeField::Blue => "blue",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeFileError {
    #[error("attribute file is empty; expected a threshold line")]
    MissingThresholdLine,
    #[error("threshold line '{content}' is not a valid number")]
    InvalidThreshold { content: String },
    #[error("attribute '{name}': {field} line is missing")]
    MissingField { name: String, field: AttributeField },
    #[error("attribute '{name}': {field} line '{content}' is not a valid number")]
    InvalidField {
        name: String,
        field: AttributeField,
        content: String,
    },
}

/// Parses one region's attribute file.
///
/// Format, one token per line: a float threshold `E` (`0` disables exact
/// search, anything else enables it with that threshold), then repeating
/// five-line groups of `name`, `alpha`, `red`, `green`, `blue` until end of
/// input. A numeric field greater than `1` is divided by `255`, otherwise
/// used as-is. Attribute order is file order and is significant downstream
/// (first declared wins nearest-match ties), so it is preserved exactly.
///
/// Any missing or non-numeric line inside a group fails the whole file; no
/// partial attribute list is ever returned.
pub fn parse_attribute_file(
    raw: &str,
) -> Result<(ExactSearchMode, Vec<RegionAttribute>), AttributeFileError> {
    let mut lines = raw.lines();
    let threshold_line = lines
        .next()
        .ok_or(AttributeFileError::MissingThresholdLine)?;
    let threshold = threshold_line.trim().parse::<f32>().map_err(|_| {
        AttributeFileError::InvalidThreshold {
            content: threshold_line.to_string(),
        }
    })?;
    let search_mode = if threshold == 0.0 {
        ExactSearchMode::default()
    } else {
        ExactSearchMode {
            enabled: true,
            threshold,
        }
    };

    let mut attributes = Vec::new();
    while let Some(name) = lines.next() {
        let alpha = next_numeric(&mut lines, name, AttributeField::Alpha)?;
        let red = next_numeric(&mut lines, name, AttributeField::Red)?;
        let green = next_numeric(&mut lines, name, AttributeField::Green)?;
        let blue = next_numeric(&mut lines, name, AttributeField::Blue)?;
        attributes.push(RegionAttribute {
            name: name.to_string(),
            color: Color {
                r: normalize(red),
                g: normalize(green),
                b: normalize(blue),
                a: normalize(alpha),
            },
            // The raw alpha magnitude, not the normalized channel.
            value: alpha,
        });
    }

    Ok((search_mode, attributes))
}

fn normalize(field: f32) -> f32 {
    if field > 1.0 {
        field / 255.0
    } else {
        field
    }
}

fn next_numeric<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    name: &str,
    field: AttributeField,
) -> Result<f32, AttributeFileError> {
    let line = lines.next().ok_or_else(|| AttributeFileError::MissingField {
        name: name.to_string(),
        field,
    })?;
    line.trim()
        .parse::<f32>()
        .map_err(|_| AttributeFileError::InvalidField {
            name: name.to_string(),
            field,
            content: line.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f32, expected: f32) -> bool {
        (actual - expected).abs() < 1e-6
    }

    #[test]
    fn parses_threshold_and_groups_in_file_order() {
        let raw = "5.0\nHighlands\n200\n10\n20\n30\nLowlands\n0.5\n0.1\n0.2\n0.3\n";
        let (mode, attributes) = parse_attribute_file(raw).expect("parse");

        assert!(mode.enabled);
        assert!(close(mode.threshold, 5.0));
        assert_eq!(attributes.len(), 2);

        assert_eq!(attributes[0].name, "Highlands");
        assert!(close(attributes[0].color.r, 10.0 / 255.0));
        assert!(close(attributes[0].color.g, 20.0 / 255.0));
        assert!(close(attributes[0].color.b, 30.0 / 255.0));
        assert!(close(attributes[0].color.a, 200.0 / 255.0));
        assert!(close(attributes[0].value, 200.0));

        assert_eq!(attributes[1].name, "Lowlands");
        assert!(close(attributes[1].color.r, 0.1));
        assert!(close(attributes[1].color.g, 0.2));
        assert!(close(attributes[1].color.b, 0.3));
        assert!(close(attributes[1].color.a, 0.5));
        assert!(close(attributes[1].value, 0.5));
    }

    #[test]
    fn zero_threshold_disables_exact_search() {
        let (mode, attributes) = parse_attribute_file("0\n").expect("parse");
        assert!(!mode.enabled);
        assert_eq!(mode.threshold, 0.0);
        assert!(attributes.is_empty());
    }

    #[test]
    fn normalization_boundary_one_is_unchanged_above_one_is_divided() {
        let raw = "0\nEdge\n1\n1.0001\n0.5\n255\n";
        let (_, attributes) = parse_attribute_file(raw).expect("parse");
        let edge = &attributes[0];
        assert!(close(edge.color.a, 1.0));
        assert!(close(edge.color.r, 1.0001 / 255.0));
        assert!(close(edge.color.g, 0.5));
        assert!(close(edge.color.b, 1.0));
        assert!(close(edge.value, 1.0));
    }

    #[test]
    fn identical_input_yields_identical_output() {
        let raw = "2\nA\n3\n4\n5\n6\nB\n7\n8\n9\n10\n";
        let first = parse_attribute_file(raw).expect("first");
        let second = parse_attribute_file(raw).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn crlf_line_endings_parse_the_same_as_lf() {
        let lf = "5.0\nHighlands\n200\n10\n20\n30\n";
        let crlf = "5.0\r\nHighlands\r\n200\r\n10\r\n20\r\n30\r\n";
        assert_eq!(
            parse_attribute_file(lf).expect("lf"),
            parse_attribute_file(crlf).expect("crlf")
        );
    }

    #[test]
    fn empty_input_is_missing_threshold() {
        let err = parse_attribute_file("").expect_err("err");
        assert_eq!(err, AttributeFileError::MissingThresholdLine);
    }

    #[test]
    fn non_numeric_threshold_fails() {
        let err = parse_attribute_file("not-a-number\n").expect_err("err");
        assert_eq!(
            err,
            AttributeFileError::InvalidThreshold {
                content: "not-a-number".to_string()
            }
        );
    }

    #[test]
    fn truncated_group_reports_missing_field() {
        let err = parse_attribute_file("0\nHighlands\n200\n10\n").expect_err("err");
        assert_eq!(
            err,
            AttributeFileError::MissingField {
                name: "Highlands".to_string(),
                field: AttributeField::Green,
            }
        );
    }

    #[test]
    fn non_numeric_field_reports_name_and_field() {
        let err = parse_attribute_file("0\nHighlands\n200\nred?\n20\n30\n").expect_err("err");
        assert_eq!(
            err,
            AttributeFileError::InvalidField {
                name: "Highlands".to_string(),
                field: AttributeField::Red,
                content: "red?".to_string(),
            }
        );
    }
}
