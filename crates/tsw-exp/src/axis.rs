use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use tsw_core::errors::{ErrorInfo, SweepError};

fn axis_error(code: &str, axis: &str, message: impl Into<String>) -> SweepError {
    SweepError::InvalidAxis(ErrorInfo::new(code, message).with_context("axis", axis))
}

/// One discrete value an axis can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisValue {
    /// Integer knob forwarded as `--flag <value>`.
    Int(u64),
    /// Toggle forwarded as a bare `--flag` when set.
    Flag(bool),
}

impl AxisValue {
    fn kind(&self) -> &'static str {
        match self {
            AxisValue::Int(_) => "int",
            AxisValue::Flag(_) => "flag",
        }
    }
}

impl Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisValue::Int(value) => write!(f, "{value}"),
            AxisValue::Flag(value) => write!(f, "{value}"),
        }
    }
}

/// Named tuning dimension with an ordered set of distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepAxis {
    name: String,
    flag: String,
    values: Vec<AxisValue>,
}

impl SweepAxis {
    /// Builds an axis, rejecting empty, repeated or mixed-kind value lists.
    pub fn new(
        name: impl Into<String>,
        flag: impl Into<String>,
        values: Vec<AxisValue>,
    ) -> Result<Self, SweepError> {
        let name = name.into();
        if values.is_empty() {
            return Err(axis_error("tsw.axis.empty", &name, "axis has no values"));
        }
        let kind = values[0].kind();
        if let Some(mixed) = values.iter().find(|value| value.kind() != kind) {
            return Err(axis_error(
                "tsw.axis.mixed",
                &name,
                format!("value {mixed} is not of kind {kind}"),
            ));
        }
        let mut seen = BTreeSet::new();
        for value in &values {
            if !seen.insert(*value) {
                return Err(axis_error(
                    "tsw.axis.duplicate",
                    &name,
                    format!("value {value} listed more than once"),
                ));
            }
        }
        Ok(Self {
            name,
            flag: flag.into(),
            values,
        })
    }

    /// Integer axis from already-parsed values.
    pub fn integers(
        name: impl Into<String>,
        flag: impl Into<String>,
        values: &[u64],
    ) -> Result<Self, SweepError> {
        Self::new(name, flag, values.iter().copied().map(AxisValue::Int).collect())
    }

    /// Integer axis from a comma separated list such as `"2, 4,8"`.
    pub fn parse_integers(
        name: impl Into<String>,
        flag: impl Into<String>,
        raw: &str,
    ) -> Result<Self, SweepError> {
        let name = name.into();
        let values = parse_int_list(&name, raw)?;
        Self::integers(name, flag, &values)
    }

    /// Boolean axis: always tries `false`, and `true` as well when requested.
    pub fn toggle(
        name: impl Into<String>,
        flag: impl Into<String>,
        include_enabled: bool,
    ) -> Result<Self, SweepError> {
        let mut values = vec![AxisValue::Flag(false)];
        if include_enabled {
            values.push(AxisValue::Flag(true));
        }
        Self::new(name, flag, values)
    }

    /// Axis name, used as the CSV column header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command line flag driven by this axis.
    pub fn flag(&self) -> &str {
        &self.flag
    }

    /// Values in sweep order.
    pub fn values(&self) -> &[AxisValue] {
        &self.values
    }
}

/// Parses a comma separated integer list; blank segments are skipped.
pub fn parse_int_list(axis: &str, raw: &str) -> Result<Vec<u64>, SweepError> {
    let mut values = Vec::new();
    for part in raw.split(',') {
        let token = part.trim();
        if token.is_empty() {
            continue;
        }
        let value = token.parse::<u64>().map_err(|err| {
            SweepError::InvalidAxis(
                ErrorInfo::new("tsw.axis.parse", format!("cannot parse '{token}': {err}"))
                    .with_context("axis", axis)
                    .with_context("raw", raw),
            )
        })?;
        values.push(value);
    }
    if values.is_empty() {
        return Err(axis_error("tsw.axis.empty", axis, "empty list"));
    }
    Ok(values)
}

/// Value chosen for one axis inside a [`Configuration`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    /// Axis name.
    pub axis: String,
    /// Flag the value is forwarded through.
    pub flag: String,
    /// Selected value.
    pub value: AxisValue,
}

/// One point of the Cartesian product of all axes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    assignments: Vec<Assignment>,
}

impl Configuration {
    /// Assignments in axis order.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Value selected for the named axis.
    pub fn value(&self, axis: &str) -> Option<AxisValue> {
        self.assignments
            .iter()
            .find(|assignment| assignment.axis == axis)
            .map(|assignment| assignment.value)
    }

    /// The identifying tuple of axis values.
    pub fn values(&self) -> Vec<AxisValue> {
        self.assignments
            .iter()
            .map(|assignment| assignment.value)
            .collect()
    }

    /// `name=value` pairs joined by spaces.
    pub fn label(&self) -> String {
        self.assignments
            .iter()
            .map(|assignment| format!("{}={}", assignment.axis, assignment.value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Expands the axes into their Cartesian product, rightmost axis fastest.
///
/// `max_configs` of `None` or `Some(0)` keeps the full product; any other
/// value keeps that many configurations from the front of the sequence.
pub fn generate_configurations(
    axes: &[SweepAxis],
    max_configs: Option<usize>,
) -> Result<Vec<Configuration>, SweepError> {
    if axes.is_empty() {
        return Err(SweepError::InvalidAxis(ErrorInfo::new(
            "tsw.axis.none",
            "at least one axis is required",
        )));
    }
    let mut names = BTreeSet::new();
    for axis in axes {
        if axis.values.is_empty() {
            return Err(axis_error("tsw.axis.empty", &axis.name, "axis has no values"));
        }
        if !names.insert(axis.name.as_str()) {
            return Err(axis_error(
                "tsw.axis.name",
                &axis.name,
                "axis name used more than once",
            ));
        }
    }
    let cap = match max_configs {
        Some(limit) if limit > 0 => limit,
        _ => usize::MAX,
    };
    let mut outputs = Vec::new();
    expand_grid(axes, 0, Vec::with_capacity(axes.len()), cap, &mut outputs);
    Ok(outputs)
}

fn expand_grid(
    axes: &[SweepAxis],
    idx: usize,
    current: Vec<Assignment>,
    cap: usize,
    outputs: &mut Vec<Configuration>,
) {
    if outputs.len() >= cap {
        return;
    }
    if idx == axes.len() {
        outputs.push(Configuration {
            assignments: current,
        });
        return;
    }
    let axis = &axes[idx];
    for value in &axis.values {
        let mut next = current.clone();
        next.push(Assignment {
            axis: axis.name.clone(),
            flag: axis.flag.clone(),
            value: *value,
        });
        expand_grid(axes, idx + 1, next, cap, outputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blank_segments() {
        assert_eq!(parse_int_list("workers", " 2, 4,,8 ").unwrap(), vec![2, 4, 8]);
    }

    #[test]
    fn parse_rejects_non_integers() {
        let err = parse_int_list("workers", "2,four").unwrap_err();
        assert_eq!(err.info().code, "tsw.axis.parse");
        assert_eq!(err.info().context_value("axis"), Some("workers"));
    }

    #[test]
    fn parse_rejects_blank_list() {
        let err = parse_int_list("visible_count", " , ").unwrap_err();
        assert_eq!(err.info().code, "tsw.axis.empty");
    }

    #[test]
    fn duplicate_values_are_rejected() {
        let err = SweepAxis::integers("workers", "--thumb-workers", &[2, 2]).unwrap_err();
        assert_eq!(err.info().code, "tsw.axis.duplicate");
    }

    #[test]
    fn mixed_kinds_are_rejected() {
        let err = SweepAxis::new(
            "workers",
            "--thumb-workers",
            vec![AxisValue::Int(2), AxisValue::Flag(true)],
        )
        .unwrap_err();
        assert_eq!(err.info().code, "tsw.axis.mixed");
    }

    #[test]
    fn toggle_lists_disabled_first() {
        let axis = SweepAxis::toggle("nv_offload", "--thumb-nv-offload", true).unwrap();
        assert_eq!(
            axis.values(),
            &[AxisValue::Flag(false), AxisValue::Flag(true)]
        );
        let axis = SweepAxis::toggle("nv_offload", "--thumb-nv-offload", false).unwrap();
        assert_eq!(axis.values(), &[AxisValue::Flag(false)]);
    }

    #[test]
    fn label_lists_assignments_in_axis_order() {
        let axes = vec![
            SweepAxis::integers("workers", "--thumb-workers", &[4]).unwrap(),
            SweepAxis::toggle("fast_resize", "--thumb-fast-resize", false).unwrap(),
        ];
        let configs = generate_configurations(&axes, None).unwrap();
        assert_eq!(configs[0].label(), "workers=4 fast_resize=false");
        assert_eq!(configs[0].value("workers"), Some(AxisValue::Int(4)));
        assert_eq!(configs[0].value("missing"), None);
    }

    #[test]
    fn repeated_axis_names_are_rejected() {
        let axes = vec![
            SweepAxis::integers("workers", "--thumb-workers", &[2]).unwrap(),
            SweepAxis::integers("workers", "--thumb-workers", &[4]).unwrap(),
        ];
        let err = generate_configurations(&axes, None).unwrap_err();
        assert_eq!(err.info().code, "tsw.axis.name");
    }

    #[test]
    fn no_axes_is_invalid() {
        assert!(matches!(
            generate_configurations(&[], None),
            Err(SweepError::InvalidAxis(_))
        ));
    }
}
