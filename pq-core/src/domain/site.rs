use std::{collections::BTreeMap, fmt};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    domain::period::parse_time_zone,
    error::{EngineError, Result},
};

pub const NOMINAL_PHASE_TO_NEUTRAL: &str = "nominalPhaseToNeutralVoltage";
pub const NOMINAL_PHASE_TO_PHASE: &str = "nominalPhaseToPhaseVoltage";
pub const POWER_CONFIGURATION: &str = "powerConfiguration";

/// Measurement point description as returned by the monitoring API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    pub mp_id: String,
    pub account_name: String,
    pub timezone: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl SiteMetadata {
    pub fn display_name(&self) -> String {
        format!("{}{}", self.account_name, self.mp_id)
    }

    pub fn time_zone(&self) -> Result<Tz> {
        parse_time_zone(&self.timezone)
    }
}

/// Energy totals for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergySummary {
    pub total_active_energy_consumed: f64,
    #[serde(default)]
    pub total_apparent_energy_consumed: Option<f64>,
    #[serde(default)]
    pub total_reactive_energy_consumed: Option<f64>,
    #[serde(default)]
    pub max_active_power_demand: Option<f64>,
    #[serde(default)]
    pub avg_power_factor: Option<f64>,
    #[serde(default)]
    pub samples: Option<u64>,
}

/// A parameter value as sent over the wire: numbers and numeric strings both occur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParameter {
    #[serde(default)]
    pub value: Option<ParamValue>,
    #[serde(default)]
    pub default_value: Option<ParamValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteParameters {
    #[serde(default)]
    pub measurement_point_id: Option<String>,
    #[serde(default)]
    pub content: BTreeMap<String, RawParameter>,
}

/// Conversion from a wire value. `Ok(None)` means "present but empty".
pub trait ParameterType: Sized {
    fn from_value(name: &str, value: &ParamValue) -> Result<Option<Self>>;
}

impl ParameterType for f64 {
    fn from_value(name: &str, value: &ParamValue) -> Result<Option<Self>> {
        match value {
            ParamValue::Number(n) => Ok(Some(*n)),
            ParamValue::Text(s) if s.trim().is_empty() => Ok(None),
            ParamValue::Text(s) => s.trim().parse().map(Some).map_err(|_| {
                EngineError::InvalidParameter {
                    name: name.to_string(),
                    value: s.clone(),
                }
            }),
        }
    }
}

/// Wiring is only reported, so unrecognised values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WiringConfiguration {
    Delta,
    Wye,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for WiringConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delta => f.write_str("Delta"),
            Self::Wye => f.write_str("Wye"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl ParameterType for WiringConfiguration {
    fn from_value(_name: &str, value: &ParamValue) -> Result<Option<Self>> {
        match value {
            ParamValue::Text(s) if s.trim().is_empty() => Ok(None),
            ParamValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "delta" => Ok(Some(Self::Delta)),
                "wye" | "star" => Ok(Some(Self::Wye)),
                _ => Ok(Some(Self::Other(s.trim().to_string()))),
            },
            ParamValue::Number(n) => Ok(Some(Self::Other(n.to_string()))),
        }
    }
}

/// A configured value with a system default behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter<T> {
    pub configured: Option<T>,
    pub default: Option<T>,
}

impl<T: ParameterType> Parameter<T> {
    pub fn new(configured: Option<T>, default: Option<T>) -> Self {
        Self { configured, default }
    }

    pub fn from_raw(name: &str, raw: Option<&RawParameter>) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::new(None, None));
        };
        let parse = |v: &Option<ParamValue>| -> Result<Option<T>> {
            match v {
                Some(v) => T::from_value(name, v),
                None => Ok(None),
            }
        };
        Ok(Self::new(parse(&raw.value)?, parse(&raw.default_value)?))
    }

    pub fn resolve(self, name: &str) -> Result<T> {
        self.configured
            .or(self.default)
            .ok_or_else(|| EngineError::MissingParameter(name.to_string()))
    }
}

/// Site electrical configuration, resolved once per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteConfiguration {
    pub nominal_phase_to_neutral: f64,
    pub nominal_phase_to_phase: f64,
    pub wiring: WiringConfiguration,
}

impl SiteConfiguration {
    pub fn new(
        nominal_phase_to_neutral: f64,
        nominal_phase_to_phase: f64,
        wiring: WiringConfiguration,
    ) -> Result<Self> {
        for (name, v) in [
            (NOMINAL_PHASE_TO_NEUTRAL, nominal_phase_to_neutral),
            (NOMINAL_PHASE_TO_PHASE, nominal_phase_to_phase),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(EngineError::InvalidParameter {
                    name: name.to_string(),
                    value: v.to_string(),
                });
            }
        }
        Ok(Self {
            nominal_phase_to_neutral,
            nominal_phase_to_phase,
            wiring,
        })
    }

    pub fn from_parameters(params: &SiteParameters) -> Result<Self> {
        let resolve_f64 = |name: &str| {
            Parameter::<f64>::from_raw(name, params.content.get(name))?.resolve(name)
        };
        let wiring = Parameter::<WiringConfiguration>::from_raw(
            POWER_CONFIGURATION,
            params.content.get(POWER_CONFIGURATION),
        )?
        .resolve(POWER_CONFIGURATION)?;

        Self::new(
            resolve_f64(NOMINAL_PHASE_TO_NEUTRAL)?,
            resolve_f64(NOMINAL_PHASE_TO_PHASE)?,
            wiring,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &str = r#"{
        "measurementPointId": "2167",
        "content": {
            "ratedCurrent": { "defaultValue": 3000 },
            "nominalPhaseToNeutralVoltage": { "defaultValue": 2400, "value": "277" },
            "powerConfiguration": { "defaultValue": "DELTA", "value": "Delta" },
            "nominalPhaseToPhaseVoltage": { "defaultValue": 4160, "value": "480" }
        }
    }"#;

    #[test]
    fn configured_value_wins_over_default() {
        let params: SiteParameters = serde_json::from_str(PARAMS).unwrap();
        let site = SiteConfiguration::from_parameters(&params).unwrap();
        assert_eq!(site.nominal_phase_to_neutral, 277.0);
        assert_eq!(site.nominal_phase_to_phase, 480.0);
        assert_eq!(site.wiring, WiringConfiguration::Delta);
    }

    #[test]
    fn empty_configured_value_falls_back_to_default() {
        let raw = RawParameter {
            value: Some(ParamValue::Text(" ".to_string())),
            default_value: Some(ParamValue::Number(347.0)),
        };
        let p = Parameter::<f64>::from_raw("v", Some(&raw)).unwrap();
        assert_eq!(p.resolve("v").unwrap(), 347.0);
    }

    #[test]
    fn missing_parameter_is_fatal() {
        let params: SiteParameters = serde_json::from_str(
            r#"{ "content": {
                "nominalPhaseToNeutralVoltage": { "defaultValue": 347 },
                "powerConfiguration": { "value": "Wye" }
            } }"#,
        )
        .unwrap();
        let err = SiteConfiguration::from_parameters(&params).unwrap_err();
        assert!(
            matches!(err, EngineError::MissingParameter(ref n) if n == NOMINAL_PHASE_TO_PHASE)
        );
    }

    #[test]
    fn garbage_value_is_rejected() {
        let raw = RawParameter {
            value: Some(ParamValue::Text("abc".to_string())),
            default_value: None,
        };
        assert!(matches!(
            Parameter::<f64>::from_raw("v", Some(&raw)),
            Err(EngineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn unrecognised_wiring_is_kept_for_display() {
        let params: SiteParameters = serde_json::from_str(
            r#"{ "content": {
                "nominalPhaseToNeutralVoltage": { "value": 347 },
                "nominalPhaseToPhaseVoltage": { "value": 600 },
                "powerConfiguration": { "value": " Open Delta ", "defaultValue": "Wye" }
            } }"#,
        )
        .unwrap();
        let site = SiteConfiguration::from_parameters(&params).unwrap();
        assert_eq!(
            site.wiring,
            WiringConfiguration::Other("Open Delta".to_string())
        );
        assert_eq!(site.wiring.to_string(), "Open Delta");
        assert_eq!(
            serde_json::to_value(&site.wiring).unwrap(),
            serde_json::json!("Open Delta")
        );

        let raw = RawParameter {
            value: Some(ParamValue::Text("STAR".to_string())),
            default_value: None,
        };
        let wiring = Parameter::<WiringConfiguration>::from_raw(POWER_CONFIGURATION, Some(&raw))
            .unwrap()
            .resolve(POWER_CONFIGURATION)
            .unwrap();
        assert_eq!(wiring, WiringConfiguration::Wye);
    }

    #[test]
    fn metadata_display_name_and_zone() {
        let meta: SiteMetadata = serde_json::from_str(
            r#"{ "mpId": "Rada Entrance - 01", "accountName": "Rada Industries",
                 "timezone": "America/Toronto", "roomId": 7 }"#,
        )
        .unwrap();
        assert_eq!(meta.display_name(), "Rada IndustriesRada Entrance - 01");
        assert_eq!(meta.time_zone().unwrap(), chrono_tz::America::Toronto);
    }
}
