use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Ampere,
    Volt,
    Watt,
    VoltAmpere,
    VoltAmpereReactive,
    Percent,
    Dimensionless,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Ampere => "A",
            Self::Volt => "V",
            Self::Watt => "W",
            Self::VoltAmpere => "VA",
            Self::VoltAmpereReactive => "var",
            Self::Percent => "%",
            Self::Dimensionless => "",
        }
    }
}

/// A one-minute measurement channel recorded by the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    L1Current,
    L2Current,
    L3Current,
    NeutralCurrent,
    GroundCurrent,
    ActivePower,
    ApparentPower,
    ReactivePower,
    PowerFactor,
    L1Voltage,
    L2Voltage,
    L3Voltage,
    Flicker,
    VoltageThd,
    CurrentTdd,
    NegSeqVoltageUnbalance,
    NegSeqCurrentUnbalance,
}

/// Channels of the general trend dataset.
pub const TREND_CHANNELS: [Channel; 11] = [
    Channel::L1Current,
    Channel::L2Current,
    Channel::L3Current,
    Channel::GroundCurrent,
    Channel::ActivePower,
    Channel::PowerFactor,
    Channel::Flicker,
    Channel::VoltageThd,
    Channel::CurrentTdd,
    Channel::NegSeqCurrentUnbalance,
    Channel::NegSeqVoltageUnbalance,
];

/// Channels of the voltage dataset. Kept separate from the trend dataset
/// because the remote API rejects requests with too many columns.
pub const VOLTAGE_CHANNELS: [Channel; 4] = [
    Channel::Flicker,
    Channel::L1Voltage,
    Channel::L2Voltage,
    Channel::L3Voltage,
];

pub const LINE_VOLTAGES: [Channel; 3] =
    [Channel::L1Voltage, Channel::L2Voltage, Channel::L3Voltage];

pub const LINE_CURRENTS: [Channel; 3] =
    [Channel::L1Current, Channel::L2Current, Channel::L3Current];

impl Channel {
    pub const ALL: [Channel; 17] = [
        Self::L1Current,
        Self::L2Current,
        Self::L3Current,
        Self::NeutralCurrent,
        Self::GroundCurrent,
        Self::ActivePower,
        Self::ApparentPower,
        Self::ReactivePower,
        Self::PowerFactor,
        Self::L1Voltage,
        Self::L2Voltage,
        Self::L3Voltage,
        Self::Flicker,
        Self::VoltageThd,
        Self::CurrentTdd,
        Self::NegSeqVoltageUnbalance,
        Self::NegSeqCurrentUnbalance,
    ];

    /// Column name used in a `TimeSeriesTable`.
    pub fn column(self) -> &'static str {
        match self {
            Self::L1Current => "l1_current",
            Self::L2Current => "l2_current",
            Self::L3Current => "l3_current",
            Self::NeutralCurrent => "neutral_current",
            Self::GroundCurrent => "ground_current",
            Self::ActivePower => "active_power",
            Self::ApparentPower => "apparent_power",
            Self::ReactivePower => "reactive_power",
            Self::PowerFactor => "power_factor",
            Self::L1Voltage => "l1_voltage",
            Self::L2Voltage => "l2_voltage",
            Self::L3Voltage => "l3_voltage",
            Self::Flicker => "pst",
            Self::VoltageThd => "thd_v",
            Self::CurrentTdd => "tdd",
            Self::NegSeqVoltageUnbalance => "neg_v_unbalance",
            Self::NegSeqCurrentUnbalance => "neg_i_unbalance",
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            Self::L1Current
            | Self::L2Current
            | Self::L3Current
            | Self::NeutralCurrent
            | Self::GroundCurrent => Unit::Ampere,
            Self::ActivePower => Unit::Watt,
            Self::ApparentPower => Unit::VoltAmpere,
            Self::ReactivePower => Unit::VoltAmpereReactive,
            Self::L1Voltage | Self::L2Voltage | Self::L3Voltage => Unit::Volt,
            Self::VoltageThd
            | Self::CurrentTdd
            | Self::NegSeqVoltageUnbalance
            | Self::NegSeqCurrentUnbalance => Unit::Percent,
            Self::PowerFactor | Self::Flicker => Unit::Dimensionless,
        }
    }

    /// Firmware channel identifier used by the monitoring API.
    pub fn default_remote_id(self) -> &'static str {
        match self {
            Self::L1Current => "c_16_avg_a",
            Self::L2Current => "c_17_avg_a",
            Self::L3Current => "c_18_avg_a",
            Self::NeutralCurrent => "c_19_avg_a",
            Self::GroundCurrent => "c_20_avg_a",
            Self::ActivePower => "c_70_avg_w",
            Self::ApparentPower => "c_106_avg_va",
            Self::ReactivePower => "c_88_avg_var",
            Self::PowerFactor => "c_124_avg_none",
            Self::L1Voltage => "c_4_avg_v",
            Self::L2Voltage => "c_5_avg_v",
            Self::L3Voltage => "c_6_avg_v",
            Self::Flicker => "c_1612_avg_none",
            Self::VoltageThd => "c_1609_avg_%",
            Self::CurrentTdd => "c_1610_avg_%",
            Self::NegSeqVoltageUnbalance => "c_287_avg_%",
            Self::NegSeqCurrentUnbalance => "c_288_avg_%",
        }
    }

    /// Name of the sample-to-sample difference column derived from this channel.
    pub fn diff_column(self) -> String {
        format!("{}_diff", self.column())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Channel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.column() == s)
            .ok_or_else(|| EngineError::InvalidParameter {
                name: "channel".to_string(),
                value: s.to_string(),
            })
    }
}

/// Mapping from channels to remote identifiers, with per-run overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap {
    overrides: BTreeMap<Channel, String>,
}

impl ChannelMap {
    pub fn with_override(mut self, channel: Channel, remote_id: impl Into<String>) -> Self {
        self.overrides.insert(channel, remote_id.into());
        self
    }

    pub fn remote_id(&self, channel: Channel) -> &str {
        self.overrides
            .get(&channel)
            .map(String::as_str)
            .unwrap_or_else(|| channel.default_remote_id())
    }

    pub fn remote_ids(&self, channels: &[Channel]) -> Vec<String> {
        channels.iter().map(|c| self.remote_id(*c).to_string()).collect()
    }

    /// Reverse lookup, used when parsing remote column headers.
    pub fn channel_for(&self, remote_id: &str) -> Option<Channel> {
        Channel::ALL
            .into_iter()
            .find(|c| self.remote_id(*c) == remote_id)
    }
}
