pub mod channel;
pub mod finding;
pub mod period;
pub mod site;

pub use channel::{
    Channel, ChannelMap, Unit, LINE_CURRENTS, LINE_VOLTAGES, TREND_CHANNELS, VOLTAGE_CHANNELS,
};
pub use finding::{Classification, Dimension, Finding, FindingDetails, Verdict};
pub use period::{localize, parse_time_zone, ReportingPeriod};
pub use site::{
    EnergySummary, ParamValue, Parameter, RawParameter, SiteConfiguration, SiteMetadata,
    SiteParameters, WiringConfiguration,
};

use time::Duration;

/// Render a duration as `D days HH:MM:SS`.
pub fn format_duration(d: Duration) -> String {
    let total = d.whole_seconds();
    let days = total.div_euclid(86_400);
    let rem = total.rem_euclid(86_400);
    format!(
        "{days} days {:02}:{:02}:{:02}",
        rem / 3_600,
        rem % 3_600 / 60,
        rem % 60
    )
}
