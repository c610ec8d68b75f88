//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::broker::StorageTargetRange;
use crate::settings::BrokerSettings;

/// Top-level scenario configuration parsed from TOML.
///
/// Missing sections take their defaults; a scenario needs at least one
/// `[[networks]]` entry to validate. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or start from a preset with
/// [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Broker loop settings shared by every generator.
    #[serde(default)]
    pub settings: BrokerSettings,
    /// Simulation timing and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Power networks and the devices on them.
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
    /// Scripted changes replayed during the run.
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of ticks per simulated day (must be > 0).
    pub ticks_per_day: u64,
    /// Number of days to simulate (must be > 0).
    pub days: u64,
    /// Master random seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks_per_day: 2400,
            days: 2,
            seed: 42,
        }
    }
}

/// One isolated power network.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub name: String,
    pub loads: Vec<LoadConfig>,
    pub solar: Vec<SolarConfig>,
    pub batteries: Vec<BatteryConfig>,
    pub generators: Vec<GeneratorConfig>,
}

/// Consumer parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Baseline consumption (kW).
    pub base_kw: f32,
    /// Sinusoidal amplitude (kW).
    pub amp_kw: f32,
    /// Phase offset (radians).
    pub phase_rad: f32,
    /// Gaussian noise standard deviation (kW).
    pub noise_std: f32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            base_kw: 2.0,
            amp_kw: 0.8,
            phase_rad: 1.2,
            noise_std: 0.05,
        }
    }
}

/// Solar array parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// Peak generation (kW).
    pub kw_peak: f32,
    /// Hour of sunrise.
    pub sunrise_hr: f32,
    /// Hour of sunset.
    pub sunset_hr: f32,
    /// Multiplicative noise standard deviation.
    pub noise_std: f32,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            kw_peak: 5.0,
            sunrise_hr: 6.0,
            sunset_hr: 18.0,
            noise_std: 0.05,
        }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Total energy capacity (kWh).
    pub capacity_kwh: f32,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f32,
    /// Maximum charging power (kW).
    pub max_charge_kw: f32,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f32,
    /// Charge efficiency (0.0–1.0).
    pub eta_charge: f32,
    /// Discharge efficiency (0.0–1.0).
    pub eta_discharge: f32,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 20.0,
            initial_soc: 0.5,
            max_charge_kw: 8.0,
            max_discharge_kw: 8.0,
            eta_charge: 0.95,
            eta_discharge: 0.95,
        }
    }
}

/// Backup generator parameters, plus the broker state for managed ones.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Unique name, referenced by `[[events]]`.
    pub name: String,
    /// Output while running (kW).
    pub rated_kw: f32,
    /// Hours of fuel in the tank; omit for a plant that needs none.
    pub fuel_hours: Option<f32>,
    /// Breakdown probability per day of runtime; 0 disables breakdowns.
    pub breakdown_chance_per_day: f32,
    /// Downtime after a breakdown (hours).
    pub repair_hours: f32,
    /// Whether a broker is attached at start.
    pub managed: bool,
    /// Storage level band `[low, high]`.
    pub storage_target: StorageTargetRange,
    pub run_on_batteries_only: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            rated_kw: 5.0,
            fuel_hours: None,
            breakdown_chance_per_day: 0.0,
            repair_hours: 4.0,
            managed: true,
            storage_target: StorageTargetRange::FULL,
            run_on_batteries_only: true,
        }
    }
}

/// Something that happens to a generator during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// The generator is removed from the grid.
    Destroy,
    /// The generator is reconnected to `network`.
    Move,
    /// The generator breaks down immediately.
    BreakDown,
    /// `hours` of fuel are added to the tank.
    Refuel,
}

/// A scripted event.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    pub at_tick: u64,
    pub generator: String,
    pub action: EventAction,
    /// Target network name for `move`.
    #[serde(default)]
    pub network: Option<String>,
    /// Fuel added by `refuel`.
    #[serde(default)]
    pub hours: Option<f32>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.ticks_per_day"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn generator(name: &str, rated_kw: f32, fuel_hours: Option<f32>, band: (f32, f32)) -> GeneratorConfig {
    GeneratorConfig {
        name: name.to_string(),
        rated_kw,
        fuel_hours,
        storage_target: StorageTargetRange::from(band),
        ..GeneratorConfig::default()
    }
}

impl ScenarioConfig {
    /// One network with solar, storage and three backup generators.
    pub fn baseline() -> Self {
        Self {
            settings: BrokerSettings::default(),
            simulation: SimulationConfig::default(),
            networks: vec![NetworkConfig {
                name: "colony".to_string(),
                loads: vec![
                    LoadConfig::default(),
                    LoadConfig {
                        base_kw: 3.0,
                        amp_kw: 1.5,
                        phase_rad: 2.4,
                        ..LoadConfig::default()
                    },
                ],
                solar: vec![SolarConfig {
                    kw_peak: 6.0,
                    ..SolarConfig::default()
                }],
                batteries: vec![BatteryConfig::default()],
                generators: vec![
                    GeneratorConfig {
                        breakdown_chance_per_day: 0.1,
                        ..generator("chemfuel-1", 4.0, Some(30.0), (0.2, 0.8))
                    },
                    generator("chemfuel-2", 4.0, Some(30.0), (0.2, 0.8)),
                    generator("wood-1", 2.0, Some(18.0), (0.1, 0.6)),
                ],
            }],
            events: Vec::new(),
        }
    }

    /// A network without storage, where generators must cover demand directly.
    pub fn no_storage() -> Self {
        Self {
            networks: vec![NetworkConfig {
                name: "outpost".to_string(),
                loads: vec![
                    LoadConfig {
                        base_kw: 4.0,
                        amp_kw: 2.0,
                        ..LoadConfig::default()
                    },
                    LoadConfig {
                        base_kw: 2.0,
                        amp_kw: 0.5,
                        phase_rad: 0.3,
                        ..LoadConfig::default()
                    },
                ],
                solar: vec![SolarConfig::default()],
                batteries: Vec::new(),
                generators: vec![
                    GeneratorConfig {
                        run_on_batteries_only: false,
                        ..generator("diesel-1", 5.0, None, (0.0, 1.0))
                    },
                    GeneratorConfig {
                        run_on_batteries_only: false,
                        ..generator("diesel-2", 3.0, None, (0.0, 1.0))
                    },
                    generator("diesel-3", 2.0, None, (0.0, 1.0)),
                ],
            }],
            ..Self::baseline()
        }
    }

    /// Two networks; a generator is rewired between them and another destroyed.
    pub fn islands() -> Self {
        let island = |name: &str, prefix: &str| NetworkConfig {
            name: name.to_string(),
            loads: vec![LoadConfig::default()],
            solar: vec![SolarConfig {
                kw_peak: 3.0,
                ..SolarConfig::default()
            }],
            batteries: vec![BatteryConfig {
                capacity_kwh: 10.0,
                initial_soc: 0.3,
                ..BatteryConfig::default()
            }],
            generators: vec![
                generator(&format!("{prefix}-1"), 3.0, Some(24.0), (0.3, 0.9)),
                generator(&format!("{prefix}-2"), 2.0, Some(24.0), (0.3, 0.9)),
            ],
        };
        Self {
            networks: vec![island("north", "north"), island("south", "south")],
            events: vec![
                EventConfig {
                    at_tick: 1200,
                    generator: "north-2".to_string(),
                    action: EventAction::Move,
                    network: Some("south".to_string()),
                    hours: None,
                },
                EventConfig {
                    at_tick: 2400,
                    generator: "south-1".to_string(),
                    action: EventAction::Destroy,
                    network: None,
                    hours: None,
                },
            ],
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "no_storage", "islands"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "no_storage" => Ok(Self::no_storage()),
            "islands" => Ok(Self::islands()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Total ticks the scenario runs for, or `None` if the product overflows.
    pub fn total_ticks(&self) -> Option<u64> {
        self.simulation.ticks_per_day.checked_mul(self.simulation.days)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.ticks_per_day == 0 {
            errors.push(ConfigError::new("simulation.ticks_per_day", "must be > 0"));
        }
        if s.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        }
        let total_ticks = self.total_ticks();
        if total_ticks.is_none() {
            errors.push(ConfigError::new(
                "simulation.days",
                "ticks_per_day * days overflows the tick counter",
            ));
        }
        if self.settings.update_interval == 0 {
            errors.push(ConfigError::new("settings.update_interval", "must be > 0"));
        }
        if self.networks.is_empty() {
            errors.push(ConfigError::new("networks", "at least one network is required"));
        }

        let mut network_names = HashSet::new();
        let mut generator_names = HashSet::new();
        for (i, net) in self.networks.iter().enumerate() {
            let path = format!("networks[{i}]");
            if net.name.is_empty() {
                errors.push(ConfigError::new(format!("{path}.name"), "must not be empty"));
            } else if !network_names.insert(net.name.as_str()) {
                errors.push(ConfigError::new(
                    format!("{path}.name"),
                    format!("duplicate network \"{}\"", net.name),
                ));
            }

            for (j, load) in net.loads.iter().enumerate() {
                let lpath = format!("{path}.loads[{j}]");
                let shape = [("base_kw", load.base_kw), ("amp_kw", load.amp_kw), ("phase_rad", load.phase_rad)];
                for (field, value) in shape {
                    if !value.is_finite() {
                        errors.push(ConfigError::new(format!("{lpath}.{field}"), "must be a finite number"));
                    }
                }
                if !(load.noise_std >= 0.0 && load.noise_std.is_finite()) {
                    errors.push(ConfigError::new(format!("{lpath}.noise_std"), "must be >= 0"));
                }
            }

            for (j, sol) in net.solar.iter().enumerate() {
                let in_day = (0.0..=24.0).contains(&sol.sunrise_hr)
                    && (0.0..=24.0).contains(&sol.sunset_hr);
                if !in_day || sol.sunrise_hr >= sol.sunset_hr {
                    errors.push(ConfigError::new(
                        format!("{path}.solar[{j}].sunrise_hr"),
                        "must be < sunset_hr, both within [0, 24]",
                    ));
                }
                if !(sol.kw_peak >= 0.0 && sol.kw_peak.is_finite()) {
                    errors.push(ConfigError::new(format!("{path}.solar[{j}].kw_peak"), "must be >= 0"));
                }
                if !(sol.noise_std >= 0.0 && sol.noise_std.is_finite()) {
                    errors.push(ConfigError::new(format!("{path}.solar[{j}].noise_std"), "must be >= 0"));
                }
            }

            for (j, bat) in net.batteries.iter().enumerate() {
                let bpath = format!("{path}.batteries[{j}]");
                // written so that NaN fails every check
                if !(bat.capacity_kwh > 0.0 && bat.capacity_kwh.is_finite()) {
                    errors.push(ConfigError::new(format!("{bpath}.capacity_kwh"), "must be > 0"));
                }
                if !(0.0..=1.0).contains(&bat.initial_soc) {
                    errors.push(ConfigError::new(
                        format!("{bpath}.initial_soc"),
                        "must be in [0.0, 1.0]",
                    ));
                }
                for (field, limit) in [("max_charge_kw", bat.max_charge_kw), ("max_discharge_kw", bat.max_discharge_kw)] {
                    if !(limit >= 0.0 && limit.is_finite()) {
                        errors.push(ConfigError::new(format!("{bpath}.{field}"), "must be >= 0"));
                    }
                }
                for (field, eta) in [("eta_charge", bat.eta_charge), ("eta_discharge", bat.eta_discharge)] {
                    if !(eta > 0.0 && eta <= 1.0) {
                        errors.push(ConfigError::new(format!("{bpath}.{field}"), "must be in (0.0, 1.0]"));
                    }
                }
            }

            for (j, g) in net.generators.iter().enumerate() {
                let gpath = format!("{path}.generators[{j}]");
                if g.name.is_empty() {
                    errors.push(ConfigError::new(format!("{gpath}.name"), "must not be empty"));
                } else if !generator_names.insert(g.name.as_str()) {
                    errors.push(ConfigError::new(
                        format!("{gpath}.name"),
                        format!("duplicate generator \"{}\"", g.name),
                    ));
                }
                if !(g.rated_kw > 0.0 && g.rated_kw.is_finite()) {
                    errors.push(ConfigError::new(format!("{gpath}.rated_kw"), "must be > 0"));
                }
                if g.fuel_hours.is_some_and(|h| !(h >= 0.0 && h.is_finite())) {
                    errors.push(ConfigError::new(format!("{gpath}.fuel_hours"), "must be >= 0"));
                }
                if !(g.repair_hours >= 0.0 && g.repair_hours.is_finite()) {
                    errors.push(ConfigError::new(format!("{gpath}.repair_hours"), "must be >= 0"));
                }
                if !(0.0..=1.0).contains(&g.breakdown_chance_per_day) {
                    errors.push(ConfigError::new(
                        format!("{gpath}.breakdown_chance_per_day"),
                        "must be in [0.0, 1.0]",
                    ));
                }
            }
        }

        for (i, ev) in self.events.iter().enumerate() {
            let path = format!("events[{i}]");
            if !generator_names.contains(ev.generator.as_str()) {
                errors.push(ConfigError::new(
                    format!("{path}.generator"),
                    format!("unknown generator \"{}\"", ev.generator),
                ));
            }
            if total_ticks.is_some_and(|total| total > 0 && ev.at_tick >= total) {
                errors.push(ConfigError::new(
                    format!("{path}.at_tick"),
                    "must fall inside the simulated run",
                ));
            }
            match ev.action {
                EventAction::Move => match ev.network.as_deref() {
                    Some(name) if network_names.contains(name) => {}
                    Some(name) => errors.push(ConfigError::new(
                        format!("{path}.network"),
                        format!("unknown network \"{name}\""),
                    )),
                    None => errors.push(ConfigError::new(
                        format!("{path}.network"),
                        "required for move",
                    )),
                },
                EventAction::Refuel if !ev.hours.is_some_and(|h| h > 0.0 && h.is_finite()) => {
                    errors.push(ConfigError::new(format!("{path}.hours"), "refuel needs hours > 0"));
                }
                _ => {}
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn no_storage_has_no_batteries() {
        let cfg = ScenarioConfig::no_storage();
        assert!(cfg.networks.iter().all(|n| n.batteries.is_empty()));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[settings]
update_interval = 120
minimum_on_time = 300

[simulation]
ticks_per_day = 1200
days = 1
seed = 7

[[networks]]
name = "main"

[[networks.loads]]
base_kw = 1.0

[[networks.batteries]]
capacity_kwh = 12.0

[[networks.generators]]
name = "gen-a"
rated_kw = 3.0
fuel_hours = 10.0
storage_target = [0.8, 0.2]
run_on_batteries_only = false

[[events]]
at_tick = 600
generator = "gen-a"
action = "refuel"
hours = 5.0
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok().unwrap_or_default();
        assert_eq!(cfg.settings.update_interval, 120);
        assert_eq!(cfg.simulation.ticks_per_day, 1200);
        let g = &cfg.networks[0].generators[0];
        assert_eq!(g.fuel_hours, Some(10.0));
        assert_eq!((g.storage_target.low(), g.storage_target.high()), (0.2, 0.8));
        assert!(g.managed);
        assert_eq!(cfg.events[0].action, EventAction::Refuel);
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
ticks_per_day = 24
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn empty_scenario_needs_a_network() {
        let cfg = ScenarioConfig::from_toml_str("").unwrap_or_default();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "networks"));
    }

    #[test]
    fn validation_catches_zero_ticks() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.ticks_per_day = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.ticks_per_day"));
    }

    #[test]
    fn validation_catches_duplicate_generator() {
        let mut cfg = ScenarioConfig::baseline();
        let dup = cfg.networks[0].generators[0].clone();
        cfg.networks[0].generators.push(dup);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.message.contains("duplicate generator")));
    }

    #[test]
    fn validation_checks_event_targets() {
        let mut cfg = ScenarioConfig::islands();
        cfg.events[0].network = Some("east".to_string());
        cfg.events[1].generator = "nobody".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "events[0].network"));
        assert!(errors.iter().any(|e| e.field == "events[1].generator"));
    }

    #[test]
    fn validation_catches_event_after_run() {
        let mut cfg = ScenarioConfig::islands();
        cfg.events[0].at_tick = cfg.total_ticks().expect("preset fits in u64");
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "events[0].at_tick"));
    }

    #[test]
    fn validation_catches_invalid_soc() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.networks[0].batteries[0].initial_soc = 1.5;
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "networks[0].batteries[0].initial_soc"));
    }

    #[test]
    fn validation_rejects_nan_fields() {
        let toml = r#"
[[networks]]
name = "a"

[[networks.batteries]]
capacity_kwh = nan

[[networks.generators]]
name = "g"
rated_kw = nan
repair_hours = nan
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("nan is valid TOML");
        let errors = cfg.validate();
        for field in [
            "networks[0].batteries[0].capacity_kwh",
            "networks[0].generators[0].rated_kw",
            "networks[0].generators[0].repair_hours",
        ] {
            assert!(errors.iter().any(|e| e.field == field), "{field}: {errors:?}");
        }
    }

    #[test]
    fn validation_rejects_nan_efficiency_and_limits() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.networks[0].batteries[0].eta_discharge = f32::NAN;
        cfg.networks[0].batteries[0].max_charge_kw = f32::NAN;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "networks[0].batteries[0].eta_discharge"));
        assert!(errors.iter().any(|e| e.field == "networks[0].batteries[0].max_charge_kw"));
    }

    #[test]
    fn validation_catches_tick_overflow() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.ticks_per_day = u64::MAX;
        cfg.simulation.days = 2;
        assert_eq!(cfg.total_ticks(), None);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.message.contains("overflows")));
    }
}
