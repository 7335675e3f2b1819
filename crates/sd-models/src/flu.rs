use serde::{Deserialize, Serialize};

use sd_core::{
    BuildError, BuildResult, DelaySpec, Dependencies, LevelSpec, LookupError, ModelBuilder,
    Parameter, SimConfig, Simulator,
};

/// Susceptible population stock.
pub const SUSCEPTIBLE: &str = "susceptible";
/// Incubating population stock.
pub const INFECTED: &str = "infected";
/// Symptomatic, isolated population stock.
pub const SICK: &str = "sick";
/// Recovered and immune population stock.
pub const RECOVERED: &str = "recovered";
/// Deceased population stock.
pub const DEAD: &str = "dead";
/// New infections per day.
pub const INFECTED_PER_DAY: &str = "infectedPerDay";
/// New symptomatic cases per day.
pub const SICK_PER_DAY: &str = "sickPerDay";
/// Cases reaching the end of their sickness.
pub const OUTCOME: &str = "outcome";
/// Recoveries per day.
pub const RECOVERY_PER_DAY: &str = "recoveryPerDay";
/// Deaths per day.
pub const DEATH_PER_DAY: &str = "deathPerDay";
/// Recovered people losing immunity per day.
pub const VULNERABLE_PER_DAY: &str = "vulnerablePerDay";
/// Living population.
pub const POPULATION: &str = "population";
/// Contacts per infected person per day.
pub const CONTACTS: &str = "contacts";
/// Fraction of contacts that become infected.
pub const INFECTION_RATE: &str = "rawInfectionRate";
/// Fraction of outcomes that are deaths.
pub const LETHALITY_RATE: &str = "rawLethalityRate";

/// The five stocks, whose sum is conserved.
pub const STOCKS: [&str; 5] = [SUSCEPTIBLE, INFECTED, SICK, RECOVERED, DEAD];

/// Build-time knobs of the epidemic model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluParams {
    /// Days between infection and symptoms.
    pub incubation_days: f64,
    /// Days between symptoms and recovery or death.
    pub sickness_days: f64,
    /// Days a recovered person stays immune.
    pub lost_immunity_days: f64,
    /// Initial susceptible population.
    pub population: f64,
    /// Infected people seeded at the start of every run.
    pub initial_infected: f64,
    /// Days to simulate. The run ends once time exceeds this.
    pub duration: f64,
    /// Days per tick.
    pub time_step: f64,
}

impl Default for FluParams {
    fn default() -> Self {
        Self {
            incubation_days: 12.0,
            sickness_days: 14.0,
            lost_immunity_days: 90.0,
            population: 10_000_000.0,
            initial_infected: 100.0,
            duration: 100.0,
            time_step: 1.0,
        }
    }
}

impl FluParams {
    /// Set the simulated duration in days.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Set the number of days per tick.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Accepted ranges for the run-level knobs.
    pub fn run_parameters() -> [Parameter; 2] {
        [
            Parameter::new("duration", 100.0, 50.0, 520.0, 10.0).with_unit("days"),
            Parameter::new("time_step", 1.0, 1.0, 2.0, 1.0).with_unit("days"),
        ]
    }

    /// Check the run-level knobs against their ranges.
    pub fn validate(&self) -> BuildResult<()> {
        let [duration, time_step] = Self::run_parameters();
        for (range, value) in [(duration, self.duration), (time_step, self.time_step)] {
            if !range.contains(value) {
                return Err(BuildError::InvalidParameter(range.name));
            }
        }
        Ok(())
    }

    /// Engine configuration for these knobs.
    pub fn config(&self) -> SimConfig {
        SimConfig::default()
            .with_duration(self.duration)
            .with_time_step(self.time_step)
    }
}

/// Parameters a client can tune while the model runs.
pub fn live_parameters() -> [Parameter; 3] {
    [
        Parameter::new(CONTACTS, 8.0, 0.0, 20.0, 1.0).with_unit("persons per person per day"),
        Parameter::new(INFECTION_RATE, 0.035, 0.0, 1.0, 0.005),
        Parameter::new(LETHALITY_RATE, 0.025, 0.0, 1.0, 0.005),
    ]
}

/// A titled group of equations meant to be charted together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plot {
    /// Chart title.
    pub title: &'static str,
    /// Equations drawn on the chart.
    pub series: &'static [&'static str],
}

/// Chart layout of the model, two rows of two.
pub const PLOTS: [Plot; 4] = [
    Plot {
        title: "Susceptible - Recovered",
        series: &[SUSCEPTIBLE, RECOVERED],
    },
    Plot {
        title: "Infected - Sick - Dead",
        series: &[INFECTED, SICK, DEAD],
    },
    Plot {
        title: "New: Infected - Sick",
        series: &[INFECTED_PER_DAY, SICK_PER_DAY],
    },
    Plot {
        title: "New: Recoveries - Deaths - Vulnerable",
        series: &[RECOVERY_PER_DAY, DEATH_PER_DAY, VULNERABLE_PER_DAY],
    },
];

/// Ordering hints: each equation follows the ones it is listed with.
pub fn dependencies() -> Dependencies {
    Dependencies::new()
        .declare(OUTCOME, [SICK])
        .declare(RECOVERY_PER_DAY, [OUTCOME])
        .declare(DEATH_PER_DAY, [OUTCOME])
        .declare(POPULATION, [SUSCEPTIBLE, INFECTED, SICK, RECOVERED])
        .declare(INFECTED_PER_DAY, [INFECTED])
        .declare(SICK_PER_DAY, [INFECTED_PER_DAY])
        .declare(VULNERABLE_PER_DAY, [RECOVERY_PER_DAY])
}

/// Build the epidemic model.
///
/// Every flow is a whole number of people and every delay is a transport
/// delay, so the five stocks always sum to the initial population plus the
/// seeded infections.
pub fn build(params: &FluParams) -> BuildResult<Simulator> {
    params.validate()?;
    let mut model = ModelBuilder::new(params.config());

    let [contacts, infection_rate, lethality_rate] =
        live_parameters().map(|parameter| model.parameter(parameter));
    let (contacts, infection_rate, lethality_rate) = (contacts?, infection_rate?, lethality_rate?);

    let population = model.auxiliary(POPULATION, "persons")?;
    let recovery_per_day = model.auxiliary(RECOVERY_PER_DAY, "persons per day")?;
    let death_per_day = model.auxiliary(DEATH_PER_DAY, "persons per day")?;

    let susceptible = model.level(SUSCEPTIBLE, "persons", params.population)?;
    let infected = model.level(INFECTED, "persons", 0.0)?;
    let infected_per_day = model.rate(INFECTED_PER_DAY, "people per day")?;
    let sick = model.level(SICK, "persons", 0.0)?;
    let sick_per_day = model.delay(
        SICK_PER_DAY,
        "persons per day",
        DelaySpec::new(INFECTED_PER_DAY, params.incubation_days).transport(),
    )?;
    let outcome = model.delay(
        OUTCOME,
        "persons",
        DelaySpec::new(SICK_PER_DAY, params.sickness_days).transport(),
    )?;
    let dead = model.level(DEAD, "persons", 0.0)?;
    let recovered = model.level(RECOVERED, "persons", 0.0)?;
    let vulnerable_per_day = model.delay(
        VULNERABLE_PER_DAY,
        "persons",
        DelaySpec::new(RECOVERY_PER_DAY, params.lost_immunity_days).transport(),
    )?;

    let levels = [susceptible, infected, sick, recovered];
    model.define(population, levels, move |x| x.sum(&levels))?;

    // Capped by the susceptible stock's next value, not its current one.
    model.define(
        infected_per_day,
        [
            infection_rate,
            contacts,
            infected,
            susceptible,
            vulnerable_per_day,
        ],
        move |x| {
            let contacted = x.get(infection_rate)? * x.get(contacts)? * x.get(infected)?;
            let remaining = x.get(susceptible)? + x.get(vulnerable_per_day)? - x.this();
            Ok(contacted.round().min(remaining))
        },
    )?;

    // Deaths and recoveries split the same outcome, so they always add back up to it.
    model.define(death_per_day, [outcome, lethality_rate], move |x| {
        Ok((x.get(outcome)? * x.get(lethality_rate)?).round())
    })?;
    model.define(recovery_per_day, [outcome, lethality_rate], move |x| {
        let finished = x.get(outcome)?;
        Ok(finished - (finished * x.get(lethality_rate)?).round())
    })?;

    model.define_level(
        susceptible,
        LevelSpec::new()
            .inflow(vulnerable_per_day)
            .outflow(infected_per_day),
    )?;
    model.define_level(
        infected,
        LevelSpec::new().inflow(infected_per_day).outflow(sick_per_day),
    )?;
    model.define_level(
        sick,
        LevelSpec::new()
            .inflow(sick_per_day)
            .outflow(recovery_per_day)
            .outflow(death_per_day),
    )?;
    model.define_level(
        recovered,
        LevelSpec::new()
            .inflow(recovery_per_day)
            .outflow(vulnerable_per_day),
    )?;
    model.define_level(dead, LevelSpec::new().inflow(death_per_day))?;

    for id in [
        susceptible,
        infected,
        sick,
        recovered,
        dead,
        infected_per_day,
        death_per_day,
    ] {
        model.non_negative(id)?;
    }

    let seed = params.initial_infected;
    let sim = model.build(&dependencies(), move |seeder| seeder.set(INFECTED, seed))?;
    log::info!(
        "flu model ready: {} days at {} days per tick",
        params.duration,
        params.time_step
    );
    Ok(sim)
}

/// Sum of the five stocks. Fails if `sim` was not built by [`build`].
pub fn total_population(sim: &Simulator) -> Result<f64, LookupError> {
    STOCKS.iter().map(|name| sim.value(name)).sum()
}
