use std::collections::HashMap;

use uuid::Uuid;

use crate::config::SimConfig;
use crate::delay::{DelayLine, DelaySpec, MAX_DELAY_TICKS};
use crate::equation::{Behavior, Equation, EquationId, EquationKind, Formula};
use crate::error::{BuildError, BuildResult, LookupError};
use crate::parameter::Parameter;
use crate::resolver::{Dependencies, DependencyGraph};
use crate::rule::{Inputs, LevelSpec, Rule, RuleResult};
use crate::simulator::{Seeder, Simulator, StopPredicate};

/// What an equation will compute once the model is built.
enum Source {
    /// Registered but not yet given a rule.
    Undefined,
    Formula(Formula),
    Delay(DelaySpec),
    Parameter(Parameter),
}

struct Entry {
    name: String,
    unit: String,
    kind: EquationKind,
    non_negative: bool,
    initial: f64,
    source: Source,
}

/// Registers equations and resolves them into a runnable [`Simulator`].
///
/// Registration happens in two steps so that rules can refer to equations
/// declared after them: declare every equation to obtain its handle, then
/// attach rules with [`define`](Self::define) or
/// [`define_level`](Self::define_level).
///
/// ```
/// use sd_core::{Dependencies, LevelSpec, ModelBuilder, SimConfig};
///
/// let mut model = ModelBuilder::new(SimConfig::default().with_duration(10.0));
/// let tank = model.level("tank", "litres", 0.0)?;
/// let fill = model.rate("fill", "litres per tick")?;
/// model.define(fill, [], |_| Ok(2.0))?;
/// model.define_level(tank, LevelSpec::new().inflow(fill))?;
///
/// let mut sim = model.build(&Dependencies::new(), |_| Ok(()))?;
/// sim.run_to_completion()?;
/// assert_eq!(sim.value("tank")?, 20.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ModelBuilder {
    model: Uuid,
    config: SimConfig,
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    stop: Option<StopPredicate>,
}

impl std::fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("config", &self.config)
            .field("equations", &self.entries.len())
            .field("custom_stop", &self.stop.is_some())
            .finish()
    }
}

impl ModelBuilder {
    /// Start an empty model.
    pub fn new(config: SimConfig) -> Self {
        Self {
            model: Uuid::new_v4(),
            config,
            entries: Vec::new(),
            by_name: HashMap::new(),
            stop: None,
        }
    }

    /// The configuration the model will run with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Register a stock starting at `initial`. Attach its rule with
    /// [`define_level`](Self::define_level) or [`define`](Self::define).
    pub fn level(&mut self, name: &str, unit: &str, initial: f64) -> BuildResult<EquationId> {
        self.register(name, unit, EquationKind::Level, initial, Source::Undefined)
    }

    /// Register a flow.
    pub fn rate(&mut self, name: &str, unit: &str) -> BuildResult<EquationId> {
        self.register(name, unit, EquationKind::Rate, 0.0, Source::Undefined)
    }

    /// Register a derived quantity.
    pub fn auxiliary(&mut self, name: &str, unit: &str) -> BuildResult<EquationId> {
        self.register(name, unit, EquationKind::Auxiliary, 0.0, Source::Undefined)
    }

    /// Register a delay. The upstream equation is looked up by name at build,
    /// so it may be registered later.
    pub fn delay(&mut self, name: &str, unit: &str, spec: DelaySpec) -> BuildResult<EquationId> {
        let initial = spec.initial;
        self.register(name, unit, EquationKind::Delay, initial, Source::Delay(spec))
    }

    /// Register a parameter. Its value starts at the declared default.
    pub fn parameter(&mut self, parameter: Parameter) -> BuildResult<EquationId> {
        let name = parameter.name.clone();
        let unit = parameter.unit.clone();
        let initial = parameter.default;
        self.register(
            &name,
            &unit,
            EquationKind::Parameter,
            initial,
            Source::Parameter(parameter),
        )
    }

    /// Clamp negative results of `id` to 0.
    pub fn non_negative(&mut self, id: EquationId) -> BuildResult<()> {
        self.entry_mut(id)?.non_negative = true;
        Ok(())
    }

    /// Attach an update rule reading the current values of `inputs`.
    ///
    /// The rule may always read its own equation. Reading any equation not
    /// listed in `inputs` aborts the run with
    /// [`SimError::UndeclaredInput`](crate::SimError::UndeclaredInput).
    pub fn define<I, F>(&mut self, id: EquationId, inputs: I, rule: F) -> BuildResult<()>
    where
        I: IntoIterator<Item = EquationId>,
        F: Fn(&Inputs<'_>) -> RuleResult + 'static,
    {
        self.define_rule(id, inputs, rule)
    }

    /// Attach any [`Rule`] implementation. See [`define`](Self::define).
    pub fn define_rule<I, R>(&mut self, id: EquationId, inputs: I, rule: R) -> BuildResult<()>
    where
        I: IntoIterator<Item = EquationId>,
        R: Rule + 'static,
    {
        let inputs: Vec<EquationId> = inputs.into_iter().collect();
        if let Some(foreign) = inputs.iter().find(|input| !self.issued(**input)) {
            return Err(BuildError::ForeignHandle(*foreign));
        }

        let entry = self.entry_mut(id)?;
        if !entry.kind.takes_rule() || !matches!(entry.source, Source::Undefined) {
            return Err(BuildError::NotDefinable(entry.name.clone()));
        }
        entry.source = Source::Formula(Formula {
            inputs,
            rule: Box::new(rule),
        });
        Ok(())
    }

    /// Attach the canonical stock rule: current value plus inflows minus
    /// outflows.
    pub fn define_level(&mut self, id: EquationId, spec: LevelSpec) -> BuildResult<()> {
        self.define_rule(id, spec.inputs(), spec)
    }

    /// Replace the default stop condition (`time > duration`). Checked after
    /// every committed tick.
    pub fn stop_when(&mut self, predicate: impl Fn(&Simulator) -> bool + 'static) {
        self.stop = Some(Box::new(predicate));
    }

    /// Handle of a registered equation.
    pub fn id(&self, name: &str) -> Option<EquationId> {
        self.by_name
            .get(name)
            .map(|&ordinal| EquationId::new(self.model, ordinal))
    }

    /// Number of registered equations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the evaluation order, assign initial values and run `init`
    /// once.
    ///
    /// `init` runs again on every [`Simulator::reset`].
    pub fn build<F>(self, dependencies: &Dependencies, init: F) -> BuildResult<Simulator>
    where
        F: FnMut(&mut Seeder<'_>) -> Result<(), LookupError> + 'static,
    {
        let time_step = self.config.time_step;
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(BuildError::InvalidTimeStep(time_step));
        }
        let duration = self.config.duration;
        if self.stop.is_none() && !duration.is_finite() {
            return Err(BuildError::InvalidDuration(duration));
        }

        let mut graph = DependencyGraph::new(self.entries.len());
        for (equation, upstream) in dependencies.iter() {
            let node = self.ordinal(equation, || BuildError::UnknownEquation(equation.to_string()))?;
            for name in upstream {
                let up = self.ordinal(name, || BuildError::UnknownDependency {
                    equation: equation.to_string(),
                    dependency: name.clone(),
                })?;
                graph.add(node, up);
            }
        }
        for (node, entry) in self.entries.iter().enumerate() {
            if let Source::Formula(formula) = &entry.source {
                if entry.kind.is_algebraic() {
                    for input in &formula.inputs {
                        let up = input.ordinal();
                        if up != node && self.entries[up].kind.is_algebraic() {
                            graph.add(node, up);
                        }
                    }
                }
            }
        }
        let order = graph.topological_order().map_err(|cycle| BuildError::Cycle {
            path: cycle
                .into_iter()
                .map(|i| self.entries[i].name.clone())
                .collect(),
        })?;

        let ModelBuilder {
            model,
            config,
            entries,
            by_name,
            stop,
        } = self;
        let mut equations = Vec::with_capacity(entries.len());
        for (ordinal, entry) in entries.into_iter().enumerate() {
            let behavior = match entry.source {
                Source::Undefined => return Err(BuildError::MissingRule(entry.name)),
                Source::Formula(formula) => Behavior::Formula(formula),
                Source::Parameter(parameter) => {
                    parameter.validate()?;
                    Behavior::Parameter(parameter)
                }
                Source::Delay(spec) => {
                    let ticks = spec.horizon / time_step;
                    if !spec.horizon.is_finite()
                        || spec.horizon <= 0.0
                        || ticks > MAX_DELAY_TICKS
                    {
                        return Err(BuildError::InvalidHorizon {
                            name: entry.name,
                            horizon: spec.horizon,
                        });
                    }
                    let Some(&upstream) = by_name.get(&spec.upstream) else {
                        return Err(BuildError::UnknownUpstream {
                            delay: entry.name,
                            upstream: spec.upstream,
                        });
                    };
                    Behavior::Delay(DelayLine::new(
                        spec.kind,
                        upstream,
                        spec.horizon,
                        time_step,
                        spec.initial,
                    ))
                }
            };
            equations.push(Equation::new(
                EquationId::new(model, ordinal),
                entry.name,
                entry.unit,
                entry.kind,
                entry.non_negative,
                entry.initial,
                behavior,
            ));
        }

        let stop: StopPredicate = match stop {
            Some(stop) => stop,
            None => Box::new(move |sim: &Simulator| sim.time() > duration),
        };
        Simulator::new(config, equations, by_name, order, stop, Box::new(init))
    }

    fn register(
        &mut self,
        name: &str,
        unit: &str,
        kind: EquationKind,
        initial: f64,
        source: Source,
    ) -> BuildResult<EquationId> {
        if self.by_name.contains_key(name) {
            return Err(BuildError::DuplicateName(name.to_string()));
        }
        let ordinal = self.entries.len();
        self.by_name.insert(name.to_string(), ordinal);
        self.entries.push(Entry {
            name: name.to_string(),
            unit: unit.to_string(),
            kind,
            non_negative: false,
            initial,
            source,
        });
        log::debug!("registered {kind} \"{name}\" as {ordinal}");
        Ok(EquationId::new(self.model, ordinal))
    }

    fn issued(&self, id: EquationId) -> bool {
        id.model() == self.model && id.ordinal() < self.entries.len()
    }

    fn entry_mut(&mut self, id: EquationId) -> BuildResult<&mut Entry> {
        if !self.issued(id) {
            return Err(BuildError::ForeignHandle(id));
        }
        Ok(&mut self.entries[id.ordinal()])
    }

    fn ordinal(&self, name: &str, missing: impl FnOnce() -> BuildError) -> BuildResult<usize> {
        self.by_name.get(name).copied().ok_or_else(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f64) -> impl Fn(&Inputs<'_>) -> RuleResult {
        move |_| Ok(value)
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut model = ModelBuilder::new(SimConfig::default());
        model.level("stock", "units", 0.0).unwrap();
        assert_eq!(
            model.rate("stock", "units"),
            Err(BuildError::DuplicateName("stock".into()))
        );
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn missing_rule_fails_build() {
        let mut model = ModelBuilder::new(SimConfig::default());
        model.auxiliary("lonely", "units").unwrap();
        let err = model.build(&Dependencies::new(), |_| Ok(())).unwrap_err();
        assert_eq!(err, BuildError::MissingRule("lonely".into()));
    }

    #[test]
    fn rules_attach_once_and_only_to_formula_kinds() {
        let mut model = ModelBuilder::new(SimConfig::default());
        let rate = model.rate("flow", "units").unwrap();
        let param = model
            .parameter(Parameter::new("knob", 1.0, 0.0, 2.0, 0.1))
            .unwrap();
        model.define(rate, [], constant(1.0)).unwrap();
        assert_eq!(
            model.define(rate, [], constant(2.0)),
            Err(BuildError::NotDefinable("flow".into()))
        );
        assert_eq!(
            model.define(param, [], constant(2.0)),
            Err(BuildError::NotDefinable("knob".into()))
        );
    }

    #[test]
    fn handles_from_elsewhere_are_rejected() {
        let mut other = ModelBuilder::new(SimConfig::default());
        other.rate("a", "units").unwrap();
        let foreign = other.rate("b", "units").unwrap();

        let mut model = ModelBuilder::new(SimConfig::default());
        let only = model.rate("a", "units").unwrap();
        assert_eq!(
            model.define(only, [foreign], constant(0.0)),
            Err(BuildError::ForeignHandle(foreign))
        );
        assert_eq!(
            model.non_negative(foreign),
            Err(BuildError::ForeignHandle(foreign))
        );
    }

    #[test]
    fn foreign_handle_with_a_local_ordinal_is_rejected() {
        let mut other = ModelBuilder::new(SimConfig::default());
        let foreign = other.level("x", "units", 7.0).unwrap();

        let mut model = ModelBuilder::new(SimConfig::default());
        let a = model.level("a", "units", 7.0).unwrap();
        let b = model.auxiliary("b", "units").unwrap();
        assert_eq!(a.ordinal(), foreign.ordinal());
        assert_ne!(a, foreign);

        assert_eq!(
            model.define(b, [foreign], move |x| x.get(foreign)),
            Err(BuildError::ForeignHandle(foreign))
        );
        assert_eq!(
            model.define_level(foreign, LevelSpec::new()),
            Err(BuildError::ForeignHandle(foreign))
        );
        assert_eq!(model.id("a"), Some(a));
    }

    #[test]
    fn algebraic_cycle_is_named() {
        let mut model = ModelBuilder::new(SimConfig::default());
        let a = model.auxiliary("a", "units").unwrap();
        let b = model.auxiliary("b", "units").unwrap();
        model.define(a, [b], move |x| x.get(b)).unwrap();
        model.define(b, [a], move |x| x.get(a)).unwrap();
        let err = model.build(&Dependencies::new(), |_| Ok(())).unwrap_err();
        assert_eq!(
            err,
            BuildError::Cycle {
                path: vec!["a".into(), "b".into(), "a".into()]
            }
        );
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }

    #[test]
    fn hinted_cycle_is_named() {
        let mut model = ModelBuilder::new(SimConfig::default());
        let a = model.level("a", "units", 0.0).unwrap();
        let b = model.level("b", "units", 0.0).unwrap();
        model.define_level(a, LevelSpec::new()).unwrap();
        model.define_level(b, LevelSpec::new()).unwrap();
        let deps = Dependencies::new().declare("a", ["b"]).declare("b", ["a"]);
        assert!(matches!(
            model.build(&deps, |_| Ok(())),
            Err(BuildError::Cycle { path }) if path == ["a", "b", "a"]
        ));
    }

    #[test]
    fn feedback_through_a_stock_is_not_a_cycle() {
        let mut model = ModelBuilder::new(SimConfig::default());
        let stock = model.level("stock", "units", 10.0).unwrap();
        let drain = model.rate("drain", "units").unwrap();
        model
            .define(drain, [stock], move |x| Ok(x.get(stock)? * 0.1))
            .unwrap();
        model
            .define_level(stock, LevelSpec::new().outflow(drain))
            .unwrap();
        assert!(model.build(&Dependencies::new(), |_| Ok(())).is_ok());
    }

    #[test]
    fn unknown_names_in_hints_fail() {
        let mut model = ModelBuilder::new(SimConfig::default());
        let a = model.rate("a", "units").unwrap();
        model.define(a, [], constant(0.0)).unwrap();
        let deps = Dependencies::new().declare("a", ["ghost"]);
        assert_eq!(
            model.build(&deps, |_| Ok(())).unwrap_err(),
            BuildError::UnknownDependency {
                equation: "a".into(),
                dependency: "ghost".into()
            }
        );

        let mut model = ModelBuilder::new(SimConfig::default());
        let a = model.rate("a", "units").unwrap();
        model.define(a, [], constant(0.0)).unwrap();
        let deps = Dependencies::new().declare("ghost", ["a"]);
        assert_eq!(
            model.build(&deps, |_| Ok(())).unwrap_err(),
            BuildError::UnknownEquation("ghost".into())
        );
    }

    #[test]
    fn delay_upstream_and_horizon_are_checked() {
        let mut model = ModelBuilder::new(SimConfig::default());
        model
            .delay("late", "units", DelaySpec::new("missing", 3.0))
            .unwrap();
        assert_eq!(
            model.build(&Dependencies::new(), |_| Ok(())).unwrap_err(),
            BuildError::UnknownUpstream {
                delay: "late".into(),
                upstream: "missing".into()
            }
        );

        let mut model = ModelBuilder::new(SimConfig::default());
        let src = model.rate("src", "units").unwrap();
        model.define(src, [], constant(1.0)).unwrap();
        model
            .delay("late", "units", DelaySpec::new("src", 0.0))
            .unwrap();
        assert!(matches!(
            model.build(&Dependencies::new(), |_| Ok(())),
            Err(BuildError::InvalidHorizon { .. })
        ));
    }

    #[test]
    fn overlong_delay_fails_instead_of_allocating() {
        for spec in [
            DelaySpec::new("src", 1e19).transport(),
            DelaySpec::new("src", 1e9).transport(),
            DelaySpec::new("src", 1e19),
        ] {
            let mut model = ModelBuilder::new(SimConfig::default());
            let src = model.rate("src", "units").unwrap();
            model.define(src, [], constant(1.0)).unwrap();
            model.delay("late", "units", spec).unwrap();
            assert!(matches!(
                model.build(&Dependencies::new(), |_| Ok(())),
                Err(BuildError::InvalidHorizon { ref name, .. }) if name == "late"
            ));
        }

        // A short horizon over a tiny time step is just as long in ticks.
        let mut model = ModelBuilder::new(SimConfig::default().with_time_step(1e-9));
        let src = model.rate("src", "units").unwrap();
        model.define(src, [], constant(1.0)).unwrap();
        model
            .delay("late", "units", DelaySpec::new("src", 10.0).transport())
            .unwrap();
        assert!(matches!(
            model.build(&Dependencies::new(), |_| Ok(())),
            Err(BuildError::InvalidHorizon { .. })
        ));

        let mut model = ModelBuilder::new(SimConfig::default());
        let src = model.rate("src", "units").unwrap();
        model.define(src, [], constant(1.0)).unwrap();
        model
            .delay("late", "units", DelaySpec::new("src", MAX_DELAY_TICKS).transport())
            .unwrap();
        assert!(model.build(&Dependencies::new(), |_| Ok(())).is_ok());
    }

    #[test]
    fn invalid_time_step_and_parameters_fail() {
        let model = ModelBuilder::new(SimConfig::default().with_time_step(0.0));
        assert_eq!(
            model.build(&Dependencies::new(), |_| Ok(())).unwrap_err(),
            BuildError::InvalidTimeStep(0.0)
        );

        for duration in [f64::NAN, f64::INFINITY] {
            let model = ModelBuilder::new(SimConfig::default().with_duration(duration));
            assert!(matches!(
                model.build(&Dependencies::new(), |_| Ok(())),
                Err(BuildError::InvalidDuration(_))
            ));
        }
        let mut model = ModelBuilder::new(SimConfig::default().with_duration(f64::NAN));
        model.stop_when(|sim| sim.tick() >= 3);
        let mut sim = model.build(&Dependencies::new(), |_| Ok(())).unwrap();
        assert_eq!(sim.run_to_completion(), Ok(3));

        let mut model = ModelBuilder::new(SimConfig::default());
        model
            .parameter(Parameter::new("bad", 5.0, 0.0, 1.0, 0.1))
            .unwrap();
        assert_eq!(
            model.build(&Dependencies::new(), |_| Ok(())).unwrap_err(),
            BuildError::InvalidParameter("bad".into())
        );
    }

    #[test]
    fn failing_init_hook_fails_build() {
        let mut model = ModelBuilder::new(SimConfig::default());
        let a = model.rate("a", "units").unwrap();
        model.define(a, [], constant(0.0)).unwrap();
        let err = model
            .build(&Dependencies::new(), |seed| seed.set("nobody", 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::Seed(LookupError::UnknownEquation("nobody".into()))
        );
    }

    #[test]
    fn id_finds_registered_equations() {
        let mut model = ModelBuilder::new(SimConfig::default());
        assert!(model.is_empty());
        let a = model.rate("a", "units").unwrap();
        assert_eq!(model.id("a"), Some(a));
        assert_eq!(model.id("b"), None);
    }
}
