use crate::bct::{ConnectivityTable, SwitchLayout};
use crate::characteristic::{Characteristic, Difference};
use crate::cluster::ClusterSearch;
use crate::error::SearchResult;
use crate::search_config::{Deadline, SearchConfig};
use crate::trail::TrailSearch;
use std::collections::BTreeMap;

/// Boomerang end points, keyed by state variable (e.g. `X0` and `X5`).
///
/// A pinned variable is never overwritten by the search. Callers that reuse a
/// [`BoomerangState`] for an independent boomerang unpin everything with
/// [`BoomerangEndpoints::clear`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoomerangEndpoints {
    values: BTreeMap<String, Difference>,
}

impl BoomerangEndpoints {
    /// Pin `variable` to `value` unless it is already pinned. Returns `true` if it was not.
    pub fn pin(&mut self, variable: &str, value: Difference) -> bool {
        if self.values.contains_key(variable) {
            return false;
        }
        self.values.insert(variable.to_string(), value);
        true
    }

    pub fn get(&self, variable: &str) -> Option<Difference> {
        self.values.get(variable).copied()
    }

    pub fn is_pinned(&self, variable: &str) -> bool {
        self.values.contains_key(variable)
    }

    /// Forget all pinned end points.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Counters reported alongside the probability.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoomerangStatistics {
    pub upper_trails: usize,
    pub lower_trails: usize,
    pub switches_accepted: usize,
    pub switches_rejected: usize,
}

/// The phase of the boomerang state machine.
pub(crate) enum Phase {
    /// Between upper trails.
    Idle,
    SearchUpper(TrailSearch),
    /// Decide whether the current upper trail admits another lower trail.
    NextLower,
    SearchLower(TrailSearch),
    /// Check the switch of the current trail pair.
    ValidateSwitch,
    ClusterUpper(ClusterSearch),
    ClusterLower(ClusterSearch),
    Accumulate,
    Terminal,
}

/// The trail pair and clustering results of the current iteration.
#[derive(Clone, Debug)]
pub(crate) struct TrailPair {
    pub upper: Characteristic,
    pub upper_weight: usize,
    pub lower: Option<(Characteristic, usize)>,
    pub switch: f64,
    /// Computed once per upper trail.
    pub upper_probability: Option<f64>,
    pub lower_probability: Option<f64>,
}

/// State of a [`crate::boomerang::BoomerangSearch`].
pub struct BoomerangState {
    pub(crate) phase: Phase,
    pub(crate) table: ConnectivityTable,
    pub(crate) layout: SwitchLayout,
    pub(crate) deadline: Deadline,
    /// Upper trails excluded from further upper searches.
    pub blocked_upper: Vec<Characteristic>,
    /// Lower trails excluded for the current upper trail.
    pub blocked_lower: Vec<Characteristic>,
    /// Starting weight of upper searches; raised as upper trails get processed.
    pub upper_weight: usize,
    /// Weight of the last lower trail found for the current upper trail.
    pub last_lower_weight: usize,
    pub(crate) current: Option<TrailPair>,
    pub probability: f64,
    pub endpoints: BoomerangEndpoints,
    pub statistics: BoomerangStatistics,
}

impl BoomerangState {
    /// Builds the connectivity table of the configured model.
    pub fn new(config: &SearchConfig) -> SearchResult<BoomerangState> {
        let model = config.model.as_ref();
        let table = ConnectivityTable::for_model(model)?;
        let layout = SwitchLayout::new(
            model.paradigm(),
            config.word_size,
            model.substitution_bits(),
            model.permutation(),
        );
        Ok(BoomerangState {
            phase: Phase::Idle,
            table,
            layout,
            deadline: Deadline::start(config.time_limit),
            blocked_upper: Vec::new(),
            blocked_lower: Vec::new(),
            upper_weight: config.upper_weight,
            last_lower_weight: config.lower_weight,
            current: None,
            probability: 0.0,
            endpoints: BoomerangEndpoints::default(),
            statistics: BoomerangStatistics::default(),
        })
    }

    /// Start a new iteration with `upper` as the current upper trail.
    pub(crate) fn accept_upper(
        &mut self,
        config: &SearchConfig,
        upper: Characteristic,
        weight: usize,
    ) {
        self.statistics.upper_trails += 1;
        self.last_lower_weight = config.lower_weight;
        self.current = Some(TrailPair {
            upper,
            upper_weight: weight,
            lower: None,
            switch: 0.0,
            upper_probability: None,
            lower_probability: None,
        });
    }

    /// Record a lower trail for the current upper trail. It is blocked right away, whether
    /// its switch is accepted or not.
    pub(crate) fn accept_lower(&mut self, lower: Characteristic, weight: usize) {
        self.statistics.lower_trails += 1;
        self.last_lower_weight = weight;
        self.blocked_lower.push(lower.clone());
        if let Some(pair) = self.current.as_mut() {
            pair.lower = Some((lower, weight));
            pair.lower_probability = None;
        }
    }

    /// Another lower trail is only searched while the last one is below the window bound:
    /// `lower_weight + (nibbles - lower_weight)` for small starting weights, otherwise only
    /// trails of the starting weight itself.
    pub(crate) fn lower_window_open(&self, config: &SearchConfig) -> bool {
        let nibbles = config.nibbles();
        let limit = if config.lower_weight < nibbles {
            nibbles - config.lower_weight
        } else {
            1
        };
        self.last_lower_weight < config.lower_weight + limit
    }

    /// No lower trail exists: block the current upper trail and forget its lower trails.
    ///
    /// The upper trail is taken out of the iteration, so it cannot be blocked twice.
    pub(crate) fn lower_exhausted(&mut self) {
        if let Some(pair) = self.current.take() {
            self.blocked_upper.push(pair.upper);
        }
        self.blocked_lower.clear();
    }

    /// All lower trails of the current upper trail were processed. Later upper searches
    /// start at the weight of this upper trail.
    pub(crate) fn finish_upper(&mut self) {
        if let Some(pair) = self.current.take() {
            self.upper_weight = pair.upper_weight;
            self.blocked_upper.push(pair.upper);
        }
        self.blocked_lower.clear();
    }

    /// Pin the input of the upper trail and the output of the lower trail (first time only).
    pub(crate) fn pin_endpoints(
        &mut self,
        config: &SearchConfig,
        input: Difference,
        output: Difference,
    ) -> Vec<String> {
        let mut pinned = Vec::new();
        let input_variable = config.state_variable(0);
        if self.endpoints.pin(&input_variable, input) {
            pinned.push(input_variable);
        }
        let output_variable = config.state_variable(config.lower_rounds);
        if self.endpoints.pin(&output_variable, output) {
            pinned.push(output_variable);
        }
        pinned
    }

    /// Add `p_upper^2 * p_lower^2 * p_switch` to the boomerang probability.
    pub(crate) fn accumulate(&mut self, upper: f64, lower: f64, switch: f64) -> f64 {
        let contribution = upper * upper * lower * lower * switch;
        self.probability += contribution;
        self.statistics.switches_accepted += 1;
        contribution
    }
}
