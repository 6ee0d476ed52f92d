/*
  Copyright 2017 Takashi Ogura

  Licensed under the Apache License, Version 2.0 (the "License");
  you may not use this file except in compliance with the License.
  You may obtain a copy of the License at

      http://www.apache.org/licenses/LICENSE-2.0

  Unless required by applicable law or agreed to in writing, software
  distributed under the License is distributed on an "AS IS" BASIS,
  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
  See the License for the specific language governing permissions and
  limitations under the License.
*/

//! Constrained bidirectional RRT-Connect. The tree structure (flat vertex arena with
//! parent indices, extend/connect with Reached/Advanced/Trapped, alternating trees)
//! follows the `rrt` crate. Every extension is projected onto the constraint manifold,
//! goal trees are rooted at states drawn from a goal sampleable, and the search is
//! limited by a time budget.

use std::mem;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use crate::constraint::capabilities::{Projectable, SampleGenerator, Sampleable, Testable};
use crate::kinematic_traits::Configuration;
use crate::parameters::CrrtPlannerParameters;
use crate::path_check::check_path;
use crate::path_plan::interpolator::Interpolator;
use crate::path_plan::metric::DistanceMetric;
use crate::path_plan::trajectory::{segment_steps, Interpolated};
use crate::planning_error::PlanningError;
use crate::planning_result::{PlanOutcome, PlanningResult};
use crate::time_budget::TimeBudget;

const START: &str = "start";
const GOAL: &str = "goal";

#[derive(Debug)]
enum ExtendStatus {
    Reached(usize),
    Advanced(usize),
    Trapped,
}

#[derive(Debug, Clone)]
struct Node {
    parent_index: Option<usize>,
    state: Configuration,
    /// Sum of metric distances from the root.
    cost: f64,
}

/// Append-only forest. The start tree has one root, the goal tree gets a root per
/// accepted goal sample.
#[derive(Debug)]
struct Tree {
    vertices: Vec<Node>,
    roots: Vec<usize>,
    name: &'static str,
}

impl Tree {
    fn new(name: &'static str) -> Self {
        Tree { vertices: Vec::new(), roots: Vec::new(), name }
    }

    fn len(&self) -> usize {
        self.vertices.len()
    }

    fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    fn add_root(&mut self, q: Configuration) -> usize {
        let index = self.vertices.len();
        self.vertices.push(Node { parent_index: None, state: q, cost: 0.0 });
        self.roots.push(index);
        index
    }

    fn add_vertex(&mut self, parent_index: usize, q: Configuration, step: f64) -> usize {
        let index = self.vertices.len();
        let cost = self.vertices[parent_index].cost + step;
        self.vertices.push(Node { parent_index: Some(parent_index), state: q, cost });
        index
    }

    fn state(&self, index: usize) -> &Configuration {
        &self.vertices[index].state
    }

    fn get_nearest_index(&self, q: &Configuration, metric: &dyn DistanceMetric) -> Option<usize> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(index, node)| (index, metric.distance(&node.state, q)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// States from the given node up to its root, both included.
    fn get_until_root(&self, index: usize) -> Vec<Configuration> {
        let mut nodes = vec![self.vertices[index].state.clone()];
        let mut cur_index = index;
        while let Some(parent_index) = self.vertices[cur_index].parent_index {
            cur_index = parent_index;
            nodes.push(self.vertices[cur_index].state.clone());
        }
        nodes
    }
}

/// Constraints and collaborators of one CRRT-Connect query.
#[derive(Clone)]
pub struct CrrtProblem {
    /// Source of goal tree roots.
    pub goal_sampleable: Arc<dyn Sampleable>,
    /// Goal roots must satisfy this.
    pub goal_testable: Arc<dyn Testable>,
    /// Trajectory constraint every new node is projected onto.
    pub constraint: Arc<dyn Projectable>,
    /// Source of random extension targets.
    pub config_sampleable: Arc<dyn Sampleable>,
    /// Checked along every edge at the collision resolution.
    pub collision: Arc<dyn Testable>,
    /// Checked on every node.
    pub bounds_testable: Arc<dyn Testable>,
    pub metric: Arc<dyn DistanceMetric>,
    pub interpolator: Arc<dyn Interpolator>,
}

/// Constrained bidirectional tree planner.
///
/// The start tree is rooted at the start state and the goal tree at states drawn from the
/// goal sampleable. Each iteration extends the active tree towards a random target by at
/// most `max_extension_distance`, projects the new state onto the constraint and rejects
/// it if projection fails, moves it by more than `max_distance_btw_projections`, leaves
/// less than `min_step_size` of progress or produces an edge that fails the collision or
/// bounds check. An accepted node is then connected from the other tree by repeated
/// extension until the trees are within `min_tree_connection_distance` or an extension
/// is rejected. Trees swap roles every iteration.
pub struct CrrtConnect {
    pub problem: CrrtProblem,
    pub parameters: CrrtPlannerParameters,
}

impl CrrtConnect {
    pub fn new(problem: CrrtProblem, parameters: CrrtPlannerParameters) -> Result<Self, PlanningError> {
        parameters.validate()?;
        Ok(Self { problem, parameters })
    }

    /// Plans from `start` until the trees connect, the goal sampleable and iteration
    /// budget are exhausted, or the time budget elapses. The returned trajectory passes
    /// through every tree node of the connecting path, from `start` to a goal root.
    pub fn plan(&self, start: &Configuration, budget: &TimeBudget, rng: &mut impl Rng) -> PlanOutcome {
        let parameters = &self.parameters;
        let metric = self.problem.metric.as_ref();

        if !self.is_valid_node(start) || !self.problem.collision.is_satisfied(start) {
            return PlanOutcome::failed(PlanningResult::infeasible(
                "CRRT-Connect: start state violates the bounds or collides",
            ));
        }

        let mut tree_a = Tree::new(START);
        let mut tree_b = Tree::new(GOAL);
        tree_a.add_root(start.clone());

        let mut goal_generator = self.problem.goal_sampleable.create_sample_generator();
        let mut config_generator = self.problem.config_sampleable.create_sample_generator();
        let mut target = Configuration::zeros(start.len());
        let mut iteration = 0;

        loop {
            if budget.is_expired() {
                let message = format!(
                    "CRRT-Connect: time limit of {:?} elapsed after {} iterations, trees have {} and {} nodes",
                    budget.limit(), iteration, tree_a.len(), tree_b.len()
                );
                info!("{}", message);
                return PlanOutcome::failed(PlanningResult::timeout(message));
            }
            if let Some(max_iterations) = parameters.max_iterations {
                if iteration >= max_iterations {
                    return PlanOutcome::failed(PlanningResult::exhausted(format!(
                        "CRRT-Connect: no connection after {} iterations", iteration
                    )));
                }
            }

            let goal_tree = if tree_a.name == GOAL { &mut tree_a } else { &mut tree_b };
            if goal_tree.is_empty() || iteration % parameters.goal_sample_interval == 0 {
                self.add_goal_root(goal_tree, goal_generator.as_mut(), start.len());
            }
            let no_goal = goal_tree.is_empty();
            iteration += 1;
            if no_goal {
                if !goal_generator.can_sample() {
                    return PlanOutcome::failed(PlanningResult::exhausted(
                        "CRRT-Connect: goal sampleable exhausted without a valid goal state",
                    ));
                }
                continue;
            }

            if !self.random_target(&tree_a, &tree_b, config_generator.as_mut(), &mut target, rng) {
                mem::swap(&mut tree_a, &mut tree_b);
                continue;
            }

            let Some(nearest_index) = tree_a.get_nearest_index(&target, metric) else {
                mem::swap(&mut tree_a, &mut tree_b);
                continue;
            };

            match self.extend(&mut tree_a, nearest_index, &target) {
                ExtendStatus::Trapped => {}
                ExtendStatus::Advanced(new_index) | ExtendStatus::Reached(new_index) => {
                    let q_new = tree_a.state(new_index).clone();
                    if let ExtendStatus::Reached(reach_index) = self.connect(&mut tree_b, &q_new, budget) {
                        if self.edge_is_free(tree_b.state(reach_index), &q_new) {
                            let states = self.splice(&tree_a, new_index, &tree_b, reach_index);
                            let message = format!(
                                "CRRT-Connect: connected after {} iterations, {} waypoints, trees have {} and {} nodes",
                                iteration, states.len(), tree_a.len(), tree_b.len()
                            );
                            info!("{}", message);
                            let trajectory =
                                Interpolated::from_states(self.problem.interpolator.clone(), metric, states);
                            return PlanOutcome::found(trajectory, PlanningResult::success(message));
                        }
                        debug!("Junction edge is not free, connection abandoned");
                    }
                }
            }
            debug!("tree_a ({}) = {}, tree_b ({}) = {}", tree_a.name, tree_a.len(), tree_b.name, tree_b.len());
            mem::swap(&mut tree_a, &mut tree_b);
        }
    }

    /// Random extension target. With probability `goal_bias` it is one of the goal roots
    /// (pulling the start tree towards the goals), otherwise a configuration sample.
    fn random_target(
        &self,
        tree_a: &Tree,
        tree_b: &Tree,
        config_generator: &mut dyn SampleGenerator,
        target: &mut Configuration,
        rng: &mut impl Rng,
    ) -> bool {
        let goal_tree = if tree_a.name == GOAL { tree_a } else { tree_b };
        if !goal_tree.roots.is_empty() && rng.r#gen::<f64>() < self.parameters.goal_bias {
            let root = goal_tree.roots[rng.gen_range(0..goal_tree.roots.len())];
            target.clone_from(goal_tree.state(root));
            return true;
        }
        config_generator.can_sample() && config_generator.sample(target)
    }

    fn add_goal_root(&self, tree: &mut Tree, generator: &mut dyn SampleGenerator, dof: usize) {
        if !generator.can_sample() {
            return;
        }
        let mut goal = Configuration::zeros(dof);
        if !generator.sample(&mut goal) {
            debug!("Goal sample failed");
            return;
        }
        if goal.len() != dof {
            debug!("Goal sample has {} joints, expected {}", goal.len(), dof);
            return;
        }
        if self.problem.goal_testable.is_satisfied(&goal)
            && self.is_valid_node(&goal)
            && self.problem.collision.is_satisfied(&goal)
        {
            let index = tree.add_root(goal);
            debug!("Goal root {} added", index);
        } else {
            debug!("Goal sample rejected");
        }
    }

    fn is_valid_node(&self, q: &Configuration) -> bool {
        self.problem.bounds_testable.is_satisfied(q)
    }

    /// Edge from `from` to `to`, excluding `from`, discretized at the collision resolution.
    fn edge_is_free(&self, from: &Configuration, to: &Configuration) -> bool {
        let length = self.problem.metric.distance(from, to);
        let steps = segment_steps(length, self.parameters.collision_resolution);
        let states: Vec<Configuration> = (1..=steps)
            .map(|k| self.problem.interpolator.interpolate(from, to, k as f64 / steps as f64))
            .collect();
        check_path(&states, self.problem.collision.as_ref()).is_none()
    }

    /// One bounded, projected step from node `from` towards `q_target`.
    fn extend(&self, tree: &mut Tree, from: usize, q_target: &Configuration) -> ExtendStatus {
        let parameters = &self.parameters;
        let metric = self.problem.metric.as_ref();
        let q_near = tree.state(from).clone();

        let diff_dist = metric.distance(&q_near, q_target);
        if diff_dist <= parameters.min_tree_connection_distance {
            return ExtendStatus::Reached(from);
        }
        let fraction = if diff_dist > parameters.max_extension_distance {
            parameters.max_extension_distance / diff_dist
        } else {
            1.0
        };
        let q_step = self.problem.interpolator.interpolate(&q_near, q_target, fraction);

        let mut q_new = q_step.clone();
        if !self.problem.constraint.project(&q_step, &mut q_new) {
            debug!("Projection failed");
            return ExtendStatus::Trapped;
        }
        if metric.distance(&q_step, &q_new) > parameters.max_distance_btw_projections {
            debug!("Projection moved the state too far");
            return ExtendStatus::Trapped;
        }
        let step = metric.distance(&q_near, &q_new);
        if step < parameters.min_step_size {
            return ExtendStatus::Trapped;
        }
        if !self.is_valid_node(&q_new) || !self.edge_is_free(&q_near, &q_new) {
            return ExtendStatus::Trapped;
        }

        let reached = metric.distance(&q_new, q_target) <= parameters.min_tree_connection_distance;
        let new_index = tree.add_vertex(from, q_new, step);
        if reached {
            ExtendStatus::Reached(new_index)
        } else {
            ExtendStatus::Advanced(new_index)
        }
    }

    /// Extends `tree` from its node nearest to `q_target` until within the connection
    /// distance (Reached), or until an extension is rejected or stops making progress.
    fn connect(&self, tree: &mut Tree, q_target: &Configuration, budget: &TimeBudget) -> ExtendStatus {
        let metric = self.problem.metric.as_ref();
        let Some(mut current) = tree.get_nearest_index(q_target, metric) else {
            return ExtendStatus::Trapped;
        };
        let mut remaining = metric.distance(tree.state(current), q_target);
        loop {
            if budget.is_expired() {
                return ExtendStatus::Trapped;
            }
            match self.extend(tree, current, q_target) {
                ExtendStatus::Trapped => return ExtendStatus::Trapped,
                ExtendStatus::Reached(index) => return ExtendStatus::Reached(index),
                ExtendStatus::Advanced(index) => {
                    let distance = metric.distance(tree.state(index), q_target);
                    if remaining - distance < self.parameters.min_step_size {
                        debug!("Connect attempt stalled at {}", distance);
                        return ExtendStatus::Trapped;
                    }
                    remaining = distance;
                    current = index;
                }
            }
        }
    }

    /// Path from the start root through the junction to a goal root.
    fn splice(&self, tree_a: &Tree, a_index: usize, tree_b: &Tree, b_index: usize) -> Vec<Configuration> {
        let mut a_all = tree_a.get_until_root(a_index);
        a_all.reverse();
        let b_all = tree_b.get_until_root(b_index);
        let skip_junction = match (a_all.last(), b_all.first()) {
            (Some(a), Some(b)) => self.problem.metric.distance(a, b) == 0.0,
            _ => false,
        };
        a_all.extend(b_all.into_iter().skip(usize::from(skip_junction)));
        if tree_a.name == GOAL {
            a_all.reverse();
        }
        a_all
    }
}
