use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nalgebra::{Isometry3, Matrix6x2, Point3, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use rs_tsr_planning::ball_obstacles::BallObstacles;
use rs_tsr_planning::constraint::bounds::JointBounds;
use rs_tsr_planning::constraint::collision_free::CollisionFree;
use rs_tsr_planning::kinematic_traits::{Configuration, Kinematics};
use rs_tsr_planning::parameter_error::ParameterError;
use rs_tsr_planning::parameters::{CrrtPlannerParameters, TsrPlanningParameters};
use rs_tsr_planning::parameters_from_file::named_configurations_from_yaml_file;
use rs_tsr_planning::planar_arm::PlanarArm;
use rs_tsr_planning::planning::util::RobotPlanner;
use rs_tsr_planning::planning_result::PlanOutcome;
use rs_tsr_planning::robot::Robot;
use rs_tsr_planning::tsr::Tsr;
use rs_tsr_planning::utils::{as_radians, dump_configuration, dump_pose, dump_trajectory};

/// Plans motions of a planar arm around a ball obstacle: a joint space goal, a Task Space
/// Region goal and a straight end-effector offset.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Link lengths of the arm, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.5, 0.4, 0.3])]
    links: Vec<f64>,

    /// Time limit of each planning query, seconds
    #[arg(long, default_value_t = 5.0)]
    time_limit: f64,

    /// Seed of the random number generator
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// YAML file with `crrt_planner_parameters` and/or `tsr_planning_parameters`
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// YAML file with named goal configurations; all of them are planned to as one goal set
    #[arg(long)]
    goals: Option<PathBuf>,

    /// Distance to move the end effector towards the base (negative moves away)
    #[arg(long, default_value_t = 0.2, allow_negative_numbers = true)]
    offset: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rs_tsr_planning=info")),
        )
        .init();

    let args = Args::parse();
    if args.links.is_empty() {
        bail!("The arm needs at least one link");
    }
    let dof = args.links.len();
    let time_limit = Duration::try_from_secs_f64(args.time_limit)
        .with_context(|| format!("Invalid time limit {}", args.time_limit))?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    let arm = PlanarArm::new(args.links.clone());
    let reach = arm.reach();
    // Ball across the arm's way at 3/4 of its reach, leaving room to pass with a bent elbow.
    let obstacles = BallObstacles::new(arm.clone(), 0.02)
        .with_ball(Point3::new(0.0, 0.75 * reach, 0.0), 0.08 * reach);
    let collision = Arc::new(CollisionFree::new(Arc::new(obstacles)));

    let bounds = JointBounds::new(vec![-PI; dof], vec![PI; dof])?;
    let mut start_degrees = vec![0.0; dof];
    start_degrees[0] = -30.0;
    let start = as_radians(&start_degrees);
    let robot = Arc::new(Robot::new(Arc::new(arm), Arc::new(bounds), start)?);

    let (crrt_parameters, tsr_parameters) = match &args.parameters {
        Some(path) => read_parameters(path)?,
        None => (CrrtPlannerParameters::default(), TsrPlanningParameters::default()),
    };
    let planner = RobotPlanner::new(robot.clone(), collision)
        .with_crrt_parameters(crrt_parameters)
        .with_tsr_parameters(tsr_parameters);

    println!("Start:");
    dump_configuration(&robot.configuration());
    dump_pose(&robot.end_effector_pose());

    // Swinging the stretched arm over to the other side runs into the ball.
    let goals: Vec<Configuration> = match &args.goals {
        Some(path) => {
            let named = named_configurations_from_yaml_file(path)
                .with_context(|| format!("Failed to read goals from {}", path.display()))?;
            let mut names: Vec<_> = named.keys().cloned().collect();
            names.sort();
            info!("Goal set: {}", names.join(", "));
            names.into_iter().filter_map(|name| named.get(&name).cloned()).collect()
        }
        None => {
            let mut goal = Configuration::zeros(dof);
            goal[0] = 2.5;
            vec![goal]
        }
    };
    let outcome = planner.plan_to_configurations(&goals, time_limit, &mut rng)?;
    report("Joint space goal", &outcome);

    // End effector anywhere within 2 cm of a point on the left, any heading.
    let target = Isometry3::translation(-0.5 * reach, 0.3 * reach, 0.0);
    #[rustfmt::skip]
    let bw = Matrix6x2::new(
        -0.02, 0.02,
        -0.02, 0.02,
        0.0, 0.0,
        0.0, 0.0,
        0.0, 0.0,
        -PI, PI,
    );
    let tsr = Tsr::new(target, Isometry3::identity(), bw)?;
    let outcome = planner.plan_to_tsr(&tsr, time_limit, &mut rng)?;
    report("Task Space Region goal", &outcome);

    let tip = robot.kinematics().forward(&robot.configuration()).translation.vector;
    let towards_base: Vector3<f64> = -Vector3::new(tip.x, tip.y, 0.0);
    let outcome = planner.plan_to_end_effector_offset_by_crrt(
        &towards_base,
        args.offset,
        0.01,
        0.05,
        time_limit,
        &mut rng,
    )?;
    report("End effector offset", &outcome);
    Ok(())
}

/// Either section may be left out of the file; it then keeps its defaults.
fn read_parameters(path: &Path) -> Result<(CrrtPlannerParameters, TsrPlanningParameters)> {
    let crrt = match CrrtPlannerParameters::from_yaml_file(path) {
        Err(ParameterError::MissingField(_)) => CrrtPlannerParameters::default(),
        other => other.with_context(|| format!("Failed to read {}", path.display()))?,
    };
    let tsr = match TsrPlanningParameters::from_yaml_file(path) {
        Err(ParameterError::MissingField(_)) => TsrPlanningParameters::default(),
        other => other.with_context(|| format!("Failed to read {}", path.display()))?,
    };
    info!("Planner parameters:\n{}{}", crrt.to_yaml(), tsr.to_yaml());
    Ok((crrt, tsr))
}

fn report(query: &str, outcome: &PlanOutcome) {
    println!("{}: {}", query, outcome.result);
    if let Some(trajectory) = &outcome.trajectory {
        dump_trajectory(trajectory);
    }
}
