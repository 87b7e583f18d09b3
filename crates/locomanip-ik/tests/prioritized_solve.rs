//! Integration tests: end-to-end prioritized solves on the shared fixtures.
//!
//! Covers the solver-level guarantees:
//! 1. A single full-rank task reaches OPTIMAL
//! 2. A lower level never disturbs a satisfied higher level
//! 3. Nullspace projectors stay idempotent at random configurations
//! 4. Identical set-ups give bitwise identical results
//! 5. Unreachable targets are never reported OPTIMAL
//! 6. Accepted costs decrease monotonically
//! 7. Gains scale the error, not the solution
//! 8. Floating-base solves keep a unit base quaternion and reject degenerate seeds

use approx::assert_relative_eq;
use locomanip_ik::{
    BaseType, CenterOfMass, ContactNormal, IkConfig, IkError, IkSolver, JointIndex, JointSubset,
    KinematicModel, KinematicsError, LineSearchRule, MidfeetPose6D, Orientation3D,
    PointAvoidance, Pose6D, RobotKinematics, SolveStatus, Task, TaskReference, TaskStack,
};
use locomanip_test_utils::fixtures::{FLOATING_BIPED, PLANAR_ARM, SIX_DOF_ARM};
use locomanip_test_utils::{random_configuration, seeded_rng};
use nalgebra::{DMatrix, DVector, Isometry3, UnitQuaternion, Vector3};

fn planar() -> KinematicModel {
    KinematicModel::from_urdf_str(PLANAR_ARM, BaseType::Fixed).unwrap()
}

fn six_dof() -> KinematicModel {
    KinematicModel::from_urdf_str(SIX_DOF_ARM, BaseType::Fixed).unwrap()
}

fn biped() -> KinematicModel {
    KinematicModel::from_urdf_str(FLOATING_BIPED, BaseType::Floating).unwrap()
}

fn pose_at(model: &mut KinematicModel, q: &[f64], frame: &str) -> Isometry3<f64> {
    model.update_kinematics(&DVector::from_row_slice(q)).unwrap();
    model.frame_pose(frame).unwrap()
}

fn pose_task(name: &str, frame: &str, target: Isometry3<f64>) -> Box<dyn Task> {
    let mut task = Pose6D::new(name, frame);
    task.set_reference(target.into()).unwrap();
    Box::new(task)
}

fn joint_task(name: &str, joints: &[&str], target: &[f64]) -> Box<dyn Task> {
    let mut task = JointSubset::new(name, joints.iter().copied());
    task.set_reference(TaskReference::Vector(DVector::from_row_slice(target)))
        .unwrap();
    Box::new(task)
}

/// Neutral biped configuration with slightly bent knees.
fn crouched(model: &KinematicModel) -> DVector<f64> {
    let mut q = model.neutral_configuration();
    for side in ["left", "right"] {
        for (joint, angle) in [("hip_pitch", -0.3), ("knee", 0.6), ("ankle_pitch", -0.3)] {
            let JointIndex { position, .. } =
                model.joint_index(&format!("{side}_{joint}")).unwrap();
            q[position] = angle;
        }
    }
    q
}

// ---------------------------------------------------------------------------
// Single task / full rank
// ---------------------------------------------------------------------------

#[test]
fn full_rank_pose_task_reaches_optimal() {
    let target = pose_at(&mut six_dof(), &[0.5, 0.3, -0.4, 0.2, 0.5, -0.3], "end_effector");

    let mut solver = IkSolver::with_defaults(six_dof());
    solver.add_task(pose_task("ee", "end_effector", target));
    solver.prepare().unwrap();
    solver
        .set_initial_config(DVector::from_vec(vec![0.2, 0.1, -0.2, 0.0, 0.3, 0.0]))
        .unwrap();
    let result = solver.solve(false).unwrap();

    assert!(result.converged, "IK did not converge: {result}");
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!(result.error_norm <= solver.config().error_tol);

    let reached = solver.kinematics().frame_pose("end_effector").unwrap();
    assert_relative_eq!(
        reached.translation.vector,
        target.translation.vector,
        epsilon = 1e-4
    );
}

#[test]
fn contact_task_lands_in_band() {
    let normal = Vector3::y_axis();
    let plane = Vector3::new(0.0, 1.0, 0.0);
    let mut contact = ContactNormal::new("touch", "tool", normal, plane).with_margin(0.05);
    contact
        .set_reference(UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.2).into())
        .unwrap();

    let mut solver = IkSolver::with_defaults(planar());
    solver.add_task(Box::new(contact.clone()));
    solver.prepare().unwrap();
    solver
        .set_initial_config(DVector::from_vec(vec![-0.2, 0.3, 0.1]))
        .unwrap();
    let result = solver.solve(false).unwrap();

    assert!(result.converged, "contact did not converge: {result}");
    let distance = contact.plane_distance(solver.kinematics()).unwrap();
    // The distance row is ½ o|o|, so error_tol bounds the overshoot o by ~0.014
    assert!(distance.abs() <= 0.05 + 0.015, "plane distance {distance}");
}

#[test]
fn avoidance_pushes_frame_out_of_margin() {
    let mut model = planar();
    let q0 = [0.3, -0.4, 0.2];
    let tool = pose_at(&mut model, &q0, "tool").translation.vector;
    let margin = 0.2;
    let mut avoid = PointAvoidance::new("avoid", ["tool"], margin);
    avoid.set_obstacles(vec![tool + Vector3::new(0.05, 0.05, 0.0)]);

    let mut solver = IkSolver::with_defaults(model);
    solver.add_task(Box::new(avoid.clone()));
    solver.prepare().unwrap();
    solver.set_initial_config(DVector::from_row_slice(&q0)).unwrap();
    let result = solver.solve(false).unwrap();

    assert_eq!(result.status, SolveStatus::Optimal, "{result}");
    let reached = solver.kinematics().frame_pose("tool").unwrap().translation.vector;
    let distance = (reached - avoid.obstacles()[0]).norm();
    assert!(distance > margin - 0.015, "distance {distance}");
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[test]
fn conflicting_joint_tasks_respect_priority() {
    let solo = {
        let mut solver = IkSolver::with_defaults(planar());
        solver.add_task(joint_task("elbow", &["elbow"], &[0.5]));
        solver.prepare().unwrap();
        solver.set_initial_config(DVector::zeros(3)).unwrap();
        solver.solve(false).unwrap()
    };

    let mut solver = IkSolver::with_defaults(planar());
    solver.add_task(joint_task("elbow", &["elbow"], &[0.5]));
    solver.add_task(joint_task("elbow_wrist", &["elbow", "wrist"], &[-0.5, 0.3]));
    solver.prepare().unwrap();
    solver.set_initial_config(DVector::zeros(3)).unwrap();
    let result = solver.solve(false).unwrap();

    // The lower level pulls the elbow the other way and must not hold it back
    assert!(
        result.task_error_norms[0] <= solo.task_error_norms[0] + 1e-9,
        "top level {} worse than alone {}: {result}",
        result.task_error_norms[0],
        solo.task_error_norms[0]
    );
    assert_eq!(result.status, SolveStatus::Suboptimal);
    assert!(!result.converged);
    assert_eq!(result.iterations, 1);
    assert_relative_eq!(result.q[1], 0.5, epsilon = 1e-9);
    assert_relative_eq!(result.q[2], 0.3, epsilon = 1e-9);
    assert_relative_eq!(result.task_error_norms[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(result.task_error_norms[1], 1.0, epsilon = 1e-9);
}

#[test]
fn summed_cost_rule_lets_lower_level_hold_back_top_level() {
    let mut solver = IkSolver::with_defaults(planar());
    solver.set_line_search(LineSearchRule::Descent);
    solver.add_task(joint_task("elbow", &["elbow"], &[0.5]));
    solver.add_task(joint_task("elbow_wrist", &["elbow", "wrist"], &[-0.5, 0.3]));
    solver.prepare().unwrap();
    solver.set_initial_config(DVector::zeros(3)).unwrap();
    let result = solver.solve(false).unwrap();

    // Equal weights: the full step raises the summed cost, so the elbow stops short
    assert!(result.task_error_norms[0] > 0.1, "{result}");
}

#[test]
fn lower_level_moves_contact_within_band() {
    let mut model = planar();
    let seed = [0.3, -0.6, 0.3];
    let tool = pose_at(&mut model, &seed, "tool");
    let normal = Vector3::y_axis();
    let mut contact =
        ContactNormal::new("contact", "tool", normal, tool.translation.vector).with_margin(0.3);
    contact.set_reference(tool.rotation.into()).unwrap();
    let lifted = Isometry3::from_parts(
        (tool.translation.vector + normal.into_inner() * 0.1).into(),
        tool.rotation,
    );

    let mut solver = IkSolver::with_defaults(model);
    solver.add_task(Box::new(contact.clone()));
    solver.add_task(pose_task("tool", "tool", lifted));
    solver.prepare().unwrap();
    solver.set_initial_config(DVector::from_row_slice(&seed)).unwrap();
    let result = solver.solve(false).unwrap();

    assert_eq!(result.status, SolveStatus::Optimal, "{result}");
    assert!(result.iterations > 0);
    let distance = contact.plane_distance(solver.kinematics()).unwrap();
    assert_relative_eq!(distance, 0.1, epsilon = 1e-3);
}

#[test]
fn tool_task_cannot_move_elbow_frame() {
    let mut model = planar();
    let seed = [0.4, 0.6, -0.2];
    let elbow = pose_at(&mut model, &seed, "link2");
    let tool_target = Isometry3::translation(0.2, 1.9, 0.0);

    let mut solver = IkSolver::with_defaults(model);
    solver.set_max_iters(200);
    solver.add_task(pose_task("elbow", "link2", elbow));
    solver.add_task(pose_task("tool", "tool", tool_target));
    solver.prepare().unwrap();
    solver.set_initial_config(DVector::from_row_slice(&seed)).unwrap();
    let result = solver.solve(false).unwrap();

    assert_ne!(result.status, SolveStatus::Optimal);
    let reached = solver.kinematics().frame_pose("link2").unwrap();
    assert_relative_eq!(
        reached.translation.vector,
        elbow.translation.vector,
        epsilon = 1e-9
    );
    assert_relative_eq!(reached.rotation.angle_to(&elbow.rotation), 0.0, epsilon = 1e-9);
    assert!(result.task_error_norms[1] > 0.1);
}

// ---------------------------------------------------------------------------
// Nullspace
// ---------------------------------------------------------------------------

#[test]
fn projectors_idempotent_at_random_configurations() {
    let model = biped();
    let limits = model.position_limits();
    let mut rng = seeded_rng(42);

    for _ in 0..10 {
        let seed = random_configuration(&limits, true, &mut rng);
        let mut solver = IkSolver::with_defaults(biped());
        solver.set_max_iters(1);
        solver.add_task(pose_task(
            "left_foot",
            "left_sole",
            Isometry3::translation(0.0, 0.1, -0.8),
        ));
        let mut com = CenterOfMass::new("com");
        com.set_reference(Vector3::new(0.05, 0.0, -0.2).into()).unwrap();
        solver.add_task(Box::new(com));
        let mut hand = Orientation3D::new("hand", "right_hand");
        hand.set_reference(UnitQuaternion::identity().into()).unwrap();
        solver.add_task(Box::new(hand));
        solver.prepare().unwrap();
        solver.set_initial_config(seed).unwrap();
        solver.solve(false).unwrap();

        for level in 0..solver.hierarchy_len() {
            let n = solver.projector(level).unwrap();
            assert_relative_eq!(n * n, n.clone(), epsilon = 1e-8);
        }

        // Each projector annihilates its own level inside the parent nullspace
        let levels = solver.levels();
        let nv = levels[0].projector.nrows();
        for (i, level) in levels.iter().enumerate() {
            let parent = if i == 0 {
                DMatrix::identity(nv, nv)
            } else {
                levels[i - 1].projector.clone()
            };
            // Only singular values dropped by the truncation may remain
            let bound = solver.config().singular_value_threshold * (level.dim() as f64).sqrt();
            let leak = (&level.jacobian * parent * &level.projector).norm();
            assert!(leak <= bound + 1e-9, "level {i} leaks {leak}");
        }
    }
}

// ---------------------------------------------------------------------------
// Determinism / monotonicity
// ---------------------------------------------------------------------------

fn biped_solver() -> IkSolver<KinematicModel> {
    let mut model = biped();
    let seed = crouched(&model);
    model.update_kinematics(&seed).unwrap();
    let left = model.frame_pose("left_sole").unwrap();
    let right = model.frame_pose("right_sole").unwrap();
    let mut pelvis = model.frame_pose("pelvis").unwrap();
    pelvis.translation.vector.z -= 0.05;

    let mut solver = IkSolver::with_defaults(model);
    solver.add_task(Box::new(TaskStack::new(
        "feet",
        vec![
            pose_task("left_foot", "left_sole", left),
            pose_task("right_foot", "right_sole", right),
        ],
    )));
    solver.add_task(pose_task("pelvis", "pelvis", pelvis));
    solver.prepare().unwrap();
    solver.set_initial_config(seed).unwrap();
    solver
}

#[test]
fn identical_setups_are_bitwise_identical() {
    let a = biped_solver().solve(false).unwrap();
    let b = biped_solver().solve(false).unwrap();
    assert_eq!(a.status, b.status);
    assert_eq!(a.iterations, b.iterations);
    assert_eq!(a.q, b.q);
    assert_eq!(a.cost_history, b.cost_history);
}

#[test]
fn accepted_cost_strictly_decreases() {
    let mut solver = biped_solver();
    solver.set_line_search(LineSearchRule::Descent);
    let result = solver.solve(false).unwrap();
    assert!(result.cost_history.len() >= 2);
    for pair in result.cost_history.windows(2) {
        assert!(pair[1] < pair[0], "cost went up: {pair:?}");
    }
}

#[test]
fn floating_base_crouch_reaches_optimal() {
    let mut solver = biped_solver();
    let result = solver.solve(false).unwrap();

    assert!(result.converged, "crouch did not converge: {result}");
    assert_relative_eq!(result.q.rows(3, 4).norm(), 1.0, epsilon = 1e-12);
    assert_eq!(result.task_names, vec!["feet".to_owned(), "pelvis".to_owned()]);
}

#[test]
fn zero_base_quaternion_seed_is_rejected() {
    let model = biped();
    let nq = model.position_dim();
    let mut solver = IkSolver::with_defaults(model);
    solver.add_task(joint_task("knee", &["left_knee"], &[0.4]));
    solver.prepare().unwrap();

    let err = solver.set_initial_config(DVector::zeros(nq)).unwrap_err();
    assert!(matches!(
        err,
        IkError::Kinematics(KinematicsError::DegenerateBaseRotation { .. })
    ));
    assert!(matches!(solver.solve(false), Err(IkError::MissingInitialConfig)));
}

#[test]
fn pelvis_tracks_midfeet_frame_while_feet_hold() {
    let mut model = biped();
    let seed = crouched(&model);
    model.update_kinematics(&seed).unwrap();
    let feet = TaskStack::new(
        "feet",
        vec![
            pose_task("left_foot", "left_sole", model.frame_pose("left_sole").unwrap()),
            pose_task("right_foot", "right_sole", model.frame_pose("right_sole").unwrap()),
        ],
    );
    let mut pelvis = MidfeetPose6D::new("pelvis", "pelvis", "left_sole", "right_sole");
    let mut relative =
        pelvis.midfeet_pose(&model).unwrap().inverse() * model.frame_pose("pelvis").unwrap();
    relative.translation.vector += Vector3::new(0.02, 0.0, -0.04);
    pelvis.set_reference(relative.into()).unwrap();

    let mut solver = IkSolver::with_defaults(model);
    solver.add_task(Box::new(feet));
    solver.add_task(Box::new(pelvis.clone()));
    solver.prepare().unwrap();
    solver.set_initial_config(seed).unwrap();
    let result = solver.solve(false).unwrap();

    assert!(result.converged, "midfeet solve did not converge: {result}");
    let kinematics = solver.kinematics();
    let reached = pelvis.midfeet_pose(kinematics).unwrap().inverse()
        * kinematics.frame_pose("pelvis").unwrap();
    assert_relative_eq!(
        reached.translation.vector,
        relative.translation.vector,
        epsilon = 1e-4
    );
}

#[test]
fn nested_reference_reached_through_stack() {
    let mut solver = biped_solver();
    let first = solver.solve(false).unwrap();
    assert!(first.converged);

    let left = solver.kinematics().frame_pose("left_sole").unwrap();
    let lifted = Isometry3::from_parts(
        (left.translation.vector + Vector3::new(0.0, 0.0, 0.03)).into(),
        left.rotation,
    );
    solver
        .task_mut("left_foot")
        .unwrap()
        .set_reference(lifted.into())
        .unwrap();
    solver.set_initial_config(first.q).unwrap();
    let second = solver.solve(false).unwrap();

    assert!(second.converged, "lift did not converge: {second}");
    let reached = solver.kinematics().frame_pose("left_sole").unwrap();
    assert_relative_eq!(
        reached.translation.vector,
        lifted.translation.vector,
        epsilon = 1e-4
    );
}

// ---------------------------------------------------------------------------
// Unreachable / gains
// ---------------------------------------------------------------------------

#[test]
fn unreachable_target_is_not_optimal() {
    let mut solver = IkSolver::with_defaults(planar());
    solver.set_max_iters(10);
    solver.add_task(pose_task("tool", "tool", Isometry3::translation(5.0, 0.0, 0.0)));
    solver.prepare().unwrap();
    solver
        .set_initial_config(DVector::from_vec(vec![0.5, 0.5, 0.5]))
        .unwrap();
    let result = solver.solve(false).unwrap();

    assert_ne!(result.status, SolveStatus::Optimal);
    assert!(!result.converged);
    // Fully stretched the tool is still 2.6 m short
    assert!(result.error_norm > 1.0);
    assert_eq!(result.q.len(), 3);
}

#[test]
fn gain_scales_error_not_solution() {
    let target = pose_at(&mut six_dof(), &[0.5, 0.3, -0.4, 0.2, 0.5, -0.3], "end_effector");
    let seed = DVector::from_vec(vec![0.2, 0.1, -0.2, 0.0, 0.3, 0.0]);

    let solve_with_gain = |gain: f64| {
        let config = IkConfig {
            error_tol: 1e-8,
            ..IkConfig::default()
        };
        let mut solver = IkSolver::new(six_dof(), config).unwrap();
        let mut task = Pose6D::new("ee", "end_effector");
        task.set_reference(target.into()).unwrap();
        task.set_gain(gain);
        solver.add_task(Box::new(task));
        solver.prepare().unwrap();
        solver.set_initial_config(seed.clone()).unwrap();
        solver.solve(false).unwrap()
    };

    let half = solve_with_gain(0.5);
    let full = solve_with_gain(1.0);
    assert!(half.converged, "{half}");
    assert!(full.converged, "{full}");
    assert_relative_eq!(
        half.cost_history[0],
        0.25 * full.cost_history[0],
        max_relative = 1e-12
    );
    assert_relative_eq!(half.q, full.q, epsilon = 1e-3);
}

// ---------------------------------------------------------------------------
// Inertia weighting
// ---------------------------------------------------------------------------

#[test]
fn inertia_weighted_com_shift_converges() {
    let mut model = biped();
    let seed = crouched(&model);
    model.update_kinematics(&seed).unwrap();
    let target = model.com_position() + Vector3::new(0.03, 0.0, 0.0);
    let feet = TaskStack::new(
        "feet",
        vec![
            pose_task("left_foot", "left_sole", model.frame_pose("left_sole").unwrap()),
            pose_task("right_foot", "right_sole", model.frame_pose("right_sole").unwrap()),
        ],
    );
    let mut com = CenterOfMass::new("com");
    com.set_reference(target.into()).unwrap();

    let mut solver = IkSolver::with_defaults(model);
    solver.add_task(Box::new(feet));
    solver.add_task(Box::new(com));
    solver.prepare().unwrap();
    solver.set_initial_config(seed).unwrap();
    let result = solver.solve(true).unwrap();

    assert!(result.converged, "weighted solve did not converge: {result}");
    assert_relative_eq!(solver.kinematics().com_position(), target, epsilon = 1e-4);
}

/// Delegates to a model but hides its mass matrix.
struct NoInertia(KinematicModel);

impl RobotKinematics for NoInertia {
    fn position_dim(&self) -> usize {
        self.0.position_dim()
    }
    fn velocity_dim(&self) -> usize {
        self.0.velocity_dim()
    }
    fn update_kinematics(&mut self, q: &DVector<f64>) -> Result<(), KinematicsError> {
        self.0.update_kinematics(q)
    }
    fn configuration(&self) -> &DVector<f64> {
        self.0.configuration()
    }
    fn frame_pose(&self, frame: &str) -> Result<Isometry3<f64>, KinematicsError> {
        self.0.frame_pose(frame)
    }
    fn frame_jacobian(&self, frame: &str) -> Result<DMatrix<f64>, KinematicsError> {
        self.0.frame_jacobian(frame)
    }
    fn com_position(&self) -> Vector3<f64> {
        self.0.com_position()
    }
    fn com_jacobian(&self) -> DMatrix<f64> {
        self.0.com_jacobian()
    }
    fn integrate(&self, q: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        self.0.integrate(q, v)
    }
    fn joint_index(&self, joint: &str) -> Result<JointIndex, KinematicsError> {
        self.0.joint_index(joint)
    }
}

#[test]
fn missing_mass_matrix_falls_back_to_identity() {
    let target = pose_at(&mut six_dof(), &[0.5, 0.3, -0.4, 0.2, 0.5, -0.3], "end_effector");
    let seed = DVector::from_vec(vec![0.2, 0.1, -0.2, 0.0, 0.3, 0.0]);

    let mut weighted = IkSolver::with_defaults(NoInertia(six_dof()));
    weighted.add_task(pose_task("ee", "end_effector", target));
    weighted.prepare().unwrap();
    weighted.set_initial_config(seed.clone()).unwrap();

    let mut plain = IkSolver::with_defaults(six_dof());
    plain.add_task(pose_task("ee", "end_effector", target));
    plain.prepare().unwrap();
    plain.set_initial_config(seed).unwrap();

    let a = weighted.solve(true).unwrap();
    let b = plain.solve(false).unwrap();
    assert_eq!(a.q, b.q);
    assert_eq!(a.status, b.status);
}
