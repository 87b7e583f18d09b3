//! Robot descriptions shared across test suites.
//!
//! Every fixture is a self-contained URDF string so tests can build a model
//! without touching the filesystem.

/// Three-link planar arm rotating about Z, links along X.
///
/// Lengths 1.0, 0.8 and 0.6 to the `tool` frame; the elbow frame is `link2`.
/// The base link is massless so the CoM only sees the moving links.
pub const PLANAR_ARM: &str = r#"
    <robot name="planar_arm">
        <link name="base"/>
        <link name="link1"><inertial><origin xyz="0.5 0 0"/><mass value="2.0"/><inertia ixx="0.01" ixy="0" ixz="0" iyy="0.17" iyz="0" izz="0.17"/></inertial></link>
        <link name="link2"><inertial><origin xyz="0.4 0 0"/><mass value="1.5"/><inertia ixx="0.005" ixy="0" ixz="0" iyy="0.08" iyz="0" izz="0.08"/></inertial></link>
        <link name="link3"><inertial><origin xyz="0.3 0 0"/><mass value="1.0"/><inertia ixx="0.002" ixy="0" ixz="0" iyy="0.03" iyz="0" izz="0.03"/></inertial></link>
        <link name="tool"/>
        <joint name="shoulder" type="revolute">
            <parent link="base"/><child link="link1"/>
            <axis xyz="0 0 1"/>
            <limit lower="-3.14159" upper="3.14159" effort="50" velocity="3"/>
        </joint>
        <joint name="elbow" type="revolute">
            <parent link="link1"/><child link="link2"/>
            <origin xyz="1.0 0 0"/><axis xyz="0 0 1"/>
            <limit lower="-2.8" upper="2.8" effort="30" velocity="5"/>
        </joint>
        <joint name="wrist" type="revolute">
            <parent link="link2"/><child link="link3"/>
            <origin xyz="0.8 0 0"/><axis xyz="0 0 1"/>
            <limit lower="-2.8" upper="2.8" effort="10" velocity="5"/>
        </joint>
        <joint name="tool_fixed" type="fixed">
            <parent link="link3"/><child link="tool"/>
            <origin xyz="0.6 0 0"/>
        </joint>
    </robot>
"#;

/// Six-DoF serial arm, all links stacked along Z at the zero configuration.
///
/// Joint offsets 0.05 + 0.2 + 0.3 + 0.1 + 0.2 + 0.06 put `end_effector` at
/// z = 0.91.
pub const SIX_DOF_ARM: &str = r#"
    <robot name="six_dof_arm">
        <link name="base"><inertial><mass value="20.0"/><inertia ixx="0.5" ixy="0" ixz="0" iyy="0.5" iyz="0" izz="0.5"/></inertial></link>
        <link name="shoulder_link"><inertial><mass value="3.0"/><inertia ixx="0.02" ixy="0" ixz="0" iyy="0.02" iyz="0" izz="0.005"/></inertial></link>
        <link name="upper_arm"><inertial><origin xyz="0 0 0.15"/><mass value="2.5"/><inertia ixx="0.015" ixy="0" ixz="0" iyy="0.015" iyz="0" izz="0.003"/></inertial></link>
        <link name="elbow_link"><inertial><mass value="1.5"/><inertia ixx="0.005" ixy="0" ixz="0" iyy="0.005" iyz="0" izz="0.002"/></inertial></link>
        <link name="forearm"><inertial><origin xyz="0 0 0.1"/><mass value="1.0"/><inertia ixx="0.003" ixy="0" ixz="0" iyy="0.003" iyz="0" izz="0.001"/></inertial></link>
        <link name="wrist_link"><inertial><mass value="0.5"/><inertia ixx="0.001" ixy="0" ixz="0" iyy="0.001" iyz="0" izz="0.0005"/></inertial></link>
        <link name="end_effector"><inertial><mass value="0.2"/><inertia ixx="0.0002" ixy="0" ixz="0" iyy="0.0002" iyz="0" izz="0.0002"/></inertial></link>
        <joint name="j1_base_yaw" type="revolute">
            <parent link="base"/><child link="shoulder_link"/>
            <origin xyz="0 0 0.05"/><axis xyz="0 0 1"/>
            <limit lower="-3.14159" upper="3.14159" effort="80" velocity="2"/>
        </joint>
        <joint name="j2_shoulder_pitch" type="revolute">
            <parent link="shoulder_link"/><child link="upper_arm"/>
            <origin xyz="0 0 0.2"/><axis xyz="0 1 0"/>
            <limit lower="-1.5708" upper="2.356" effort="60" velocity="2"/>
        </joint>
        <joint name="j3_elbow_pitch" type="revolute">
            <parent link="upper_arm"/><child link="elbow_link"/>
            <origin xyz="0 0 0.3"/><axis xyz="0 1 0"/>
            <limit lower="-2.356" upper="2.356" effort="40" velocity="3"/>
        </joint>
        <joint name="j4_forearm_roll" type="revolute">
            <parent link="elbow_link"/><child link="forearm"/>
            <origin xyz="0 0 0.1"/><axis xyz="0 0 1"/>
            <limit lower="-3.14159" upper="3.14159" effort="20" velocity="5"/>
        </joint>
        <joint name="j5_wrist_pitch" type="revolute">
            <parent link="forearm"/><child link="wrist_link"/>
            <origin xyz="0 0 0.2"/><axis xyz="0 1 0"/>
            <limit lower="-2.094" upper="2.094" effort="10" velocity="5"/>
        </joint>
        <joint name="j6_wrist_roll" type="revolute">
            <parent link="wrist_link"/><child link="end_effector"/>
            <origin xyz="0 0 0.06"/><axis xyz="0 0 1"/>
            <limit lower="-3.14159" upper="3.14159" effort="5" velocity="8"/>
        </joint>
    </robot>
"#;

/// Humanoid lower body with a torso and two 3-DoF arms, meant for a
/// floating base rooted at `pelvis`.
///
/// Each leg is hip yaw/roll/pitch, knee, ankle pitch/roll (6 DoF) ending in a
/// `left_sole`/`right_sole` frame 0.9 m below the pelvis when straight. The
/// torso has one yaw joint and each arm ends in a `left_hand`/`right_hand`
/// frame. 19 joints in total.
pub const FLOATING_BIPED: &str = r#"
    <robot name="floating_biped">
        <link name="pelvis"><inertial><mass value="8.0"/><inertia ixx="0.08" ixy="0" ixz="0" iyy="0.05" iyz="0" izz="0.09"/></inertial></link>
        <link name="torso"><inertial><origin xyz="0 0 0.25"/><mass value="15.0"/><inertia ixx="0.4" ixy="0" ixz="0" iyy="0.35" iyz="0" izz="0.15"/></inertial></link>

        <link name="left_hip_yaw_link"><inertial><mass value="0.5"/><inertia ixx="0.001" ixy="0" ixz="0" iyy="0.001" iyz="0" izz="0.001"/></inertial></link>
        <link name="left_hip_roll_link"><inertial><mass value="0.5"/><inertia ixx="0.001" ixy="0" ixz="0" iyy="0.001" iyz="0" izz="0.001"/></inertial></link>
        <link name="left_thigh"><inertial><origin xyz="0 0 -0.2"/><mass value="4.0"/><inertia ixx="0.06" ixy="0" ixz="0" iyy="0.06" iyz="0" izz="0.01"/></inertial></link>
        <link name="left_shin"><inertial><origin xyz="0 0 -0.2"/><mass value="2.5"/><inertia ixx="0.035" ixy="0" ixz="0" iyy="0.035" iyz="0" izz="0.005"/></inertial></link>
        <link name="left_ankle_link"><inertial><mass value="0.2"/><inertia ixx="0.0002" ixy="0" ixz="0" iyy="0.0002" iyz="0" izz="0.0002"/></inertial></link>
        <link name="left_foot"><inertial><origin xyz="0.03 0 -0.03"/><mass value="1.0"/><inertia ixx="0.002" ixy="0" ixz="0" iyy="0.005" iyz="0" izz="0.005"/></inertial></link>
        <link name="left_sole"/>

        <link name="right_hip_yaw_link"><inertial><mass value="0.5"/><inertia ixx="0.001" ixy="0" ixz="0" iyy="0.001" iyz="0" izz="0.001"/></inertial></link>
        <link name="right_hip_roll_link"><inertial><mass value="0.5"/><inertia ixx="0.001" ixy="0" ixz="0" iyy="0.001" iyz="0" izz="0.001"/></inertial></link>
        <link name="right_thigh"><inertial><origin xyz="0 0 -0.2"/><mass value="4.0"/><inertia ixx="0.06" ixy="0" ixz="0" iyy="0.06" iyz="0" izz="0.01"/></inertial></link>
        <link name="right_shin"><inertial><origin xyz="0 0 -0.2"/><mass value="2.5"/><inertia ixx="0.035" ixy="0" ixz="0" iyy="0.035" iyz="0" izz="0.005"/></inertial></link>
        <link name="right_ankle_link"><inertial><mass value="0.2"/><inertia ixx="0.0002" ixy="0" ixz="0" iyy="0.0002" iyz="0" izz="0.0002"/></inertial></link>
        <link name="right_foot"><inertial><origin xyz="0.03 0 -0.03"/><mass value="1.0"/><inertia ixx="0.002" ixy="0" ixz="0" iyy="0.005" iyz="0" izz="0.005"/></inertial></link>
        <link name="right_sole"/>

        <link name="left_shoulder_link"><inertial><mass value="0.3"/><inertia ixx="0.0005" ixy="0" ixz="0" iyy="0.0005" iyz="0" izz="0.0005"/></inertial></link>
        <link name="left_upper_arm"><inertial><origin xyz="0 0 -0.15"/><mass value="1.5"/><inertia ixx="0.012" ixy="0" ixz="0" iyy="0.012" iyz="0" izz="0.002"/></inertial></link>
        <link name="left_forearm"><inertial><origin xyz="0 0 -0.12"/><mass value="1.0"/><inertia ixx="0.006" ixy="0" ixz="0" iyy="0.006" iyz="0" izz="0.001"/></inertial></link>
        <link name="left_hand"><inertial><mass value="0.3"/><inertia ixx="0.0003" ixy="0" ixz="0" iyy="0.0003" iyz="0" izz="0.0003"/></inertial></link>

        <link name="right_shoulder_link"><inertial><mass value="0.3"/><inertia ixx="0.0005" ixy="0" ixz="0" iyy="0.0005" iyz="0" izz="0.0005"/></inertial></link>
        <link name="right_upper_arm"><inertial><origin xyz="0 0 -0.15"/><mass value="1.5"/><inertia ixx="0.012" ixy="0" ixz="0" iyy="0.012" iyz="0" izz="0.002"/></inertial></link>
        <link name="right_forearm"><inertial><origin xyz="0 0 -0.12"/><mass value="1.0"/><inertia ixx="0.006" ixy="0" ixz="0" iyy="0.006" iyz="0" izz="0.001"/></inertial></link>
        <link name="right_hand"><inertial><mass value="0.3"/><inertia ixx="0.0003" ixy="0" ixz="0" iyy="0.0003" iyz="0" izz="0.0003"/></inertial></link>

        <joint name="left_hip_yaw" type="revolute">
            <parent link="pelvis"/><child link="left_hip_yaw_link"/>
            <origin xyz="0 0.1 -0.05"/><axis xyz="0 0 1"/>
            <limit lower="-0.8" upper="0.8" effort="100" velocity="5"/>
        </joint>
        <joint name="left_hip_roll" type="revolute">
            <parent link="left_hip_yaw_link"/><child link="left_hip_roll_link"/>
            <axis xyz="1 0 0"/>
            <limit lower="-0.5" upper="0.8" effort="100" velocity="5"/>
        </joint>
        <joint name="left_hip_pitch" type="revolute">
            <parent link="left_hip_roll_link"/><child link="left_thigh"/>
            <axis xyz="0 1 0"/>
            <limit lower="-1.8" upper="0.8" effort="150" velocity="5"/>
        </joint>
        <joint name="left_knee" type="revolute">
            <parent link="left_thigh"/><child link="left_shin"/>
            <origin xyz="0 0 -0.4"/><axis xyz="0 1 0"/>
            <limit lower="0.0" upper="2.4" effort="150" velocity="5"/>
        </joint>
        <joint name="left_ankle_pitch" type="revolute">
            <parent link="left_shin"/><child link="left_ankle_link"/>
            <origin xyz="0 0 -0.4"/><axis xyz="0 1 0"/>
            <limit lower="-1.0" upper="0.8" effort="80" velocity="5"/>
        </joint>
        <joint name="left_ankle_roll" type="revolute">
            <parent link="left_ankle_link"/><child link="left_foot"/>
            <axis xyz="1 0 0"/>
            <limit lower="-0.4" upper="0.4" effort="50" velocity="5"/>
        </joint>
        <joint name="left_sole_fixed" type="fixed">
            <parent link="left_foot"/><child link="left_sole"/>
            <origin xyz="0.03 0 -0.05"/>
        </joint>

        <joint name="right_hip_yaw" type="revolute">
            <parent link="pelvis"/><child link="right_hip_yaw_link"/>
            <origin xyz="0 -0.1 -0.05"/><axis xyz="0 0 1"/>
            <limit lower="-0.8" upper="0.8" effort="100" velocity="5"/>
        </joint>
        <joint name="right_hip_roll" type="revolute">
            <parent link="right_hip_yaw_link"/><child link="right_hip_roll_link"/>
            <axis xyz="1 0 0"/>
            <limit lower="-0.8" upper="0.5" effort="100" velocity="5"/>
        </joint>
        <joint name="right_hip_pitch" type="revolute">
            <parent link="right_hip_roll_link"/><child link="right_thigh"/>
            <axis xyz="0 1 0"/>
            <limit lower="-1.8" upper="0.8" effort="150" velocity="5"/>
        </joint>
        <joint name="right_knee" type="revolute">
            <parent link="right_thigh"/><child link="right_shin"/>
            <origin xyz="0 0 -0.4"/><axis xyz="0 1 0"/>
            <limit lower="0.0" upper="2.4" effort="150" velocity="5"/>
        </joint>
        <joint name="right_ankle_pitch" type="revolute">
            <parent link="right_shin"/><child link="right_ankle_link"/>
            <origin xyz="0 0 -0.4"/><axis xyz="0 1 0"/>
            <limit lower="-1.0" upper="0.8" effort="80" velocity="5"/>
        </joint>
        <joint name="right_ankle_roll" type="revolute">
            <parent link="right_ankle_link"/><child link="right_foot"/>
            <axis xyz="1 0 0"/>
            <limit lower="-0.4" upper="0.4" effort="50" velocity="5"/>
        </joint>
        <joint name="right_sole_fixed" type="fixed">
            <parent link="right_foot"/><child link="right_sole"/>
            <origin xyz="0.03 0 -0.05"/>
        </joint>

        <joint name="torso_yaw" type="revolute">
            <parent link="pelvis"/><child link="torso"/>
            <origin xyz="0 0 0.1"/><axis xyz="0 0 1"/>
            <limit lower="-1.0" upper="1.0" effort="100" velocity="3"/>
        </joint>

        <joint name="left_shoulder_pitch" type="revolute">
            <parent link="torso"/><child link="left_shoulder_link"/>
            <origin xyz="0 0.22 0.4"/><axis xyz="0 1 0"/>
            <limit lower="-2.5" upper="2.5" effort="40" velocity="5"/>
        </joint>
        <joint name="left_shoulder_roll" type="revolute">
            <parent link="left_shoulder_link"/><child link="left_upper_arm"/>
            <axis xyz="1 0 0"/>
            <limit lower="-0.3" upper="2.5" effort="40" velocity="5"/>
        </joint>
        <joint name="left_elbow" type="revolute">
            <parent link="left_upper_arm"/><child link="left_forearm"/>
            <origin xyz="0 0 -0.3"/><axis xyz="0 1 0"/>
            <limit lower="-2.4" upper="0.0" effort="30" velocity="5"/>
        </joint>
        <joint name="left_wrist_fixed" type="fixed">
            <parent link="left_forearm"/><child link="left_hand"/>
            <origin xyz="0 0 -0.25"/>
        </joint>

        <joint name="right_shoulder_pitch" type="revolute">
            <parent link="torso"/><child link="right_shoulder_link"/>
            <origin xyz="0 -0.22 0.4"/><axis xyz="0 1 0"/>
            <limit lower="-2.5" upper="2.5" effort="40" velocity="5"/>
        </joint>
        <joint name="right_shoulder_roll" type="revolute">
            <parent link="right_shoulder_link"/><child link="right_upper_arm"/>
            <axis xyz="1 0 0"/>
            <limit lower="-2.5" upper="0.3" effort="40" velocity="5"/>
        </joint>
        <joint name="right_elbow" type="revolute">
            <parent link="right_upper_arm"/><child link="right_forearm"/>
            <origin xyz="0 0 -0.3"/><axis xyz="0 1 0"/>
            <limit lower="-2.4" upper="0.0" effort="30" velocity="5"/>
        </joint>
        <joint name="right_wrist_fixed" type="fixed">
            <parent link="right_forearm"/><child link="right_hand"/>
            <origin xyz="0 0 -0.25"/>
        </joint>
    </robot>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use locomanip_urdf::parse_string;

    #[test]
    fn fixtures_parse() {
        assert_eq!(parse_string(PLANAR_ARM).unwrap().dof(), 3);
        assert_eq!(parse_string(SIX_DOF_ARM).unwrap().dof(), 6);
        assert_eq!(parse_string(FLOATING_BIPED).unwrap().dof(), 19);
    }

    #[test]
    fn biped_is_rooted_at_pelvis() {
        let model = parse_string(FLOATING_BIPED).unwrap();
        assert_eq!(model.root_link, "pelvis");
        assert!(model.link("left_sole").is_ok());
        assert!(model.link("right_hand").is_ok());
    }
}
