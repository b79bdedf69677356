use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tracked humanoid skeleton joints, as named by the avatar source.
///
/// The wire name is the camelCase form of the variant (`RightUpperArm` is
/// `"rightUpperArm"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JointName {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
}

impl JointName {
    pub const COUNT: usize = 22;

    pub const ALL: [JointName; Self::COUNT] = [
        JointName::Hips,
        JointName::Spine,
        JointName::Chest,
        JointName::UpperChest,
        JointName::Neck,
        JointName::Head,
        JointName::LeftShoulder,
        JointName::LeftUpperArm,
        JointName::LeftLowerArm,
        JointName::LeftHand,
        JointName::RightShoulder,
        JointName::RightUpperArm,
        JointName::RightLowerArm,
        JointName::RightHand,
        JointName::LeftUpperLeg,
        JointName::LeftLowerLeg,
        JointName::LeftFoot,
        JointName::LeftToes,
        JointName::RightUpperLeg,
        JointName::RightLowerLeg,
        JointName::RightFoot,
        JointName::RightToes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JointName::Hips => "hips",
            JointName::Spine => "spine",
            JointName::Chest => "chest",
            JointName::UpperChest => "upperChest",
            JointName::Neck => "neck",
            JointName::Head => "head",
            JointName::LeftShoulder => "leftShoulder",
            JointName::LeftUpperArm => "leftUpperArm",
            JointName::LeftLowerArm => "leftLowerArm",
            JointName::LeftHand => "leftHand",
            JointName::RightShoulder => "rightShoulder",
            JointName::RightUpperArm => "rightUpperArm",
            JointName::RightLowerArm => "rightLowerArm",
            JointName::RightHand => "rightHand",
            JointName::LeftUpperLeg => "leftUpperLeg",
            JointName::LeftLowerLeg => "leftLowerLeg",
            JointName::LeftFoot => "leftFoot",
            JointName::LeftToes => "leftToes",
            JointName::RightUpperLeg => "rightUpperLeg",
            JointName::RightLowerLeg => "rightLowerLeg",
            JointName::RightFoot => "rightFoot",
            JointName::RightToes => "rightToes",
        }
    }

    /// Position of this joint in [`JointName::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown joint name: {0}")]
pub struct UnknownJoint(pub String);

impl FromStr for JointName {
    type Err = UnknownJoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JointName::ALL
            .iter()
            .copied()
            .find(|joint| joint.as_str() == s)
            .ok_or_else(|| UnknownJoint(s.to_string()))
    }
}
