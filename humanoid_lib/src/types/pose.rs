use super::JointName;
use nalgebra::Vector3;

/// Joint positions of one avatar frame.
///
/// Joints the source did not send (or sent garbled) sit at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSnapshot {
    joints: [Vector3<f64>; JointName::COUNT],
}

impl PoseSnapshot {
    /// A snapshot with every joint at the origin.
    pub fn zeroed() -> Self {
        Self {
            joints: [Vector3::zeros(); JointName::COUNT],
        }
    }

    pub fn from_joints<I>(joints: I) -> Self
    where
        I: IntoIterator<Item = (JointName, Vector3<f64>)>,
    {
        let mut snapshot = Self::zeroed();
        for (name, position) in joints {
            snapshot.joints[name.index()] = position;
        }
        snapshot
    }

    pub fn joint(&self, name: JointName) -> Vector3<f64> {
        self.joints[name.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointName, Vector3<f64>)> + '_ {
        JointName::ALL
            .iter()
            .map(move |&name| (name, self.joints[name.index()]))
    }
}

impl Default for PoseSnapshot {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_joints_default_to_zero() {
        let snapshot =
            PoseSnapshot::from_joints([(JointName::RightHand, Vector3::new(1.0, 2.0, 3.0))]);

        assert_eq!(snapshot.joint(JointName::RightHand), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(snapshot.joint(JointName::LeftHand), Vector3::zeros());
        assert_eq!(snapshot.iter().count(), JointName::COUNT);
    }
}
