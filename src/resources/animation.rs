//! Node animation clips loaded from glTF and their sampling.

use cgmath::{InnerSpace, Quaternion, Vector3, VectorSpace};

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
    Other,
}

/// A single animated property of one node.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub node: usize,
    pub keyframes: Keyframes,
    pub timestamps: Vec<f32>,
}

/// Value of a clip at a point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Translation(Vector3<f32>),
    Rotation(Quaternion<f32>),
    Scale(Vector3<f32>),
}

impl AnimationClip {
    pub fn duration(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }

    /// Interpolated value at `time`, wrapped into the clip duration.
    ///
    /// Returns `None` for empty clips and for keyframe kinds that are not
    /// node transforms.
    pub fn sample(&self, time: f32) -> Option<Sample> {
        let (i0, i1, t) = find_segment(&self.timestamps, time)?;
        match &self.keyframes {
            Keyframes::Translation(frames) => {
                let (a, b) = (frames.get(i0)?, frames.get(i1)?);
                Some(Sample::Translation(a.lerp(*b, t)))
            }
            Keyframes::Rotation(frames) => {
                let (a, b) = (frames.get(i0)?, frames.get(i1)?);
                // take the short way round
                let b = if a.dot(*b) < 0.0 { -*b } else { *b };
                Some(Sample::Rotation(a.nlerp(b, t)))
            }
            Keyframes::Scale(frames) => {
                let (a, b) = (frames.get(i0)?, frames.get(i1)?);
                Some(Sample::Scale(a.lerp(*b, t)))
            }
            Keyframes::Other => None,
        }
    }
}

/// Keyframe indices surrounding `time` and the blend factor between them.
pub fn find_segment(timestamps: &[f32], time: f32) -> Option<(usize, usize, f32)> {
    let last = *timestamps.last()?;
    if timestamps.len() == 1 || last <= 0.0 {
        return Some((0, 0, 0.0));
    }
    let time = time.rem_euclid(last);
    let next = timestamps
        .iter()
        .position(|&t| t > time)
        .unwrap_or(timestamps.len() - 1);
    if next == 0 {
        return Some((0, 0, 0.0));
    }
    let prev = next - 1;
    let span = timestamps[next] - timestamps[prev];
    let t = if span > 0.0 {
        ((time - timestamps[prev]) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Some((prev, next, t))
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Rotation3};

    use super::*;

    fn translation_clip() -> AnimationClip {
        AnimationClip {
            name: "slide".to_string(),
            node: 0,
            keyframes: Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(2.0, 4.0, 0.0),
            ]),
            timestamps: vec![0.0, 1.0, 2.0],
        }
    }

    #[test]
    fn interpolates_between_keyframes() {
        let clip = translation_clip();
        assert_eq!(
            clip.sample(0.5),
            Some(Sample::Translation(Vector3::new(1.0, 0.0, 0.0)))
        );
        assert_eq!(
            clip.sample(1.5),
            Some(Sample::Translation(Vector3::new(2.0, 2.0, 0.0)))
        );
    }

    #[test]
    fn wraps_around_the_clip_duration() {
        let clip = translation_clip();
        assert_eq!(clip.duration(), 2.0);
        assert_eq!(clip.sample(2.5), clip.sample(0.5));
        assert_eq!(clip.sample(-1.5), clip.sample(0.5));
    }

    #[test]
    fn rotation_sampling_stays_normalised() {
        let clip = AnimationClip {
            name: "spin".to_string(),
            node: 3,
            keyframes: Keyframes::Rotation(vec![
                Quaternion::from_angle_y(Deg(0.0)),
                Quaternion::from_angle_y(Deg(170.0)),
            ]),
            timestamps: vec![0.0, 1.0],
        };
        match clip.sample(0.3) {
            Some(Sample::Rotation(q)) => assert!((q.magnitude() - 1.0).abs() < 1e-5),
            other => panic!("unexpected sample {other:?}"),
        }
    }

    #[test]
    fn empty_and_other_clips_sample_to_nothing() {
        let mut clip = translation_clip();
        clip.timestamps.clear();
        assert_eq!(clip.sample(0.0), None);
        clip.timestamps = vec![0.0];
        clip.keyframes = Keyframes::Other;
        assert_eq!(clip.sample(0.0), None);
    }
}
