use nalgebra::{Point3, Vector3};

/// A keyframe of a frame's blend weight at a playback time index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub time: i32,
    pub weight: f64,
}

/// Trajectory frames of a site collection beyond the rest pose.
///
/// Frame 0 is the rest pose and lives in the sites themselves; the timeline holds
/// frames `1..`, each with one local position per site. Frames can be stored but
/// deferred, in which case only the rest pose counts until they are materialized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    frame_start: i32,
    frames: Vec<Vec<Point3<f64>>>,
    deferred: bool,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_start(&self) -> i32 {
        self.frame_start
    }

    pub fn set_frame_start(&mut self, frame_start: i32) {
        self.frame_start = frame_start;
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Number of frames including the rest pose.
    pub fn frame_count(&self) -> usize {
        if self.deferred {
            1
        } else {
            1 + self.frames.len()
        }
    }

    /// Number of stored frames after the rest pose, deferred or not.
    pub fn stored_frames(&self) -> usize {
        self.frames.len()
    }

    /// Local positions of frame `index`, for `index >= 1`.
    pub fn frame(&self, index: usize) -> Option<&[Point3<f64>]> {
        if self.deferred || index == 0 {
            return None;
        }
        self.frames.get(index - 1).map(Vec::as_slice)
    }

    /// Replaces every frame after the rest pose.
    pub fn replace(&mut self, frames: Vec<Vec<Point3<f64>>>, deferred: bool) {
        self.frames = frames;
        self.deferred = deferred;
    }

    /// Overwrites frame `index`, or appends it if `index` is one past the last frame.
    ///
    /// # Return
    ///
    /// Returns `None` for the rest pose, an index beyond the end, or while frames are
    /// deferred.
    pub fn set_frame(&mut self, index: usize, positions: Vec<Point3<f64>>) -> Option<()> {
        if self.deferred || index == 0 || index > self.frames.len() + 1 {
            return None;
        }
        if index == self.frames.len() + 1 {
            self.frames.push(positions);
        } else {
            self.frames[index - 1] = positions;
        }
        Some(())
    }

    pub fn materialize(&mut self) {
        self.deferred = false;
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.deferred = false;
    }

    /// Blend weight keypoints of frame `index`.
    ///
    /// The weight peaks at 1 on the frame's own time and is 0 on its neighbours; the
    /// last frame has no successor and gets a two-point falling window. The rest pose
    /// and unmaterialized frames have none, as does a frame whose window does not fit
    /// in `i32` times.
    pub fn interpolation_window(&self, index: usize) -> Option<Vec<Keypoint>> {
        let count = self.frame_count();
        if index == 0 || index >= count {
            return None;
        }
        let time = self.frame_start.checked_add(i32::try_from(index).ok()?)?;
        let mut window = vec![
            Keypoint {
                time: time.checked_sub(1)?,
                weight: 0.0,
            },
            Keypoint { time, weight: 1.0 },
        ];
        if index != count - 1 {
            window.push(Keypoint {
                time: time.checked_add(1)?,
                weight: 0.0,
            });
        }
        Some(window)
    }

    /// Keeps only the sites whose entry in `keep` is `true`, in every frame.
    pub fn retain_sites(&mut self, keep: &[bool]) {
        for frame in &mut self.frames {
            let mut flags = keep.iter();
            frame.retain(|_| flags.next().copied().unwrap_or(false));
        }
    }

    /// Replaces every frame by its replicas, one per offset, in offset order.
    pub fn tile(&mut self, offsets: &[Vector3<f64>]) {
        for frame in &mut self.frames {
            let tiled: Vec<Point3<f64>> = offsets
                .iter()
                .flat_map(|offset| frame.iter().map(move |p| p + offset))
                .collect();
            *frame = tiled;
        }
    }

    /// Maps every stored position through `f`.
    pub fn map_positions<F>(&mut self, f: F)
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        for frame in &mut self.frames {
            for position in frame.iter_mut() {
                *position = f(position);
            }
        }
    }

    /// Appends the sites of another collection to every frame.
    ///
    /// Frames missing on either side are filled with that side's rest pose.
    pub fn append(
        &mut self,
        own_rest: &[Point3<f64>],
        other: &Timeline,
        other_rest: &[Point3<f64>],
    ) {
        let deferred = match (self.frames.is_empty(), other.frames.is_empty()) {
            (true, _) => other.deferred,
            (false, true) => self.deferred,
            (false, false) => self.deferred && other.deferred,
        };
        let count = self.frames.len().max(other.frames.len());
        self.frames.resize_with(count, || own_rest.to_vec());
        for (i, frame) in self.frames.iter_mut().enumerate() {
            let tail = other.frames.get(i).map(Vec::as_slice).unwrap_or(other_rest);
            frame.extend_from_slice(tail);
        }
        self.deferred = deferred;
    }
}
