// Fixed four-slot container keyed by WheelPosition

use super::kinematics::WheelPosition;

/// One value per corner of the base. Iteration always runs
/// FrontLeft, FrontRight, RearLeft, RearRight.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Corners<T> {
    pub front_left: T,
    pub front_right: T,
    pub rear_left: T,
    pub rear_right: T,
}

impl<T> Corners<T> {
    pub fn new(front_left: T, front_right: T, rear_left: T, rear_right: T) -> Self {
        Self {
            front_left,
            front_right,
            rear_left,
            rear_right,
        }
    }

    pub fn from_fn(mut f: impl FnMut(WheelPosition) -> T) -> Self {
        Self {
            front_left: f(WheelPosition::FrontLeft),
            front_right: f(WheelPosition::FrontRight),
            rear_left: f(WheelPosition::RearLeft),
            rear_right: f(WheelPosition::RearRight),
        }
    }

    pub fn get(&self, position: WheelPosition) -> &T {
        match position {
            WheelPosition::FrontLeft => &self.front_left,
            WheelPosition::FrontRight => &self.front_right,
            WheelPosition::RearLeft => &self.rear_left,
            WheelPosition::RearRight => &self.rear_right,
        }
    }

    pub fn get_mut(&mut self, position: WheelPosition) -> &mut T {
        match position {
            WheelPosition::FrontLeft => &mut self.front_left,
            WheelPosition::FrontRight => &mut self.front_right,
            WheelPosition::RearLeft => &mut self.rear_left,
            WheelPosition::RearRight => &mut self.rear_right,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (WheelPosition, &T)> {
        [
            (WheelPosition::FrontLeft, &self.front_left),
            (WheelPosition::FrontRight, &self.front_right),
            (WheelPosition::RearLeft, &self.rear_left),
            (WheelPosition::RearRight, &self.rear_right),
        ]
        .into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (WheelPosition, &mut T)> {
        [
            (WheelPosition::FrontLeft, &mut self.front_left),
            (WheelPosition::FrontRight, &mut self.front_right),
            (WheelPosition::RearLeft, &mut self.rear_left),
            (WheelPosition::RearRight, &mut self.rear_right),
        ]
        .into_iter()
    }

    pub fn each_mut(&mut self) -> Corners<&mut T> {
        Corners {
            front_left: &mut self.front_left,
            front_right: &mut self.front_right,
            rear_left: &mut self.rear_left,
            rear_right: &mut self.rear_right,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(WheelPosition, T) -> U) -> Corners<U> {
        Corners {
            front_left: f(WheelPosition::FrontLeft, self.front_left),
            front_right: f(WheelPosition::FrontRight, self.front_right),
            rear_left: f(WheelPosition::RearLeft, self.rear_left),
            rear_right: f(WheelPosition::RearRight, self.rear_right),
        }
    }
}
