use crate::models::ChartPoint;
use std::collections::VecDeque;

/// Fixed-length window of chart points; appending to a full window drops
/// the oldest point.
#[derive(Debug, Clone)]
pub struct ChartHistory {
    points: VecDeque<ChartPoint>,
    capacity: usize,
}

impl ChartHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: ChartPoint) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> Vec<ChartPoint> {
        self.points.iter().cloned().collect()
    }
}
