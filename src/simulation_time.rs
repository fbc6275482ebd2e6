use crate::core::units::{SECONDS_PER_DAY, SECONDS_PER_HOUR};

/// The simulated horizon, stepped at the controller's decision interval. Time is kept as whole
/// elapsed seconds so hour and day boundaries are exact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationTime {
    end_seconds: u32,
    step_seconds: u32,
}

impl SimulationTime {
    pub fn new(hours: u32, step_seconds: u32) -> Self {
        Self {
            end_seconds: hours * SECONDS_PER_HOUR,
            step_seconds,
        }
    }

    pub fn total_steps(&self) -> usize {
        self.end_seconds.div_ceil(self.step_seconds) as usize
    }

    pub fn total_hours(&self) -> usize {
        self.end_seconds.div_ceil(SECONDS_PER_HOUR) as usize
    }

    pub(crate) fn iter(&self) -> SimulationTimeIterator {
        SimulationTimeIterator {
            current_index: 0,
            simulation_time: *self,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SimulationTimeIterator {
    current_index: usize,
    simulation_time: SimulationTime,
}

/// One decision instant of the simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationTimeIteration {
    pub index: usize,
    /// elapsed time at the start of this step, in s
    pub elapsed_seconds: u32,
    /// length of this step, in s
    pub timestep: u32,
}

impl SimulationTimeIteration {
    pub fn time(&self) -> f64 {
        self.elapsed_seconds as f64
    }

    pub fn current_hour(&self) -> usize {
        (self.elapsed_seconds / SECONDS_PER_HOUR) as usize
    }

    pub fn current_day(&self) -> usize {
        (self.elapsed_seconds / SECONDS_PER_DAY) as usize
    }

    pub fn is_start_of_hour(&self) -> bool {
        self.elapsed_seconds % SECONDS_PER_HOUR == 0
    }
}

impl Iterator for SimulationTimeIterator {
    type Item = SimulationTimeIteration;

    fn next(&mut self) -> Option<Self::Item> {
        let SimulationTime {
            end_seconds,
            step_seconds,
        } = self.simulation_time;
        let elapsed_seconds = self.current_index as u32 * step_seconds;
        if elapsed_seconds >= end_seconds {
            return None;
        }
        let iteration = SimulationTimeIteration {
            index: self.current_index,
            elapsed_seconds,
            timestep: step_seconds.min(end_seconds - elapsed_seconds),
        };
        self.current_index += 1;

        Some(iteration)
    }
}
