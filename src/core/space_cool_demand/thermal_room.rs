use crate::input::IntegrationMethod;

/// A server room modelled as a single lumped thermal mass:
///
/// C · dT/dt = Q_servers + A·U·(T_ambient - T) - Q_cooling
#[derive(Clone, Copy, Debug)]
pub struct ThermalRoom {
    /// exterior surface area, in m2
    area: f64,
    /// heat transfer coefficient of the envelope, in W / (m2.K)
    u_value: f64,
    /// fixed IT heat load, in W
    internal_gains: f64,
    /// thermal capacitance, in J / K
    thermal_capacitance: f64,
}

/// Ambient temperature at the start, mid-point and end of an integration substep.
#[derive(Clone, Copy, Debug)]
pub struct AmbientSpan {
    pub start: f64,
    pub mid: f64,
    pub end: f64,
}

impl AmbientSpan {
    pub fn constant(temp: f64) -> Self {
        Self {
            start: temp,
            mid: temp,
            end: temp,
        }
    }
}

/// Heat (in J) entering the room over a substep, consistent with the integration scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeatFlows {
    pub internal: f64,
    pub transmission: f64,
    pub cooling: f64,
}

impl HeatFlows {
    pub fn net(&self) -> f64 {
        self.internal + self.transmission - self.cooling
    }

    pub fn gross(&self) -> f64 {
        self.internal.abs() + self.transmission.abs() + self.cooling.abs()
    }
}

impl std::ops::AddAssign for HeatFlows {
    fn add_assign(&mut self, rhs: Self) {
        self.internal += rhs.internal;
        self.transmission += rhs.transmission;
        self.cooling += rhs.cooling;
    }
}

impl ThermalRoom {
    pub(crate) fn new(
        area: f64,
        u_value: f64,
        internal_gains: f64,
        thermal_capacitance: f64,
    ) -> Self {
        Self {
            area,
            u_value,
            internal_gains,
            thermal_capacitance,
        }
    }

    /// Heat transfer coefficient of the envelope, in W / K
    pub fn heat_transfer_coefficient(&self) -> f64 {
        self.area * self.u_value
    }

    pub fn thermal_capacitance(&self) -> f64 {
        self.thermal_capacitance
    }

    pub fn internal_gains(&self) -> f64 {
        self.internal_gains
    }

    /// Fixed point of the room temperature for constant ambient temperature and cooling power
    pub fn steady_state_temp(&self, ambient_temp: f64, cooling_power: f64) -> f64 {
        ambient_temp + (self.internal_gains - cooling_power) / self.heat_transfer_coefficient()
    }

    fn transmission_power(&self, room_temp: f64, ambient_temp: f64) -> f64 {
        self.heat_transfer_coefficient() * (ambient_temp - room_temp)
    }

    fn rate_of_change(&self, room_temp: f64, ambient_temp: f64, cooling_power: f64) -> f64 {
        (self.internal_gains + self.transmission_power(room_temp, ambient_temp) - cooling_power)
            / self.thermal_capacitance
    }

    /// Advance the room temperature over one substep with cooling power held constant.
    ///
    /// Returns the new room temperature and the heat flows over the substep.
    pub fn advance(
        &self,
        method: IntegrationMethod,
        room_temp: f64,
        ambient: AmbientSpan,
        cooling_power: f64,
        timestep: f64,
    ) -> (f64, HeatFlows) {
        let (temp_change, transmission_power) = match method {
            IntegrationMethod::ForwardEuler => (
                timestep * self.rate_of_change(room_temp, ambient.start, cooling_power),
                self.transmission_power(room_temp, ambient.start),
            ),
            IntegrationMethod::Rk4 => {
                let k1 = self.rate_of_change(room_temp, ambient.start, cooling_power);
                let temp_2 = room_temp + timestep / 2. * k1;
                let k2 = self.rate_of_change(temp_2, ambient.mid, cooling_power);
                let temp_3 = room_temp + timestep / 2. * k2;
                let k3 = self.rate_of_change(temp_3, ambient.mid, cooling_power);
                let temp_4 = room_temp + timestep * k3;
                let k4 = self.rate_of_change(temp_4, ambient.end, cooling_power);

                let transmission = (self.transmission_power(room_temp, ambient.start)
                    + 2. * self.transmission_power(temp_2, ambient.mid)
                    + 2. * self.transmission_power(temp_3, ambient.mid)
                    + self.transmission_power(temp_4, ambient.end))
                    / 6.;

                (timestep * (k1 + 2. * k2 + 2. * k3 + k4) / 6., transmission)
            }
        };

        (
            room_temp + temp_change,
            HeatFlows {
                internal: self.internal_gains * timestep,
                transmission: transmission_power * timestep,
                cooling: cooling_power * timestep,
            },
        )
    }
}
