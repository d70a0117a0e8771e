//! Carbon impact calculation
//!
//! Each category computes its own impact through [`ImpactModel`]. Missing or
//! incomplete attributes degrade to zero impact rather than failing; rejecting
//! malformed input is the job of [`crate::validate`].

use common::ledger::round3;
use common::models::{ActivityDetails, EnergyDetails, FoodDetails, TransportDetails, WasteDetails};
use serde::Serialize;

use crate::emissions::{
    car_factor, is_eco_mode, is_low_impact_meal, EmissionFactor, AVERAGE_MEAL_EMISSION,
    DEFAULT_WASTE_WEIGHT_KG, GRID_EMISSION_FACTOR,
};

/// Signed CO2 impact in kg: positive = saved, negative = emitted
pub trait ImpactModel {
    fn co2_impact(&self) -> f64;
}

impl ImpactModel for TransportDetails {
    fn co2_impact(&self) -> f64 {
        let (Some(mode), Some(distance)) = (self.mode, self.distance_km) else {
            return 0.0;
        };
        if distance <= 0.0 {
            return 0.0;
        }

        if is_eco_mode(mode) {
            // Savings are measured against driving the same distance
            round3((car_factor() - mode.factor()) * distance)
        } else {
            round3(-(mode.factor() * distance))
        }
    }
}

impl ImpactModel for FoodDetails {
    fn co2_impact(&self) -> f64 {
        let Some(meal) = self.meal_type else {
            return 0.0;
        };
        let servings = match self.servings {
            Some(s) if s > 0 => s as f64,
            _ => 1.0,
        };

        if is_low_impact_meal(meal) {
            round3((AVERAGE_MEAL_EMISSION - meal.factor()) * servings)
        } else {
            round3(-(meal.factor() * servings))
        }
    }
}

impl ImpactModel for EnergyDetails {
    fn co2_impact(&self) -> f64 {
        let kwh = match self.kwh_saved {
            Some(kwh) if kwh > 0.0 => kwh,
            _ => {
                let hours = match self.hours {
                    Some(h) if h > 0.0 => h,
                    _ => 1.0,
                };
                self.energy_type.map(|e| e.factor()).unwrap_or(0.0) * hours
            }
        };

        round3(kwh * GRID_EMISSION_FACTOR)
    }
}

impl ImpactModel for WasteDetails {
    fn co2_impact(&self) -> f64 {
        let Some(waste) = self.waste_type else {
            return 0.0;
        };
        let weight = match self.weight_kg {
            Some(w) if w > 0.0 => w,
            _ => DEFAULT_WASTE_WEIGHT_KG,
        };

        round3(waste.factor() * weight)
    }
}

impl ImpactModel for ActivityDetails {
    fn co2_impact(&self) -> f64 {
        match self {
            ActivityDetails::Transport(d) => d.co2_impact(),
            ActivityDetails::Food(d) => d.co2_impact(),
            ActivityDetails::Energy(d) => d.co2_impact(),
            ActivityDetails::Waste(d) => d.co2_impact(),
        }
    }
}

/// Impact and point award for one activity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Impact {
    pub co2_kg: f64,
    pub points: u32,
}

/// 10 points per kg saved, truncated. Emissions earn nothing.
pub fn points_for_impact(co2_kg: f64) -> u32 {
    if co2_kg > 0.0 {
        (co2_kg * 10.0).floor() as u32
    } else {
        0
    }
}

/// Compute impact and points for an activity
pub fn assess(details: &ActivityDetails) -> Impact {
    let co2_kg = details.co2_impact();
    Impact {
        co2_kg,
        points: points_for_impact(co2_kg),
    }
}
