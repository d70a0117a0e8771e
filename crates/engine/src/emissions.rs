//! Emission factor tables
//!
//! Static coefficients in kg CO2 per unit, calibrated for Nepal.

use common::models::{EnergyType, MealType, TransportMode, WasteType};

/// Grid emission factor, kg CO2 per kWh
pub const GRID_EMISSION_FACTOR: f64 = 0.67;

/// Emission of an average meal, kg CO2 per serving
pub const AVERAGE_MEAL_EMISSION: f64 = 2.5;

/// Assumed weight when a waste activity omits it, kg
pub const DEFAULT_WASTE_WEIGHT_KG: f64 = 0.5;

/// A per-unit coefficient attached to an activity subtype
pub trait EmissionFactor {
    fn factor(&self) -> f64;
}

/// kg CO2 per km
impl EmissionFactor for TransportMode {
    fn factor(&self) -> f64 {
        match self {
            TransportMode::Walk => 0.0,
            TransportMode::Bicycle => 0.0,
            TransportMode::Ebike => 0.02,
            TransportMode::Microbus => 0.089,
            TransportMode::SafaTempo => 0.02,
            TransportMode::Motorcycle => 0.103,
            TransportMode::Car => 0.171,
            TransportMode::Bus => 0.068,
            TransportMode::Taxi => 0.171,
            TransportMode::Rickshaw => 0.0,
        }
    }
}

/// kg CO2 per serving
impl EmissionFactor for MealType {
    fn factor(&self) -> f64 {
        match self {
            MealType::Vegan => 0.5,
            MealType::Vegetarian => 1.0,
            MealType::DalBhat => 1.2,
            MealType::VegetableCurry => 0.8,
            MealType::Chicken => 2.9,
            MealType::Buff => 5.5,
            MealType::Pork => 5.9,
            MealType::Fish => 2.7,
            MealType::Egg => 1.6,
            MealType::Dairy => 1.3,
        }
    }
}

/// kWh saved per hour (or per use)
impl EmissionFactor for EnergyType {
    fn factor(&self) -> f64 {
        match self {
            EnergyType::LightsOff => 0.06,
            EnergyType::AcOff => 1.5,
            EnergyType::Unplugged => 0.01,
            EnergyType::EnergyEfficient => 0.5,
            EnergyType::SolarUsed => 1.0,
        }
    }
}

/// kg CO2 saved per kg handled
impl EmissionFactor for WasteType {
    fn factor(&self) -> f64 {
        match self {
            WasteType::Recycled => 0.3,
            WasteType::Composted => 0.5,
            WasteType::Reused => 0.4,
            WasteType::AvoidedPlastic => 0.2,
        }
    }
}

/// The baseline every eco trip is compared against
pub fn car_factor() -> f64 {
    TransportMode::Car.factor()
}

/// Modes credited as savings against the car baseline
pub fn is_eco_mode(mode: TransportMode) -> bool {
    matches!(
        mode,
        TransportMode::Walk
            | TransportMode::Bicycle
            | TransportMode::Rickshaw
            | TransportMode::Ebike
            | TransportMode::SafaTempo
    )
}

/// Meals credited as savings against the average meal
pub fn is_low_impact_meal(meal: MealType) -> bool {
    matches!(
        meal,
        MealType::Vegan | MealType::Vegetarian | MealType::DalBhat | MealType::VegetableCurry
    )
}

/// Emission of every transport mode over a distance, kg CO2
pub fn transport_comparison(distance_km: f64) -> Vec<(TransportMode, f64)> {
    TransportMode::ALL
        .iter()
        .map(|mode| (*mode, common::ledger::round3(mode.factor() * distance_km)))
        .collect()
}

/// Emission of every meal type for a number of servings, kg CO2
pub fn food_comparison(servings: i32) -> Vec<(MealType, f64)> {
    MealType::ALL
        .iter()
        .map(|meal| (*meal, common::ledger::round3(meal.factor() * servings as f64)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eco_modes_never_exceed_car_factor() {
        for mode in TransportMode::ALL.iter().filter(|m| is_eco_mode(**m)) {
            assert!(mode.factor() <= car_factor(), "{} above car baseline", mode);
        }
    }

    #[test]
    fn test_low_impact_meals_below_average() {
        for meal in MealType::ALL.iter().filter(|m| is_low_impact_meal(**m)) {
            assert!(meal.factor() < AVERAGE_MEAL_EMISSION);
        }
    }

    #[test]
    fn test_transport_comparison_covers_all_modes() {
        let comparison = transport_comparison(10.0);

        assert_eq!(comparison.len(), TransportMode::ALL.len());
        assert!(comparison.contains(&(TransportMode::Car, 1.71)));
        assert!(comparison.contains(&(TransportMode::Walk, 0.0)));
    }

    #[test]
    fn test_food_comparison_scales_with_servings() {
        let comparison = food_comparison(2);

        assert!(comparison.contains(&(MealType::Chicken, 5.8)));
        assert!(comparison.contains(&(MealType::Vegan, 1.0)));
    }
}
