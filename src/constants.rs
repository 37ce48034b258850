/// Kilograms of CO2-equivalent per reward point
/// One point is awarded for every full 10 kg recorded
pub const KG_CO2_PER_REWARD_POINT: f64 = 10.0;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for a non-finite emissions value
pub const ERR_EMISSIONS_NOT_FINITE: &str = "carbonEmissions must be a finite number";
