/// Determinant magnitude at or below which a matrix or linear system is treated as singular.
pub const SINGULARITY_THRESHOLD: f64 = 1e-12;
/// Refractive index of the medium surrounding a stack, unless configured otherwise.
pub const AMBIENT_REFR_INDEX: f64 = 1.0;
/// Incident field amplitude used when the caller does not supply one.
pub const DEFAULT_INCIDENT_FIELD: f64 = 1.0;
