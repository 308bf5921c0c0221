use serde::Deserialize;

// --- OpenCage forward-geocoding response, trimmed to what we read ---

#[derive(Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}
#[derive(Deserialize)]
pub struct GeocodeResult {
    pub geometry: Geometry,
}
#[derive(Deserialize, Clone, Copy)]
pub struct Geometry {
    pub lat: f64,
    pub lng: f64,
}
