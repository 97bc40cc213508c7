use actix_cors::Cors;

/// Preflight answers are cached by browsers for this long.
const PREFLIGHT_MAX_AGE: usize = 3600;

/// Lets browsers on any origin call the API. Responses carry a literal `*`
/// origin since no credentials are involved.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allow_any_method()
        .allow_any_header()
        .max_age(PREFLIGHT_MAX_AGE)
}
