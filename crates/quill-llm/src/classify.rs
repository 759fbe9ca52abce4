/// What went wrong upstream, as far as the failure text lets us tell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// Provider rate limit or quota hit
    RateLimited,
    /// Our credentials were rejected by the provider
    AuthFailed,
    /// Provider rejected the request shape
    BadRequest,
    /// Request body exceeded the provider's size limit
    PayloadTooLarge,
    /// Provider-side 5xx
    Unavailable,
    /// Anything else
    Other,
}

/// Substring rules checked in priority order; first hit wins
const RULES: &[(&[&str], UpstreamKind)] = &[
    (&["429", "rate limit"], UpstreamKind::RateLimited),
    (&["401", "unauthorized"], UpstreamKind::AuthFailed),
    (&["400", "bad request"], UpstreamKind::BadRequest),
    (&["413", "payload too large"], UpstreamKind::PayloadTooLarge),
    (&["500", "502", "503"], UpstreamKind::Unavailable),
];

/// Classify a provider failure from its message text
///
/// Providers rarely surface structured errors through their SDK boundaries,
/// so the status code usually arrives embedded in a message string.
pub fn classify(message: &str) -> UpstreamKind {
    let lower = message.to_lowercase();
    for (needles, kind) in RULES {
        if needles.iter().any(|needle| lower.contains(needle)) {
            return *kind;
        }
    }
    UpstreamKind::Other
}
