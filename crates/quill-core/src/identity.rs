/// Authenticated caller identity, inserted into request extensions by the
/// bearer-token middleware
///
/// Absence of this extension means the request is anonymous. Anonymous
/// requests are still served, at the smallest content budget and without
/// any ledger interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user identifier from the identity provider
    pub user_id: String,
}
