/// Liveness probe; allow-anonymous via the policy rules.
pub async fn health() -> &'static str {
    "ok"
}
