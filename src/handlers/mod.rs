// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (authenticated user) → Elevated (admin e-mail)
//
// Every tier sits behind the identity middleware; the tiers differ only in what
// their handlers demand of the resolved identity.

pub mod elevated; // Tier 3: admin allow-list (/api/admin/*)
pub mod protected; // Tier 2: authenticated user (/api/*)
pub mod public; // Tier 1: no authentication (/, /health, /api/templates)
