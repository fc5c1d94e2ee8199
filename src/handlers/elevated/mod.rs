// handlers/elevated/mod.rs - Elevated handlers (admin e-mail allow-list)
//
// Authenticated like the protected tier, then gated on the caller's e-mail. These
// are the only handlers that read across users.

pub mod admin_usage;
