//! WebSocket close codes used by the server.

/// The socket is kicked (duplicate character claim, rule violation, admin kick).
pub const KICK: u16 = 4002;
/// The owning account is banned (`user_bans`).
pub const BAN: u16 = 4003;
